//! HTTP implementations of the correlation backends.

pub mod github;
pub mod http;
pub mod taskcluster;
pub mod treeherder;

pub use github::GitHubClient;
pub use http::HttpPolicy;
pub use taskcluster::TaskclusterClient;
pub use treeherder::TreeherderClient;
