use serde::Deserialize;

use crate::correlate::types::{Execution, Push};

/// Paged list envelope used by the push and job endpoints.
#[derive(Debug, Deserialize)]
pub struct ResultsPage<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

pub type PushPage = ResultsPage<Push>;
pub type JobPage = ResultsPage<Execution>;

/// One entry of the job log URL listing.
#[derive(Debug, Deserialize)]
pub struct JobLogUrl {
    pub url: String,
}
