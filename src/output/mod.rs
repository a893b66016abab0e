mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::{export_dataset, export_disabled_tests};
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::{print_catalog, print_summary};

/// Prints the `testlens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔬 testlens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI test result correlation")
    );
}
