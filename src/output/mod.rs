mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_report;
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the flake-tracker banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("❄️  flake-tracker"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Links reported flakes to TestGrid results")
    );
}
