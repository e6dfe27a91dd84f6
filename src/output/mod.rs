mod exports;
pub mod html;
mod progress;
mod styling;
mod summary;
mod tables;
pub mod terminal;

pub use exports::{export_console, export_consoles, FoldedConsole};
pub use progress::WatchProgress;
pub use styling::{dim, magenta_bold};

/// Prints the `consolefold` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🧾 consolefold"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI Console Folding Tool")
    );
}
