use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_red, bright_yellow};

/// Spinner shown on stderr while a job's console is being watched.
pub struct WatchProgress {
    pb: ProgressBar,
}

impl WatchProgress {
    pub fn start(job: &str) -> Self {
        eprintln!("{}  {}", bright("👀"), bright(format!("Watching {job}")).underlined());
        let pb = create_spinner(bright_yellow("Waiting for console output").to_string());
        Self { pb }
    }

    pub fn update(&self, lines: usize, status: &str) {
        self.pb.set_message(
            bright_yellow(format!("{lines} lines received, job is {status}")).to_string(),
        );
    }

    pub fn paused(&self) {
        self.pb
            .set_message(bright_yellow("Polling paused").to_string());
    }

    /// Hides the spinner so other output can be printed above it.
    pub fn suspend<F: FnOnce()>(&self, f: F) {
        self.pb.suspend(f);
    }

    pub fn finish(self, lines: usize, result: &str) {
        let message = if result.eq_ignore_ascii_case("passed") {
            bright_green(format!("Job {result} after {lines} lines ✓"))
        } else {
            bright_red(format!("Job {result} after {lines} lines ✗"))
        };
        self.pb.finish_with_message(message.to_string());
        eprintln!();
    }

    pub fn abandon(self, reason: &str) {
        self.pb
            .abandon_with_message(bright_red(reason).to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap(),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
