use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow, dim};

/// Progress tracking for the three phases of a build
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_pushes() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/3: Fetching pushes").to_string());
        Self { pb }
    }

    pub fn finish_pushes_start_categories(self, pushes: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Fetched {pushes} pushes ✓")).to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 2/3: Collecting categories").to_string());
        Self { pb }
    }

    /// Shows which category is being collected.
    pub fn category(&self, name: &str, index: usize, total: usize) {
        self.pb.set_message(format!(
            "{} {}",
            bright_yellow(format!("Phase 2/3: Collecting categories ({}/{total})", index + 1)),
            dim(name)
        ));
    }

    pub fn finish_categories_start_output(self, records: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 2/3: Collected {records} records ✓")).to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 3/3: Writing output").to_string());
        Self { pb }
    }

    pub fn finish_output(self) {
        self.pb
            .finish_with_message(bright_green("Phase 3/3: Output written ✓").to_string());
        eprintln!();
    }

    /// Clears the spinner when a phase fails.
    pub fn abandon(self) {
        self.pb.abandon();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
