use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Progress tracking for the three collection phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1(dashboard: &str) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(
            bright_yellow(format!("Phase 1/3: Fetching {dashboard} job statuses and test results"))
                .to_string(),
        );
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, jobs: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/3: Fetched {jobs} job statuses ✓")).to_string(),
        );
        let pb = create_spinner(
            bright_yellow("Phase 2/3: Fetching reported flakes from the board").to_string(),
        );
        Self { pb }
    }

    pub fn finish_phase_2_start_phase_3(self, issues: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 2/3: Fetched {issues} reported flakes ✓")).to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 3/3: Linking reported flakes").to_string());
        Self { pb }
    }

    pub fn finish_phase_3(self, links: usize) {
        self.pb.finish_with_message(
            bright_green(format!("Phase 3/3: Linked {links} tests to issues ✓")).to_string(),
        );
        eprintln!("\n");
    }

    /// Leaves the spinner where it stopped when a phase fails.
    pub fn abandon(&self) {
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
