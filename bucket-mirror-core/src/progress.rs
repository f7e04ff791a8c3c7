//! Progress reporting for downloads

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};

const BAR_TEMPLATE: &str =
    "{bytes}/{total_bytes} [{wide_bar}] {percent}% {binary_bytes_per_sec} eta {eta}";

/// Whether byte-level progress bars are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressDisplay {
    /// Draw to stderr (indicatif hides the bar when stderr is not a terminal).
    #[default]
    Bar,
    /// Never draw.
    Hidden,
}

impl ProgressDisplay {
    /// Creates a bar sized to `total_bytes`.
    pub fn transfer_bar(self, total_bytes: u64) -> ProgressBar {
        let target = match self {
            ProgressDisplay::Bar => ProgressDrawTarget::stderr(),
            ProgressDisplay::Hidden => ProgressDrawTarget::hidden(),
        };
        let bar = ProgressBar::with_draw_target(Some(total_bytes), target);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}

/// Share of the worklist reached after item `position` (1-based) of `total`.
pub fn worklist_percent(position: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (position as f64 / total as f64) * 100.0
}

/// The per-item line logged before each download.
pub fn progress_line(key: &str, position: usize, total: usize) -> String {
    format!(
        "downloading '{}' [{} of {} ({:.2}%)]",
        key,
        position,
        total,
        worklist_percent(position, total)
    )
}
