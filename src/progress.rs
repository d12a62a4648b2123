//! Progress reporting: one bar over (country, phase) pairs.
//!
//! The bar redraws on a timer and would interleave with log lines, so it is
//! only shown when the subscriber filters out debug output.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const PAIR_TEMPLATE: &str = "{spinner} pair {pos}/{len} {wide_bar} {elapsed} {msg}";

/// Bar over the pairs of one run; hidden when progress is off.
pub struct PairProgress {
    pb: Option<ProgressBar>,
}

impl PairProgress {
    pub fn new(enabled: bool, total: u64) -> Self {
        let verbose = tracing::enabled!(tracing::Level::DEBUG);
        if enabled && verbose {
            tracing::debug!("debug logging is on; progress bar suppressed");
        }
        Self { pb: (enabled && !verbose).then(|| pair_bar(total)) }
    }

    pub fn is_visible(&self) -> bool {
        self.pb.is_some()
    }

    pub fn set_pair(&self, label: String) {
        if let Some(pb) = &self.pb {
            pb.set_message(label);
        }
    }

    pub fn inc(&self) {
        if let Some(pb) = &self.pb {
            pb.inc(1);
        }
    }

    pub fn finish(&self, msg: &'static str) {
        if let Some(pb) = &self.pb {
            pb.finish_with_message(msg);
        }
    }
}

fn pair_bar(total: u64) -> ProgressBar {
    let style = ProgressStyle::with_template(PAIR_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar());
    let pb = ProgressBar::new(total).with_style(style);
    pb.enable_steady_tick(Duration::from_millis(250));
    pb
}
