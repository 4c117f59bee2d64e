use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hubget_fetch::{FetchPhase, Progress};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;

const PB_STYLE: &str = "{spinner:.blue} {wide_msg} {bar:30.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

/// One progress bar per file in flight, driven by the downloader's progress
/// callback.
#[derive(Clone)]
pub struct ProgressTracker {
    multi: MultiProgress,
    bars:  Arc<Mutex<HashMap<Arc<str>, ProgressBar>>>,
}

impl ProgressTracker {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Arc::default(),
        }
    }

    pub fn callback(&self) -> Arc<dyn Fn(&Progress) + Send + Sync> {
        let tracker = self.clone();
        Arc::new(move |progress: &Progress| tracker.update(progress))
    }

    pub fn update(&self, progress: &Progress) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };

        match progress.phase {
            FetchPhase::Completed | FetchPhase::Failed => {
                if let Some(pb) = bars.remove(&progress.path) {
                    pb.finish_and_clear();
                    self.multi.remove(&pb);
                }
            }
            phase => {
                let pb = bars
                    .entry(progress.path.clone())
                    .or_insert_with(|| self.bar(progress.total_bytes));
                pb.set_position(progress.bytes_downloaded);
                pb.set_message(label(progress, phase));
            }
        }
    }

    fn bar(&self, len: u64) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        if let Some(style) = PB_TEMPLATE.as_ref() {
            pb.set_style(style.clone());
        }
        pb
    }

    /// Clears bars left behind by an aborted run.
    pub fn finish(&self) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        for (_, pb) in bars.drain() {
            pb.finish_and_clear();
            self.multi.remove(&pb);
        }
    }
}

fn label(progress: &Progress, phase: FetchPhase) -> String {
    match (phase, progress.is_retrying()) {
        (FetchPhase::Downloading, false) => progress.path.to_string(),
        (phase, false) => format!("{} [{phase}]", progress.path),
        (phase, true) => format!("{} [{phase}, pass {}]", progress.path, progress.attempt),
    }
}
