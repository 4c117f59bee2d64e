use hubget_fetch::{DownloadJob, OutcomeState, Report};
use indicatif::{MultiProgress, ProgressDrawTarget};

use self::table::{FormatConfig, Formatter, ReportRow};
use self::tracker::ProgressTracker;

pub mod table;
pub mod tracker;

/// Terminal output shared by the log writer, progress bars and reports.
pub struct Ui {
    multi: MultiProgress,
}

impl Ui {
    pub fn new(progress: bool) -> Self {
        let target = if progress {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self {
            multi: MultiProgress::with_draw_target(target),
        }
    }

    pub fn multi(&self) -> &MultiProgress { &self.multi }

    pub fn tracker(&self) -> ProgressTracker { ProgressTracker::new(self.multi.clone()) }

    /// Prints every file that was not already present, with a summary footer.
    pub fn print_report(&self, job: &DownloadJob, report: &Report) {
        let rows: Vec<ReportRow> = report
            .outcomes()
            .iter()
            .filter(|o| o.state != OutcomeState::Skipped)
            .map(ReportRow::from)
            .collect();

        let config = FormatConfig {
            header: Some(format!("{} -> {}", job.repo, job.local_dir.display())),
            footer: Some(table::summary_line(&report.summary())),
            col_name: false,
        };
        let table = Formatter::default(rows, config);
        self.multi.suspend(|| println!("{table}"));
    }
}
