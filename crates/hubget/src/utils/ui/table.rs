use hubget_fetch::{OutcomeState, Summary, TransferOutcome};
use indicatif::HumanBytes;
use tabled::settings::object::Rows;
use tabled::settings::{Panel, Remove, Style};
use tabled::{Table, Tabled};

pub struct Formatter;

#[derive(Debug, Clone, Default)]
pub struct FormatConfig {
    pub header:   Option<String>,
    pub footer:   Option<String>,
    /// Drop the column-name row.
    pub col_name: bool,
}

impl Formatter {
    pub fn default<T: Tabled>(data: impl IntoIterator<Item = T>, config: FormatConfig) -> Table {
        let mut table = Table::new(data);
        if config.col_name {
            table.with(Remove::row(Rows::first()));
        }
        if let Some(header) = config.header {
            table.with(Panel::header(header));
        }
        if let Some(footer) = config.footer {
            table.with(Panel::footer(footer));
        }

        table.with(Style::blank());
        table
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct ReportRow {
    pub file:     String,
    pub status:   &'static str,
    pub received: String,
    pub attempts: u32,
    pub detail:   String,
}

impl From<&TransferOutcome> for ReportRow {
    fn from(outcome: &TransferOutcome) -> Self {
        let (status, detail) = match &outcome.state {
            OutcomeState::Succeeded if outcome.attempts > 1 => ("retried", String::new()),
            OutcomeState::Succeeded => ("ok", String::new()),
            OutcomeState::Skipped => ("present", String::new()),
            OutcomeState::Failed(failure) => ("FAILED", failure.to_string()),
        };
        Self {
            file: outcome.path.clone(),
            status,
            received: HumanBytes(outcome.bytes_transferred).to_string(),
            attempts: outcome.attempts,
            detail,
        }
    }
}

pub fn summary_line(summary: &Summary) -> String {
    format!(
        "{} downloaded, {} already present, {} failed, {} retried, {} excluded, {} received",
        summary.succeeded,
        summary.skipped,
        summary.failed,
        summary.retried,
        summary.excluded,
        HumanBytes(summary.bytes_transferred)
    )
}
