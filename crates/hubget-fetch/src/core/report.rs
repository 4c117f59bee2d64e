use tracing::{info, warn};

use crate::data::{OutcomeState, TransferOutcome};

/// Collects outcomes in whatever order files finish.
#[derive(Debug, Default)]
pub struct Reporter {
    outcomes: Vec<TransferOutcome>,
}

impl Reporter {
    pub fn new() -> Self { Self::default() }

    /// Records and logs one terminal outcome.
    pub fn record(&mut self, outcome: TransferOutcome) {
        match &outcome.state {
            OutcomeState::Succeeded if outcome.attempts > 1 => info!(
                path = %outcome.path,
                bytes = outcome.bytes_transferred,
                attempts = outcome.attempts,
                "downloaded after retries"
            ),
            OutcomeState::Succeeded => {
                info!(path = %outcome.path, bytes = outcome.bytes_transferred, "downloaded")
            }
            OutcomeState::Skipped => info!(path = %outcome.path, "already present, skipped"),
            OutcomeState::Failed(failure) => warn!(
                path = %outcome.path,
                attempts = outcome.attempts,
                kind = %failure.kind,
                "failed: {}",
                failure.message
            ),
        }
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize { self.outcomes.len() }

    pub fn is_empty(&self) -> bool { self.outcomes.is_empty() }

    /// `excluded` is the number of manifest entries filtered out by patterns.
    pub fn finish(self, excluded: usize) -> Report { Report::new(self.outcomes, excluded) }
}

/// Final per-file report of one repository download, sorted by path.
#[derive(Debug, Clone)]
pub struct Report {
    outcomes: Vec<TransferOutcome>,
    excluded: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub succeeded:         usize,
    pub skipped:           usize,
    pub failed:            usize,
    /// Succeeded, but not on the first attempt.
    pub retried:           usize,
    pub excluded:          usize,
    pub bytes_transferred: u64,
}

impl Report {
    pub fn new(mut outcomes: Vec<TransferOutcome>, excluded: usize) -> Self {
        outcomes.sort_by(|a, b| a.path.cmp(&b.path));
        Self { outcomes, excluded }
    }

    pub fn outcomes(&self) -> &[TransferOutcome] { &self.outcomes }

    pub fn succeeded(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.outcomes.iter().filter(|o| o.state == OutcomeState::Succeeded)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.outcomes.iter().filter(|o| o.state == OutcomeState::Skipped)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn retried(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.succeeded().filter(|o| o.attempts > 1)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            succeeded:         self.succeeded().count(),
            skipped:           self.skipped().count(),
            failed:            self.failed().count(),
            retried:           self.retried().count(),
            excluded:          self.excluded,
            bytes_transferred: self.outcomes.iter().map(|o| o.bytes_transferred).sum(),
        }
    }

    /// No file failed. Skipped files count as success.
    pub fn is_success(&self) -> bool { self.failed().next().is_none() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    fn succeeded(path: &str, attempts: u32) -> TransferOutcome {
        TransferOutcome {
            path: path.into(),
            state: OutcomeState::Succeeded,
            bytes_transferred: 10,
            attempts,
        }
    }

    #[test]
    fn test_report_is_sorted_and_counted() {
        let mut reporter = Reporter::new();
        reporter.record(succeeded("z.bin", 1));
        reporter.record(TransferOutcome::skipped("a.json"));
        reporter.record(succeeded("m.bin", 3));
        reporter.record(TransferOutcome::failed(
            "b.bin",
            &FetchError::NotFound("gone".into()),
            0,
            1,
        ));
        assert_eq!(reporter.len(), 4);

        let report = reporter.finish(2);
        let paths: Vec<_> = report.outcomes().iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, ["a.json", "b.bin", "m.bin", "z.bin"]);

        assert_eq!(
            report.summary(),
            Summary {
                succeeded:         2,
                skipped:           1,
                failed:            1,
                retried:           1,
                excluded:          2,
                bytes_transferred: 20,
            }
        );
        assert!(!report.is_success());
        assert_eq!(report.retried().next().unwrap().path, "m.bin");
    }

    #[test]
    fn test_skipped_only_is_success() {
        let report = Report::new(vec![TransferOutcome::skipped("a")], 0);
        assert!(report.is_success());

        let empty = Report::new(Vec::new(), 5);
        assert!(empty.is_success());
    }
}
