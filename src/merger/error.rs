use thiserror::Error;

use crate::source::SourceError;

/// Error yielded by a load or peek pass.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A source failed while being scanned; the pass stopped.
    #[error("source {ordinal} ({name}) failed: {error}")]
    Source {
        /// Ordinal of the failing source.
        ordinal: usize,
        /// Registered name of the failing source.
        name: String,
        /// What went wrong.
        #[source]
        error: SourceError,
    },
}

/// A source that could not be released by [`TailingMerger::close`](crate::TailingMerger::close).
#[derive(Debug, Error)]
#[error("{name}: {error}")]
pub struct CloseFailure {
    /// Registered name of the source.
    pub name: String,
    /// What went wrong.
    #[source]
    pub error: SourceError,
}

/// Error returned when one or more sources failed to release.
///
/// Every source is still given the chance to release before this is returned.
#[derive(Debug, Error)]
#[error("failed to release {count} source(s): {summary}", count = .failures.len(), summary = summarize(.failures))]
pub struct CloseError {
    /// Every failure, in source order.
    pub failures: Vec<CloseFailure>,
}

fn summarize(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(CloseFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
