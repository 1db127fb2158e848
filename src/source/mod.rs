//! Ordered, append-only, resumable log sources.

mod error;
mod json_lines;
mod memory;

use std::future::Future;

use futures_util::stream::BoxStream;

pub use self::{
    error::SourceError,
    json_lines::JsonLinesSource,
    memory::{MemoryAppender, MemorySource},
};
use crate::record::LogRecord;

/// Stream returned by [`OrderedSource::scan`].
pub type ScanStream<'scan, R> = BoxStream<'scan, Result<Progressed<R>, SourceError>>;

/// A record together with the completion percentage of its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progressed<R> {
    /// The scanned record.
    pub record: R,
    /// How far the source has been read, from 0 to 100.
    pub percent: u8,
}

impl<R> Progressed<R> {
    /// Pair `record` with `percent`, clamped to 100.
    pub fn new(record: R, percent: u8) -> Self {
        Self {
            record,
            percent: percent.min(100),
        }
    }
}

/// An append-only sequence of time-ordered records that can be read
/// incrementally.
///
/// Each call to [`scan`](OrderedSource::scan) starts where the previous scan
/// stopped and yields only the records appended since. Within one scan records
/// never go back in time.
///
/// The cursor moves past a yielded record only once the scan produces its
/// next item, ends or fails, never on the yield itself. A record fetched by a
/// pass that stops before the scan moves on, including a pass dropped while
/// the scan is still reading, is therefore yielded again by the following
/// scan. A failure that should not repeat on every scan must move the cursor
/// past its cause before it is yielded.
pub trait OrderedSource {
    /// Type of the records produced by this source.
    type Record: LogRecord + Send;

    /// Stable, human-readable name used to register the source.
    fn name(&self) -> &str;

    /// Scan the records appended since the previous scan.
    fn scan(&mut self) -> ScanStream<'_, Self::Record>;

    /// Release any file or stream handles held by the source.
    fn close(&mut self) -> impl Future<Output = Result<(), SourceError>> + Send {
        async { Ok(()) }
    }
}

/// Percentage of `total` covered by `done`, 100 when there is nothing to read.
pub(crate) fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.saturating_mul(100) / total).min(100) as u8
}
