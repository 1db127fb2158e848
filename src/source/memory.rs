use std::sync::{Arc, Mutex, PoisonError};

use async_stream::stream;

use super::{percent_of, OrderedSource, Progressed, ScanStream};
use crate::record::LogRecord;

/// An in-memory source fed through a [`MemoryAppender`].
///
/// Useful for logs produced inside the process and for exercising a merger
/// without touching the file system.
#[derive(Debug)]
pub struct MemorySource<R> {
    name: String,
    log: Arc<Mutex<Vec<R>>>,
    cursor: usize,
}

/// Cloneable handle appending records to a [`MemorySource`].
#[derive(Debug)]
pub struct MemoryAppender<R> {
    log: Arc<Mutex<Vec<R>>>,
}

impl<R> Clone for MemoryAppender<R> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
        }
    }
}

impl<R> MemorySource<R> {
    /// Create an empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_records(name, Vec::new())
    }

    /// Create a source already holding `records`, which must be ordered by
    /// time.
    pub fn with_records(name: impl Into<String>, records: Vec<R>) -> Self {
        Self {
            name: name.into(),
            log: Arc::new(Mutex::new(records)),
            cursor: 0,
        }
    }

    /// Handle for appending records after the source has been handed over.
    pub fn appender(&self) -> MemoryAppender<R> {
        MemoryAppender {
            log: Arc::clone(&self.log),
        }
    }

    /// Number of records consumed by previous scans.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl<R> MemoryAppender<R> {
    /// Append a record. It must not be older than the last appended one.
    pub fn append(&self, record: R) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Append several records in order.
    pub fn extend(&self, records: impl IntoIterator<Item = R>) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records);
    }
}

impl<R> OrderedSource for MemorySource<R>
where
    R: LogRecord + Clone + Send,
{
    type Record = R;

    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&mut self) -> ScanStream<'_, R> {
        Box::pin(stream! {
            loop {
                let (next, len) = {
                    let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
                    (log.get(self.cursor).cloned(), log.len())
                };
                let record = match next {
                    Some(record) => record,
                    None => break,
                };
                let percent = percent_of(self.cursor as u64 + 1, len as u64);
                yield Ok(Progressed::new(record, percent));
                self.cursor += 1;
            }
        })
    }
}
