//! The indexed log that receives merged, filtered records.

use std::collections::HashMap;

use crate::record::{LogRecord, Timestamp};

/// Destination of the records produced by a merge pass.
///
/// Sources are registered by name before every pass; the index returned for a
/// name must be the ordinal the merger assigned to that source.
pub trait IndexedLog<R> {
    /// Register a source and return the index records of that source are
    /// stamped with.
    fn register_source(&mut self, name: &str) -> usize;

    /// Make sure a metadata slot exists for the source at `index`.
    fn register_metadata_slot(&mut self, index: usize);

    /// Append a record, already stamped with its source index.
    fn insert(&mut self, record: R);
}

/// Per-source bookkeeping kept by [`LogIndex`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    registrations: u64,
    records: usize,
    last_time: Option<Timestamp>,
}

impl SourceMetadata {
    /// How many passes registered this source.
    pub fn registrations(&self) -> u64 {
        self.registrations
    }

    /// Records inserted from this source.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Time of the last record inserted from this source.
    pub fn last_time(&self) -> Option<Timestamp> {
        self.last_time
    }
}

/// In-memory [`IndexedLog`] keeping records in insertion order.
///
/// Registering a name that is already known returns its existing index, so an
/// incremental pass over the same sources registers cleanly.
#[derive(Debug)]
pub struct LogIndex<R> {
    names: Vec<String>,
    by_name: HashMap<String, usize>,
    metadata: Vec<SourceMetadata>,
    records: Vec<R>,
}

impl<R> Default for LogIndex<R> {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            by_name: HashMap::new(),
            metadata: Vec::new(),
            records: Vec::new(),
        }
    }
}

impl<R> LogIndex<R> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in the order they were inserted.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Number of records inserted so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no record has been inserted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered source names, by index.
    pub fn source_names(&self) -> &[String] {
        &self.names
    }

    /// Name registered for `index`.
    pub fn source_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Metadata slot of the source at `index`.
    pub fn metadata(&self, index: usize) -> Option<&SourceMetadata> {
        self.metadata.get(index)
    }

    /// Remove and return all records, keeping source registrations.
    pub fn drain_records(&mut self) -> Vec<R> {
        std::mem::take(&mut self.records)
    }
}

impl<R> IndexedLog<R> for LogIndex<R>
where
    R: LogRecord,
{
    fn register_source(&mut self, name: &str) -> usize {
        if let Some(index) = self.by_name.get(name) {
            return *index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), index);
        index
    }

    fn register_metadata_slot(&mut self, index: usize) {
        if self.metadata.len() <= index {
            self.metadata.resize_with(index + 1, SourceMetadata::default);
        }
        self.metadata[index].registrations += 1;
    }

    fn insert(&mut self, record: R) {
        if let Some(slot) = record
            .source_index()
            .and_then(|index| self.metadata.get_mut(index))
        {
            slot.records += 1;
            slot.last_time = Some(record.time());
        }
        self.records.push(record);
    }
}
