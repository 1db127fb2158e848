//! Record contracts shared by sources, the merge and the indexed log.

mod entry;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use self::entry::LogEntry;

/// Sort key of a log record.
///
/// Wraps a signed count of time units since an arbitrary epoch; the merge only
/// relies on its total order. Ties between records are allowed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Earliest representable timestamp.
    pub const MIN: Self = Self(i64::MIN);
    /// Latest representable timestamp.
    pub const MAX: Self = Self(i64::MAX);

    /// Construct a timestamp from a raw `i64`.
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw `i64` value backing this timestamp.
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Timestamp").field(&self.0).finish()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record that can be merged by time and stamped with its source ordinal.
pub trait LogRecord {
    /// Sort key used to order records across sources.
    fn time(&self) -> Timestamp;

    /// Ordinal of the source this record was merged from, once stamped.
    fn source_index(&self) -> Option<usize>;

    /// Stamp the ordinal of the originating source.
    fn set_source_index(&mut self, index: usize);
}

/// Predicate deciding whether a merged record is accepted.
///
/// Implementations must be pure: the merge may evaluate a record at most once
/// per pass but makes no other guarantee about when it is called.
pub trait Filter<R: ?Sized> {
    /// Returns `true` when `record` should be forwarded to the indexed log.
    fn matches(&self, record: &R) -> bool;
}

impl<R, F> Filter<R> for F
where
    R: ?Sized,
    F: Fn(&R) -> bool,
{
    fn matches(&self, record: &R) -> bool {
        self(record)
    }
}
