pub(crate) mod merge;

use thiserror::Error;

pub use self::merge::{merge, MergeStream};

/// An item tagged with the ordinal of the stream it was merged from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged<T> {
    /// Position of the originating stream in the merge input.
    pub source: usize,
    /// The merged item.
    pub item: T,
}

/// A stream failure surfaced by the merge, tagged with the failing ordinal.
#[derive(Debug, Error)]
#[error("merge input {ordinal} failed: {error}")]
pub struct SourceFailure<E> {
    /// Position of the failing stream in the merge input.
    pub ordinal: usize,
    /// The error the stream yielded.
    #[source]
    pub error: E,
}
