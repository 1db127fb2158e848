#![deny(missing_docs)]
//! Incremental k-way merge of tailing, time-ordered log sources.
//!
//! A [`TailingMerger`] owns a fixed set of [`OrderedSource`]s and an
//! [`IndexedLog`]. A *load* pass merges everything the sources appended since
//! the previous load and inserts it in global time order; a *peek* pass looks
//! for the first merged record accepted by a filter and inserts only that
//! one. Both passes are lazy streams of progress percentages, can be
//! cancelled per call, and are stopped for good by [`TailingMerger::close`] or
//! a [`ShutdownHandle`].
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use tailmerge::{JsonLinesSource, LogEntry, LogIndex, TailingMerger};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let sources = vec![
//!     JsonLinesSource::<LogEntry>::new("api.jsonl"),
//!     JsonLinesSource::<LogEntry>::new("worker.jsonl"),
//! ];
//! let mut merger = TailingMerger::new(sources, LogIndex::new());
//!
//! let mut progress = Box::pin(merger.load(None, CancellationToken::new()));
//! while let Some(percent) = progress.next().await {
//!     println!("{}%", percent?);
//! }
//! drop(progress);
//!
//! merger.close().await?;
//! # Ok(())
//! # }
//! ```

/// Cancellation tokens linked across scopes.
pub mod cancel;
mod index;
mod merger;
pub(crate) mod observability;
mod option;
pub(crate) mod progress;
/// Record types and the traits the merger relies on.
pub mod record;
/// Ordered, resumable sources and their built-in implementations.
pub mod source;
/// The generic ordered merge stream.
pub mod stream;

pub use crate::{
    cancel::LinkedToken,
    index::{IndexedLog, LogIndex, SourceMetadata},
    merger::{CloseError, CloseFailure, MergeError, ShutdownHandle, TailingMerger},
    option::MergeOption,
    record::{Filter, LogEntry, LogRecord, Timestamp},
    source::{
        JsonLinesSource, MemoryAppender, MemorySource, OrderedSource, Progressed, ScanStream,
        SourceError,
    },
    stream::{merge, MergeStream, Merged, SourceFailure},
};
