//! Tailing load and peek passes over a fixed set of ordered sources.
//!
//! A [`TailingMerger`] owns its sources and an [`IndexedLog`]. Each pass merges
//! whatever the sources appended since the previous pass, forwards the merged
//! records to the log and reports progress as a stream of percentages. Passes
//! are pull driven: no work happens between two polls of the progress stream,
//! and dropping the stream ends the pass.

mod error;
mod lifetime;

use std::{cmp::Ordering, mem, sync::Arc};

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

pub use self::{
    error::{CloseError, CloseFailure, MergeError},
    lifetime::ShutdownHandle,
};
use self::lifetime::{begin_pass, Lifetime};
use crate::{
    index::IndexedLog,
    observability::{log_debug, log_info, log_warn},
    option::MergeOption,
    progress::{load_interval, ProgressTracker, COMPLETE},
    record::{Filter, LogRecord},
    source::{OrderedSource, Progressed, SourceError},
    stream::{MergeStream, Merged, SourceFailure},
};

/// Merges a set of tailing sources into an indexed log.
///
/// Only one pass runs at a time: the progress stream of a pass borrows the
/// merger mutably until it is dropped. Another task may still stop the merger
/// through a [`ShutdownHandle`].
pub struct TailingMerger<S, M> {
    sources: Vec<S>,
    model: M,
    option: MergeOption,
    lifetime: Arc<Lifetime>,
    loads: u64,
}

impl<S, M> TailingMerger<S, M>
where
    S: OrderedSource,
    M: IndexedLog<S::Record>,
{
    /// Create a merger with the default [`MergeOption`].
    pub fn new(sources: Vec<S>, model: M) -> Self {
        Self::with_option(sources, model, MergeOption::default())
    }

    /// Create a merger with an explicit option.
    pub fn with_option(sources: Vec<S>, model: M, option: MergeOption) -> Self {
        Self {
            sources,
            model,
            option,
            lifetime: Arc::new(Lifetime::default()),
            loads: 0,
        }
    }

    /// Add a source; it takes the next ordinal from the following pass on.
    pub fn push_source(&mut self, source: S) {
        self.sources.push(source);
    }

    /// The sources, in ordinal order.
    pub fn sources(&self) -> &[S] {
        &self.sources
    }

    /// The indexed log receiving merged records.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the indexed log between passes.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// The option this merger was built with.
    pub fn option(&self) -> &MergeOption {
        &self.option
    }

    /// Handle able to stop this merger from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            lifetime: Arc::clone(&self.lifetime),
        }
    }

    /// Whether a pass is currently running.
    pub fn is_busy(&self) -> bool {
        self.lifetime.in_progress()
    }

    /// Merge everything the sources appended since the previous load.
    ///
    /// The first load reads every source from its start; later loads pick up
    /// only new records. Records accepted by `filter` (all of them when it is
    /// `None`) are stamped with their source ordinal and inserted in time
    /// order. The stream yields `0` first and `100` last; cancelling `cancel`
    /// or shutting the merger down ends it early without the final `100`.
    pub fn load<'a>(
        &'a mut self,
        filter: Option<&'a dyn Filter<S::Record>>,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<u8, MergeError>> + 'a {
        let TailingMerger {
            sources,
            model,
            option,
            lifetime,
            loads,
        } = self;

        stream! {
            let (cancel, _pass) = begin_pass(lifetime, cancel);
            *loads += 1;
            let kind = if *loads == 1 { "first" } else { "incremental" };

            yield Ok(0);
            if cancel.is_cancelled() {
                log_debug!(component = "load", event = "pass_cancelled", kind, merged = 0);
                return;
            }
            if sources.is_empty() {
                yield Ok(COMPLETE);
                return;
            }

            let names = source_names(sources.as_slice());
            register_sources::<S::Record, _>(model, &names);
            log_debug!(
                component = "load",
                event = "pass_started",
                kind,
                sources = names.len(),
                filtered = filter.is_some(),
            );

            let mut progress = ProgressTracker::new(
                names.len(),
                load_interval(names.len(), option.steps_per_source),
            );
            let scans = sources
                .iter_mut()
                .map(|source| source.scan())
                .collect::<Vec<_>>();
            let mut merged = MergeStream::new(cancel.clone(), by_time::<S::Record>, scans);
            let mut count = 0usize;
            let mut inserted = 0usize;

            while let Some(next) = merged.next().await {
                let Merged { source, item: Progressed { mut record, percent } } = match next {
                    Ok(merged) => merged,
                    Err(failure) => {
                        let err = pass_failure(failure, &names);
                        log_warn!(component = "load", event = "pass_failed", kind, merged = count, error = %err);
                        yield Err(err);
                        return;
                    }
                };
                count += 1;

                if filter.map_or(true, |filter| filter.matches(&record)) {
                    record.set_source_index(source);
                    model.insert(record);
                    inserted += 1;
                }

                progress.observe(source, percent);
                if progress.reached() || count == option.first_report_count {
                    yield Ok(progress.advance());
                }
            }

            if cancel.is_cancelled() {
                log_debug!(component = "load", event = "pass_cancelled", kind, merged = count);
                return;
            }
            log_debug!(component = "load", event = "pass_finished", kind, merged = count, inserted);
            yield Ok(COMPLETE);
        }
    }

    /// Find the first merged record accepted by `filter` and insert only that
    /// record.
    ///
    /// At most `peek_count` records are examined (unbounded when `None`).
    /// Examined records that do not match are consumed from their sources.
    /// The stream yields `0` first and then every `peek_report_step` points of
    /// progress; it never yields a final `100`.
    pub fn peek<'a>(
        &'a mut self,
        filter: &'a dyn Filter<S::Record>,
        peek_count: Option<usize>,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<u8, MergeError>> + 'a {
        let TailingMerger {
            sources,
            model,
            option,
            lifetime,
            ..
        } = self;

        stream! {
            let (cancel, _pass) = begin_pass(lifetime, cancel);

            yield Ok(0);
            if cancel.is_cancelled() {
                log_debug!(component = "peek", event = "pass_cancelled", examined = 0);
                return;
            }

            let names = source_names(sources.as_slice());
            register_sources::<S::Record, _>(model, &names);
            log_debug!(
                component = "peek",
                event = "pass_started",
                sources = names.len(),
                limit = ?peek_count,
            );

            let mut progress =
                ProgressTracker::new(names.len(), u32::from(option.peek_report_step));
            let scans = sources
                .iter_mut()
                .map(|source| source.scan())
                .collect::<Vec<_>>();
            let mut merged = MergeStream::new(cancel.clone(), by_time::<S::Record>, scans);
            let mut examined = 0usize;

            loop {
                if peek_count.is_some_and(|limit| examined >= limit) {
                    break;
                }
                let next = match merged.next().await {
                    Some(next) => next,
                    None => break,
                };
                let Merged { source, item: Progressed { mut record, percent } } = match next {
                    Ok(merged) => merged,
                    Err(failure) => {
                        let err = pass_failure(failure, &names);
                        log_warn!(component = "peek", event = "pass_failed", examined, error = %err);
                        yield Err(err);
                        return;
                    }
                };
                examined += 1;

                if filter.matches(&record) {
                    record.set_source_index(source);
                    model.insert(record);
                    log_debug!(component = "peek", event = "peek_matched", examined, source);
                    return;
                }

                progress.observe(source, percent);
                if progress.reached() {
                    yield Ok(progress.advance());
                }
            }

            if cancel.is_cancelled() {
                log_debug!(component = "peek", event = "pass_cancelled", examined);
                return;
            }
            log_debug!(component = "peek", event = "peek_exhausted", examined);
        }
    }

    /// Stop the merger and release every source.
    ///
    /// Any running pass is cancelled and waited for first. A source that fails
    /// to release does not keep the others from being released; all failures
    /// are returned together.
    pub async fn close(mut self) -> Result<(), CloseError> {
        self.lifetime.cancel();
        self.lifetime.wait_idle().await;

        let sources = mem::take(&mut self.sources);
        let total = sources.len();
        let mut failures = Vec::new();
        for mut source in sources {
            if let Err(error) = source.close().await {
                log_warn!(
                    component = "close",
                    event = "source_close_failed",
                    source = %source.name(),
                    error = %error,
                );
                failures.push(CloseFailure {
                    name: source.name().to_string(),
                    error,
                });
            }
        }
        log_info!(
            component = "close",
            event = "merger_closed",
            sources = total,
            failed = failures.len(),
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CloseError { failures })
        }
    }
}

impl<S, M> Drop for TailingMerger<S, M> {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

fn by_time<R: LogRecord>(a: &Progressed<R>, b: &Progressed<R>) -> Ordering {
    a.record.time().cmp(&b.record.time())
}

fn source_names<S: OrderedSource>(sources: &[S]) -> Vec<String> {
    sources
        .iter()
        .map(|source| source.name().to_string())
        .collect()
}

/// Register every source with the model, in ordinal order.
///
/// # Panics
///
/// When the model assigns a source an index other than its ordinal. Stamping
/// records with ordinals would then attribute them to the wrong source.
fn register_sources<R, M>(model: &mut M, names: &[String])
where
    M: IndexedLog<R>,
{
    for (ordinal, name) in names.iter().enumerate() {
        let index = model.register_source(name);
        model.register_metadata_slot(index);
        assert_eq!(
            index, ordinal,
            "source {name} registered at index {index}, expected ordinal {ordinal}"
        );
    }
}

fn pass_failure(failure: SourceFailure<SourceError>, names: &[String]) -> MergeError {
    MergeError::Source {
        ordinal: failure.ordinal,
        name: names.get(failure.ordinal).cloned().unwrap_or_default(),
        error: failure.error,
    }
}
