use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures_core::{ready, Stream};
use pin_project_lite::pin_project;

use super::{Merged, SourceFailure};
use crate::cancel::LinkedToken;

pin_project! {
    /// Stream that merges several ordered streams into one ordered stream.
    ///
    /// One head per input is kept in a binary heap, so each emitted item costs
    /// `O(log N)`. Heads that compare equal are emitted in input order. Nothing
    /// is polled until the merge itself is polled, and the replacement head of
    /// an input is fetched before that input's current head is returned.
    ///
    /// Once a replacement fetch has started it is always finished and the
    /// current head emitted, even if cancellation fires in between. A failed
    /// replacement fetch is reported on the poll after the head it follows.
    pub struct MergeStream<S, T, E, C> {
        streams: Vec<S>,
        peeked: BinaryHeap<Reverse<HeapEntry<T, C>>>,
        compare: Arc<C>,
        cancel: LinkedToken,
        primed: usize,
        refilling: Option<usize>,
        failure: Option<SourceFailure<E>>,
        done: bool,
    }
}

impl<S, T, E, C> MergeStream<S, T, E, C>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    C: Fn(&T, &T) -> Ordering,
{
    /// Merge `streams` by `compare`, stopping early once `cancel` fires.
    pub fn new(cancel: impl Into<LinkedToken>, compare: C, streams: Vec<S>) -> Self {
        Self {
            peeked: BinaryHeap::with_capacity(streams.len()),
            streams,
            compare: Arc::new(compare),
            cancel: cancel.into(),
            primed: 0,
            refilling: None,
            failure: None,
            done: false,
        }
    }

    /// Number of inputs that still have a head waiting to be emitted.
    pub fn pending_heads(&self) -> usize {
        self.peeked.len()
    }
}

/// Shorthand for [`MergeStream::new`].
pub fn merge<S, T, E, C>(
    cancel: impl Into<LinkedToken>,
    compare: C,
    streams: Vec<S>,
) -> MergeStream<S, T, E, C>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    C: Fn(&T, &T) -> Ordering,
{
    MergeStream::new(cancel, compare, streams)
}

impl<S, T, E, C> Stream for MergeStream<S, T, E, C>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    C: Fn(&T, &T) -> Ordering,
{
    type Item = Result<Merged<T>, SourceFailure<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        if let Some(failure) = this.failure.take() {
            *this.done = true;
            return Poll::Ready(Some(Err(failure)));
        }
        while *this.primed < this.streams.len() {
            let ordinal = *this.primed;
            let head = ready!(Pin::new(&mut this.streams[ordinal]).poll_next(cx));
            *this.primed += 1;
            match head {
                Some(Ok(item)) => this.peeked.push(Reverse(HeapEntry::new(
                    ordinal,
                    item,
                    Arc::clone(this.compare),
                ))),
                Some(Err(error)) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(SourceFailure { ordinal, error })));
                }
                None => {}
            }
        }

        let ordinal = match *this.refilling {
            Some(ordinal) => ordinal,
            None => {
                if this.cancel.is_cancelled() {
                    *this.done = true;
                    return Poll::Ready(None);
                }
                let Some(ordinal) = this.peeked.peek().map(|Reverse(entry)| entry.ordinal) else {
                    *this.done = true;
                    return Poll::Ready(None);
                };
                *this.refilling = Some(ordinal);
                ordinal
            }
        };
        // the input has moved past its head from here on
        let next = ready!(Pin::new(&mut this.streams[ordinal]).poll_next(cx));
        *this.refilling = None;
        let Some(Reverse(head)) = this.peeked.pop() else {
            *this.done = true;
            return Poll::Ready(None);
        };
        match next {
            Some(Ok(item)) => this.peeked.push(Reverse(HeapEntry::new(
                ordinal,
                item,
                Arc::clone(this.compare),
            ))),
            Some(Err(error)) => *this.failure = Some(SourceFailure { ordinal, error }),
            None => {}
        }

        Poll::Ready(Some(Ok(Merged {
            source: head.ordinal,
            item: head.item,
        })))
    }
}

struct HeapEntry<T, C> {
    ordinal: usize,
    item: T,
    compare: Arc<C>,
}

impl<T, C> HeapEntry<T, C> {
    fn new(ordinal: usize, item: T, compare: Arc<C>) -> Self {
        Self {
            ordinal,
            item,
            compare,
        }
    }
}

impl<T, C> PartialEq for HeapEntry<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T, C> Eq for HeapEntry<T, C> where C: Fn(&T, &T) -> Ordering {}

impl<T, C> PartialOrd for HeapEntry<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, C> Ord for HeapEntry<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    fn cmp(&self, other: &Self) -> Ordering {
        (self.compare)(&self.item, &other.item).then(self.ordinal.cmp(&other.ordinal))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
        Arc,
    };

    use futures_core::Stream;
    use futures_util::{stream, FutureExt, StreamExt};
    use tokio_util::sync::CancellationToken;

    use super::{merge, MergeStream};

    type Item = Result<i64, &'static str>;

    fn source(items: &[i64]) -> stream::Iter<std::vec::IntoIter<Item>> {
        stream::iter(items.iter().copied().map(Ok).collect::<Vec<_>>())
    }

    fn counted(items: &[i64], pulls: Arc<AtomicUsize>) -> impl Stream<Item = Item> + Unpin {
        source(items).inspect(move |_| {
            pulls.fetch_add(1, AtomicOrdering::SeqCst);
        })
    }

    async fn drain<S>(mut merge: S) -> Vec<(i64, usize)>
    where
        S: Stream<Item = Result<super::Merged<i64>, super::SourceFailure<&'static str>>> + Unpin,
    {
        let mut out = Vec::new();
        while let Some(next) = merge.next().await {
            let merged = next.unwrap();
            out.push((merged.item, merged.source));
        }
        out
    }

    #[tokio::test]
    async fn merges_three_sources_in_time_order() {
        let merge = merge(
            CancellationToken::new(),
            i64::cmp,
            vec![source(&[1, 3, 5]), source(&[2, 4]), source(&[6])],
        );

        assert_eq!(
            drain(merge).await,
            vec![(1, 0), (2, 1), (3, 0), (4, 1), (5, 0), (6, 2)]
        );
    }

    #[tokio::test]
    async fn equal_heads_follow_input_order() {
        let by_key = |a: &(i64, &str), b: &(i64, &str)| a.0.cmp(&b.0);
        let inputs = vec![
            stream::iter(vec![Ok::<_, &str>((1, "a1")), Ok((2, "a2"))]),
            stream::iter(vec![Ok((1, "b1")), Ok((2, "b2"))]),
            stream::iter(vec![Ok((2, "c2"))]),
        ];
        let mut merge = MergeStream::new(CancellationToken::new(), by_key, inputs);

        let mut labels = Vec::new();
        while let Some(next) = merge.next().await {
            labels.push(next.unwrap().item.1);
        }
        assert_eq!(labels, vec!["a1", "b1", "a2", "b2", "c2"]);
    }

    #[tokio::test]
    async fn output_is_sorted_and_reproducible() {
        let mut seed = 0x2545_f491_u64;
        let mut inputs = Vec::new();
        for _ in 0..17 {
            let mut time = 0;
            let mut items = Vec::new();
            for _ in 0..40 {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                time += (seed >> 60) as i64;
                items.push(time);
            }
            inputs.push(items);
        }

        let first = drain(merge(
            CancellationToken::new(),
            i64::cmp,
            inputs.iter().map(|items| source(items)).collect(),
        ))
        .await;
        let second = drain(merge(
            CancellationToken::new(),
            i64::cmp,
            inputs.iter().map(|items| source(items)).collect(),
        ))
        .await;

        assert_eq!(first.len(), 17 * 40);
        assert!(first
            .windows(2)
            .all(|pair| pair[0].0 < pair[1].0 || (pair[0].0 == pair[1].0 && pair[0].1 <= pair[1].1)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_inputs_end_immediately() {
        let none: Vec<stream::Iter<std::vec::IntoIter<Item>>> = Vec::new();
        assert!(drain(merge(CancellationToken::new(), i64::cmp, none))
            .await
            .is_empty());

        let hollow = vec![source(&[]), source(&[])];
        assert!(drain(merge(CancellationToken::new(), i64::cmp, hollow))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn heads_are_fetched_lazily() {
        let pulls = Arc::new(AtomicUsize::new(0));
        let mut merge = merge(
            CancellationToken::new(),
            i64::cmp,
            vec![
                counted(&[1, 4, 7], pulls.clone()),
                counted(&[2, 5], pulls.clone()),
                counted(&[3], pulls.clone()),
            ],
        );
        assert_eq!(pulls.load(AtomicOrdering::SeqCst), 0);

        let first = merge.next().await.unwrap().unwrap();
        assert_eq!(first.item, 1);
        // one head per input plus the replacement for the emitted one
        assert_eq!(pulls.load(AtomicOrdering::SeqCst), 4);
        assert_eq!(merge.pending_heads(), 3);
    }

    #[tokio::test]
    async fn cancellation_ends_without_error() {
        let token = CancellationToken::new();
        let mut merge = merge(
            token.clone(),
            i64::cmp,
            vec![source(&[1, 3, 5]), source(&[2, 4])],
        );

        assert_eq!(merge.next().await.unwrap().unwrap().item, 1);
        assert_eq!(merge.next().await.unwrap().unwrap().item, 2);
        token.cancel();
        assert!(merge.next().await.is_none());
        assert!(merge.next().await.is_none());
    }

    #[tokio::test]
    async fn source_error_follows_the_head_it_replaces() {
        let inputs = vec![
            stream::iter(vec![Ok(1), Ok(4)]),
            stream::iter(vec![Ok(2), Err("truncated"), Ok(9)]),
        ];
        let mut merge = merge(CancellationToken::new(), i64::cmp, inputs);

        assert_eq!(merge.next().await.unwrap().unwrap().item, 1);
        let second = merge.next().await.unwrap().unwrap();
        assert_eq!((second.item, second.source), (2, 1));
        let failure = merge.next().await.unwrap().unwrap_err();
        assert_eq!(failure.ordinal, 1);
        assert_eq!(failure.error, "truncated");
        assert!(merge.next().await.is_none());
    }

    #[tokio::test]
    async fn priming_error_ends_the_merge() {
        let inputs = vec![
            stream::iter(vec![Ok(1)]),
            stream::iter(vec![Err("unreadable")]),
        ];
        let mut merge = merge(CancellationToken::new(), i64::cmp, inputs);

        assert_eq!(merge.next().await.unwrap().unwrap_err().ordinal, 1);
        assert!(merge.next().await.is_none());
    }

    #[tokio::test]
    async fn started_refill_is_finished_after_cancellation() {
        let token = CancellationToken::new();
        let slow = Box::pin(async_stream::stream! {
            yield Ok::<i64, &'static str>(1);
            tokio::task::yield_now().await;
            yield Ok(2);
        });
        let mut merge = merge(token.clone(), i64::cmp, vec![slow]);

        assert!(merge.next().now_or_never().is_none());
        token.cancel();
        assert_eq!(merge.next().await.unwrap().unwrap().item, 1);
        assert!(merge.next().await.is_none());
    }
}
