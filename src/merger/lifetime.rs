use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::{cancel::LinkedToken, observability::log_debug};

/// State shared between a merger, its passes and its shutdown handles.
#[derive(Debug, Default)]
pub(crate) struct Lifetime {
    token: CancellationToken,
    in_progress: AtomicBool,
    idle: Notify,
}

impl Lifetime {
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Wait until no pass is running.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.in_progress() {
                return;
            }
            notified.await;
        }
    }
}

/// Start a pass: link `caller` with the lifetime and raise the in-progress
/// flag until the returned guard is dropped.
pub(crate) fn begin_pass(
    lifetime: &Arc<Lifetime>,
    caller: CancellationToken,
) -> (LinkedToken, PassGuard) {
    lifetime.in_progress.store(true, Ordering::Release);
    let token = LinkedToken::link(caller, lifetime.token.child_token());
    let guard = PassGuard {
        lifetime: Arc::clone(lifetime),
    };
    (token, guard)
}

/// Clears the in-progress flag on every exit path of a pass, including the
/// pass stream being dropped while suspended.
#[derive(Debug)]
pub(crate) struct PassGuard {
    lifetime: Arc<Lifetime>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.lifetime.in_progress.store(false, Ordering::Release);
        self.lifetime.idle.notify_waiters();
    }
}

/// Cloneable handle that stops a [`TailingMerger`](crate::TailingMerger) from
/// another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    pub(crate) lifetime: Arc<Lifetime>,
}

impl ShutdownHandle {
    /// Cancel the merger and wait for its in-flight pass, if any, to finish.
    ///
    /// The running pass stops at its next record; the returned future
    /// completes once that pass has been dropped or run to its end. Calling
    /// this again is harmless.
    pub async fn shutdown(&self) {
        if !self.lifetime.is_cancelled() {
            log_debug!(component = "close", event = "shutdown_requested");
        }
        self.lifetime.cancel();
        self.lifetime.wait_idle().await;
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    /// Whether a pass is currently running.
    pub fn is_busy(&self) -> bool {
        self.lifetime.in_progress()
    }
}
