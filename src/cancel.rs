//! Cancellation shared between a caller and the merger that serves it.

use tokio_util::sync::CancellationToken;

/// A cancellation signal that fires when either of two tokens fires.
///
/// Passes run under a `LinkedToken` that joins the caller's token with a
/// child of the merger's lifetime token, so cancelling either one stops the
/// pass. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct LinkedToken {
    caller: CancellationToken,
    scope: Option<CancellationToken>,
}

impl LinkedToken {
    /// Wrap a single token.
    pub fn new(caller: CancellationToken) -> Self {
        Self {
            caller,
            scope: None,
        }
    }

    /// Join `caller` with `scope`; the result is cancelled once either is.
    pub fn link(caller: CancellationToken, scope: CancellationToken) -> Self {
        Self {
            caller,
            scope: Some(scope),
        }
    }

    /// Check if cancellation has been requested through either token.
    pub fn is_cancelled(&self) -> bool {
        self.caller.is_cancelled()
            || self
                .scope
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
    }
}

impl From<CancellationToken> for LinkedToken {
    fn from(caller: CancellationToken) -> Self {
        Self::new(caller)
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::LinkedToken;

    #[test]
    fn fires_when_caller_fires() {
        let caller = CancellationToken::new();
        let lifetime = CancellationToken::new();
        let linked = LinkedToken::link(caller.clone(), lifetime.child_token());

        assert!(!linked.is_cancelled());
        caller.cancel();
        assert!(linked.is_cancelled());
        assert!(!lifetime.is_cancelled());
    }

    #[test]
    fn fires_when_lifetime_fires() {
        let caller = CancellationToken::new();
        let lifetime = CancellationToken::new();
        let linked = LinkedToken::link(caller.clone(), lifetime.child_token());

        lifetime.cancel();
        assert!(linked.is_cancelled());
        assert!(!caller.is_cancelled());
    }

    #[test]
    fn dropping_the_link_leaves_parents_untouched() {
        let caller = CancellationToken::new();
        let lifetime = CancellationToken::new();
        {
            let linked = LinkedToken::link(caller.clone(), lifetime.child_token());
            let clone = linked.clone();
            drop(linked);
            assert!(!clone.is_cancelled());
        }
        assert!(!caller.is_cancelled());
        assert!(!lifetime.is_cancelled());
    }
}
