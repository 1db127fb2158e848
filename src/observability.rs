//! Structured events emitted by passes and teardown.
//!
//! Every event goes to the `tailmerge` target and names itself in an `event`
//! field (`pass_started`, `peek_matched`, `merger_closed`, ...), with the
//! emitting phase in `component`. Subscribing is up to the application; the
//! crate only emits. A pass logs when it starts and when it ends, never once
//! per merged record.

/// Target for all tailmerge log events.
pub(crate) const TAILMERGE_TARGET: &str = "tailmerge";

/// Macro for info-level log events.
///
/// # Example
/// ```ignore
/// log_info!(
///     component = "close",
///     event = "merger_closed",
///     sources = released,
/// );
/// ```
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::TAILMERGE_TARGET, $($field)*)
    };
}

/// Macro for debug-level log events.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::TAILMERGE_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::TAILMERGE_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_info;
pub(crate) use log_warn;
