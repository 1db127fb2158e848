//! Aggregate progress across the sources of one pass.

/// Percentage reported once a pass has finished.
pub(crate) const COMPLETE: u8 = 100;

/// Tracks each source's last reported percentage and the next threshold to
/// emit.
///
/// The aggregate is the truncated arithmetic mean of the per-source values,
/// so a source that has not produced anything yet holds the mean down.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    percents: Vec<u8>,
    next: u32,
    step: u32,
}

impl ProgressTracker {
    /// Start a tracker for `sources` sources whose first threshold is `step`.
    pub(crate) fn new(sources: usize, step: u32) -> Self {
        let step = step.max(1);
        Self {
            percents: vec![0; sources],
            next: step,
            step,
        }
    }

    /// Record the latest percentage of `source`.
    pub(crate) fn observe(&mut self, source: usize, percent: u8) {
        if let Some(slot) = self.percents.get_mut(source) {
            *slot = percent.min(COMPLETE);
        }
    }

    /// Truncated mean of the per-source percentages.
    pub(crate) fn mean(&self) -> u32 {
        if self.percents.is_empty() {
            return 0;
        }
        let total: u32 = self.percents.iter().map(|percent| u32::from(*percent)).sum();
        total / self.percents.len() as u32
    }

    /// Whether the mean has reached the next threshold.
    pub(crate) fn reached(&self) -> bool {
        self.mean() >= self.next
    }

    /// Return the pending threshold, clamped to 100, and schedule the next.
    pub(crate) fn advance(&mut self) -> u8 {
        let value = self.next.min(u32::from(COMPLETE)) as u8;
        self.next = self.next.saturating_add(self.step);
        value
    }
}

/// Load report interval: every source is split into `steps_per_source` steps.
pub(crate) fn load_interval(sources: usize, steps_per_source: u32) -> u32 {
    let steps = (sources as u32).saturating_mul(steps_per_source.max(1));
    if steps == 0 {
        return u32::from(COMPLETE);
    }
    (u32::from(COMPLETE) / steps).max(1)
}

#[cfg(test)]
mod tests {
    use super::{load_interval, ProgressTracker};

    #[test]
    fn interval_shrinks_with_source_count() {
        assert_eq!(load_interval(1, 5), 20);
        assert_eq!(load_interval(3, 5), 6);
        assert_eq!(load_interval(20, 5), 1);
        assert_eq!(load_interval(150, 5), 1);
    }

    #[test]
    fn mean_is_truncated() {
        let mut tracker = ProgressTracker::new(3, 6);
        tracker.observe(0, 50);
        tracker.observe(2, 51);
        assert_eq!(tracker.mean(), 33);
    }

    #[test]
    fn thresholds_advance_one_step_per_report() {
        let mut tracker = ProgressTracker::new(2, 10);
        assert!(!tracker.reached());

        tracker.observe(0, 100);
        tracker.observe(1, 100);
        assert!(tracker.reached());
        assert_eq!(tracker.advance(), 10);
        assert!(tracker.reached());
        assert_eq!(tracker.advance(), 20);
    }

    #[test]
    fn reported_values_never_exceed_complete() {
        let mut tracker = ProgressTracker::new(1, 60);
        assert_eq!(tracker.advance(), 60);
        assert_eq!(tracker.advance(), 100);
        assert_eq!(tracker.advance(), 100);
    }

    #[test]
    fn unknown_source_is_ignored() {
        let mut tracker = ProgressTracker::new(1, 20);
        tracker.observe(4, 100);
        assert_eq!(tracker.mean(), 0);
    }
}
