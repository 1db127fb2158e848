/// Tuning knobs for the progress reporting of a [`TailingMerger`](crate::TailingMerger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOption {
    pub(crate) first_report_count: usize,
    pub(crate) steps_per_source: u32,
    pub(crate) peek_report_step: u8,
}

impl Default for MergeOption {
    fn default() -> Self {
        MergeOption {
            first_report_count: 100,
            steps_per_source: 5,
            peek_report_step: 20,
        }
    }
}

impl MergeOption {
    /// Number of merged records after which a load reports progress even if
    /// the next threshold has not been reached.
    pub fn first_report_count(self, first_report_count: usize) -> Self {
        MergeOption {
            first_report_count,
            ..self
        }
    }

    /// Number of progress steps each source contributes to a load.
    pub fn steps_per_source(self, steps_per_source: u32) -> Self {
        MergeOption {
            steps_per_source: steps_per_source.max(1),
            ..self
        }
    }

    /// Percentage points between two progress values reported by a peek.
    pub fn peek_report_step(self, peek_report_step: u8) -> Self {
        MergeOption {
            peek_report_step: peek_report_step.clamp(1, 100),
            ..self
        }
    }

    /// See [`MergeOption::first_report_count`].
    pub fn get_first_report_count(&self) -> usize {
        self.first_report_count
    }

    /// See [`MergeOption::steps_per_source`].
    pub fn get_steps_per_source(&self) -> u32 {
        self.steps_per_source
    }

    /// See [`MergeOption::peek_report_step`].
    pub fn get_peek_report_step(&self) -> u8 {
        self.peek_report_step
    }
}
