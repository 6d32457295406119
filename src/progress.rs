//! Timing summary for long batches of experiments.

use core::fmt;
use core::time::Duration;

use crate::error::{Error, Result};

/// Mean duration and remaining-time estimate for a batch of experiments.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use surrogate_utils::progress::ExperimentProgress;
///
/// let done = [Duration::from_secs(60), Duration::from_secs(120)];
/// let progress = ExperimentProgress::new(&done, 5).unwrap();
///
/// assert_eq!(progress.experiments_left(), 3);
/// assert_eq!(progress.time_left(), Duration::from_secs(270));
/// assert_eq!(
///     progress.to_string(),
///     "Average duration of one experiment = 01:30\nEstimated time left = 04:30"
/// );
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExperimentProgress {
    mean_duration: Duration,
    completed: usize,
    total: usize,
}

impl ExperimentProgress {
    /// Summarizes `durations` of completed experiments out of `total`
    /// planned.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoCompletedExperiments` if `durations` is empty and
    /// `Error::Internal` if their sum does not fit in a `Duration`.
    pub fn new(durations: &[Duration], total: usize) -> Result<Self> {
        if durations.is_empty() {
            return Err(Error::NoCompletedExperiments);
        }
        let sum = durations
            .iter()
            .try_fold(Duration::ZERO, |acc, d| acc.checked_add(*d))
            .ok_or(Error::Internal("total experiment duration overflows"))?;
        let n = u32::try_from(durations.len())
            .map_err(|_| Error::Internal("too many experiments"))?;
        Ok(Self {
            mean_duration: sum / n,
            completed: durations.len(),
            total,
        })
    }

    /// Mean duration of the completed experiments.
    #[must_use]
    pub fn mean_duration(&self) -> Duration {
        self.mean_duration
    }

    /// Planned experiments not yet completed.
    #[must_use]
    pub fn experiments_left(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }

    /// `experiments_left × mean_duration`.
    #[must_use]
    pub fn time_left(&self) -> Duration {
        let left = u32::try_from(self.experiments_left()).unwrap_or(u32::MAX);
        self.mean_duration.saturating_mul(left)
    }

    /// Emits the report at info level.
    pub fn log(&self) {
        trace_info!(
            mean_secs = self.mean_duration.as_secs_f64(),
            left = self.experiments_left(),
            eta_secs = self.time_left().as_secs_f64(),
            "{self}"
        );
    }
}

impl fmt::Display for ExperimentProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mean = self.mean_duration.as_secs();
        writeln!(
            f,
            "Average duration of one experiment = {:02}:{:02}",
            mean / 60,
            mean % 60
        )?;

        let left = self.time_left().as_secs();
        if left > 3600 {
            write!(
                f,
                "Estimated time left = {:02}:{:02}:{:02}",
                left / 3600,
                (left / 60) % 60,
                left % 60
            )
        } else {
            write!(f, "Estimated time left = {:02}:{:02}", left / 60, left % 60)
        }
    }
}
