//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Malformed or inverted time window
    InvalidRange {
        start: String,
        end: String,
    },

    /// Slot granularity of zero or an empty duration menu
    InvalidGranularity {
        base_secs: u32,
    },

    /// Duration menu and weight list differ in length
    WeightMismatch {
        durations: usize,
        weights: usize,
    },

    /// A fixed slot falls outside the requested window
    FixedSlotOutOfWindow {
        start: String,
        window_start: String,
        window_end: String,
    },

    /// No content fits a slot after exhausting all fallback pools.
    /// Recovered by slot splitting when the slot is above base granularity.
    NoCandidate {
        slot_start: String,
        duration_secs: u32,
    },

    /// Terminal per-slot failure: even the fallback filler is unavailable.
    /// Aborts the whole assembly request.
    UnfillableSlot {
        slot_start: String,
        duration_secs: u32,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { start, end } => {
                write!(f, "Invalid time range: start {} >= end {}", start, end)
            }
            Self::InvalidGranularity { base_secs } => {
                write!(f, "Invalid slot granularity: {} seconds", base_secs)
            }
            Self::WeightMismatch { durations, weights } => {
                write!(
                    f,
                    "Duration menu has {} entries but {} weights",
                    durations, weights
                )
            }
            Self::FixedSlotOutOfWindow {
                start,
                window_start,
                window_end,
            } => {
                write!(
                    f,
                    "Fixed slot at {} is outside window [{}, {})",
                    start, window_start, window_end
                )
            }
            Self::NoCandidate {
                slot_start,
                duration_secs,
            } => {
                write!(
                    f,
                    "No candidate content for slot at {} ({} s)",
                    slot_start, duration_secs
                )
            }
            Self::UnfillableSlot {
                slot_start,
                duration_secs,
            } => {
                write!(
                    f,
                    "Slot at {} ({} s) could not be filled, fallback pool exhausted",
                    slot_start, duration_secs
                )
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid range error
    pub fn invalid_range(start: impl ToString, end: impl ToString) -> Self {
        Self::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Create an invalid granularity error
    pub fn invalid_granularity(base_secs: u32) -> Self {
        Self::InvalidGranularity { base_secs }
    }

    /// Create a fixed slot out-of-window error
    pub fn fixed_slot_out_of_window(
        start: impl ToString,
        window_start: impl ToString,
        window_end: impl ToString,
    ) -> Self {
        Self::FixedSlotOutOfWindow {
            start: start.to_string(),
            window_start: window_start.to_string(),
            window_end: window_end.to_string(),
        }
    }

    /// Create a no candidate error
    pub fn no_candidate(slot_start: impl ToString, duration_secs: u32) -> Self {
        Self::NoCandidate {
            slot_start: slot_start.to_string(),
            duration_secs,
        }
    }

    /// Create an unfillable slot error
    pub fn unfillable(slot_start: impl ToString, duration_secs: u32) -> Self {
        Self::UnfillableSlot {
            slot_start: slot_start.to_string(),
            duration_secs,
        }
    }

    /// Whether slot filling can recover from this error locally
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoCandidate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range_message() {
        let err = SchedulerError::invalid_range("19:00:00", "18:00:00");
        assert!(err.to_string().contains("19:00:00"));
        assert!(err.to_string().contains("18:00:00"));
    }

    #[test]
    fn test_no_candidate_recoverable() {
        let err = SchedulerError::no_candidate("1972-09-15 20:00:00", 3600);
        assert!(err.is_recoverable());

        let err = SchedulerError::unfillable("1972-09-15 20:00:00", 1800);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_weight_mismatch_message() {
        let err = SchedulerError::WeightMismatch {
            durations: 2,
            weights: 3,
        };
        assert!(err.to_string().contains('2'));
        assert!(err.to_string().contains('3'));
    }
}
