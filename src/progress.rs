//! Merged progress of a job.
//!
//! Progress notifications arrive partial and sometimes malformed. `ProgressState`
//! folds them into one sane value:
//!
//! - `valuemin` / `valuemax` are write-once
//! - `progress` only moves forward
//! - `percent` is recomputed from all three and always lies in `[0, 100]`;
//!   a value outside that range resets the numeric fields instead of failing
//! - `message` is always the latest one received

use serde::Serialize;

/// Snapshot of a job's progress as seen by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressState {
    progress: Option<f64>,
    valuemin: Option<f64>,
    valuemax: Option<f64>,
    percent: u8,
    message: Option<String>,
}

/// Keep only finite numbers; NaN and infinities are filtered like non-numbers.
fn valid(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Percentage of `progress` within `[valuemin, valuemax]`, rounded half-up.
///
/// Returns `None` when the result is not a percentage (outside `[0, 100]`,
/// NaN, or infinite because the bounds coincide).
fn compute_percent(progress: f64, valuemin: f64, valuemax: f64) -> Option<u8> {
    let ratio = (progress - valuemin) / (valuemax - valuemin);
    let percent = (ratio * 100.0 + 0.5).floor();
    if (0.0..=100.0).contains(&percent) {
        Some(percent as u8)
    } else {
        None
    }
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one progress notification into this state.
    ///
    /// Pure: returns the new state and never fails. Invalid numeric inputs are
    /// ignored field by field.
    pub fn update(
        &self,
        progress: Option<f64>,
        valuemin: Option<f64>,
        valuemax: Option<f64>,
        message: Option<String>,
    ) -> ProgressState {
        let mut next = self.clone();

        if let Some(p) = valid(progress)
            && next.progress.is_none_or(|current| current < p)
        {
            next.progress = Some(p);
        }
        if next.valuemin.is_none() {
            next.valuemin = valid(valuemin);
        }
        if next.valuemax.is_none() {
            next.valuemax = valid(valuemax);
        }

        if let (Some(p), Some(min), Some(max)) = (next.progress, next.valuemin, next.valuemax) {
            match compute_percent(p, min, max) {
                Some(percent) => next.percent = percent,
                None => {
                    tracing::debug!(
                        progress = p,
                        valuemin = min,
                        valuemax = max,
                        "Inconsistent progress bounds, resetting"
                    );
                    next.progress = None;
                    next.valuemin = None;
                    next.valuemax = None;
                    next.percent = 0;
                }
            }
        }

        next.message = message;
        next
    }

    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    pub fn valuemin(&self) -> Option<f64> {
        self.valuemin
    }

    pub fn valuemax(&self) -> Option<f64> {
        self.valuemax
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// A bar is only meaningful once some progress value is known.
    pub fn has_bar(&self) -> bool {
        self.progress.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(state: &ProgressState, p: f64, min: f64, max: f64) -> ProgressState {
        state.update(Some(p), Some(min), Some(max), None)
    }

    #[test]
    fn test_default_state_is_unset() {
        let state = ProgressState::new();
        assert!(state.progress().is_none());
        assert!(state.valuemin().is_none());
        assert!(state.valuemax().is_none());
        assert_eq!(state.percent(), 0);
        assert!(state.message().is_none());
        assert!(!state.has_bar());
    }

    #[test]
    fn test_percent_with_offset_bounds() {
        let state = ProgressState::new().update(Some(50.0), Some(0.0), Some(200.0), None);
        assert_eq!(state.percent(), 25);

        let state = ProgressState::new().update(Some(15.0), Some(10.0), Some(20.0), None);
        assert_eq!(state.percent(), 50);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        let state = ProgressState::new().update(Some(1.0), Some(0.0), Some(8.0), None);
        // 12.5 -> 13
        assert_eq!(state.percent(), 13);
    }

    #[test]
    fn test_inconsistent_percent_resets_numeric_fields() {
        let state = ProgressState::new().update(
            Some(150.0),
            Some(0.0),
            Some(100.0),
            Some("too far".to_string()),
        );
        assert!(state.progress().is_none());
        assert!(state.valuemin().is_none());
        assert!(state.valuemax().is_none());
        assert_eq!(state.percent(), 0);
        assert_eq!(state.message(), Some("too far"));
    }

    #[test]
    fn test_equal_bounds_reset_instead_of_dividing_by_zero() {
        let state = apply(&ProgressState::new(), 5.0, 5.0, 5.0);
        assert!(state.progress().is_none());
        assert_eq!(state.percent(), 0);
    }

    #[test]
    fn test_bounds_are_write_once() {
        let state = apply(&ProgressState::new(), 10.0, 0.0, 100.0);
        let state = apply(&state, 20.0, 5.0, 500.0);
        assert_eq!(state.valuemin(), Some(0.0));
        assert_eq!(state.valuemax(), Some(100.0));
        assert_eq!(state.percent(), 20);
    }

    #[test]
    fn test_bounds_can_arrive_in_later_notifications() {
        let state = ProgressState::new().update(Some(30.0), None, None, None);
        assert_eq!(state.percent(), 0);
        let state = state.update(None, Some(0.0), None, None);
        let state = state.update(None, None, Some(60.0), None);
        assert_eq!(state.percent(), 50);
    }

    #[test]
    fn test_progress_never_decreases() {
        let state = apply(&ProgressState::new(), 40.0, 0.0, 100.0);
        let state = apply(&state, 10.0, 0.0, 100.0);
        assert_eq!(state.progress(), Some(40.0));
        assert_eq!(state.percent(), 40);
        let state = apply(&state, 40.0, 0.0, 100.0);
        assert_eq!(state.progress(), Some(40.0));
    }

    #[test]
    fn test_invalid_numbers_are_ignored() {
        let state = apply(&ProgressState::new(), 10.0, 0.0, 100.0);
        let state = state.update(Some(f64::NAN), Some(f64::INFINITY), None, None);
        assert_eq!(state.progress(), Some(10.0));
        assert_eq!(state.valuemin(), Some(0.0));
        assert_eq!(state.percent(), 10);

        let state = ProgressState::new().update(Some(f64::NAN), Some(f64::NAN), Some(f64::NAN), None);
        assert!(state.progress().is_none());
        assert!(state.valuemin().is_none());
        assert!(state.valuemax().is_none());
    }

    #[test]
    fn test_message_always_takes_latest() {
        let state = ProgressState::new().update(None, None, None, Some("first".to_string()));
        assert_eq!(state.message(), Some("first"));
        let state = state.update(None, None, None, Some("second".to_string()));
        assert_eq!(state.message(), Some("second"));
        let state = state.update(None, None, None, None);
        assert!(state.message().is_none());
    }

    #[test]
    fn test_update_is_pure() {
        let before = apply(&ProgressState::new(), 10.0, 0.0, 100.0);
        let snapshot = before.clone();
        let _after = apply(&before, 90.0, 0.0, 100.0);
        assert_eq!(before, snapshot);
    }

    #[test]
    fn test_percent_stays_in_range_over_arbitrary_sequences() {
        let inputs = [
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            -1e9,
            -50.0,
            -0.5,
            0.0,
            0.4,
            1.0,
            33.3,
            99.5,
            100.0,
            150.0,
            1e12,
        ];
        let mut state = ProgressState::new();
        for (i, p) in inputs.iter().enumerate() {
            for (j, min) in inputs.iter().enumerate().step_by(3) {
                let max = inputs[(i + j + 5) % inputs.len()];
                let previous = state.progress();
                let bounds = (state.valuemin(), state.valuemax());
                state = state.update(Some(*p), Some(*min), Some(max), None);

                assert!(state.percent() <= 100);
                if let (Some(before), Some(after)) = (previous, state.progress()) {
                    assert!(after >= before);
                }
                if let (Some(min_before), Some(min_after)) = (bounds.0, state.valuemin()) {
                    assert_eq!(min_before, min_after);
                }
                if let (Some(max_before), Some(max_after)) = (bounds.1, state.valuemax()) {
                    assert_eq!(max_before, max_after);
                }
            }
        }
    }
}
