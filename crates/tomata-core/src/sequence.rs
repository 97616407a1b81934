//! Saved phase sequences.
//!
//! A sequence is a named list of `(phase, minutes)` steps. When one is in
//! use the engine follows it cyclically instead of the standard pomodoro
//! rotation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::timer::SequenceStep;

/// Longest step duration accepted, in minutes. Matches the manual edit
/// bound on the timer.
pub const MAX_STEP_MINUTES: u64 = 180;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSequence {
    pub id: String,
    pub name: String,
    pub steps: Vec<SequenceStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredSequence {
    /// Build a sequence with a fresh id. The name is trimmed; an empty
    /// name, an empty step list, or an out-of-range step duration is
    /// rejected.
    pub fn new(name: &str, steps: Vec<SequenceStep>) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "sequence name cannot be empty".into(),
            });
        }
        validate_steps(&steps)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            steps,
            created_at: now,
            updated_at: now,
        })
    }
}

pub fn validate_steps(steps: &[SequenceStep]) -> Result<(), ValidationError> {
    if steps.is_empty() {
        return Err(ValidationError::EmptyCollection("steps".into()));
    }
    for (i, step) in steps.iter().enumerate() {
        if step.duration_min == 0 || step.duration_min > MAX_STEP_MINUTES {
            return Err(ValidationError::InvalidValue {
                field: format!("steps[{i}]"),
                message: format!(
                    "step duration must be between 1 and {MAX_STEP_MINUTES} minutes, got {}",
                    step.duration_min
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Phase;

    fn steps() -> Vec<SequenceStep> {
        vec![
            SequenceStep::new(Phase::Focus, 10),
            SequenceStep::new(Phase::ShortBreak, 5),
            SequenceStep::new(Phase::Focus, 15),
        ]
    }

    #[test]
    fn new_sequence_trims_name() {
        let seq = StoredSequence::new("  sprint  ", steps()).unwrap();
        assert_eq!(seq.name, "sprint");
        assert_eq!(seq.steps.len(), 3);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(StoredSequence::new("   ", steps()).is_err());
    }

    #[test]
    fn empty_step_list_is_rejected() {
        assert!(StoredSequence::new("sprint", Vec::new()).is_err());
    }

    #[test]
    fn zero_and_oversized_durations_are_rejected() {
        let zero = vec![SequenceStep::new(Phase::Focus, 0)];
        assert!(StoredSequence::new("s", zero).is_err());
        let huge = vec![SequenceStep::new(Phase::Focus, MAX_STEP_MINUTES + 1)];
        assert!(StoredSequence::new("s", huge).is_err());
        let edge = vec![SequenceStep::new(Phase::Focus, MAX_STEP_MINUTES)];
        assert!(StoredSequence::new("s", edge).is_ok());
    }
}
