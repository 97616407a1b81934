mod engine;
mod phase;
mod streak;

pub use engine::{ActiveSequence, Completion, TimerEngine, TimerObserver};
pub use phase::{ParsePhaseError, Phase, PhaseDurations, SequenceStep};
pub use streak::StreakRecord;
