// flow_analyzer/mod.rs
pub mod observation;
pub mod reward;

pub use observation::{BoxSpace, ObservationBuilder};
pub use reward::{RewardBreakdown, RewardEvaluator};
