// environment/mod.rs
pub mod action;
pub mod env;

pub use action::{Action, ActionSpace};
pub use env::{Observation, QueueGridEnv, StepInfo, StepResult, VecEnv};
