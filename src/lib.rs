pub mod config;
pub mod control_system;
pub mod environment;
pub mod error;
pub mod flow_analyzer;
pub mod global_variables;
pub mod simulation_engine;

pub use config::{EnvConfig, GridConfig, ObservationConfig, TlType};
pub use environment::{Action, ActionSpace, QueueGridEnv, StepInfo, StepResult, VecEnv};
pub use error::{GridEnvError, Result};
