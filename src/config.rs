// config.rs
//
// Environment parameters. `switch_time`, `tl_type` and `discrete` are
// required; partial observation additionally requires `num_observed`.

use crate::error::{GridEnvError, Result};
use crate::global_variables::{
    DEFAULT_HORIZON, DEFAULT_SIM_STEP, DEFAULT_STANDSTILL_GAIN, DEFAULT_STANDSTILL_THRESHOLD,
    DEFAULT_SWITCH_PENALTY, DEFAULT_SWITCH_TIME,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest grid the discrete `2^n` action space can address with a `u64`.
const MAX_DISCRETE_INTERSECTIONS: usize = 63;

/// Dimensions and segment lengths of the road grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
    /// Length of the entrance edges vehicles start on.
    pub short_length: f64,
    /// Length of the terminal edges at the end of each route.
    pub long_length: f64,
    /// Length of edges between two intersections.
    pub inner_length: f64,
    #[serde(default = "default_lanes")]
    pub horizontal_lanes: usize,
    #[serde(default = "default_lanes")]
    pub vertical_lanes: usize,
    /// Speed limit on every edge; only the in-memory simulator reads it.
    #[serde(default = "default_speed_limit")]
    pub speed_limit: f64,
}

fn default_lanes() -> usize {
    1
}

fn default_speed_limit() -> f64 {
    35.0
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 3,
            short_length: 300.0,
            long_length: 100.0,
            inner_length: 300.0,
            horizontal_lanes: default_lanes(),
            vertical_lanes: default_lanes(),
            speed_limit: default_speed_limit(),
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(GridEnvError::config(format!(
                "grid needs at least one row and one column, got {}x{}",
                self.rows, self.cols
            )));
        }
        for (name, value) in [
            ("short_length", self.short_length),
            ("long_length", self.long_length),
            ("inner_length", self.inner_length),
            ("speed_limit", self.speed_limit),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GridEnvError::config(format!("{name} must be positive, got {value}")));
            }
        }
        if self.horizontal_lanes == 0 || self.vertical_lanes == 0 {
            return Err(GridEnvError::config("every approach needs at least one lane"));
        }
        Ok(())
    }
}

/// Whether the agent or the simulator drives the lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlType {
    Controlled,
    Actuated,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ObservationConfig {
    #[default]
    Full,
    Partial {
        /// Vehicles observed per approach, closest first.
        num_observed: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    pub grid: GridConfig,
    /// Minimum yellow time in seconds; earlier switch requests are ignored.
    pub switch_time: f64,
    pub tl_type: TlType,
    /// Discrete `2^n` action space instead of a `[-1, 1]^n` box.
    pub discrete: bool,
    #[serde(default)]
    pub min_green_time: f64,
    #[serde(default = "default_sim_step")]
    pub sim_step: f64,
    #[serde(default = "default_horizon")]
    pub horizon: u64,
    #[serde(default)]
    pub observation: ObservationConfig,
    #[serde(default = "default_switch_penalty")]
    pub switch_penalty: f64,
    #[serde(default = "default_standstill_gain")]
    pub standstill_gain: f64,
    #[serde(default = "default_standstill_threshold")]
    pub standstill_threshold: f64,
    /// Evaluation runs report delay only, without the standstill penalty.
    #[serde(default)]
    pub evaluate: bool,
}

fn default_sim_step() -> f64 {
    DEFAULT_SIM_STEP
}

fn default_horizon() -> u64 {
    DEFAULT_HORIZON
}

fn default_switch_penalty() -> f64 {
    DEFAULT_SWITCH_PENALTY
}

fn default_standstill_gain() -> f64 {
    DEFAULT_STANDSTILL_GAIN
}

fn default_standstill_threshold() -> f64 {
    DEFAULT_STANDSTILL_THRESHOLD
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            switch_time: DEFAULT_SWITCH_TIME,
            tl_type: TlType::Controlled,
            discrete: false,
            min_green_time: 0.0,
            sim_step: DEFAULT_SIM_STEP,
            horizon: DEFAULT_HORIZON,
            observation: ObservationConfig::Full,
            switch_penalty: DEFAULT_SWITCH_PENALTY,
            standstill_gain: DEFAULT_STANDSTILL_GAIN,
            standstill_threshold: DEFAULT_STANDSTILL_THRESHOLD,
            evaluate: false,
        }
    }
}

impl EnvConfig {
    /// Parses and validates a JSON document. Missing required keys surface
    /// as `Configuration` errors naming the key.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EnvConfig = serde_json::from_str(json).map_err(|e| {
            if e.is_data() {
                GridEnvError::config(e.to_string())
            } else {
                GridEnvError::Json(e)
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn num_intersections(&self) -> usize {
        self.grid.rows * self.grid.cols
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;

        if !(self.switch_time.is_finite() && self.switch_time >= 0.0) {
            return Err(GridEnvError::config(format!(
                "switch_time must be non-negative, got {}",
                self.switch_time
            )));
        }
        if !(self.min_green_time.is_finite() && self.min_green_time >= 0.0) {
            return Err(GridEnvError::config(format!(
                "min_green_time must be non-negative, got {}",
                self.min_green_time
            )));
        }
        if !(self.sim_step.is_finite() && self.sim_step > 0.0) {
            return Err(GridEnvError::config(format!(
                "sim_step must be positive, got {}",
                self.sim_step
            )));
        }
        if self.horizon == 0 {
            return Err(GridEnvError::config("horizon must be at least one step"));
        }
        if let ObservationConfig::Partial { num_observed: 0 } = self.observation {
            return Err(GridEnvError::config("num_observed must be at least 1"));
        }
        if self.discrete && self.num_intersections() > MAX_DISCRETE_INTERSECTIONS {
            return Err(GridEnvError::config(format!(
                "discrete action space supports at most {MAX_DISCRETE_INTERSECTIONS} intersections, grid has {}",
                self.num_intersections()
            )));
        }
        for (name, value) in [
            ("switch_penalty", self.switch_penalty),
            ("standstill_gain", self.standstill_gain),
            ("standstill_threshold", self.standstill_threshold),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(GridEnvError::config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}
