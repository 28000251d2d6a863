// reward.rs

use crate::config::{EnvConfig, ObservationConfig};
use crate::global_variables::MIN_VALID_SPEED;
use crate::simulation_engine::simulator::Simulator;
use serde::{Deserialize, Serialize};

/// Components of one step's reward. `reward = -delay - penalties`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub delay: f64,
    pub switch_penalty: f64,
    pub standstill_penalty: f64,
    pub reward: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Penalty {
    /// Charged per requested switch.
    Switching { gain: f64 },
    /// Charged per vehicle at or below `threshold`.
    Standstill { gain: f64, threshold: f64 },
    None,
}

/// Delay-based reward. Full observation pairs the delay with a switching
/// penalty; partial observation with a standstill penalty, dropped in
/// evaluation runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardEvaluator {
    penalty: Penalty,
}

impl RewardEvaluator {
    pub fn switching(gain: f64) -> Self {
        Self {
            penalty: Penalty::Switching { gain },
        }
    }

    pub fn standstill(gain: f64, threshold: f64) -> Self {
        Self {
            penalty: Penalty::Standstill { gain, threshold },
        }
    }

    pub fn delay_only() -> Self {
        Self {
            penalty: Penalty::None,
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        match config.observation {
            ObservationConfig::Full => Self::switching(config.switch_penalty),
            ObservationConfig::Partial { .. } if config.evaluate => Self::delay_only(),
            ObservationConfig::Partial { .. } => {
                Self::standstill(config.standstill_gain, config.standstill_threshold)
            }
        }
    }

    /// Total shortfall below the speed limit over vehicles with a valid
    /// speed.
    pub fn delay<S: Simulator + ?Sized>(sim: &S) -> f64 {
        let max_speed = sim.max_speed();
        sim.vehicles()
            .iter()
            .filter(|v| v.speed >= MIN_VALID_SPEED)
            .map(|v| sim.speed_limit(&v.edge).unwrap_or(max_speed) - v.speed)
            .sum()
    }

    /// `switches` is the number of switch requests in the applied action.
    pub fn evaluate<S: Simulator + ?Sized>(&self, sim: &S, switches: usize) -> RewardBreakdown {
        let delay = Self::delay(sim);
        let mut breakdown = RewardBreakdown {
            delay,
            ..RewardBreakdown::default()
        };
        match self.penalty {
            Penalty::Switching { gain } => breakdown.switch_penalty = gain * switches as f64,
            Penalty::Standstill { gain, threshold } => {
                let stopped = sim
                    .vehicles()
                    .iter()
                    .filter(|v| v.speed >= MIN_VALID_SPEED && v.speed <= threshold)
                    .count();
                breakdown.standstill_penalty = gain * stopped as f64;
            }
            Penalty::None => {}
        }
        breakdown.reward = -delay - breakdown.switch_penalty - breakdown.standstill_penalty;
        breakdown
    }
}
