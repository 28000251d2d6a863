use crate::error::{GridEnvError, Result};
use crate::global_variables::CENTER_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linear index of an intersection, `id = (x - 1) + (y - 1) * cols`.
///
/// Only `Grid` hands these out, so holding one means the index is in range
/// for the grid that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntersectionId(usize);

impl IntersectionId {
    pub(crate) fn new_unchecked(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Traffic-light node name as used by the simulator (`center{id}`).
impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CENTER_PREFIX}{}", self.0)
    }
}

/// Neighbor direction for relative node lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

impl FromStr for Direction {
    type Err = GridEnvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" => Ok(Direction::Top),
            "bottom" => Ok(Direction::Bottom),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(GridEnvError::UnsupportedDirection(other.to_string())),
        }
    }
}

/// Which pair of approaches currently has (or last had) right of way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDirection {
    Vertical,
    Horizontal,
}

impl FlowDirection {
    /// Numeric encoding used in observation vectors.
    pub fn as_f64(self) -> f64 {
        match self {
            FlowDirection::Vertical => 0.0,
            FlowDirection::Horizontal => 1.0,
        }
    }
}
