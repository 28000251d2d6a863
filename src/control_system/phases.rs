// phases.rs
//
// The twelve signal phases of a four-approach intersection and the static
// tables behind them: integer codes, no-repeat successors and per-approach
// light colors.

use crate::error::{GridEnvError, Result};
use crate::simulation_engine::intersections::FlowDirection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signal phases. Green phases use codes 0..=5, their yellow counterparts
/// the same code plus 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    VerticalGreen,
    HorizontalGreen,
    ProtectedLeftTop,
    ProtectedLeftRight,
    ProtectedLeftBottom,
    ProtectedLeftLeft,
    VerticalGreenToYellow,
    HorizontalGreenToYellow,
    ProtectedLeftTopToYellow,
    ProtectedLeftRightToYellow,
    ProtectedLeftBottomToYellow,
    ProtectedLeftLeftToYellow,
}

const YELLOW_OFFSET: u8 = 6;

impl Phase {
    pub const ALL: [Phase; 12] = [
        Phase::VerticalGreen,
        Phase::HorizontalGreen,
        Phase::ProtectedLeftTop,
        Phase::ProtectedLeftRight,
        Phase::ProtectedLeftBottom,
        Phase::ProtectedLeftLeft,
        Phase::VerticalGreenToYellow,
        Phase::HorizontalGreenToYellow,
        Phase::ProtectedLeftTopToYellow,
        Phase::ProtectedLeftRightToYellow,
        Phase::ProtectedLeftBottomToYellow,
        Phase::ProtectedLeftLeftToYellow,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Phase::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| GridEnvError::invalid_transition("phase table", format!("code {code}")))
    }

    pub fn name(self) -> &'static str {
        PHASE_NAMES[self as usize]
    }

    pub fn is_yellow(self) -> bool {
        self.code() >= YELLOW_OFFSET
    }

    /// Yellow phase that ends this green; yellow phases map to themselves.
    pub fn to_yellow(self) -> Phase {
        if self.is_yellow() {
            self
        } else {
            Phase::ALL[(self.code() + YELLOW_OFFSET) as usize]
        }
    }

    /// Green phase a yellow departed from; green phases map to themselves.
    pub fn departed_green(self) -> Phase {
        if self.is_yellow() {
            Phase::ALL[(self.code() - YELLOW_OFFSET) as usize]
        } else {
            self
        }
    }

    /// Green that replaces `self` when leaving its own yellow would land
    /// back on it.
    pub fn no_repeat_successor(self) -> Phase {
        NO_REPEAT_SUCCESSOR[self.departed_green() as usize]
    }

    pub fn flow_direction(self) -> FlowDirection {
        match self.departed_green() {
            Phase::VerticalGreen | Phase::ProtectedLeftTop | Phase::ProtectedLeftBottom => {
                FlowDirection::Vertical
            }
            _ => FlowDirection::Horizontal,
        }
    }

    /// Per-lane signal string: approaches top, right, bottom, left, each as
    /// right turn, one char per straight lane, left turn.
    pub fn signal_state(self, horizontal_lanes: usize, vertical_lanes: usize) -> String {
        let mut state = String::with_capacity(2 * (horizontal_lanes + vertical_lanes) + 8);
        for (approach, lights) in PHASE_LIGHTS[self as usize].iter().enumerate() {
            // Top and bottom are the vertical approaches.
            let lanes = if approach % 2 == 0 {
                vertical_lanes
            } else {
                horizontal_lanes
            };
            state.push(lights.right_turn.as_char());
            for _ in 0..lanes {
                state.push(lights.straight.as_char());
            }
            state.push(lights.left_turn.as_char());
        }
        state
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = GridEnvError;

    fn from_str(s: &str) -> Result<Self> {
        PHASE_NAMES
            .iter()
            .position(|name| *name == s)
            .map(|i| Phase::ALL[i])
            .ok_or_else(|| GridEnvError::invalid_transition("phase table", s))
    }
}

const PHASE_NAMES: [&str; 12] = [
    "vertical_green",
    "horizontal_green",
    "protected_left_top",
    "protected_left_right",
    "protected_left_bottom",
    "protected_left_left",
    "vertical_green_to_yellow",
    "horizontal_green_to_yellow",
    "protected_left_top_to_yellow",
    "protected_left_right_to_yellow",
    "protected_left_bottom_to_yellow",
    "protected_left_left_to_yellow",
];

/// Indexed by green phase code.
const NO_REPEAT_SUCCESSOR: [Phase; 6] = [
    Phase::HorizontalGreen,
    Phase::VerticalGreen,
    Phase::ProtectedLeftRight,
    Phase::ProtectedLeftBottom,
    Phase::ProtectedLeftLeft,
    Phase::ProtectedLeftTop,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightColor {
    /// Priority green.
    Green,
    /// Permissive green; must yield.
    GreenMinor,
    Yellow,
    Red,
}

impl LightColor {
    pub fn as_char(self) -> char {
        match self {
            LightColor::Green => 'G',
            LightColor::GreenMinor => 'g',
            LightColor::Yellow => 'y',
            LightColor::Red => 'r',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'G' => Some(LightColor::Green),
            'g' => Some(LightColor::GreenMinor),
            'y' | 'Y' => Some(LightColor::Yellow),
            'r' | 'R' => Some(LightColor::Red),
            _ => None,
        }
    }

    pub fn allows_entry(self) -> bool {
        matches!(self, LightColor::Green | LightColor::GreenMinor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproachLights {
    pub right_turn: LightColor,
    pub straight: LightColor,
    pub left_turn: LightColor,
}

const fn lights(right_turn: LightColor, straight: LightColor, left_turn: LightColor) -> ApproachLights {
    ApproachLights {
        right_turn,
        straight,
        left_turn,
    }
}

use LightColor::{Green as G, GreenMinor as M, Red as R, Yellow as Y};

/// Right turns stay permissive unless a protected phase gives them priority.
const STOP: ApproachLights = lights(M, R, R);
const THROUGH: ApproachLights = lights(G, G, R);
const THROUGH_YELLOW: ApproachLights = lights(M, Y, R);
const LEFT_YELLOW: ApproachLights = lights(M, Y, Y);

/// Lights per phase for approaches top, right, bottom, left.
pub const PHASE_LIGHTS: [[ApproachLights; 4]; 12] = [
    [THROUGH, STOP, THROUGH, STOP],
    [STOP, THROUGH, STOP, THROUGH],
    [lights(G, G, G), STOP, STOP, STOP],
    [STOP, lights(M, G, G), STOP, STOP],
    [STOP, STOP, lights(G, G, G), STOP],
    [STOP, STOP, STOP, lights(M, G, G)],
    // Horizontal approaches stay red while the vertical through lanes clear.
    [THROUGH_YELLOW, STOP, THROUGH_YELLOW, STOP],
    [STOP, THROUGH_YELLOW, STOP, THROUGH_YELLOW],
    [LEFT_YELLOW, STOP, STOP, STOP],
    [STOP, LEFT_YELLOW, STOP, STOP],
    [STOP, STOP, LEFT_YELLOW, STOP],
    [STOP, STOP, STOP, LEFT_YELLOW],
];
