// Shared constants for the grid environment.

/// Approaches feeding every intersection (top, right, bottom, left).
pub const APPROACHES_PER_INTERSECTION: usize = 4;

/// Nominal vehicle length in meters, used for edge densities.
pub const VEHICLE_LENGTH: f64 = 5.0;

/// Floating point slack when comparing accumulated dwell times to thresholds.
pub const DWELL_EPSILON: f64 = 1e-9;

/// Simulators report a large negative speed for vehicles that are gone.
pub const MIN_VALID_SPEED: f64 = -1e-6;

// Defaults mirrored by `EnvConfig::default()`.
pub const DEFAULT_SWITCH_TIME: f64 = 2.0;
pub const DEFAULT_SIM_STEP: f64 = 1.0;
pub const DEFAULT_HORIZON: u64 = 400;
pub const DEFAULT_SWITCH_PENALTY: f64 = 1.0;
pub const DEFAULT_STANDSTILL_GAIN: f64 = 0.2;
pub const DEFAULT_STANDSTILL_THRESHOLD: f64 = 0.0;

// Node and edge naming used by the grid network.
pub const CENTER_PREFIX: &str = "center";
pub const INTERNAL_EDGE_MARKER: char = ':';
