// simulator.rs
//
// Narrow view of the external micro-simulator: what the environment reads
// (vehicles, network) and what it commands (signals, vehicle insertion).

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Per-vehicle values read once per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub id: String,
    pub speed: f64,
    /// Current edge name; empty while the vehicle is between edges.
    pub edge: String,
    /// Distance travelled along `edge`, in meters.
    pub position: f64,
    pub lane: usize,
    pub type_id: String,
}

/// Arguments of an add-vehicle command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInsertion {
    pub id: String,
    pub edge: String,
    pub type_id: String,
    pub lane: usize,
    pub position: f64,
    pub speed: f64,
}

pub trait VehicleQuery {
    /// All vehicles, in the simulator's current enumeration order.
    fn vehicles(&self) -> Vec<VehicleState>;

    fn vehicles_on_edge(&self, edge: &str) -> Vec<VehicleState>;
}

pub trait NetworkQuery {
    fn edge_length(&self, edge: &str) -> Option<f64>;

    fn speed_limit(&self, edge: &str) -> Option<f64>;

    /// Non-internal edges of the network.
    fn edge_list(&self) -> Vec<String>;

    fn max_speed(&self) -> f64;
}

pub trait SimulatorCommand {
    fn set_signal_state(&mut self, node: &str, state: &str) -> Result<()>;

    fn remove_vehicle(&mut self, id: &str) -> Result<()>;

    fn add_vehicle(&mut self, vehicle: VehicleInsertion) -> Result<()>;

    /// Advances the physics by `dt` seconds.
    fn simulation_step(&mut self, dt: f64) -> Result<()>;
}

/// Everything the environment needs from a simulator.
pub trait Simulator: VehicleQuery + NetworkQuery + SimulatorCommand {}

impl<T: VehicleQuery + NetworkQuery + SimulatorCommand> Simulator for T {}
