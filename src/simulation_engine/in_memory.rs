// in_memory.rs
//
// Kinematic stand-in for the external simulator, used by tests, benches and
// the rollout binary. Vehicles drive straight at the speed limit, stop at
// the stop line while their lane shows red, cross intersections on the
// center edge and wait at the end of terminal edges. There is no car
// following; this is a driver for the environment, not a traffic model.

use crate::config::GridConfig;
use crate::control_system::phases::LightColor;
use crate::error::{GridEnvError, Result};
use crate::simulation_engine::edge_indexer::EdgeIndexer;
use crate::simulation_engine::edges::{EdgeLabel, ThroughEdge};
use crate::simulation_engine::grid::Grid;
use crate::simulation_engine::intersections::IntersectionId;
use crate::simulation_engine::simulator::{
    NetworkQuery, SimulatorCommand, VehicleInsertion, VehicleQuery, VehicleState,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Length of the connector inside an intersection, in meters.
pub const CROSSING_LENGTH: f64 = 10.0;

/// Vehicle mix used when populating the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    Car,
    Bus,
    Truck,
}

impl VehicleType {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Car => "car",
            VehicleType::Bus => "bus",
            VehicleType::Truck => "truck",
        }
    }

    fn sample(rng: &mut StdRng) -> Self {
        let roll: f64 = rng.random_range(0.0..1.0);
        if roll < 0.5 {
            VehicleType::Car
        } else if roll < 0.81 {
            VehicleType::Truck
        } else {
            VehicleType::Bus
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Location {
    Road(ThroughEdge),
    Crossing { node: IntersectionId, exit: ThroughEdge },
}

impl Location {
    fn label(&self) -> EdgeLabel {
        match self {
            Location::Road(edge) => EdgeLabel::Through(*edge),
            Location::Crossing { node, .. } => EdgeLabel::Center(node.index()),
        }
    }
}

#[derive(Debug, Clone)]
struct SimVehicle {
    id: String,
    type_id: String,
    location: Location,
    position: f64,
    lane: usize,
    speed: f64,
}

#[derive(Debug, Clone, Copy)]
struct EdgeInfo {
    length: f64,
    speed_limit: f64,
}

#[derive(Debug, Clone)]
pub struct InMemorySimulator {
    grid: Grid,
    speed_limit: f64,
    edges: HashMap<String, EdgeInfo>,
    edge_order: Vec<String>,
    vehicles: Vec<SimVehicle>,
    signals: HashMap<IntersectionId, String>,
    time: f64,
}

impl InMemorySimulator {
    pub fn new(grid: &Grid, speed_limit: f64) -> Self {
        let mut edges = HashMap::new();
        let mut edge_order = Vec::new();
        let indexer = EdgeIndexer::new(grid);
        for edge in indexer.through_edges() {
            let name = EdgeLabel::Through(edge).to_string();
            edges.insert(
                name.clone(),
                EdgeInfo {
                    length: grid.segment_length(&edge),
                    speed_limit,
                },
            );
            edge_order.push(name);
        }
        for node in grid.intersections() {
            edges.insert(
                EdgeLabel::Center(node.index()).to_string(),
                EdgeInfo {
                    length: CROSSING_LENGTH,
                    speed_limit,
                },
            );
        }

        Self {
            grid: grid.clone(),
            speed_limit,
            edges,
            edge_order,
            vehicles: Vec::new(),
            signals: HashMap::new(),
            time: 0.0,
        }
    }

    pub fn from_config(config: &GridConfig) -> Result<Self> {
        Ok(Self::new(&Grid::from_config(config)?, config.speed_limit))
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    pub fn signal_state(&self, node: IntersectionId) -> Option<&str> {
        self.signals.get(&node).map(String::as_str)
    }

    /// Places `count` stopped vehicles on random entrance edges.
    pub fn populate(&mut self, count: usize, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let entrances: Vec<ThroughEdge> = EdgeIndexer::new(&self.grid)
            .through_edges()
            .filter(|edge| self.grid.is_entrance(edge))
            .collect();

        for n in 0..count {
            let edge = entrances[rng.random_range(0..entrances.len())];
            let length = self.grid.segment_length(&edge);
            let vehicle = SimVehicle {
                id: format!("veh_{n}"),
                type_id: VehicleType::sample(&mut rng).as_str().to_string(),
                location: Location::Road(edge),
                position: rng.random_range(0.0..length),
                lane: rng.random_range(0..self.grid.lanes_on(&edge)),
                speed: 0.0,
            };
            self.vehicles.push(vehicle);
        }
    }

    /// Places a vehicle inside intersection `node`, heading for `exit`.
    pub fn spawn_crossing(&mut self, id: &str, node: IntersectionId, exit: ThroughEdge) -> Result<()> {
        self.ensure_unique(id)?;
        self.vehicles.push(SimVehicle {
            id: id.to_string(),
            type_id: VehicleType::Car.as_str().to_string(),
            location: Location::Crossing { node, exit },
            position: 0.0,
            lane: 0,
            speed: self.speed_limit,
        });
        Ok(())
    }

    fn ensure_unique(&self, id: &str) -> Result<()> {
        if self.vehicles.iter().any(|v| v.id == id) {
            return Err(GridEnvError::Simulator(format!("vehicle '{id}' already exists")));
        }
        Ok(())
    }

    fn length_of(&self, location: &Location) -> f64 {
        match location {
            Location::Road(edge) => self.grid.segment_length(edge),
            Location::Crossing { .. } => CROSSING_LENGTH,
        }
    }

    fn signal_len(&self) -> usize {
        2 * (self.grid.horizontal_lanes() + 2) + 2 * (self.grid.vertical_lanes() + 2)
    }

    /// Whether a vehicle on `edge`, `lane` may drive straight into `node`.
    fn allows_straight(&self, node: IntersectionId, edge: &ThroughEdge, lane: usize) -> bool {
        let Some(state) = self.signals.get(&node) else {
            return true;
        };
        let Some(approach) = self.grid.incoming_edges(node).iter().position(|e| e == edge) else {
            return true;
        };
        let lanes_of = |approach: usize| {
            if approach % 2 == 0 {
                self.grid.vertical_lanes()
            } else {
                self.grid.horizontal_lanes()
            }
        };
        let offset: usize = (0..approach).map(|a| lanes_of(a) + 2).sum();
        let index = offset + 1 + lane.min(lanes_of(approach) - 1);
        state
            .chars()
            .nth(index)
            .and_then(LightColor::from_char)
            .is_some_and(LightColor::allows_entry)
    }

    fn advance(&self, vehicle: &mut SimVehicle, dt: f64) {
        let mut remaining = self.speed_limit * dt;
        vehicle.speed = self.speed_limit;
        loop {
            let room = self.length_of(&vehicle.location) - vehicle.position;
            if remaining < room {
                vehicle.position += remaining;
                return;
            }
            match vehicle.location {
                Location::Road(edge) => {
                    let (Some(node), Some(exit)) =
                        (self.grid.downstream_intersection(&edge), self.grid.next_straight(&edge))
                    else {
                        // Terminal edge: wait at the end to be rerouted.
                        vehicle.position += room;
                        return;
                    };
                    if !self.allows_straight(node, &edge, vehicle.lane) {
                        vehicle.position += room;
                        vehicle.speed = 0.0;
                        return;
                    }
                    remaining -= room;
                    vehicle.location = Location::Crossing { node, exit };
                    vehicle.position = 0.0;
                }
                Location::Crossing { exit, .. } => {
                    remaining -= room;
                    vehicle.location = Location::Road(exit);
                    vehicle.position = 0.0;
                    vehicle.lane = vehicle.lane.min(self.grid.lanes_on(&exit) - 1);
                }
            }
        }
    }

    fn state_of(vehicle: &SimVehicle) -> VehicleState {
        VehicleState {
            id: vehicle.id.clone(),
            speed: vehicle.speed,
            edge: vehicle.location.label().to_string(),
            position: vehicle.position,
            lane: vehicle.lane,
            type_id: vehicle.type_id.clone(),
        }
    }
}

impl VehicleQuery for InMemorySimulator {
    fn vehicles(&self) -> Vec<VehicleState> {
        self.vehicles.iter().map(Self::state_of).collect()
    }

    fn vehicles_on_edge(&self, edge: &str) -> Vec<VehicleState> {
        self.vehicles
            .iter()
            .map(Self::state_of)
            .filter(|v| v.edge == edge)
            .collect()
    }
}

impl NetworkQuery for InMemorySimulator {
    fn edge_length(&self, edge: &str) -> Option<f64> {
        self.edges.get(edge).map(|info| info.length)
    }

    fn speed_limit(&self, edge: &str) -> Option<f64> {
        self.edges.get(edge).map(|info| info.speed_limit)
    }

    fn edge_list(&self) -> Vec<String> {
        self.edge_order.clone()
    }

    fn max_speed(&self) -> f64 {
        self.speed_limit
    }
}

impl SimulatorCommand for InMemorySimulator {
    fn set_signal_state(&mut self, node: &str, state: &str) -> Result<()> {
        let id = self.grid.parse_node(node)?;
        if state.chars().count() != self.signal_len() {
            return Err(GridEnvError::Simulator(format!(
                "signal state '{state}' for {node} should have {} links",
                self.signal_len()
            )));
        }
        self.signals.insert(id, state.to_string());
        Ok(())
    }

    fn remove_vehicle(&mut self, id: &str) -> Result<()> {
        let index = self
            .vehicles
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| GridEnvError::Simulator(format!("no vehicle '{id}' to remove")))?;
        self.vehicles.remove(index);
        Ok(())
    }

    fn add_vehicle(&mut self, vehicle: VehicleInsertion) -> Result<()> {
        self.ensure_unique(&vehicle.id)?;
        let label = EdgeLabel::parse(&vehicle.edge)?;
        self.grid.validate_edge(&label)?;
        let EdgeLabel::Through(edge) = label else {
            return Err(GridEnvError::Simulator(format!(
                "cannot insert '{}' on internal edge {}",
                vehicle.id, vehicle.edge
            )));
        };
        if vehicle.lane >= self.grid.lanes_on(&edge) {
            return Err(GridEnvError::Simulator(format!(
                "edge {} has no lane {}",
                vehicle.edge, vehicle.lane
            )));
        }
        self.vehicles.push(SimVehicle {
            id: vehicle.id,
            type_id: vehicle.type_id,
            location: Location::Road(edge),
            position: vehicle.position,
            lane: vehicle.lane,
            speed: vehicle.speed,
        });
        Ok(())
    }

    fn simulation_step(&mut self, dt: f64) -> Result<()> {
        let mut vehicles = std::mem::take(&mut self.vehicles);
        for vehicle in &mut vehicles {
            self.advance(vehicle, dt);
        }
        self.vehicles = vehicles;
        self.time += dt;
        Ok(())
    }
}
