// observation.rs
//
// Flattens simulator readings and signal states into the agent's
// observation vector.
//
// Full layout (n intersections, m vehicles in enumeration order):
//   [speed/max_speed; m] [distance/max_segment_length; m]
//   [edge_index/(num_edges - 1); m] [dwell; n] [flow_direction; n]
//   [is_yellow; n]
//
// Partial layout (k observed per approach, e through edges):
//   [speeds; 4kn] [distances; 4kn] [edge indices; 4kn]
//   [density; e] [mean speed; e] [dwell; n] [flow_direction; n]
//   [is_yellow; n]

use crate::config::ObservationConfig;
use crate::control_system::traffic_light_controller::TrafficLightController;
use crate::error::Result;
use crate::global_variables::{APPROACHES_PER_INTERSECTION, VEHICLE_LENGTH};
use crate::simulation_engine::edge_indexer::EdgeIndexer;
use crate::simulation_engine::edges::EdgeLabel;
use crate::simulation_engine::grid::Grid;
use crate::simulation_engine::simulator::{Simulator, VehicleState};
use serde::{Deserialize, Serialize};

/// Bounds and length of a flat observation vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: f64,
    pub high: f64,
    pub dim: usize,
}

#[derive(Debug, Clone)]
pub struct ObservationBuilder {
    mode: ObservationConfig,
    grid: Grid,
    indexer: EdgeIndexer,
    observed_ids: Vec<String>,
}

/// `num / den`, or 0 when the denominator is not positive.
fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

impl ObservationBuilder {
    pub fn new(grid: &Grid, mode: ObservationConfig) -> Self {
        Self {
            mode,
            grid: grid.clone(),
            indexer: EdgeIndexer::new(grid),
            observed_ids: Vec::new(),
        }
    }

    /// Vehicles that entered the last partial observation, in slot order.
    pub fn observed_ids(&self) -> &[String] {
        &self.observed_ids
    }

    /// Vector length for a network holding `num_vehicles`. Only the full
    /// layout depends on the vehicle count.
    pub fn observation_len(&self, num_vehicles: usize) -> usize {
        let n = self.grid.num_intersections();
        match self.mode {
            ObservationConfig::Full => 3 * num_vehicles + 3 * n,
            ObservationConfig::Partial { num_observed } => {
                3 * APPROACHES_PER_INTERSECTION * num_observed * n
                    + 2 * self.grid.num_through_edges()
                    + 3 * n
            }
        }
    }

    pub fn observation_space(&self, num_vehicles: usize) -> BoxSpace {
        BoxSpace {
            low: 0.0,
            high: f64::MAX,
            dim: self.observation_len(num_vehicles),
        }
    }

    pub fn build<S: Simulator + ?Sized>(
        &mut self,
        sim: &S,
        controller: &TrafficLightController,
    ) -> Result<Vec<f64>> {
        let mut obs = match self.mode {
            ObservationConfig::Full => self.vehicle_blocks(sim)?,
            ObservationConfig::Partial { num_observed } => {
                let mut obs = self.approach_blocks(sim, num_observed)?;
                obs.extend(self.edge_blocks(sim));
                obs
            }
        };
        Self::push_signal_blocks(&mut obs, controller);
        Ok(obs)
    }

    fn edge_index(&self, edge: &str) -> Result<f64> {
        if edge.is_empty() {
            return Ok(0.0);
        }
        Ok(self.indexer.normalized(self.indexer.index_of_str(edge)?))
    }

    fn distance_to_intersection<S: Simulator + ?Sized>(sim: &S, vehicle: &VehicleState) -> f64 {
        let on_center = EdgeLabel::parse(&vehicle.edge).is_ok_and(|label| label.is_center());
        if vehicle.edge.is_empty() || on_center {
            return 0.0;
        }
        sim.edge_length(&vehicle.edge)
            .map_or(0.0, |length| (length - vehicle.position).max(0.0))
    }

    fn vehicle_blocks<S: Simulator + ?Sized>(&self, sim: &S) -> Result<Vec<f64>> {
        let vehicles = sim.vehicles();
        let max_speed = sim.max_speed();
        let max_dist = self.grid.max_segment_length();

        let mut obs = Vec::with_capacity(self.observation_len(vehicles.len()));
        obs.extend(vehicles.iter().map(|v| ratio(v.speed, max_speed)));
        obs.extend(
            vehicles
                .iter()
                .map(|v| ratio(Self::distance_to_intersection(sim, v), max_dist)),
        );
        for vehicle in &vehicles {
            obs.push(self.edge_index(&vehicle.edge)?);
        }
        Ok(obs)
    }

    fn approach_blocks<S: Simulator + ?Sized>(&mut self, sim: &S, num_observed: usize) -> Result<Vec<f64>> {
        let slots = APPROACHES_PER_INTERSECTION * num_observed * self.grid.num_intersections();
        let mut speeds = Vec::with_capacity(slots);
        let mut distances = Vec::with_capacity(slots);
        let mut edges = Vec::with_capacity(slots);
        let max_speed = sim.max_speed();
        let max_dist = self.grid.max_segment_length();
        self.observed_ids.clear();

        for node in self.grid.intersections() {
            for approach in self.grid.incoming_edges(node) {
                let name = EdgeLabel::Through(approach).to_string();
                let edge_index = self.indexer.normalized(self.indexer.index_of(&EdgeLabel::Through(approach))?);
                let mut queue: Vec<(f64, VehicleState)> = sim
                    .vehicles_on_edge(&name)
                    .into_iter()
                    .map(|v| (Self::distance_to_intersection(sim, &v), v))
                    .collect();
                queue.sort_by(|a, b| a.0.total_cmp(&b.0));
                queue.truncate(num_observed);

                let padding = num_observed - queue.len();
                for (distance, vehicle) in queue {
                    speeds.push(ratio(vehicle.speed, max_speed));
                    distances.push(ratio(distance, max_dist));
                    edges.push(edge_index);
                    self.observed_ids.push(vehicle.id);
                }
                for block in [&mut speeds, &mut distances, &mut edges] {
                    block.extend(std::iter::repeat(0.0).take(padding));
                }
            }
        }

        speeds.append(&mut distances);
        speeds.append(&mut edges);
        Ok(speeds)
    }

    fn edge_blocks<S: Simulator + ?Sized>(&self, sim: &S) -> Vec<f64> {
        let max_speed = sim.max_speed();
        let (density, mean_speed): (Vec<f64>, Vec<f64>) = self
            .indexer
            .through_edges()
            .map(|edge| {
                let name = EdgeLabel::Through(edge).to_string();
                let on_edge = sim.vehicles_on_edge(&name);
                if on_edge.is_empty() {
                    return (0.0, 0.0);
                }
                let count = on_edge.len() as f64;
                let length = sim
                    .edge_length(&name)
                    .unwrap_or_else(|| self.grid.segment_length(&edge));
                let mean = on_edge.iter().map(|v| v.speed).sum::<f64>() / count;
                (ratio(VEHICLE_LENGTH * count, length), ratio(mean, max_speed))
            })
            .unzip();

        let mut obs = density;
        obs.extend(mean_speed);
        obs
    }

    fn push_signal_blocks(obs: &mut Vec<f64>, controller: &TrafficLightController) {
        obs.extend(controller.states().map(|(_, s)| s.dwell_time));
        obs.extend(controller.states().map(|(_, s)| s.flow_direction.as_f64()));
        obs.extend(controller.states().map(|(_, s)| if s.is_yellow { 1.0 } else { 0.0 }));
    }
}
