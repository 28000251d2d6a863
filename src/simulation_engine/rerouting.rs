// rerouting.rs
//
// Keeps the vehicle population constant: anything that reaches a terminal
// edge is taken out and re-inserted at the entrance of the same row or
// column, heading the same way.

use crate::error::{GridEnvError, Result};
use crate::simulation_engine::edges::EdgeLabel;
use crate::simulation_engine::grid::Grid;
use crate::simulation_engine::simulator::{Simulator, VehicleInsertion};
use log::debug;
use serde::{Deserialize, Serialize};

/// One vehicle moved from a terminal edge back to an entrance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reinsertion {
    pub vehicle_id: String,
    pub from_edge: String,
    pub to_edge: String,
}

#[derive(Debug, Clone)]
pub struct BoundaryRerouter {
    grid: Grid,
}

impl BoundaryRerouter {
    pub fn new(grid: &Grid) -> Self {
        Self { grid: grid.clone() }
    }

    /// Re-inserts every vehicle currently on a terminal edge. Vehicles
    /// between edges or inside an intersection are left alone.
    ///
    /// Every label is checked against the grid, and every entrance against
    /// the simulator, before the first vehicle is removed; on error the
    /// simulator is untouched.
    pub fn reroute<S: Simulator + ?Sized>(&self, sim: &mut S) -> Result<Vec<Reinsertion>> {
        let mut planned = Vec::new();
        for vehicle in sim.vehicles() {
            if vehicle.edge.is_empty() {
                continue;
            }
            let label = EdgeLabel::parse(&vehicle.edge)?;
            self.grid.validate_edge(&label)?;
            let Some(edge) = label.as_through() else {
                continue;
            };
            if !self.grid.is_terminal(edge) {
                continue;
            }

            let entrance = EdgeLabel::Through(self.grid.entrance_for(edge)).to_string();
            if sim.edge_length(&entrance).is_none() {
                return Err(GridEnvError::invalid_edge(
                    entrance,
                    "entrance is missing from the simulator network",
                ));
            }
            let speed = sim.speed_limit(&entrance).unwrap_or_else(|| sim.max_speed());
            let insertion = VehicleInsertion {
                id: vehicle.id.clone(),
                edge: entrance,
                type_id: vehicle.type_id,
                lane: vehicle.lane,
                position: 0.0,
                speed,
            };
            planned.push((vehicle.edge, insertion));
        }

        let mut moved = Vec::with_capacity(planned.len());
        for (from_edge, insertion) in planned {
            let (vehicle_id, to_edge) = (insertion.id.clone(), insertion.edge.clone());
            sim.remove_vehicle(&vehicle_id)?;
            sim.add_vehicle(insertion)?;
            debug!("rerouted {} from {} to {}", vehicle_id, from_edge, to_edge);
            moved.push(Reinsertion {
                vehicle_id,
                from_edge,
                to_edge,
            });
        }
        Ok(moved)
    }
}
