// simulation_engine/mod.rs
pub mod edge_indexer;
pub mod edges;
pub mod grid;
pub mod in_memory;
pub mod intersections;
pub mod rerouting;
pub mod simulator;
