// control_system/mod.rs
pub mod phases;
pub mod traffic_light_controller;
