pub mod communication;
pub mod console;
pub mod control_system;
pub mod data_structures;
pub mod engine;
pub mod error;
pub mod global_variables;
pub mod simulation_engine;
pub mod storage;

pub use engine::{EngineConfig, TrafficEngine};
pub use error::TrafficError;
