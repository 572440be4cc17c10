pub mod config;
pub mod simulation;

pub use config::EngineConfig;
pub use simulation::{TickReport, TrafficEngine};
