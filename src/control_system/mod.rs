pub mod emergency_override;
pub mod emergency_scheduler;
pub mod traffic_light_controller;
