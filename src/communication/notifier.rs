use log::{info, warn};

use crate::data_structures::{EmergencyVehicle, Intersection};

use super::messages::{ClearedTarget, TrafficMessage};

/// Broadcast channel to observers. Delivery is fire-and-forget: failures are
/// reported by the implementation and never reach the engine.
///
/// `publish` is called on runtime workers, sometimes while the emergency
/// slot is locked to keep broadcasts in lifecycle order, so it must not block.
pub trait Notifier: Send + Sync + 'static {
    fn publish(&self, message: TrafficMessage);

    fn emit_update(&self, intersection: &Intersection) {
        self.publish(TrafficMessage::TrafficUpdate(intersection.clone()));
    }

    fn emit_vehicle_alert(&self, vehicle: &EmergencyVehicle) {
        self.publish(TrafficMessage::EmergencyVehicleAlert(vehicle.clone()));
    }

    fn emit_vehicle_cleared(&self, target: ClearedTarget) {
        self.publish(TrafficMessage::EmergencyVehicleAlertCleared(target));
    }
}

/// Writes every broadcast to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, message: TrafficMessage) {
        match serde_json::to_string(&message) {
            Ok(json) => info!(target: "broadcast", "[{}] {}", message.queue(), json),
            Err(e) => warn!("Could not serialize {} message: {}", message.queue(), e),
        }
    }
}
