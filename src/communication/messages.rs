use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data_structures::{EmergencyVehicle, Intersection};
use crate::global_variables::{QUEUE_EMERGENCY_ALERT, QUEUE_EMERGENCY_CLEARED, QUEUE_TRAFFIC_UPDATE};

/// Which vehicles a cleared notification refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClearedTarget {
    Vehicle(String),
    All,
}

impl fmt::Display for ClearedTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClearedTarget::Vehicle(id) => write!(f, "{}", id),
            ClearedTarget::All => write!(f, "all"),
        }
    }
}

impl From<String> for ClearedTarget {
    fn from(value: String) -> Self {
        if value == "all" {
            ClearedTarget::All
        } else {
            ClearedTarget::Vehicle(value)
        }
    }
}

impl From<ClearedTarget> for String {
    fn from(target: ClearedTarget) -> Self {
        target.to_string()
    }
}

/// Everything the engine broadcasts to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum TrafficMessage {
    TrafficUpdate(Intersection),
    EmergencyVehicleAlert(EmergencyVehicle),
    EmergencyVehicleAlertCleared(ClearedTarget),
}

impl TrafficMessage {
    /// Routing key the message is published under.
    pub fn queue(&self) -> &'static str {
        match self {
            TrafficMessage::TrafficUpdate(_) => QUEUE_TRAFFIC_UPDATE,
            TrafficMessage::EmergencyVehicleAlert(_) => QUEUE_EMERGENCY_ALERT,
            TrafficMessage::EmergencyVehicleAlertCleared(_) => QUEUE_EMERGENCY_CLEARED,
        }
    }
}
