use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TrafficError;
use crate::global_variables::GREEN_LIGHT_SECS;
use crate::global_variables::RED_LIGHT_SECS;
use crate::simulation_engine::lanes::congestion_level;

/// One of the two perpendicular traffic directions at an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::NorthSouth, Axis::EastWest];

    pub fn opposite(self) -> Axis {
        match self {
            Axis::NorthSouth => Axis::EastWest,
            Axis::EastWest => Axis::NorthSouth,
        }
    }

    /// Reads the axis tag out of a lane id such as `A_NS_IN`.
    /// Ids carrying both tags or neither are rejected.
    pub fn from_lane_id(lane_id: &str) -> Result<Axis, TrafficError> {
        match (lane_id.contains("NS"), lane_id.contains("EW")) {
            (true, false) => Ok(Axis::NorthSouth),
            (false, true) => Ok(Axis::EastWest),
            _ => Err(TrafficError::InvalidLaneIdentifier(lane_id.to_string())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Axis::NorthSouth => write!(f, "NORTH_SOUTH"),
            Axis::EastWest => write!(f, "EAST_WEST"),
        }
    }
}

/// The possible states for a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LightState {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficLight {
    pub direction: Axis,
    pub state: LightState,
    /// Seconds allotted to the current state. Advisory only, the
    /// authoritative clock is the time elapsed since `last_changed`.
    pub timer: u32,
    pub last_changed: DateTime<Utc>,
}

impl TrafficLight {
    pub fn new(direction: Axis, state: LightState, timer: u32, now: DateTime<Utc>) -> Self {
        Self {
            direction,
            state,
            timer,
            last_changed: now,
        }
    }

    /// Moves the light into `state`. `last_changed` only moves when the state does.
    pub fn transition(&mut self, state: LightState, timer: u32, now: DateTime<Utc>) {
        self.timer = timer;
        if self.state != state {
            self.state = state;
            self.last_changed = now;
        }
    }

    /// Milliseconds spent in the current state at `now`.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_changed).num_milliseconds()
    }
}

/// The two lights of an intersection, one per axis.
///
/// Serialized as a two element array to match the broadcast format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<TrafficLight>", try_from = "Vec<TrafficLight>")]
pub struct LightPair {
    pub north_south: TrafficLight,
    pub east_west: TrafficLight,
}

impl LightPair {
    /// Builds a pair with `green_axis` running and the other axis held at red.
    pub fn with_green(green_axis: Axis, now: DateTime<Utc>) -> Self {
        let light_for = |axis: Axis| {
            if axis == green_axis {
                TrafficLight::new(axis, LightState::Green, GREEN_LIGHT_SECS, now)
            } else {
                TrafficLight::new(axis, LightState::Red, RED_LIGHT_SECS, now)
            }
        };
        Self {
            north_south: light_for(Axis::NorthSouth),
            east_west: light_for(Axis::EastWest),
        }
    }

    pub fn get(&self, axis: Axis) -> &TrafficLight {
        match axis {
            Axis::NorthSouth => &self.north_south,
            Axis::EastWest => &self.east_west,
        }
    }

    pub fn get_mut(&mut self, axis: Axis) -> &mut TrafficLight {
        match axis {
            Axis::NorthSouth => &mut self.north_south,
            Axis::EastWest => &mut self.east_west,
        }
    }

    /// The axis currently allowed to move (GREEN or YELLOW), if exactly one is.
    pub fn active_axis(&self) -> Option<Axis> {
        let ns_active = self.north_south.state != LightState::Red;
        let ew_active = self.east_west.state != LightState::Red;
        match (ns_active, ew_active) {
            (true, false) => Some(Axis::NorthSouth),
            (false, true) => Some(Axis::EastWest),
            _ => None,
        }
    }

    /// Exactly one axis is GREEN or YELLOW and the other is RED.
    pub fn is_consistent(&self) -> bool {
        self.active_axis().is_some()
    }

    /// Timestamp of the most recent change on either light.
    pub fn last_changed(&self) -> DateTime<Utc> {
        self.north_south.last_changed.max(self.east_west.last_changed)
    }
}

impl From<LightPair> for Vec<TrafficLight> {
    fn from(pair: LightPair) -> Self {
        vec![pair.north_south, pair.east_west]
    }
}

impl TryFrom<Vec<TrafficLight>> for LightPair {
    type Error = String;

    fn try_from(lights: Vec<TrafficLight>) -> Result<Self, Self::Error> {
        if lights.len() != 2 {
            return Err(format!("expected 2 traffic lights, got {}", lights.len()));
        }
        let find = |axis: Axis| {
            lights
                .iter()
                .find(|light| light.direction == axis)
                .cloned()
                .ok_or_else(|| format!("missing {} light", axis))
        };
        Ok(Self {
            north_south: find(Axis::NorthSouth)?,
            east_west: find(Axis::EastWest)?,
        })
    }
}

/// Per-lane traffic figures, refreshed every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    #[serde(rename = "laneId")]
    pub id: String,
    pub axis: Axis,
    pub vehicle_count: u32,
    pub average_speed: u32,
    pub congestion_level: u32,
}

impl Lane {
    /// Creates a lane, reading its axis from the id and deriving congestion.
    pub fn new(id: &str, vehicle_count: u32, average_speed: u32) -> Result<Self, TrafficError> {
        let axis = Axis::from_lane_id(id)?;
        Ok(Self {
            id: id.to_string(),
            axis,
            vehicle_count,
            average_speed,
            congestion_level: congestion_level(vehicle_count, average_speed),
        })
    }
}

/// Represents a signalised intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intersection {
    #[serde(rename = "intersectionId")]
    pub id: String,
    pub location: Location,
    #[serde(rename = "trafficLights")]
    pub lights: LightPair,
    pub lanes: Vec<Lane>,
    pub last_updated: DateTime<Utc>,
}

impl Intersection {
    pub fn new(
        id: &str,
        location: Location,
        lights: LightPair,
        lanes: Vec<Lane>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            location,
            lights,
            lanes,
            last_updated: now,
        }
    }

    /// Total vehicles queued on the lanes of one axis.
    pub fn traffic_on(&self, axis: Axis) -> u32 {
        self.lanes
            .iter()
            .filter(|lane| lane.axis == axis)
            .map(|lane| lane.vehicle_count)
            .sum()
    }
}

/// Different types of emergency vehicles that can be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyVehicleType {
    Ambulance,
    #[serde(rename = "Fire Truck")]
    FireTruck,
    #[serde(rename = "Police Car")]
    PoliceCar,
}

impl fmt::Display for EmergencyVehicleType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmergencyVehicleType::Ambulance => write!(f, "Ambulance"),
            EmergencyVehicleType::FireTruck => write!(f, "Fire Truck"),
            EmergencyVehicleType::PoliceCar => write!(f, "Police Car"),
        }
    }
}

impl FromStr for EmergencyVehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "ambulance" => Ok(EmergencyVehicleType::Ambulance),
            "firetruck" => Ok(EmergencyVehicleType::FireTruck),
            "policecar" => Ok(EmergencyVehicleType::PoliceCar),
            _ => Err(format!("unknown emergency vehicle type `{}`", s)),
        }
    }
}

/// Where an emergency vehicle is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecyclePhase {
    Entering,
    EnRoute,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyVehicle {
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub vehicle_type: EmergencyVehicleType,
    pub current_intersection_id: String,
    pub destination_intersection_id: Option<String>,
    pub is_active: bool,
    pub priority_override_active: bool,
    pub current_path: Vec<String>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub phase: LifecyclePhase,
}

impl EmergencyVehicle {
    /// A fresh, active vehicle sitting at `start` with the override raised.
    pub fn dispatch(
        vehicle_type: EmergencyVehicleType,
        start: &str,
        destination: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let destination = destination
            .filter(|dest| !dest.is_empty())
            .map(str::to_string);
        let mut current_path = vec![start.to_string()];
        if let Some(dest) = destination.as_deref().filter(|dest| *dest != start) {
            current_path.push(dest.to_string());
        }

        Self {
            vehicle_id: format!("EV-{}", Uuid::new_v4().simple()),
            vehicle_type,
            current_intersection_id: start.to_string(),
            destination_intersection_id: destination,
            is_active: true,
            priority_override_active: true,
            current_path,
            entry_time: now,
            exit_time: None,
            phase: LifecyclePhase::Entering,
        }
    }

    /// The intersection the vehicle still has to travel to, if any.
    pub fn pending_destination(&self) -> Option<&str> {
        self.destination_intersection_id
            .as_deref()
            .filter(|dest| *dest != self.current_intersection_id)
    }

    pub fn arrive_at(&mut self, intersection_id: &str) {
        self.current_intersection_id = intersection_id.to_string();
        self.phase = LifecyclePhase::EnRoute;
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.priority_override_active = false;
        self.exit_time.get_or_insert(now);
        self.phase = LifecyclePhase::Cleared;
    }

    pub fn holds_override_at(&self, intersection_id: &str) -> bool {
        self.is_active
            && self.priority_override_active
            && self.current_intersection_id == intersection_id
    }
}
