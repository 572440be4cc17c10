//! Persistence seam for intersection and emergency vehicle records.
//!
//! The engine never keeps records across ticks; everything is re-read from a
//! [`Store`] at the start of each pass and written back per intersection.

pub mod memory;

use std::future::Future;

use crate::data_structures::{EmergencyVehicle, Intersection};
use crate::error::TrafficError;

pub use memory::InMemoryStore;

pub trait Store: Send + Sync + 'static {
    fn load_intersections(&self) -> impl Future<Output = Result<Vec<Intersection>, TrafficError>> + Send;

    /// Persists the whole record in one step and returns what was stored.
    /// Readers never observe a partially written light set.
    fn save_intersection(
        &self,
        intersection: Intersection,
    ) -> impl Future<Output = Result<Intersection, TrafficError>> + Send;

    /// The active vehicle holding a priority override at `intersection_id`.
    fn find_active_override(
        &self,
        intersection_id: &str,
    ) -> impl Future<Output = Result<Option<EmergencyVehicle>, TrafficError>> + Send;

    fn load_vehicle(
        &self,
        vehicle_id: &str,
    ) -> impl Future<Output = Result<Option<EmergencyVehicle>, TrafficError>> + Send;

    fn save_vehicle(
        &self,
        vehicle: EmergencyVehicle,
    ) -> impl Future<Output = Result<EmergencyVehicle, TrafficError>> + Send;

    /// Deactivates every vehicle record.
    fn clear_all_vehicles(&self) -> impl Future<Output = Result<(), TrafficError>> + Send;
}
