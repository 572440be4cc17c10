use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data_structures::{EmergencyVehicle, Intersection};
use crate::error::TrafficError;

use super::Store;

/// Process-local store. Each record is replaced whole under a write lock,
/// which gives the per-record atomicity the engine relies on.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    intersections: RwLock<BTreeMap<String, Intersection>>,
    vehicles: RwLock<HashMap<String, EmergencyVehicle>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with `intersections` and no vehicles.
    pub fn with_intersections(intersections: Vec<Intersection>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.intersections.write() {
            for intersection in intersections {
                map.insert(intersection.id.clone(), intersection);
            }
        }
        store
    }

    /// Replaces all records with the seed set, dropping every vehicle.
    pub fn reset(&self, intersections: Vec<Intersection>) -> Result<(), TrafficError> {
        let mut map = write(&self.intersections)?;
        map.clear();
        for intersection in intersections {
            map.insert(intersection.id.clone(), intersection);
        }
        write(&self.vehicles)?.clear();
        Ok(())
    }

    /// Every vehicle record, active or not.
    pub fn vehicles(&self) -> Result<Vec<EmergencyVehicle>, TrafficError> {
        Ok(read(&self.vehicles)?.values().cloned().collect())
    }

    pub fn active_vehicles(&self) -> Result<Vec<EmergencyVehicle>, TrafficError> {
        Ok(read(&self.vehicles)?
            .values()
            .filter(|vehicle| vehicle.is_active)
            .cloned()
            .collect())
    }

    pub fn intersection(&self, intersection_id: &str) -> Result<Option<Intersection>, TrafficError> {
        Ok(read(&self.intersections)?.get(intersection_id).cloned())
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, TrafficError> {
    lock.read()
        .map_err(|_| TrafficError::StoreUnavailable("store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, TrafficError> {
    lock.write()
        .map_err(|_| TrafficError::StoreUnavailable("store lock poisoned".to_string()))
}

impl Store for InMemoryStore {
    async fn load_intersections(&self) -> Result<Vec<Intersection>, TrafficError> {
        Ok(read(&self.intersections)?.values().cloned().collect())
    }

    async fn save_intersection(&self, intersection: Intersection) -> Result<Intersection, TrafficError> {
        let mut map = write(&self.intersections)?;
        match map.get_mut(&intersection.id) {
            Some(stored) => {
                *stored = intersection;
                Ok(stored.clone())
            }
            None => Err(TrafficError::UnknownIntersection(intersection.id)),
        }
    }

    async fn find_active_override(
        &self,
        intersection_id: &str,
    ) -> Result<Option<EmergencyVehicle>, TrafficError> {
        Ok(read(&self.vehicles)?
            .values()
            .find(|vehicle| vehicle.holds_override_at(intersection_id))
            .cloned())
    }

    async fn load_vehicle(&self, vehicle_id: &str) -> Result<Option<EmergencyVehicle>, TrafficError> {
        Ok(read(&self.vehicles)?.get(vehicle_id).cloned())
    }

    async fn save_vehicle(&self, vehicle: EmergencyVehicle) -> Result<EmergencyVehicle, TrafficError> {
        write(&self.vehicles)?.insert(vehicle.vehicle_id.clone(), vehicle.clone());
        Ok(vehicle)
    }

    async fn clear_all_vehicles(&self) -> Result<(), TrafficError> {
        let now = Utc::now();
        for vehicle in write(&self.vehicles)?.values_mut() {
            if vehicle.is_active {
                vehicle.deactivate(now);
            }
        }
        Ok(())
    }
}
