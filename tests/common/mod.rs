#![allow(dead_code)]

use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

use smart_traffic::communication::{ClearedTarget, Notifier, TrafficMessage};
use smart_traffic::data_structures::{EmergencyVehicle, Intersection};
use smart_traffic::simulation_engine::intersections::create_intersections;
use smart_traffic::storage::{InMemoryStore, Store};
use smart_traffic::TrafficError;

/// Keeps every broadcast for later inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<TrafficMessage>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<TrafficMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<Intersection> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                TrafficMessage::TrafficUpdate(intersection) => Some(intersection),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<EmergencyVehicle> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                TrafficMessage::EmergencyVehicleAlert(vehicle) => Some(vehicle),
                _ => None,
            })
            .collect()
    }

    pub fn cleared(&self) -> Vec<ClearedTarget> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                TrafficMessage::EmergencyVehicleAlertCleared(target) => Some(target),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, message: TrafficMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

/// Wraps the in-memory store with switchable outages.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    offline: AtomicBool,
    failing_saves: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn seeded() -> Self {
        Self {
            inner: InMemoryStore::with_intersections(create_intersections(Utc::now()).unwrap()),
            ..Self::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fail_saves_for(&self, intersection_id: &str) {
        self.failing_saves
            .lock()
            .unwrap()
            .insert(intersection_id.to_string());
    }

    fn check(&self) -> Result<(), TrafficError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(TrafficError::StoreUnavailable("store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Store for FlakyStore {
    async fn load_intersections(&self) -> Result<Vec<Intersection>, TrafficError> {
        self.check()?;
        self.inner.load_intersections().await
    }

    async fn save_intersection(&self, intersection: Intersection) -> Result<Intersection, TrafficError> {
        self.check()?;
        let failing = self.failing_saves.lock().unwrap().contains(&intersection.id);
        if failing {
            return Err(TrafficError::StoreUnavailable(format!(
                "write to {} timed out",
                intersection.id
            )));
        }
        self.inner.save_intersection(intersection).await
    }

    async fn find_active_override(
        &self,
        intersection_id: &str,
    ) -> Result<Option<EmergencyVehicle>, TrafficError> {
        self.check()?;
        self.inner.find_active_override(intersection_id).await
    }

    async fn load_vehicle(&self, vehicle_id: &str) -> Result<Option<EmergencyVehicle>, TrafficError> {
        self.check()?;
        self.inner.load_vehicle(vehicle_id).await
    }

    async fn save_vehicle(&self, vehicle: EmergencyVehicle) -> Result<EmergencyVehicle, TrafficError> {
        self.check()?;
        self.inner.save_vehicle(vehicle).await
    }

    async fn clear_all_vehicles(&self) -> Result<(), TrafficError> {
        self.check()?;
        self.inner.clear_all_vehicles().await
    }
}

/// Wraps the in-memory store with a slow `load_intersections` and a log of
/// the order loads and saves happen in.
pub struct SlowStore {
    pub inner: InMemoryStore,
    load_delay: Duration,
    events: Mutex<Vec<String>>,
}

impl SlowStore {
    pub fn seeded(load_delay: Duration) -> Self {
        Self {
            inner: InMemoryStore::with_intersections(create_intersections(Utc::now()).unwrap()),
            load_delay,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Store for SlowStore {
    async fn load_intersections(&self) -> Result<Vec<Intersection>, TrafficError> {
        self.record("load".to_string());
        sleep(self.load_delay).await;
        self.inner.load_intersections().await
    }

    async fn save_intersection(&self, intersection: Intersection) -> Result<Intersection, TrafficError> {
        self.record(format!("save:{}", intersection.id));
        self.inner.save_intersection(intersection).await
    }

    async fn find_active_override(
        &self,
        intersection_id: &str,
    ) -> Result<Option<EmergencyVehicle>, TrafficError> {
        self.inner.find_active_override(intersection_id).await
    }

    async fn load_vehicle(&self, vehicle_id: &str) -> Result<Option<EmergencyVehicle>, TrafficError> {
        self.inner.load_vehicle(vehicle_id).await
    }

    async fn save_vehicle(&self, vehicle: EmergencyVehicle) -> Result<EmergencyVehicle, TrafficError> {
        self.inner.save_vehicle(vehicle).await
    }

    async fn clear_all_vehicles(&self) -> Result<(), TrafficError> {
        self.inner.clear_all_vehicles().await
    }
}

pub fn seeded_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_intersections(
        create_intersections(Utc::now()).unwrap(),
    ))
}
