use chrono::Utc;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::communication::{ClearedTarget, Notifier};
use crate::data_structures::{EmergencyVehicle, EmergencyVehicleType};
use crate::error::TrafficError;
use crate::storage::Store;

/// A scheduled lifecycle run, tagged with the slot generation it belongs to.
struct DelayedTask {
    token: u64,
    handle: JoinHandle<()>,
}

impl DelayedTask {
    fn cancel(self) {
        debug!("[Emergency] Cancelling lifecycle run #{}", self.token);
        self.handle.abort();
    }
}

/// The single active-vehicle slot. Every write to vehicle records goes
/// through this lock, so at most one writer runs at a time.
#[derive(Default)]
struct VehicleSlot {
    generation: u64,
    vehicle_id: Option<String>,
    pending: Option<DelayedTask>,
}

impl VehicleSlot {
    /// Starts a new generation, cancelling whatever run was pending.
    /// Callbacks holding an older token become no-ops.
    fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.vehicle_id = None;
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
        self.generation
    }
}

#[derive(Debug, Clone, Copy)]
enum LifecycleStep<'a> {
    Arrive(&'a str),
    Clear,
}

impl fmt::Display for LifecycleStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LifecycleStep::Arrive(dest) => write!(f, "arrival at {}", dest),
            LifecycleStep::Clear => write!(f, "clearance"),
        }
    }
}

/// Drives emergency vehicles through ENTERING -> EN_ROUTE -> CLEARED on
/// timers anchored at dispatch, independent of the simulation tick.
pub struct EmergencyScheduler<S: Store, N: Notifier> {
    store: Arc<S>,
    notifier: Arc<N>,
    travel_dwell: Duration,
    stationary_dwell: Duration,
    slot: Arc<Mutex<VehicleSlot>>,
}

impl<S: Store, N: Notifier> Clone for EmergencyScheduler<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            travel_dwell: self.travel_dwell,
            stationary_dwell: self.stationary_dwell,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<S: Store, N: Notifier> EmergencyScheduler<S, N> {
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        travel_dwell: Duration,
        stationary_dwell: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            travel_dwell,
            stationary_dwell,
            slot: Arc::new(Mutex::new(VehicleSlot::default())),
        }
    }

    /// Dispatches a new vehicle, replacing any vehicle already in the system.
    ///
    /// Concurrent triggers are last-writer-wins: each one bumps the slot
    /// generation, so the runs of earlier vehicles never touch the records again.
    pub async fn trigger(
        &self,
        vehicle_type: EmergencyVehicleType,
        start: &str,
        destination: Option<&str>,
    ) -> Result<EmergencyVehicle, TrafficError> {
        let destination = destination.filter(|dest| !dest.is_empty());
        self.ensure_known(start, destination).await?;

        let mut slot = self.slot.lock().await;
        self.store.clear_all_vehicles().await?;
        let vehicle = self
            .store
            .save_vehicle(EmergencyVehicle::dispatch(vehicle_type, start, destination, Utc::now()))
            .await?;

        let generation = slot.invalidate();
        info!(
            "[Emergency] {} {} dispatched at {} heading to {}",
            vehicle.vehicle_type,
            vehicle.vehicle_id,
            start,
            vehicle.pending_destination().unwrap_or(start)
        );
        self.notifier.emit_vehicle_alert(&vehicle);

        slot.vehicle_id = Some(vehicle.vehicle_id.clone());
        slot.pending = Some(self.schedule(generation, &vehicle));
        Ok(vehicle)
    }

    /// Deactivates every vehicle right away and emits a single cleared("all").
    pub async fn clear_all(&self) -> Result<(), TrafficError> {
        let mut slot = self.slot.lock().await;
        self.store.clear_all_vehicles().await?;
        slot.invalidate();
        info!("[Emergency] All emergency vehicles cleared.");
        self.notifier.emit_vehicle_cleared(ClearedTarget::All);
        Ok(())
    }

    /// Id of the vehicle whose lifecycle is still running, if any.
    pub async fn active_vehicle_id(&self) -> Option<String> {
        self.slot.lock().await.vehicle_id.clone()
    }

    async fn ensure_known(&self, start: &str, destination: Option<&str>) -> Result<(), TrafficError> {
        let intersections = self.store.load_intersections().await?;
        for id in std::iter::once(start).chain(destination) {
            if !intersections.iter().any(|intersection| intersection.id == id) {
                return Err(TrafficError::UnknownIntersection(id.to_string()));
            }
        }
        Ok(())
    }

    fn schedule(&self, generation: u64, vehicle: &EmergencyVehicle) -> DelayedTask {
        let scheduler = self.clone();
        let vehicle_id = vehicle.vehicle_id.clone();
        let destination = vehicle.pending_destination().map(str::to_string);

        let handle = tokio::spawn(async move {
            match destination {
                Some(dest) => {
                    sleep(scheduler.travel_dwell).await;
                    if !scheduler
                        .advance(generation, &vehicle_id, LifecycleStep::Arrive(&dest))
                        .await
                    {
                        return;
                    }
                    sleep(scheduler.travel_dwell).await;
                    scheduler
                        .advance(generation, &vehicle_id, LifecycleStep::Clear)
                        .await;
                }
                None => {
                    sleep(scheduler.stationary_dwell).await;
                    scheduler
                        .advance(generation, &vehicle_id, LifecycleStep::Clear)
                        .await;
                }
            }
        });

        DelayedTask {
            token: generation,
            handle,
        }
    }

    /// Applies one lifecycle step if the run is still current and the vehicle
    /// still active. Store failures are logged and the step is dropped.
    async fn advance(&self, generation: u64, vehicle_id: &str, step: LifecycleStep<'_>) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.generation != generation {
            debug!("[Emergency] Ignoring stale {} for {}", step, vehicle_id);
            return false;
        }

        let mut vehicle = match self.store.load_vehicle(vehicle_id).await {
            Ok(Some(vehicle)) if vehicle.is_active => vehicle,
            Ok(_) => {
                debug!("[Emergency] {} no longer active, skipping {}", vehicle_id, step);
                return false;
            }
            Err(e) => {
                error!("[Emergency] Lost {} for {}: {}", step, vehicle_id, e);
                return false;
            }
        };

        match step {
            LifecycleStep::Arrive(dest) => vehicle.arrive_at(dest),
            LifecycleStep::Clear => vehicle.deactivate(Utc::now()),
        }

        let saved = match self.store.save_vehicle(vehicle).await {
            Ok(saved) => saved,
            Err(e) => {
                error!("[Emergency] Lost {} for {}: {}", step, vehicle_id, e);
                return false;
            }
        };

        match step {
            LifecycleStep::Arrive(dest) => {
                info!("[Emergency] Vehicle {} moved to {}.", vehicle_id, dest);
                self.notifier.emit_vehicle_alert(&saved);
            }
            LifecycleStep::Clear => {
                info!("[Emergency] Vehicle {} cleared.", vehicle_id);
                self.notifier
                    .emit_vehicle_cleared(ClearedTarget::Vehicle(saved.vehicle_id.clone()));
                slot.vehicle_id = None;
                // The run is finishing on its own; detach rather than abort.
                if slot.pending.take().is_none() {
                    warn!("[Emergency] Cleared {} without a pending run", vehicle_id);
                }
            }
        }
        true
    }
}
