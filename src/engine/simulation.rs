// simulation.rs
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::communication::Notifier;
use crate::control_system::emergency_scheduler::EmergencyScheduler;
use crate::control_system::traffic_light_controller::{control_lights, LightDecision};
use crate::data_structures::{EmergencyVehicle, EmergencyVehicleType, Intersection};
use crate::error::TrafficError;
use crate::simulation_engine::lanes::update_lanes;
use crate::storage::Store;

use super::config::EngineConfig;

/// Outcome of one simulation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub updated: usize,
    pub skipped: usize,
}

/// Handle on the running tick series. Dropping it tells the loop to stop
/// once the pass in flight, if any, has finished persisting.
struct Ticker {
    _shutdown: oneshot::Sender<()>,
    _handle: JoinHandle<()>,
}

/// Every start and stop bumps `epoch`; a start only installs its series if
/// nothing else touched the slot while its first pass was running.
#[derive(Default)]
struct TickerSlot {
    epoch: u64,
    ticker: Option<Ticker>,
}

impl TickerSlot {
    fn reset(&mut self) -> (u64, Option<Ticker>) {
        self.epoch += 1;
        (self.epoch, self.ticker.take())
    }
}

/// The simulation engine: owns the tick series and the emergency scheduler.
/// Built once per process and shared behind an `Arc`.
pub struct TrafficEngine<S: Store, N: Notifier> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: EngineConfig,
    rng: Mutex<StdRng>,
    ticker: Mutex<TickerSlot>,
    // Held for the whole of a pass so passes never overlap.
    pass_guard: AsyncMutex<()>,
    emergencies: EmergencyScheduler<S, N>,
}

impl<S: Store, N: Notifier> TrafficEngine<S, N> {
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: EngineConfig) -> Arc<Self> {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(store, notifier, config, rng)
    }

    pub fn with_rng(store: Arc<S>, notifier: Arc<N>, config: EngineConfig, rng: StdRng) -> Arc<Self> {
        config.validate();
        let emergencies = EmergencyScheduler::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            config.travel_dwell,
            config.stationary_dwell,
        );
        Arc::new(Self {
            store,
            notifier,
            config,
            rng: Mutex::new(rng),
            ticker: Mutex::new(TickerSlot::default()),
            pass_guard: AsyncMutex::new(()),
            emergencies,
        })
    }

    /// (Re)starts the simulation: any running series is cancelled, one pass
    /// runs immediately, then passes repeat every tick period.
    ///
    /// A stop or another start issued while the first pass is running wins;
    /// this call then returns without installing its series.
    pub async fn start_simulation(self: &Arc<Self>) {
        let (epoch, previous) = self.reset_ticker();
        if previous.is_some() {
            info!("Restarting traffic simulation...");
        } else {
            info!("Starting traffic simulation...");
        }
        drop(previous);

        self.tick().await;

        let mut slot = match self.ticker.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.epoch != epoch {
            info!("Simulation start superseded before its first tick completed");
            return;
        }
        slot.ticker = Some(self.spawn_ticker());
    }

    fn spawn_ticker(self: &Arc<Self>) -> Ticker {
        let period = self.config.tick_period.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let engine: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {}
                }
                match engine.upgrade() {
                    Some(engine) => {
                        engine.tick().await;
                    }
                    None => break,
                }
            }
            debug!("Tick loop exited");
        });

        Ticker {
            _shutdown: shutdown_tx,
            _handle: handle,
        }
    }

    /// Stops the tick series, including one a concurrent start is about to
    /// install. Pending emergency lifecycles keep running.
    pub fn stop_simulation(&self) {
        let (_, previous) = self.reset_ticker();
        if previous.is_some() {
            info!("Stopping traffic simulation...");
        } else {
            debug!("Stop requested but simulation is not running");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .map(|slot| slot.ticker.is_some())
            .unwrap_or(false)
    }

    fn reset_ticker(&self) -> (u64, Option<Ticker>) {
        let mut slot = match self.ticker.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.reset()
    }

    pub async fn trigger_emergency(
        &self,
        vehicle_type: EmergencyVehicleType,
        start: &str,
        destination: Option<&str>,
    ) -> Result<EmergencyVehicle, TrafficError> {
        self.emergencies.trigger(vehicle_type, start, destination).await
    }

    pub async fn clear_emergencies(&self) -> Result<(), TrafficError> {
        self.emergencies.clear_all().await
    }

    pub async fn active_vehicle_id(&self) -> Option<String> {
        self.emergencies.active_vehicle_id().await
    }

    /// Current state of every intersection, as the store holds it.
    pub async fn intersections(&self) -> Result<Vec<Intersection>, TrafficError> {
        self.store.load_intersections().await
    }

    /// Runs one simulation pass over all intersections.
    ///
    /// Lanes are updated here, in store order, so a seeded engine produces the
    /// same traffic every run; the light decision and the save for each
    /// intersection then run concurrently.
    pub async fn tick(&self) -> TickReport {
        let _pass = self.pass_guard.lock().await;
        let now = Utc::now();
        let mut report = TickReport::default();

        let intersections = match self.store.load_intersections().await {
            Ok(intersections) => intersections,
            Err(e) => {
                error!("Tick skipped, could not load intersections: {}", e);
                return report;
            }
        };
        debug!("Tick: found {} intersections", intersections.len());

        let mut pass = JoinSet::new();
        {
            let mut rng = match self.rng.lock() {
                Ok(rng) => rng,
                Err(poisoned) => poisoned.into_inner(),
            };
            for mut intersection in intersections {
                update_lanes(&mut intersection.lanes, &mut *rng);
                pass.spawn(process_intersection(
                    Arc::clone(&self.store),
                    Arc::clone(&self.notifier),
                    intersection,
                    now,
                ));
            }
        }

        while let Some(joined) = pass.join_next().await {
            match joined {
                Ok(Ok(_)) => report.updated += 1,
                Ok(Err((id, e))) => {
                    warn!("Intersection {} skipped this tick: {}", id, e);
                    report.skipped += 1;
                }
                Err(e) => {
                    error!("Intersection task failed: {}", e);
                    report.skipped += 1;
                }
            }
        }
        report
    }
}

/// Decides the lights for one intersection, persists it, and broadcasts the
/// stored record. The override lookup always precedes the normal cycle.
async fn process_intersection<S: Store, N: Notifier>(
    store: Arc<S>,
    notifier: Arc<N>,
    mut intersection: Intersection,
    now: DateTime<Utc>,
) -> Result<Intersection, (String, TrafficError)> {
    let id = intersection.id.clone();
    let emergency = store
        .find_active_override(&id)
        .await
        .map_err(|e| (id.clone(), e))?;

    match control_lights(&mut intersection, emergency.as_ref(), now) {
        LightDecision::Override { vehicle_id, action } => {
            info!(
                "[Override] Intersection {}: {:?} for emergency vehicle {}",
                id, action, vehicle_id
            );
        }
        LightDecision::Cycle(Some(transition)) => {
            info!("Intersection {}: {:?}", id, transition);
        }
        LightDecision::Cycle(None) => {}
    }
    intersection.last_updated = now;

    let saved = store
        .save_intersection(intersection)
        .await
        .map_err(|e| (id.clone(), e))?;
    debug!("Emitting traffic_update for intersection {}", saved.id);
    notifier.emit_update(&saved);
    Ok(saved)
}
