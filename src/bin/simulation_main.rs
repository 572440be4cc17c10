// simulation_main.rs
use chrono::Utc;
use clap::Parser;
use log::{error, info};
use smart_traffic::communication::{AmqpNotifier, LogNotifier, Notifier};
use smart_traffic::console::run_console;
use smart_traffic::global_variables::{
    AMQP_URL, STATIONARY_DWELL_SECS, TICK_PERIOD_MS, TRAVEL_DWELL_SECS,
};
use smart_traffic::simulation_engine::intersections::{create_intersections, load_seed_file};
use smart_traffic::storage::InMemoryStore;
use smart_traffic::{EngineConfig, TrafficEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "simulation_main", about = "Traffic light and emergency override simulation")]
struct Args {
    /// Milliseconds between simulation passes
    #[arg(long, default_value_t = TICK_PERIOD_MS)]
    tick_ms: u64,

    /// Seconds an emergency vehicle spends at each intersection on its path
    #[arg(long, default_value_t = TRAVEL_DWELL_SECS)]
    dwell_secs: u64,

    /// Seconds before clearing a vehicle with no destination
    #[arg(long, default_value_t = STATIONARY_DWELL_SECS)]
    stationary_dwell_secs: u64,

    /// Seed for the traffic model's random source
    #[arg(long)]
    rng_seed: Option<u64>,

    /// CSV file replacing the built-in intersections
    #[arg(long)]
    seed_file: Option<PathBuf>,

    /// Publish broadcasts to RabbitMQ instead of the log (bare flag uses the local broker)
    #[arg(long, num_args = 0..=1, default_missing_value = AMQP_URL)]
    amqp_url: Option<String>,
}

async fn run<N: Notifier>(store: Arc<InMemoryStore>, notifier: Arc<N>, config: EngineConfig) {
    let engine = TrafficEngine::new(store, notifier, config);
    engine.start_simulation().await;

    tokio::select! {
        _ = run_console(Arc::clone(&engine)) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            engine.stop_simulation();
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let now = Utc::now();
    let seed = match &args.seed_file {
        Some(path) => load_seed_file(path, now),
        None => create_intersections(now),
    };
    let intersections = match seed {
        Ok(intersections) => intersections,
        Err(e) => {
            error!("Could not build the intersection seed set: {}", e);
            std::process::exit(1);
        }
    };
    let count = intersections.len();
    let store = Arc::new(InMemoryStore::new());
    if let Err(e) = store.reset(intersections) {
        error!("Could not reset the store: {}", e);
        std::process::exit(1);
    }
    info!("Initial intersection data loaded ({} intersections).", count);

    let config = EngineConfig {
        tick_period: Duration::from_millis(args.tick_ms),
        travel_dwell: Duration::from_secs(args.dwell_secs),
        stationary_dwell: Duration::from_secs(args.stationary_dwell_secs),
        rng_seed: args.rng_seed,
    };

    match args.amqp_url.as_deref() {
        Some(url) => match AmqpNotifier::connect(url) {
            Ok(notifier) => run(store, Arc::new(notifier), config).await,
            Err(e) => {
                error!("RabbitMQ connection to {} failed: {}", url, e);
                std::process::exit(1);
            }
        },
        None => run(store, Arc::new(LogNotifier), config).await,
    }
}
