use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::communication::Notifier;
use crate::data_structures::{EmergencyVehicleType, LightState};
use crate::engine::TrafficEngine;
use crate::storage::Store;

/// Operator commands, one per line on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Trigger {
        vehicle_type: EmergencyVehicleType,
        start: String,
        destination: Option<String>,
    },
    Clear,
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or("").to_ascii_lowercase();
    match verb.as_str() {
        "start" => Ok(Command::Start),
        "stop" => Ok(Command::Stop),
        "trigger" => {
            let vehicle_type = words
                .next()
                .ok_or("usage: trigger <Ambulance|FireTruck|PoliceCar> <start> [destination]")?
                .parse()?;
            let start = words.next().ok_or("trigger needs a start intersection")?;
            Ok(Command::Trigger {
                vehicle_type,
                start: start.to_string(),
                destination: words.next().map(str::to_string),
            })
        }
        "clear" => Ok(Command::Clear),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command `{}`", other)),
    }
}

fn print_help() {
    println!("\nTraffic Engine Console");
    println!("  start                                  start or restart the simulation");
    println!("  stop                                   pause the simulation");
    println!("  trigger <type> <start> [destination]   dispatch an emergency vehicle");
    println!("  clear                                  clear all emergency vehicles");
    println!("  status                                 show every intersection");
    println!("  quit                                   stop and exit");
}

fn light_symbol(state: LightState) -> &'static str {
    match state {
        LightState::Green => "GREEN ",
        LightState::Yellow => "YELLOW",
        LightState::Red => "RED   ",
    }
}

async fn print_status<S: Store, N: Notifier>(engine: &TrafficEngine<S, N>) {
    println!(
        "Simulation {}",
        if engine.is_running() { "running" } else { "stopped" }
    );
    match engine.active_vehicle_id().await {
        Some(id) => println!("Active emergency vehicle: {}", id),
        None => println!("No active emergency vehicle"),
    }
    match engine.intersections().await {
        Ok(intersections) => {
            for intersection in intersections {
                println!(
                    "Intersection {}: NS {} | EW {}",
                    intersection.id,
                    light_symbol(intersection.lights.north_south.state),
                    light_symbol(intersection.lights.east_west.state)
                );
                for lane in &intersection.lanes {
                    println!(
                        "    {:<10} vehicles {:>3}  speed {:>2}  congestion {:>3}",
                        lane.id, lane.vehicle_count, lane.average_speed, lane.congestion_level
                    );
                }
            }
        }
        Err(e) => eprintln!("Error reading intersections: {}", e),
    }
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run_console<S: Store, N: Notifier>(engine: std::sync::Arc<TrafficEngine<S, N>>) {
    print_help();
    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Start) => engine.start_simulation().await,
            Ok(Command::Stop) => engine.stop_simulation(),
            Ok(Command::Trigger {
                vehicle_type,
                start,
                destination,
            }) => match engine
                .trigger_emergency(vehicle_type, &start, destination.as_deref())
                .await
            {
                Ok(vehicle) => println!("Emergency vehicle {} triggered", vehicle.vehicle_id),
                Err(e) => eprintln!("Error triggering emergency: {}", e),
            },
            Ok(Command::Clear) => {
                if let Err(e) = engine.clear_emergencies().await {
                    eprintln!("Error clearing emergencies: {}", e);
                }
            }
            Ok(Command::Status) => print_status(&engine).await,
            Ok(Command::Help) => print_help(),
            Ok(Command::Quit) => {
                println!("Exiting console.");
                break;
            }
            Err(e) => println!("{}. Type `help` for commands.", e),
        }
    }
    engine.stop_simulation();
}
