// benches/bench_traffic_light_controller.rs
use chrono::{Duration as ChronoDuration, Utc};
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use std::time::Duration;

use smart_traffic::control_system::traffic_light_controller::{advance_cycle, control_lights};
use smart_traffic::data_structures::{
    Axis, EmergencyVehicle, EmergencyVehicleType, Intersection, Lane, LightPair, LightState,
    Location,
};

// Builds an intersection with `lanes_per_axis` inbound lanes on each axis.
fn create_intersection(lanes_per_axis: usize) -> Intersection {
    let now = Utc::now();
    let mut lanes = Vec::with_capacity(lanes_per_axis * 2);
    for i in 0..lanes_per_axis {
        lanes.push(Lane::new(&format!("X_NS_IN_{}", i), (i % 30) as u32, 25).unwrap());
        lanes.push(Lane::new(&format!("X_EW_IN_{}", i), (i % 20) as u32, 35).unwrap());
    }
    Intersection::new(
        "X",
        Location {
            latitude: 26.45,
            longitude: 80.33,
        },
        LightPair::with_green(Axis::EastWest, now - ChronoDuration::seconds(60)),
        lanes,
        now,
    )
}

fn bench_advance_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance_cycle");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    // Expired green, expired yellow, and a light still inside its duration.
    let cases = [
        ("green_expired", LightState::Green, 46),
        ("yellow_expired", LightState::Yellow, 6),
        ("steady", LightState::Green, 10),
    ];
    for (name, state, age_secs) in cases {
        group.bench_function(name, |b| {
            let now = Utc::now();
            let mut lights = LightPair::with_green(Axis::NorthSouth, now - ChronoDuration::seconds(age_secs));
            lights.north_south.state = state;
            b.iter(|| {
                let mut pair = lights.clone();
                black_box(advance_cycle(&mut pair, black_box(now)));
            });
        });
    }
    group.finish();
}

fn bench_emergency_override(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_lights_override");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));

    // Override cost grows with the number of lanes summed per axis.
    for &size in [2, 50, 200].iter() {
        group.bench_function(format!("lanes_{}", size), |b| {
            let intersection = create_intersection(size);
            let vehicle =
                EmergencyVehicle::dispatch(EmergencyVehicleType::Ambulance, "X", None, Utc::now());
            let now = Utc::now();
            b.iter(|| {
                let mut target = intersection.clone();
                black_box(control_lights(&mut target, Some(&vehicle), now));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_advance_cycle, bench_emergency_override);
criterion_main!(benches);
