// benches/bench_lane_update.rs
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

use smart_traffic::data_structures::Lane;
use smart_traffic::simulation_engine::lanes::{congestion_level, update_lanes};

// Alternating NS/EW lanes with spread-out starting figures.
fn create_lanes(num_lanes: usize) -> Vec<Lane> {
    (0..num_lanes)
        .map(|i| {
            let tag = if i % 2 == 0 { "NS" } else { "EW" };
            Lane::new(
                &format!("L{}_{}_IN", i, tag),
                (i % 40) as u32,
                10 + (i % 50) as u32,
            )
            .unwrap()
        })
        .collect()
}

fn bench_update_lanes(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_lanes");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in [2, 100, 1000].iter() {
        group.bench_function(format!("size_{}", size), |b| {
            let mut lanes = create_lanes(size);
            let mut rng = StdRng::seed_from_u64(7);
            b.iter(|| {
                update_lanes(&mut lanes, &mut rng);
                black_box(&lanes);
            });
        });
    }
    group.finish();
}

fn bench_congestion_level(c: &mut Criterion) {
    c.bench_function("congestion_level", |b| {
        b.iter(|| {
            for count in 0..40u32 {
                black_box(congestion_level(black_box(count), black_box(35)));
            }
        });
    });
}

criterion_group!(benches, bench_update_lanes, bench_congestion_level);
criterion_main!(benches);
