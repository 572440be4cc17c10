use rand::Rng;

use crate::data_structures::Lane;
use crate::global_variables::{
    CONGESTION_SATURATION_COUNT, MAX_AVERAGE_SPEED, MAX_CONGESTION, MIN_AVERAGE_SPEED,
    SPEED_JITTER, VEHICLE_COUNT_JITTER,
};

/// Congestion score in `[0, 100]`: 30 queued vehicles saturate the count term,
/// and every km/h below 60 adds a point.
pub fn congestion_level(vehicle_count: u32, average_speed: u32) -> u32 {
    let count_term = vehicle_count as f64 / CONGESTION_SATURATION_COUNT * 100.0;
    let speed_term = MAX_AVERAGE_SPEED as f64 - average_speed as f64;
    (count_term + speed_term)
        .round()
        .clamp(0.0, MAX_CONGESTION as f64) as u32
}

/// Applies one tick of random traffic drift to a lane.
pub fn update_lane<R: Rng>(lane: &mut Lane, rng: &mut R) {
    let count_delta = rng.random_range(-VEHICLE_COUNT_JITTER..=VEHICLE_COUNT_JITTER);
    let speed_delta = rng.random_range(-SPEED_JITTER..=SPEED_JITTER);

    lane.vehicle_count = lane.vehicle_count.saturating_add_signed(count_delta as i32);
    lane.average_speed = (lane.average_speed as i64 + speed_delta)
        .clamp(MIN_AVERAGE_SPEED as i64, MAX_AVERAGE_SPEED as i64) as u32;
    lane.congestion_level = congestion_level(lane.vehicle_count, lane.average_speed);
}

pub fn update_lanes<R: Rng>(lanes: &mut [Lane], rng: &mut R) {
    for lane in lanes.iter_mut() {
        update_lane(lane, rng);
    }
}
