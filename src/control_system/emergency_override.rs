use chrono::{DateTime, Utc};

use crate::data_structures::{Axis, Intersection, LightState};
use crate::global_variables::{GREEN_LIGHT_SECS, OVERRIDE_MIN_DWELL_SECS, RED_LIGHT_SECS};

/// Outcome of an emergency override at one intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideAction {
    /// Lights were switched to give `Axis` the green.
    Forced(Axis),
    /// `Axis` already had the green; nothing was touched.
    Holding(Axis),
    /// The lights changed too recently to be switched again.
    Dwelling(Axis),
}

impl OverrideAction {
    pub fn axis(self) -> Axis {
        match self {
            OverrideAction::Forced(axis)
            | OverrideAction::Holding(axis)
            | OverrideAction::Dwelling(axis) => axis,
        }
    }
}

/// The axis an emergency vehicle is given: whichever carries more vehicles,
/// north-south on a tie.
pub fn override_axis(intersection: &Intersection) -> Axis {
    if intersection.traffic_on(Axis::EastWest) > intersection.traffic_on(Axis::NorthSouth) {
        Axis::EastWest
    } else {
        Axis::NorthSouth
    }
}

/// Forces the override axis green and the other red.
///
/// Skipped when the axis is already green, so `last_changed` is not reset
/// every tick, and until the lights have been stable for the minimum dwell.
pub fn apply_emergency_override(intersection: &mut Intersection, now: DateTime<Utc>) -> OverrideAction {
    let axis = override_axis(intersection);
    let lights = &mut intersection.lights;

    if lights.get(axis).state == LightState::Green {
        return OverrideAction::Holding(axis);
    }
    let since_change_ms = (now - lights.last_changed()).num_milliseconds();
    if since_change_ms <= OVERRIDE_MIN_DWELL_SECS * 1000 {
        return OverrideAction::Dwelling(axis);
    }

    lights
        .get_mut(axis)
        .transition(LightState::Green, GREEN_LIGHT_SECS, now);
    lights
        .get_mut(axis.opposite())
        .transition(LightState::Red, RED_LIGHT_SECS, now);
    OverrideAction::Forced(axis)
}
