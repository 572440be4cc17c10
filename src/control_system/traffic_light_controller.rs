use chrono::{DateTime, Utc};

use crate::data_structures::{Axis, EmergencyVehicle, Intersection, LightPair, LightState};
use crate::global_variables::{GREEN_LIGHT_SECS, RED_LIGHT_SECS, YELLOW_LIGHT_SECS};

use super::emergency_override::{apply_emergency_override, OverrideAction};

/// A normal-cycle change applied to an intersection's lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTransition {
    /// The axis ran out of green and is now showing yellow.
    GreenToYellow(Axis),
    /// `stopped` went red and `released` went green.
    YellowToRed { stopped: Axis, released: Axis },
}

/// What happened to an intersection's lights during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightDecision {
    Cycle(Option<CycleTransition>),
    Override {
        vehicle_id: String,
        action: OverrideAction,
    },
}

/// Advances the normal RED/GREEN/YELLOW cycle by at most one step.
///
/// Axes are checked north-south first; the first light whose state has run
/// past its duration transitions and the rest of the pair is left alone.
pub fn advance_cycle(lights: &mut LightPair, now: DateTime<Utc>) -> Option<CycleTransition> {
    let green_ms = GREEN_LIGHT_SECS as i64 * 1000;
    let yellow_ms = YELLOW_LIGHT_SECS as i64 * 1000;

    for axis in Axis::ALL {
        let light = lights.get(axis);
        let (state, elapsed) = (light.state, light.elapsed_ms(now));

        match state {
            LightState::Green if elapsed > green_ms => {
                lights
                    .get_mut(axis)
                    .transition(LightState::Yellow, YELLOW_LIGHT_SECS, now);
                return Some(CycleTransition::GreenToYellow(axis));
            }
            LightState::Yellow if elapsed > yellow_ms => {
                let released = axis.opposite();
                lights
                    .get_mut(axis)
                    .transition(LightState::Red, RED_LIGHT_SECS, now);
                lights
                    .get_mut(released)
                    .transition(LightState::Green, GREEN_LIGHT_SECS, now);
                return Some(CycleTransition::YellowToRed {
                    stopped: axis,
                    released,
                });
            }
            _ => {}
        }
    }
    None
}

/// Decides the lights for one intersection: an emergency override at this
/// intersection suppresses the normal cycle entirely.
pub fn control_lights(
    intersection: &mut Intersection,
    emergency: Option<&EmergencyVehicle>,
    now: DateTime<Utc>,
) -> LightDecision {
    match emergency.filter(|vehicle| vehicle.holds_override_at(&intersection.id)) {
        Some(vehicle) => LightDecision::Override {
            vehicle_id: vehicle.vehicle_id.clone(),
            action: apply_emergency_override(intersection, now),
        },
        None => LightDecision::Cycle(advance_cycle(&mut intersection.lights, now)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{EmergencyVehicleType, Lane, Location};
    use chrono::Duration;

    fn pair_aged(green_axis: Axis, state: LightState, age_secs: i64, now: DateTime<Utc>) -> LightPair {
        let mut lights = LightPair::with_green(green_axis, now - Duration::seconds(age_secs));
        lights.get_mut(green_axis).state = state;
        lights
    }

    #[test]
    fn green_past_duration_turns_yellow() {
        let now = Utc::now();
        let mut lights = pair_aged(Axis::NorthSouth, LightState::Green, 46, now);

        let transition = advance_cycle(&mut lights, now);

        assert_eq!(transition, Some(CycleTransition::GreenToYellow(Axis::NorthSouth)));
        assert_eq!(lights.north_south.state, LightState::Yellow);
        assert_eq!(lights.north_south.timer, YELLOW_LIGHT_SECS);
        assert_eq!(lights.north_south.last_changed, now);
        assert_eq!(lights.east_west.state, LightState::Red);
        assert_eq!(lights.east_west.last_changed, now - Duration::seconds(46));
    }

    #[test]
    fn yellow_past_duration_hands_over_to_opposite_axis() {
        let now = Utc::now();
        let mut lights = pair_aged(Axis::EastWest, LightState::Yellow, 6, now);

        let transition = advance_cycle(&mut lights, now);

        assert_eq!(
            transition,
            Some(CycleTransition::YellowToRed {
                stopped: Axis::EastWest,
                released: Axis::NorthSouth
            })
        );
        assert_eq!(lights.east_west.state, LightState::Red);
        assert_eq!(lights.north_south.state, LightState::Green);
        assert_eq!(lights.north_south.timer, GREEN_LIGHT_SECS);
        assert_eq!(lights.north_south.last_changed, now);
        assert_eq!(lights.east_west.last_changed, now);
    }

    #[test]
    fn lights_within_duration_are_left_alone() {
        let now = Utc::now();
        let mut green = pair_aged(Axis::NorthSouth, LightState::Green, 45, now);
        let mut yellow = pair_aged(Axis::EastWest, LightState::Yellow, 5, now);
        let (green_before, yellow_before) = (green.clone(), yellow.clone());

        assert_eq!(advance_cycle(&mut green, now), None);
        assert_eq!(advance_cycle(&mut yellow, now), None);
        assert_eq!(green, green_before);
        assert_eq!(yellow, yellow_before);
    }

    #[test]
    fn cycle_keeps_exactly_one_axis_active() {
        let start = Utc::now();
        let mut lights = LightPair::with_green(Axis::NorthSouth, start);
        let mut greens = Vec::new();

        // Ten simulated minutes at a 2 second tick.
        for step in 1..=300 {
            let now = start + Duration::seconds(step * 2);
            if let Some(CycleTransition::YellowToRed { released, .. }) = advance_cycle(&mut lights, now) {
                greens.push(released);
            }
            assert!(lights.is_consistent(), "inconsistent lights at step {}", step);
            assert!(
                !(lights.north_south.state == LightState::Green
                    && lights.east_west.state == LightState::Green)
            );
        }
        // A full green+yellow span is 52 seconds at this tick rate.
        assert!(greens.len() >= 10);
        assert!(greens.windows(2).all(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn override_vehicle_elsewhere_does_not_suppress_cycle() {
        let now = Utc::now();
        let mut intersection = Intersection::new(
            "A",
            Location {
                latitude: 0.0,
                longitude: 0.0,
            },
            pair_aged(Axis::NorthSouth, LightState::Green, 50, now),
            vec![Lane::new("A_EW_IN", 30, 20).unwrap()],
            now,
        );
        let vehicle = EmergencyVehicle::dispatch(EmergencyVehicleType::Ambulance, "B", None, now);

        let decision = control_lights(&mut intersection, Some(&vehicle), now);

        assert_eq!(
            decision,
            LightDecision::Cycle(Some(CycleTransition::GreenToYellow(Axis::NorthSouth)))
        );
    }
}
