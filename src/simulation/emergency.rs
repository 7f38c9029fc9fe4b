//! Emergency vehicle preemption
//!
//! Shared by both signal policies. While an emergency vehicle approaches an
//! intersection, the light governing its approach is held green and every
//! other light red. The check runs every tick, so preemption ends as soon as
//! the vehicle crosses the centre or leaves the influence radius.
//!
//! Vehicles drive straight along their lane, so an approaching vehicle's
//! bearing sector is its heading. The heading is used directly: within the
//! lane offset of the centre the bearing flips to a neighbouring sector and
//! would hold the wrong light green.
//!
//! Lights are keyed by travel direction: a vehicle approaching from the
//! south drives north, so the light that turns green is `North`.

use log::{debug, info};

use super::controller::SignalInput;
use super::signal::{grant_exclusive_green, has_light, TrafficLight};
use super::types::{Direction, VehicleStatus};

/// Per-intersection emergency state
#[derive(Debug, Clone, Default)]
pub struct EmergencyPreemption {
    active: Option<Direction>,
}

impl EmergencyPreemption {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direction currently being held green for an emergency vehicle
    pub fn active_direction(&self) -> Option<Direction> {
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Direction an approaching emergency vehicle needs, if any.
    ///
    /// Only vehicles that have not yet crossed the centre count, and only
    /// directions the intersection actually has a light for.
    pub fn detect(input: &SignalInput<'_>, lights: &[TrafficLight]) -> Option<Direction> {
        input
            .nearby
            .iter()
            .filter(|vehicle| vehicle.is_emergency() && vehicle.status != VehicleStatus::Exited)
            .filter(|vehicle| !vehicle.has_crossed(&input.center))
            .map(|vehicle| vehicle.direction)
            .find(|direction| has_light(lights, *direction))
    }

    /// Evaluate preemption for this tick. Returns true when preempting, in
    /// which case the lights have already been forced. A yellow approach is
    /// taken to red first and turns green on the following tick.
    pub fn evaluate(
        &mut self,
        input: &SignalInput<'_>,
        lights: &mut [TrafficLight],
        green_time: f32,
    ) -> bool {
        match Self::detect(input, lights) {
            Some(direction) => {
                if self.active != Some(direction) {
                    info!("Emergency preemption: holding {} green", direction);
                }
                self.active = Some(direction);
                if !grant_exclusive_green(lights, direction, green_time) {
                    debug!("Emergency preemption: {} yellow goes red first", direction);
                }
                true
            }
            None => {
                if let Some(direction) = self.active.take() {
                    info!(
                        "Emergency cleared ({}), resuming normal rotation",
                        direction
                    );
                }
                false
            }
        }
    }
}
