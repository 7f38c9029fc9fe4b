//! Traffic lights and helpers over an intersection's light set
//!
//! Controllers never hold lights themselves; they mutate the slice owned by
//! the intersection through these helpers.

use super::types::{Direction, LightState, Position};

/// One traffic light governing a single direction of travel
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficLight {
    /// Direction keyed identifier, e.g. `north`
    pub id: String,
    pub state: LightState,
    /// Seconds remaining in the current state, never negative
    pub timer: f32,
    pub direction: Direction,
    /// Render position only
    pub position: Position,
}

impl TrafficLight {
    pub fn new(direction: Direction, state: LightState, timer: f32, position: Position) -> Self {
        Self {
            id: direction.as_str().to_string(),
            state,
            timer: timer.max(0.0),
            direction,
            position,
        }
    }

    pub fn is_green(&self) -> bool {
        self.state == LightState::Green
    }

    fn set(&mut self, state: LightState, timer: f32) {
        self.state = state;
        self.timer = timer.max(0.0);
    }
}

/// Set the light for `direction`, if present. Returns whether it exists.
pub fn set_light(
    lights: &mut [TrafficLight],
    direction: Direction,
    state: LightState,
    timer: f32,
) -> bool {
    match lights.iter_mut().find(|light| light.direction == direction) {
        Some(light) => {
            light.set(state, timer);
            true
        }
        None => false,
    }
}

/// Make `direction` the only green light; everything else goes red.
///
/// A yellow light only ever leaves yellow through red, so a yellow target
/// goes red along with the rest and is granted on the next call. Returns
/// whether `direction` is green afterwards.
pub fn grant_exclusive_green(
    lights: &mut [TrafficLight],
    direction: Direction,
    timer: f32,
) -> bool {
    let target_yellow = lights
        .iter()
        .any(|light| light.direction == direction && light.state == LightState::Yellow);
    let mut granted = false;
    for light in lights.iter_mut() {
        if light.direction == direction && !target_yellow {
            light.set(LightState::Green, timer);
            granted = true;
        } else {
            light.set(LightState::Red, 0.0);
        }
    }
    granted
}

pub fn light_for(lights: &[TrafficLight], direction: Direction) -> Option<&TrafficLight> {
    lights.iter().find(|light| light.direction == direction)
}

pub fn has_light(lights: &[TrafficLight], direction: Direction) -> bool {
    light_for(lights, direction).is_some()
}

/// Direction of the first light in the given state
pub fn direction_in_state(lights: &[TrafficLight], state: LightState) -> Option<Direction> {
    lights
        .iter()
        .find(|light| light.state == state)
        .map(|light| light.direction)
}

pub fn green_count(lights: &[TrafficLight]) -> usize {
    lights.iter().filter(|light| light.is_green()).count()
}

/// Next direction after `current` in rotation order that has a light.
/// Falls back to `current` when it is the only light.
pub fn next_direction(lights: &[TrafficLight], current: Direction) -> Direction {
    let mut candidate = current.next_in_rotation();
    while candidate != current {
        if has_light(lights, candidate) {
            return candidate;
        }
        candidate = candidate.next_in_rotation();
    }
    current
}

/// First direction in rotation order that has a light
pub fn first_in_rotation(lights: &[TrafficLight]) -> Option<Direction> {
    Direction::ROTATION
        .into_iter()
        .find(|direction| has_light(lights, *direction))
}

/// Count green and yellow timers down by `delta_secs`, clamped at zero
pub fn count_down(lights: &mut [TrafficLight], delta_secs: f32) {
    for light in lights.iter_mut() {
        if matches!(light.state, LightState::Green | LightState::Yellow) {
            light.timer = (light.timer - delta_secs).max(0.0);
        }
    }
}

/// Build the light set for an intersection centred at `center`
pub fn build_lights(
    center: Position,
    directions: &[Direction],
    initial_green: Direction,
    initial_green_time: f32,
) -> Vec<TrafficLight> {
    directions
        .iter()
        .map(|&direction| {
            // Lights sit on the approach side of the direction they govern
            let position = center.translate(direction.opposite(), super::types::LIGHT_OFFSET);
            if direction == initial_green {
                TrafficLight::new(direction, LightState::Green, initial_green_time, position)
            } else {
                TrafficLight::new(direction, LightState::Red, 0.0, position)
            }
        })
        .collect()
}
