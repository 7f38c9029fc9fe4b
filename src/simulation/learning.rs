//! Q-learning signal policy
//!
//! The intersection is reduced to a coarse density level, and every tick
//! the controller picks one of three actions epsilon-greedily from a 3x3
//! value table. The table is updated with the previous tick's state and
//! action once the next state has been observed.

use std::fmt;

use log::trace;
use rand::Rng;

use super::config::SimConfig;
use super::controller::SignalInput;
use super::emergency::EmergencyPreemption;
use super::signal::{
    count_down, direction_in_state, first_in_rotation, light_for, next_direction, set_light,
    TrafficLight,
};
use super::types::{Direction, LightState, VehicleStatus, EXTEND_GREEN_SECS};

/// Densities above this are `Medium`
pub const MEDIUM_DENSITY: f32 = 0.3;
/// Densities above this are `High`
pub const HIGH_DENSITY: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DensityLevel {
    Low,
    Medium,
    High,
}

impl DensityLevel {
    pub const ALL: [DensityLevel; 3] = [DensityLevel::Low, DensityLevel::Medium, DensityLevel::High];

    pub fn classify(density: f32) -> Self {
        if density > HIGH_DENSITY {
            DensityLevel::High
        } else if density > MEDIUM_DENSITY {
            DensityLevel::Medium
        } else {
            DensityLevel::Low
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DensityLevel::Low => "low",
            DensityLevel::Medium => "medium",
            DensityLevel::High => "high",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalAction {
    /// Add a few seconds to the current green
    ExtendGreen,
    /// Advance the green/yellow/red cycle one step
    SwitchToNext,
    Maintain,
}

impl SignalAction {
    /// Declaration order, which is also the greedy tie-break order
    pub const ALL: [SignalAction; 3] = [
        SignalAction::ExtendGreen,
        SignalAction::SwitchToNext,
        SignalAction::Maintain,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Zero-initialised action values per density level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: [[f64; 3]; 3],
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, state: DensityLevel, action: SignalAction) -> f64 {
        self.values[state.index()][action.index()]
    }

    pub fn row(&self, state: DensityLevel) -> [f64; 3] {
        self.values[state.index()]
    }

    pub fn max_value(&self, state: DensityLevel) -> f64 {
        self.values[state.index()]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Highest valued action; the earliest action wins ties
    pub fn best_action(&self, state: DensityLevel) -> SignalAction {
        let mut best = SignalAction::ALL[0];
        for action in SignalAction::ALL.into_iter().skip(1) {
            if self.get(state, action) > self.get(state, best) {
                best = action;
            }
        }
        best
    }

    /// Bellman update of one entry
    pub fn learn(
        &mut self,
        state: DensityLevel,
        action: SignalAction,
        reward: f64,
        next_state: DensityLevel,
        learning_rate: f64,
        discount_factor: f64,
    ) {
        let old = self.get(state, action);
        let target = reward + discount_factor * self.max_value(next_state);
        self.values[state.index()][action.index()] = old + learning_rate * (target - old);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningSettings {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub lane_capacity: f32,
    pub min_green_time: f32,
    pub yellow_duration: f32,
    pub emergency_green_time: f32,
}

impl LearningSettings {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
            exploration_rate: config.exploration_rate,
            lane_capacity: config.lane_capacity,
            min_green_time: config.min_green_time,
            yellow_duration: config.yellow_duration,
            emergency_green_time: config.emergency_green_time,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LearningController {
    table: QTable,
    settings: LearningSettings,
    last: Option<(DensityLevel, SignalAction)>,
    /// Present when emergency preemption is layered over the policy
    emergency: Option<EmergencyPreemption>,
}

impl LearningController {
    pub fn new(config: &SimConfig) -> Self {
        let mut controller = Self::with_settings(LearningSettings::from_config(config));
        if config.learning_emergency_override {
            controller.emergency = Some(EmergencyPreemption::new());
        }
        controller
    }

    /// Plain policy without emergency override
    pub fn with_settings(settings: LearningSettings) -> Self {
        Self {
            table: QTable::new(),
            settings,
            last: None,
            emergency: None,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn last_step(&self) -> Option<(DensityLevel, SignalAction)> {
        self.last
    }

    pub fn emergency_direction(&self) -> Option<Direction> {
        self.emergency
            .as_ref()
            .and_then(EmergencyPreemption::active_direction)
    }

    /// Forget the previous state/action so the next tick does not learn from it
    pub fn forget_last_step(&mut self) {
        self.last = None;
    }

    /// Density level of the busiest direction in view
    pub fn observe_state(&self, input: &SignalInput<'_>) -> DensityLevel {
        let busiest = Direction::ROTATION
            .into_iter()
            .map(|direction| {
                input
                    .nearby
                    .iter()
                    .filter(|vehicle| vehicle.direction == direction)
                    .filter(|vehicle| vehicle.status != VehicleStatus::Exited)
                    .count()
            })
            .max()
            .unwrap_or(0);
        let capacity = self.settings.lane_capacity.max(1.0);
        DensityLevel::classify(busiest as f32 / capacity)
    }

    /// Negative total wait of the vehicles in view
    pub fn reward(input: &SignalInput<'_>) -> f64 {
        -input
            .nearby
            .iter()
            .map(|vehicle| f64::from(vehicle.wait_time))
            .sum::<f64>()
    }

    pub fn choose_action<R: Rng + ?Sized>(&self, state: DensityLevel, rng: &mut R) -> SignalAction {
        if rng.random::<f64>() < self.settings.exploration_rate {
            SignalAction::ALL[rng.random_range(0..SignalAction::ALL.len())]
        } else {
            self.table.best_action(state)
        }
    }

    /// Learn from the previous step, then choose and remember the next action
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        state: DensityLevel,
        reward: f64,
        rng: &mut R,
    ) -> SignalAction {
        if let Some((last_state, last_action)) = self.last {
            self.table.learn(
                last_state,
                last_action,
                reward,
                state,
                self.settings.learning_rate,
                self.settings.discount_factor,
            );
        }
        let action = self.choose_action(state, rng);
        self.last = Some((state, action));
        action
    }

    /// Run one controller tick
    pub fn update_lights<R: Rng + ?Sized>(
        &mut self,
        input: &SignalInput<'_>,
        lights: &mut [TrafficLight],
        rng: &mut R,
    ) {
        let green_time = self.settings.emergency_green_time;
        if let Some(emergency) = self.emergency.as_mut() {
            if emergency.evaluate(input, lights, green_time) {
                self.last = None;
                count_down(lights, input.delta_secs);
                return;
            }
        }

        self.complete_expired_yellow(lights);

        let state = self.observe_state(input);
        let reward = Self::reward(input);
        let action = self.step(state, reward, rng);
        trace!("Learning policy in {} state chose {:?}", state, action);
        self.apply_action(action, lights);

        count_down(lights, input.delta_secs);
    }

    pub fn apply_action(&self, action: SignalAction, lights: &mut [TrafficLight]) {
        match action {
            SignalAction::ExtendGreen => {
                if let Some(green) = direction_in_state(lights, LightState::Green) {
                    let timer = light_for(lights, green).map_or(0.0, |light| light.timer);
                    set_light(lights, green, LightState::Green, timer + EXTEND_GREEN_SECS);
                }
            }
            SignalAction::SwitchToNext => self.advance_cycle(lights),
            SignalAction::Maintain => {}
        }
    }

    /// Green goes yellow, yellow hands over to the next light, and an
    /// all-red set starts the rotation
    pub fn advance_cycle(&self, lights: &mut [TrafficLight]) {
        if let Some(green) = direction_in_state(lights, LightState::Green) {
            set_light(lights, green, LightState::Yellow, self.settings.yellow_duration);
        } else if let Some(yellow) = direction_in_state(lights, LightState::Yellow) {
            self.hand_over(lights, yellow);
        } else if let Some(first) = first_in_rotation(lights) {
            set_light(lights, first, LightState::Green, self.settings.min_green_time);
        }
    }

    fn complete_expired_yellow(&self, lights: &mut [TrafficLight]) {
        let expired = lights
            .iter()
            .find(|light| light.state == LightState::Yellow && light.timer <= 0.0)
            .map(|light| light.direction);
        if let Some(yellow) = expired {
            self.hand_over(lights, yellow);
        }
    }

    fn hand_over(&self, lights: &mut [TrafficLight], yellow: Direction) {
        let next = next_direction(lights, yellow);
        set_light(lights, yellow, LightState::Red, 0.0);
        set_light(lights, next, LightState::Green, self.settings.min_green_time);
    }
}
