//! Signal controller dispatch
//!
//! Each intersection owns one controller. The policy is a closed enum so
//! adding a policy forces every match to handle it.

use rand::Rng;

use super::adaptive::AdaptiveController;
use super::config::{ControlPolicy, SimConfig};
use super::learning::LearningController;
use super::signal::TrafficLight;
use super::types::{Direction, Position};
use super::vehicle::SimVehicle;

/// Everything a controller may read during one tick
#[derive(Debug, Clone, Copy)]
pub struct SignalInput<'a> {
    /// Centre of the controlled intersection
    pub center: Position,
    /// All live vehicles
    pub vehicles: &'a [&'a SimVehicle],
    /// Vehicles within the intersection's influence radius
    pub nearby: &'a [&'a SimVehicle],
    /// Scaled simulated seconds since the previous tick
    pub delta_secs: f32,
    pub hour_of_day: f32,
}

/// The signal policy running at one intersection
#[derive(Debug, Clone)]
pub enum SignalController {
    Adaptive(AdaptiveController),
    Learning(LearningController),
}

impl SignalController {
    pub fn from_config(config: &SimConfig) -> Self {
        match config.policy {
            ControlPolicy::Adaptive => SignalController::Adaptive(AdaptiveController::new(config)),
            ControlPolicy::Learning => SignalController::Learning(LearningController::new(config)),
        }
    }

    pub fn policy(&self) -> ControlPolicy {
        match self {
            SignalController::Adaptive(_) => ControlPolicy::Adaptive,
            SignalController::Learning(_) => ControlPolicy::Learning,
        }
    }

    /// Run one controller tick against the intersection's lights
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        input: &SignalInput<'_>,
        lights: &mut [TrafficLight],
        rng: &mut R,
    ) {
        match self {
            SignalController::Adaptive(controller) => controller.update(input, lights, rng),
            SignalController::Learning(controller) => controller.update_lights(input, lights, rng),
        }
    }

    /// Direction held green for an emergency vehicle, if preempting
    pub fn emergency_direction(&self) -> Option<Direction> {
        match self {
            SignalController::Adaptive(controller) => controller.emergency_direction(),
            SignalController::Learning(controller) => controller.emergency_direction(),
        }
    }

    /// Drop any pending transitions, e.g. after lights were forced externally
    pub fn clear_pending(&mut self) {
        match self {
            SignalController::Adaptive(controller) => controller.clear_pending(),
            SignalController::Learning(controller) => controller.forget_last_step(),
        }
    }
}
