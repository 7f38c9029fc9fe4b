//! Adaptive rule-based signal controller
//!
//! The current green yields when its timer runs out or when another
//! approach builds up a clear lead in demand. Yielding goes through yellow
//! and a queued handover to the next direction in rotation. Green durations
//! scale with waiting vehicles and with rush hour.

use log::trace;
use rand::Rng;

use super::config::{RushHourWindow, SimConfig};
use super::controller::SignalInput;
use super::emergency::EmergencyPreemption;
use super::schedule::HandoverQueue;
use super::signal::{
    count_down, direction_in_state, first_in_rotation, light_for, next_direction, set_light,
    TrafficLight,
};
use super::types::{Direction, LightState, VehicleStatus};

/// Extra green seconds granted per waiting vehicle
pub const GREEN_PER_WAITING_VEHICLE: f32 = 2.0;
/// Cap on the waiting-vehicle bonus
pub const MAX_WAITING_BONUS: f32 = 30.0;

/// Timing parameters of the adaptive controller
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveSettings {
    pub min_green_time: f32,
    pub max_green_time: f32,
    pub yellow_duration: f32,
    pub emergency_green_time: f32,
    pub green_jitter: f32,
    pub switch_margin: usize,
    pub count_radius: f32,
    pub rush_hours: Vec<RushHourWindow>,
}

impl AdaptiveSettings {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            min_green_time: config.min_green_time,
            max_green_time: config.max_green_time,
            yellow_duration: config.yellow_duration,
            emergency_green_time: config.emergency_green_time,
            green_jitter: config.green_jitter,
            switch_margin: config.switch_margin,
            count_radius: config.count_radius,
            rush_hours: config.rush_hours.clone(),
        }
    }

    fn rush_hour_multiplier(&self, hour: f32) -> f32 {
        RushHourWindow::multiplier_at(&self.rush_hours, hour)
    }
}

/// Demand-driven controller with emergency preemption
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    settings: AdaptiveSettings,
    emergency: EmergencyPreemption,
    handovers: HandoverQueue,
    /// Controller clock in simulated seconds
    clock: f32,
}

impl AdaptiveController {
    pub fn new(config: &SimConfig) -> Self {
        Self::with_settings(AdaptiveSettings::from_config(config))
    }

    pub fn with_settings(settings: AdaptiveSettings) -> Self {
        Self {
            settings,
            emergency: EmergencyPreemption::new(),
            handovers: HandoverQueue::new(),
            clock: 0.0,
        }
    }

    pub fn settings(&self) -> &AdaptiveSettings {
        &self.settings
    }

    pub fn emergency_direction(&self) -> Option<Direction> {
        self.emergency.active_direction()
    }

    pub fn is_handover_pending(&self) -> bool {
        self.handovers.is_pending()
    }

    pub fn clear_pending(&mut self) {
        self.handovers.cancel_all();
    }

    /// Run one controller tick
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        input: &SignalInput<'_>,
        lights: &mut [TrafficLight],
        rng: &mut R,
    ) {
        self.clock += input.delta_secs;

        if self
            .emergency
            .evaluate(input, lights, self.settings.emergency_green_time)
        {
            self.handovers.cancel_all();
        } else {
            self.run_rotation(input, lights, rng);
        }

        count_down(lights, input.delta_secs);
    }

    fn run_rotation<R: Rng + ?Sized>(
        &mut self,
        input: &SignalInput<'_>,
        lights: &mut [TrafficLight],
        rng: &mut R,
    ) {
        while let Some(handover) = self.handovers.pop_due(self.clock) {
            set_light(lights, handover.from, LightState::Red, 0.0);
            let green_time = self.green_time(handover.to, input, rng);
            set_light(lights, handover.to, LightState::Green, green_time);
            trace!(
                "Handover {} -> {} with {:.1}s green",
                handover.from,
                handover.to,
                green_time
            );
        }

        if self.handovers.is_pending() {
            return;
        }

        let Some(current) = direction_in_state(lights, LightState::Green) else {
            self.restore_rotation(input, lights, rng);
            return;
        };

        let timer = light_for(lights, current).map_or(0.0, |light| light.timer);
        if timer <= 0.0 || self.should_switch(input, lights, current) {
            self.begin_switch(lights, current);
        }
    }

    /// Number of moving vehicles within the count radius in `direction`'s sector
    pub fn demand(&self, input: &SignalInput<'_>, direction: Direction) -> usize {
        input
            .vehicles
            .iter()
            .filter(|vehicle| vehicle.status == VehicleStatus::Moving)
            .filter(|vehicle| vehicle.position.distance(&input.center) <= self.settings.count_radius)
            .filter(|vehicle| {
                let (dx, dy) = vehicle.position.offset_from(&input.center);
                Direction::approach_sector(dx, dy) == direction
            })
            .count()
    }

    /// Whether another approach leads the current green by more than the margin
    pub fn should_switch(
        &self,
        input: &SignalInput<'_>,
        lights: &[TrafficLight],
        current: Direction,
    ) -> bool {
        let current_count = self.demand(input, current);
        let max_other = lights
            .iter()
            .filter(|light| light.direction != current)
            .map(|light| self.demand(input, light.direction))
            .max()
            .unwrap_or(0);
        max_other > current_count + self.settings.switch_margin
    }

    /// Green duration for a direction about to turn green
    pub fn green_time<R: Rng + ?Sized>(
        &self,
        direction: Direction,
        input: &SignalInput<'_>,
        rng: &mut R,
    ) -> f32 {
        let settings = &self.settings;
        let waiting = input
            .nearby
            .iter()
            .filter(|vehicle| vehicle.direction == direction)
            .filter(|vehicle| vehicle.status == VehicleStatus::Waiting)
            .count();

        let jitter = if settings.green_jitter > 0.0 {
            rng.random_range(0.0..settings.green_jitter)
        } else {
            0.0
        };
        let bonus = (waiting as f32 * GREEN_PER_WAITING_VEHICLE).min(MAX_WAITING_BONUS);
        let green = (settings.min_green_time + jitter + bonus)
            * settings.rush_hour_multiplier(input.hour_of_day);
        green.clamp(settings.min_green_time, settings.max_green_time)
    }

    fn begin_switch(&mut self, lights: &mut [TrafficLight], current: Direction) {
        let next = next_direction(lights, current);
        set_light(lights, current, LightState::Yellow, self.settings.yellow_duration);
        self.handovers
            .schedule(self.clock + self.settings.yellow_duration, current, next);
        trace!("{} yields to {}", current, next);
    }

    /// Recover a rotation with no green light and no queued handover
    fn restore_rotation<R: Rng + ?Sized>(
        &mut self,
        input: &SignalInput<'_>,
        lights: &mut [TrafficLight],
        rng: &mut R,
    ) {
        if let Some(yellow) = direction_in_state(lights, LightState::Yellow) {
            let remaining = light_for(lights, yellow).map_or(0.0, |light| light.timer);
            let next = next_direction(lights, yellow);
            self.handovers.schedule(self.clock + remaining, yellow, next);
            return;
        }

        let Some(first) = first_in_rotation(lights) else {
            return;
        };
        // Busiest approach wins, earlier rotation position breaks ties
        let mut best = (first, self.demand(input, first));
        for light in lights.iter() {
            let count = self.demand(input, light.direction);
            if count > best.1 {
                best = (light.direction, count);
            }
        }
        let green_time = self.green_time(best.0, input, rng);
        set_light(lights, best.0, LightState::Green, green_time);
    }
}
