//! Simulation configuration
//!
//! Every tunable constant of the engine lives here. Values loaded from a
//! file or the command line are clamped to their documented bounds by
//! [`SimConfig::sanitized`] rather than rejected.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::types::Topology;

/// Lower bound of the simulation speed multiplier
pub const MIN_SPEED_MULTIPLIER: f32 = 0.1;
/// Upper bound of the simulation speed multiplier
pub const MAX_SPEED_MULTIPLIER: f32 = 5.0;

/// Which signal policy the intersections run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ControlPolicy {
    /// Demand-weighted rule-based timing with emergency preemption
    Adaptive,
    /// Discretised-state Q-learning policy
    Learning,
}

/// A time-of-day window that stretches green durations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RushHourWindow {
    /// Inclusive start hour (0..24)
    pub start_hour: f32,
    /// Exclusive end hour (0..24)
    pub end_hour: f32,
    pub multiplier: f32,
}

impl RushHourWindow {
    pub fn contains(&self, hour: f32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }

    /// Multiplier of the first window containing `hour`, or 1.0 off-peak
    pub fn multiplier_at(windows: &[RushHourWindow], hour: f32) -> f32 {
        windows
            .iter()
            .find(|window| window.contains(hour))
            .map_or(1.0, |window| window.multiplier)
    }
}

/// Configuration for one simulation instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world_width: f32,
    pub world_height: f32,
    pub topology: Topology,
    pub policy: ControlPolicy,

    /// Maximum number of live vehicles
    pub max_vehicles: usize,
    /// Chance that an eligible spawn attempt produces a vehicle
    pub spawn_probability: f64,
    /// Share of spawned vehicles that are emergency vehicles
    pub emergency_probability: f64,
    /// Minimum real time between spawn attempts at 1x speed
    pub spawn_interval_ms: f64,
    /// Base vehicle speed in world units per simulated second
    pub vehicle_speed: f32,
    /// Vehicles further than this past the world bounds are culled
    pub exit_buffer: f32,

    /// Radius within which a red light stops a vehicle
    pub proximity_radius: f32,
    /// Radius within which the adaptive controller counts demand
    pub count_radius: f32,
    /// Radius within which vehicles belong to an intersection's view
    pub influence_radius: f32,

    pub min_green_time: f32,
    pub max_green_time: f32,
    pub yellow_duration: f32,
    /// Green time granted to a direction when the simulation starts
    pub initial_green_time: f32,
    pub emergency_green_time: f32,
    /// Upper bound of the random component added to green durations
    pub green_jitter: f32,
    /// Count lead another direction needs before the green yields early
    pub switch_margin: usize,
    pub rush_hours: Vec<RushHourWindow>,
    /// Hour of day at simulated time zero
    pub start_hour: f32,

    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    /// Vehicles per lane that count as full density
    pub lane_capacity: f32,
    /// Layer emergency preemption over the learning policy
    pub learning_emergency_override: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 1000.0,
            world_height: 700.0,
            topology: Topology::FourLane,
            policy: ControlPolicy::Adaptive,
            max_vehicles: 50,
            spawn_probability: 0.3,
            emergency_probability: 0.02,
            spawn_interval_ms: 1000.0,
            vehicle_speed: 60.0,
            exit_buffer: 50.0,
            proximity_radius: 30.0,
            count_radius: 100.0,
            influence_radius: 150.0,
            min_green_time: 10.0,
            max_green_time: 90.0,
            yellow_duration: 3.0,
            initial_green_time: 30.0,
            emergency_green_time: 15.0,
            green_jitter: 20.0,
            switch_margin: 3,
            rush_hours: vec![
                RushHourWindow {
                    start_hour: 7.0,
                    end_hour: 10.0,
                    multiplier: 1.3,
                },
                RushHourWindow {
                    start_hour: 16.0,
                    end_hour: 19.0,
                    multiplier: 1.5,
                },
            ],
            start_hour: 12.0,
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 0.3,
            lane_capacity: 10.0,
            learning_emergency_override: true,
        }
    }
}

impl SimConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SimConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config.sanitized())
    }

    /// Centre of the world, where the intersection sits
    pub fn center(&self) -> (f32, f32) {
        (self.world_width / 2.0, self.world_height / 2.0)
    }

    /// Multiplier applied to green durations at the given hour of day
    pub fn rush_hour_multiplier(&self, hour: f32) -> f32 {
        RushHourWindow::multiplier_at(&self.rush_hours, hour)
    }

    /// Clamp every value to its documented bounds
    pub fn sanitized(mut self) -> Self {
        self.world_width = clamp_logged("world_width", self.world_width, 100.0, 100_000.0);
        self.world_height = clamp_logged("world_height", self.world_height, 100.0, 100_000.0);
        self.spawn_probability =
            clamp_logged("spawn_probability", self.spawn_probability, 0.0, 1.0);
        self.emergency_probability =
            clamp_logged("emergency_probability", self.emergency_probability, 0.0, 1.0);
        self.spawn_interval_ms =
            clamp_logged("spawn_interval_ms", self.spawn_interval_ms, 0.0, 3_600_000.0);
        self.vehicle_speed = clamp_logged("vehicle_speed", self.vehicle_speed, 0.1, 10_000.0);
        self.exit_buffer = clamp_logged("exit_buffer", self.exit_buffer, 0.0, 10_000.0);
        self.proximity_radius =
            clamp_logged("proximity_radius", self.proximity_radius, 0.0, 10_000.0);
        self.count_radius = clamp_logged("count_radius", self.count_radius, 0.0, 10_000.0);
        self.influence_radius =
            clamp_logged("influence_radius", self.influence_radius, 0.0, 10_000.0);
        self.min_green_time = clamp_logged("min_green_time", self.min_green_time, 1.0, 600.0);
        self.max_green_time = clamp_logged(
            "max_green_time",
            self.max_green_time,
            self.min_green_time,
            3600.0,
        );
        self.yellow_duration = clamp_logged("yellow_duration", self.yellow_duration, 0.5, 60.0);
        self.initial_green_time =
            clamp_logged("initial_green_time", self.initial_green_time, 1.0, 3600.0);
        self.emergency_green_time =
            clamp_logged("emergency_green_time", self.emergency_green_time, 1.0, 600.0);
        self.green_jitter = clamp_logged("green_jitter", self.green_jitter, 0.0, 600.0);
        self.start_hour = self.start_hour.rem_euclid(24.0);
        self.learning_rate = clamp_logged("learning_rate", self.learning_rate, 0.0, 1.0);
        self.discount_factor = clamp_logged("discount_factor", self.discount_factor, 0.0, 1.0);
        self.exploration_rate = clamp_logged("exploration_rate", self.exploration_rate, 0.0, 1.0);
        self.lane_capacity = clamp_logged("lane_capacity", self.lane_capacity, 1.0, 1000.0);
        self
    }
}

/// Clamp a speed multiplier to [`MIN_SPEED_MULTIPLIER`], [`MAX_SPEED_MULTIPLIER`]
pub fn clamp_speed_multiplier(speed: f32) -> f32 {
    if speed.is_nan() {
        return 1.0;
    }
    speed.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER)
}

fn clamp_logged<T>(name: &str, value: T, min: T, max: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    // NaN compares false both ways and falls back to the minimum
    let clamped = if value > max {
        max
    } else if value >= min {
        value
    } else {
        min
    };
    if clamped != value {
        warn!("Config value {} = {} out of range, clamped to {}", name, value, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SimConfig::default();
        assert_eq!(config.max_vehicles, 50);
        assert_eq!(config.spawn_probability, 0.3);
        assert_eq!(config.emergency_green_time, 15.0);
        assert_eq!((config.min_green_time, config.max_green_time), (10.0, 90.0));
        assert_eq!(config.yellow_duration, 3.0);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.discount_factor, 0.95);
        assert_eq!(config.exploration_rate, 0.3);
        assert_eq!(config.proximity_radius, 30.0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = SimConfig {
            exploration_rate: 3.0,
            spawn_probability: -1.0,
            max_green_time: 2.0,
            start_hour: 26.0,
            ..SimConfig::default()
        }
        .sanitized();

        assert_eq!(config.exploration_rate, 1.0);
        assert_eq!(config.spawn_probability, 0.0);
        assert_eq!(config.max_green_time, config.min_green_time);
        assert_eq!(config.start_hour, 2.0);
    }

    #[test]
    fn speed_multiplier_is_clamped() {
        assert_eq!(clamp_speed_multiplier(0.0), MIN_SPEED_MULTIPLIER);
        assert_eq!(clamp_speed_multiplier(9.0), MAX_SPEED_MULTIPLIER);
        assert_eq!(clamp_speed_multiplier(2.5), 2.5);
        assert_eq!(clamp_speed_multiplier(f32::NAN), 1.0);
    }

    #[test]
    fn rush_hour_windows() {
        let config = SimConfig::default();
        assert_eq!(config.rush_hour_multiplier(8.5), 1.3);
        assert_eq!(config.rush_hour_multiplier(17.0), 1.5);
        assert_eq!(config.rush_hour_multiplier(12.0), 1.0);
        assert_eq!(config.rush_hour_multiplier(10.0), 1.0);
    }

    #[test]
    fn first_matching_window_wins() {
        let windows = [
            RushHourWindow {
                start_hour: 6.0,
                end_hour: 9.0,
                multiplier: 1.2,
            },
            RushHourWindow {
                start_hour: 8.0,
                end_hour: 11.0,
                multiplier: 1.8,
            },
        ];
        assert_eq!(RushHourWindow::multiplier_at(&windows, 8.5), 1.2);
        assert_eq!(RushHourWindow::multiplier_at(&windows, 9.0), 1.8);
        assert_eq!(RushHourWindow::multiplier_at(&windows, 11.0), 1.0);
        assert_eq!(RushHourWindow::multiplier_at(&[], 8.5), 1.0);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "topology": "2lane", "max_vehicles": 12 }"#).unwrap();
        assert_eq!(config.topology, Topology::TwoLane);
        assert_eq!(config.max_vehicles, 12);
        assert_eq!(config.yellow_duration, 3.0);
    }
}
