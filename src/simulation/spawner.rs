//! Vehicle spawning
//!
//! The spawner is rate limited in real (unscaled) time and gated by a
//! uniform draw, so at the default settings roughly one vehicle appears
//! every three seconds.

use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::config::SimConfig;
use super::types::{Direction, Position, VehicleClass, VehicleId, LANE_OFFSET};
use super::vehicle::SimVehicle;

/// How far outside the world bounds new vehicles are placed
pub const SPAWN_MARGIN: f32 = 20.0;

/// Rate-limited stochastic vehicle generator
#[derive(Debug, Clone, Default)]
pub struct VehicleSpawner {
    /// Real time of the last spawn attempt, in milliseconds
    last_attempt_ms: Option<f64>,
}

impl VehicleSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the last attempt so the next call is eligible immediately
    pub fn reset(&mut self) {
        self.last_attempt_ms = None;
    }

    /// Try to emit one vehicle.
    ///
    /// `allocate_id` is only called when a vehicle is actually produced, so
    /// ids are never burned on failed attempts.
    #[allow(clippy::too_many_arguments)]
    pub fn try_spawn<R: Rng + ?Sized>(
        &mut self,
        now_ms: f64,
        live_count: usize,
        is_running: bool,
        speed_multiplier: f32,
        config: &SimConfig,
        allocate_id: impl FnOnce() -> VehicleId,
        rng: &mut R,
    ) -> Option<SimVehicle> {
        if !is_running {
            return None;
        }

        let interval = config.spawn_interval_ms / f64::from(speed_multiplier.max(f32::EPSILON));
        if let Some(last) = self.last_attempt_ms {
            if now_ms - last < interval {
                return None;
            }
        }
        self.last_attempt_ms = Some(now_ms);

        if live_count >= config.max_vehicles {
            return None;
        }

        if rng.random::<f64>() >= config.spawn_probability {
            return None;
        }

        let direction = *config.topology.directions().choose(rng)?;
        let class = if rng.random_bool(config.emergency_probability.clamp(0.0, 1.0)) {
            VehicleClass::Emergency
        } else {
            *VehicleClass::REGULAR.choose(rng)?
        };

        let variation = config.topology.speed_variation();
        let speed = config.vehicle_speed * (1.0 + variation * (rng.random::<f32>() - 0.5));
        let position = entry_position(direction, config.world_width, config.world_height);

        let vehicle = SimVehicle::new(allocate_id(), position, speed, direction, class);
        debug!(
            "Spawned {} ({:?}) heading {} at ({:.1}, {:.1}), speed {:.1}",
            vehicle.id, class, direction, position.x, position.y, speed
        );
        Some(vehicle)
    }
}

/// Entry point just outside the world for traffic heading `direction`
pub fn entry_position(direction: Direction, width: f32, height: f32) -> Position {
    let lane_x = width / 2.0 + LANE_OFFSET;
    let lane_y = height / 2.0 + LANE_OFFSET;
    match direction {
        Direction::East => Position::new(-SPAWN_MARGIN, lane_y),
        Direction::West => Position::new(width + SPAWN_MARGIN, lane_y),
        Direction::South => Position::new(lane_x, -SPAWN_MARGIN),
        Direction::North => Position::new(lane_x, height + SPAWN_MARGIN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::{SimId, Topology};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn always_spawn() -> SimConfig {
        SimConfig {
            spawn_probability: 1.0,
            emergency_probability: 0.0,
            ..SimConfig::default()
        }
    }

    fn attempt(
        spawner: &mut VehicleSpawner,
        now_ms: f64,
        live: usize,
        config: &SimConfig,
        rng: &mut StdRng,
    ) -> Option<SimVehicle> {
        spawner.try_spawn(now_ms, live, true, 1.0, config, || VehicleId(SimId(7)), rng)
    }

    #[test]
    fn rate_limited_per_interval() {
        let config = always_spawn();
        let mut rng = StdRng::seed_from_u64(1);
        let mut spawner = VehicleSpawner::new();

        assert!(attempt(&mut spawner, 0.0, 0, &config, &mut rng).is_some());
        assert!(attempt(&mut spawner, 500.0, 1, &config, &mut rng).is_none());
        assert!(attempt(&mut spawner, 1000.0, 1, &config, &mut rng).is_some());
    }

    #[test]
    fn faster_simulation_spawns_more_often() {
        let config = always_spawn();
        let mut rng = StdRng::seed_from_u64(1);
        let mut spawner = VehicleSpawner::new();

        assert!(spawner
            .try_spawn(0.0, 0, true, 4.0, &config, || VehicleId(SimId(1)), &mut rng)
            .is_some());
        assert!(spawner
            .try_spawn(250.0, 1, true, 4.0, &config, || VehicleId(SimId(2)), &mut rng)
            .is_some());
    }

    #[test]
    fn respects_cap_and_running_flag() {
        let config = always_spawn();
        let mut rng = StdRng::seed_from_u64(2);
        let mut spawner = VehicleSpawner::new();

        assert!(attempt(&mut spawner, 0.0, 50, &config, &mut rng).is_none());
        assert!(spawner
            .try_spawn(5000.0, 0, false, 1.0, &config, || VehicleId(SimId(1)), &mut rng)
            .is_none());
    }

    #[test]
    fn zero_probability_never_spawns() {
        let config = SimConfig {
            spawn_probability: 0.0,
            ..SimConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut spawner = VehicleSpawner::new();
        for step in 0..100 {
            assert!(attempt(&mut spawner, step as f64 * 1000.0, 0, &config, &mut rng).is_none());
        }
    }

    #[test]
    fn two_lane_spawns_only_north_south_outside_bounds() {
        let config = SimConfig {
            topology: Topology::TwoLane,
            ..always_spawn()
        };
        let mut rng = StdRng::seed_from_u64(4);
        let mut spawner = VehicleSpawner::new();

        for step in 0..40 {
            let vehicle = attempt(&mut spawner, step as f64 * 1000.0, 0, &config, &mut rng)
                .expect("spawn probability is 1");
            assert!(matches!(vehicle.direction, Direction::North | Direction::South));
            assert!(vehicle.position.y < 0.0 || vehicle.position.y > config.world_height);
            assert_eq!(vehicle.position.x, config.world_width / 2.0 + LANE_OFFSET);
            assert!(vehicle.speed > 0.0);
        }
    }

    #[test]
    fn entry_is_opposite_travel_direction() {
        assert_eq!(entry_position(Direction::East, 1000.0, 700.0), Position::new(-20.0, 345.0));
        assert_eq!(entry_position(Direction::West, 1000.0, 700.0), Position::new(1020.0, 345.0));
        assert_eq!(entry_position(Direction::South, 1000.0, 700.0), Position::new(495.0, -20.0));
        assert_eq!(entry_position(Direction::North, 1000.0, 700.0), Position::new(495.0, 720.0));
    }
}
