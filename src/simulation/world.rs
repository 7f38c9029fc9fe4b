//! Main simulation world that ties everything together
//!
//! Owns the vehicles, the intersections and the RNG. Each call to
//! [`SimWorld::tick`] runs one step: spawn, move vehicles, run the signal
//! controllers, cull vehicles that left the world, recompute metrics.

use log::{debug, info};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use super::config::{clamp_speed_multiplier, ControlPolicy, SimConfig};
use super::frame::SimulationFrame;
use super::intersection::SimIntersection;
use super::metrics::SimulationMetrics;
use super::spawner::{entry_position, VehicleSpawner};
use super::types::{
    Direction, IntersectionId, LightState, Position, SimId, Topology, VehicleClass, VehicleId,
    VehicleStatus,
};
use super::vehicle::{may_advance, SimVehicle};

/// Width of the ASCII map in characters
const MAP_COLS: usize = 60;
/// Height of the ASCII map in characters
const MAP_ROWS: usize = 24;

/// The main simulation world
pub struct SimWorld {
    pub config: SimConfig,

    /// All intersections, the first one sits at the world centre
    pub intersections: Vec<SimIntersection>,

    /// Live vehicles, ordered by id
    pub vehicles: BTreeMap<VehicleId, SimVehicle>,

    pub metrics: SimulationMetrics,

    /// Simulated seconds since start or reset
    pub time: f32,

    is_running: bool,
    speed_multiplier: f32,
    spawner: VehicleSpawner,

    /// Unscaled milliseconds fed to tick, drives the spawn rate limit
    real_elapsed_ms: f64,

    /// Next ID to assign
    next_id: usize,

    rng: StdRng,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig, rng: StdRng) -> Self {
        let mut world = Self {
            config: config.sanitized(),
            intersections: Vec::new(),
            vehicles: BTreeMap::new(),
            metrics: SimulationMetrics::new(),
            time: 0.0,
            is_running: true,
            speed_multiplier: 1.0,
            spawner: VehicleSpawner::new(),
            real_elapsed_ms: 0.0,
            next_id: 0,
            rng,
        };
        world.build_intersections();
        world
    }

    pub fn new(config: SimConfig) -> Self {
        Self::new_internal(config, StdRng::from_os_rng())
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(config: SimConfig, seed: u64) -> Self {
        Self::new_internal(config, StdRng::seed_from_u64(seed))
    }

    /// Quiet, seeded world with its centre at (500, 750) and no random spawns
    pub fn create_test_world() -> Self {
        let config = SimConfig {
            world_width: 1000.0,
            world_height: 1500.0,
            spawn_probability: 0.0,
            ..SimConfig::default()
        };
        Self::new_with_seed(config, 0)
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    fn build_intersections(&mut self) {
        let (x, y) = self.config.center();
        let id = IntersectionId(self.next_sim_id());
        self.intersections = vec![SimIntersection::new(id, Position::new(x, y), &self.config)];
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn set_running(&mut self, running: bool) {
        if self.is_running != running {
            info!("Simulation {}", if running { "resumed" } else { "paused" });
        }
        self.is_running = running;
    }

    pub fn toggle_running(&mut self) {
        self.set_running(!self.is_running);
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Set the simulation speed, clamped to the supported range
    pub fn set_speed(&mut self, multiplier: f32) {
        self.speed_multiplier = clamp_speed_multiplier(multiplier);
    }

    /// Switch between two- and four-lane layouts; resets the world
    pub fn set_topology(&mut self, topology: Topology) {
        self.config.topology = topology;
        self.reset();
    }

    /// Swap the signal policy at every intersection; resets the world
    pub fn set_policy(&mut self, policy: ControlPolicy) {
        self.config.policy = policy;
        self.reset();
    }

    /// Clear vehicles, metrics and clocks and rebuild the intersections
    pub fn reset(&mut self) {
        self.vehicles.clear();
        self.metrics = SimulationMetrics::new();
        self.time = 0.0;
        self.real_elapsed_ms = 0.0;
        self.next_id = 0;
        self.spawner.reset();
        self.build_intersections();
        info!(
            "Simulation reset ({:?} layout, {:?} policy)",
            self.config.topology, self.config.policy
        );
    }

    /// Hour of day on the simulated clock
    pub fn hour_of_day(&self) -> f32 {
        (self.config.start_hour + self.time / 3600.0).rem_euclid(24.0)
    }

    /// The intersection at the world centre
    pub fn intersection(&self) -> Option<&SimIntersection> {
        self.intersections.first()
    }

    /// State of the centre intersection's light for `direction`
    pub fn light_state(&self, direction: Direction) -> Option<LightState> {
        self.intersection()
            .and_then(|intersection| intersection.light_state(direction))
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&SimVehicle> {
        self.vehicles.get(&id)
    }

    /// Add a vehicle at an explicit position, bypassing the spawner
    pub fn add_vehicle(
        &mut self,
        position: Position,
        speed: f32,
        direction: Direction,
        class: VehicleClass,
    ) -> VehicleId {
        let id = VehicleId(self.next_sim_id());
        self.insert_vehicle(SimVehicle::new(id, position, speed, direction, class));
        id
    }

    /// Add a vehicle at the world edge it would normally enter from
    pub fn inject_vehicle(&mut self, direction: Direction, class: VehicleClass) -> VehicleId {
        let position = entry_position(direction, self.config.world_width, self.config.world_height);
        self.add_vehicle(position, self.config.vehicle_speed, direction, class)
    }

    pub fn spawn_emergency(&mut self, direction: Direction) -> VehicleId {
        self.inject_vehicle(direction, VehicleClass::Emergency)
    }

    fn insert_vehicle(&mut self, vehicle: SimVehicle) {
        self.metrics.record_spawn();
        self.vehicles.insert(vehicle.id, vehicle);
    }

    /// Advance the simulation by `delta_secs` of wall time
    pub fn tick(&mut self, delta_secs: f32) {
        if !self.is_running {
            return;
        }

        let real_delta = if delta_secs.is_finite() && delta_secs > 0.0 {
            delta_secs
        } else {
            0.0
        };
        let delta = real_delta * self.speed_multiplier;
        self.real_elapsed_ms += f64::from(real_delta) * 1000.0;
        self.time += delta;

        self.spawn_vehicles();
        self.update_vehicles(delta);
        self.update_intersections(delta);
        self.cull_vehicles();

        self.metrics.recompute(self.vehicles.values(), self.time);
    }

    fn spawn_vehicles(&mut self) {
        let next_id = &mut self.next_id;
        let spawned = self.spawner.try_spawn(
            self.real_elapsed_ms,
            self.vehicles.len(),
            self.is_running,
            self.speed_multiplier,
            &self.config,
            || {
                let id = VehicleId(SimId(*next_id));
                *next_id += 1;
                id
            },
            &mut self.rng,
        );
        if let Some(vehicle) = spawned {
            self.insert_vehicle(vehicle);
        }
    }

    fn update_vehicles(&mut self, delta_secs: f32) {
        let proximity = self.config.proximity_radius;
        for vehicle in self.vehicles.values_mut() {
            let may = match nearest_intersection(&self.intersections, &vehicle.position) {
                Some(intersection) => may_advance(
                    vehicle,
                    &intersection.position,
                    intersection.light_state(vehicle.direction),
                    proximity,
                ),
                None => true,
            };
            vehicle.advance(may, delta_secs);
        }
    }

    fn update_intersections(&mut self, delta_secs: f32) {
        let hour = self.hour_of_day();
        let vehicles: Vec<&SimVehicle> = self.vehicles.values().collect();
        for intersection in self.intersections.iter_mut() {
            intersection.update_signals(&vehicles, delta_secs, hour, &mut self.rng);
        }
    }

    /// Remove vehicles past the world edge and return them marked exited
    fn cull_vehicles(&mut self) -> Vec<SimVehicle> {
        let width = self.config.world_width;
        let height = self.config.world_height;
        let buffer = self.config.exit_buffer;
        let leaving: Vec<VehicleId> = self
            .vehicles
            .iter()
            .filter(|(_, vehicle)| vehicle.is_outside(width, height, buffer))
            .map(|(id, _)| *id)
            .collect();

        let mut exited = Vec::with_capacity(leaving.len());
        for id in leaving {
            if let Some(mut vehicle) = self.vehicles.remove(&id) {
                vehicle.status = VehicleStatus::Exited;
                self.metrics.record_exit(vehicle.wait_time);
                debug!("{} exited after waiting {:.1}s", id, vehicle.wait_time);
                exited.push(vehicle);
            }
        }
        exited
    }

    /// Read-only frame for external sinks
    pub fn snapshot(&self) -> SimulationFrame {
        SimulationFrame::capture(
            self.vehicles.values(),
            self.intersections
                .iter()
                .flat_map(|intersection| intersection.lights.iter()),
            &self.metrics,
            self.time,
        )
    }

    /// Print a summary of the simulation state
    pub fn print_summary(&self) {
        println!("=== Signal Simulation Summary ===");
        println!(
            "Time: {:.2}s (hour {:.2}), speed x{:.1}, {}",
            self.time,
            self.hour_of_day(),
            self.speed_multiplier,
            if self.is_running { "running" } else { "paused" }
        );
        println!(
            "Layout: {:?}, policy: {:?}",
            self.config.topology, self.config.policy
        );
        println!(
            "Vehicles: {} live, {} spawned, {} exited",
            self.metrics.vehicle_count, self.metrics.total_vehicles, self.metrics.vehicles_exited
        );
        println!(
            "Wait: average {:.2}s (live), total {:.2}s (exited), throughput {:.1}/min",
            self.metrics.average_wait_time,
            self.metrics.total_wait_time,
            self.metrics.throughput_per_minute
        );
        println!();

        println!("--- Intersections ---");
        for intersection in &self.intersections {
            let lights: Vec<String> = intersection
                .lights
                .iter()
                .map(|light| format!("{}={:?}({:.1}s)", light.direction, light.state, light.timer))
                .collect();
            println!(
                "  {} [{:?}]: {}, {} in view",
                intersection.id,
                intersection.controller.policy(),
                lights.join(" "),
                intersection.vehicles.len()
            );
            if let Some(direction) = intersection.emergency_direction() {
                println!("    emergency preemption holding {} green", direction);
            }
        }

        if !self.vehicles.is_empty() {
            println!("--- Active Vehicles ---");
            for vehicle in self.vehicles.values() {
                println!(
                    "  {} {:?} heading {}: ({:.1}, {:.1}), {:?}, waited {:.1}s",
                    vehicle.id,
                    vehicle.class,
                    vehicle.direction,
                    vehicle.position.x,
                    vehicle.position.y,
                    vehicle.status,
                    vehicle.wait_time
                );
            }
        }
    }

    /// Render the world as ASCII art
    pub fn render_map(&self) -> String {
        let mut grid = vec![vec![' '; MAP_COLS]; MAP_ROWS];
        let world_width = self.config.world_width;
        let world_height = self.config.world_height;

        let to_grid = |position: &Position| -> Option<(usize, usize)> {
            if position.x < 0.0
                || position.y < 0.0
                || position.x >= world_width
                || position.y >= world_height
            {
                return None;
            }
            let col = (position.x / world_width * MAP_COLS as f32) as usize;
            let row = (position.y / world_height * MAP_ROWS as f32) as usize;
            Some((row.min(MAP_ROWS - 1), col.min(MAP_COLS - 1)))
        };

        for intersection in &self.intersections {
            let Some((center_row, center_col)) = to_grid(&intersection.position) else {
                continue;
            };
            let directions = self.config.topology.directions();
            if directions.contains(&Direction::North) || directions.contains(&Direction::South) {
                for row in grid.iter_mut() {
                    row[center_col] = '|';
                }
            }
            if directions.contains(&Direction::East) || directions.contains(&Direction::West) {
                for cell in grid[center_row].iter_mut() {
                    *cell = '-';
                }
            }
            grid[center_row][center_col] = '+';

            // Lights one cell off the centre on their approach side
            for light in &intersection.lights {
                let (ux, uy) = light.direction.opposite().unit_vector();
                let row = (center_row as f32 + uy).clamp(0.0, (MAP_ROWS - 1) as f32) as usize;
                let col = (center_col as f32 + 2.0 * ux).clamp(0.0, (MAP_COLS - 1) as f32) as usize;
                grid[row][col] = match light.state {
                    LightState::Red => 'R',
                    LightState::Yellow => 'Y',
                    LightState::Green => 'G',
                };
            }
        }

        for vehicle in self.vehicles.values() {
            if let Some((row, col)) = to_grid(&vehicle.position) {
                grid[row][col] = if vehicle.is_emergency() {
                    'E'
                } else {
                    match vehicle.direction {
                        Direction::North => '^',
                        Direction::East => '>',
                        Direction::South => 'v',
                        Direction::West => '<',
                    }
                };
            }
        }

        let mut map = String::with_capacity((MAP_COLS + 3) * (MAP_ROWS + 2));
        let border = format!("+{}+", "-".repeat(MAP_COLS));
        map.push_str(&border);
        map.push('\n');
        for row in grid {
            map.push('|');
            map.extend(row);
            map.push_str("|\n");
        }
        map.push_str(&border);
        map
    }

    /// Print an ASCII map of the intersection, its lights and vehicles
    pub fn draw_map(&self) {
        println!("\n=== World Map ===");
        println!("Legend: +=Intersection, R/Y/G=Light, ^>v<=Vehicle, E=Emergency");
        println!();
        println!("{}", self.render_map());
        println!();
    }
}

/// Intersection whose centre is closest to `position`
fn nearest_intersection<'a>(
    intersections: &'a [SimIntersection],
    position: &Position,
) -> Option<&'a SimIntersection> {
    intersections
        .iter()
        .min_by_key(|intersection| OrderedFloat(intersection.position.distance(position)))
}
