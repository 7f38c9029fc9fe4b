//! Signalised intersection
//!
//! Owns the light set and the controller driving it. The list of vehicles in
//! view is refreshed from the world every tick and is never the source of
//! truth for vehicle state.

use rand::Rng;

use super::config::SimConfig;
use super::controller::{SignalController, SignalInput};
use super::signal::{build_lights, grant_exclusive_green, green_count, light_for, TrafficLight};
use super::types::{Direction, IntersectionId, LightState, Position, VehicleId};
use super::vehicle::SimVehicle;

/// An intersection in the signal simulation
#[derive(Debug, Clone)]
pub struct SimIntersection {
    pub id: IntersectionId,
    pub position: Position,
    pub lights: Vec<TrafficLight>,
    /// Vehicles within the influence radius as of the last refresh
    pub vehicles: Vec<VehicleId>,
    pub controller: SignalController,
    influence_radius: f32,
}

impl SimIntersection {
    pub fn new(id: IntersectionId, position: Position, config: &SimConfig) -> Self {
        let lights = build_lights(
            position,
            config.topology.directions(),
            config.topology.initial_green(),
            config.initial_green_time,
        );
        Self {
            id,
            position,
            lights,
            vehicles: Vec::new(),
            controller: SignalController::from_config(config),
            influence_radius: config.influence_radius,
        }
    }

    /// State of the light governing `direction`, if there is one
    pub fn light_state(&self, direction: Direction) -> Option<LightState> {
        light_for(&self.lights, direction).map(|light| light.state)
    }

    /// Vehicles within the influence radius, in the order given
    pub fn nearby<'a>(&self, vehicles: &[&'a SimVehicle]) -> Vec<&'a SimVehicle> {
        vehicles
            .iter()
            .copied()
            .filter(|vehicle| vehicle.position.distance(&self.position) <= self.influence_radius)
            .collect()
    }

    /// Rebuild the in-view list and return the vehicles in view
    pub fn refresh_view<'a>(&mut self, vehicles: &[&'a SimVehicle]) -> Vec<&'a SimVehicle> {
        let nearby = self.nearby(vehicles);
        self.vehicles = nearby.iter().map(|vehicle| vehicle.id).collect();
        nearby
    }

    /// Refresh the view and run the controller for one tick
    pub fn update_signals<R: Rng + ?Sized>(
        &mut self,
        vehicles: &[&SimVehicle],
        delta_secs: f32,
        hour_of_day: f32,
        rng: &mut R,
    ) -> &[TrafficLight] {
        let nearby = self.refresh_view(vehicles);
        let input = SignalInput {
            center: self.position,
            vehicles,
            nearby: &nearby,
            delta_secs,
            hour_of_day,
        };
        self.controller.update(&input, &mut self.lights, rng);
        &self.lights
    }

    /// Force `direction` green and everything else red, dropping any
    /// transition the controller had queued
    pub fn force_green(&mut self, direction: Direction, timer: f32) {
        grant_exclusive_green(&mut self.lights, direction, timer);
        self.controller.clear_pending();
    }

    pub fn emergency_direction(&self) -> Option<Direction> {
        self.controller.emergency_direction()
    }

    pub fn green_count(&self) -> usize {
        green_count(&self.lights)
    }
}
