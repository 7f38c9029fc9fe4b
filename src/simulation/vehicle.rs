//! Vehicle state and per-tick kinematics
//!
//! Vehicles travel in a straight line at constant speed. The only decision a
//! vehicle makes each tick is whether it may advance, which the world derives
//! from the governing light before calling [`SimVehicle::advance`].

use super::types::{Direction, LightState, Position, VehicleClass, VehicleId, VehicleStatus};

/// A vehicle in the signal simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub position: Position,
    pub width: f32,
    pub height: f32,
    /// World units per simulated second
    pub speed: f32,
    pub direction: Direction,
    pub class: VehicleClass,
    /// Accumulated seconds spent stopped at a red light
    pub wait_time: f32,
    pub has_waited: bool,
    pub status: VehicleStatus,
}

impl SimVehicle {
    pub fn new(
        id: VehicleId,
        position: Position,
        speed: f32,
        direction: Direction,
        class: VehicleClass,
    ) -> Self {
        let (width, height) = class.dimensions();
        Self {
            id,
            position,
            width,
            height,
            speed,
            direction,
            class,
            wait_time: 0.0,
            has_waited: false,
            status: VehicleStatus::Moving,
        }
    }

    /// Advance the vehicle by one tick.
    ///
    /// When `may_advance` is false the vehicle holds its position and
    /// accumulates wait time instead. Only this vehicle's fields change.
    pub fn advance(&mut self, may_advance: bool, delta_secs: f32) {
        if may_advance {
            self.position = self.position.translate(self.direction, self.speed * delta_secs);
            self.status = VehicleStatus::Moving;
        } else {
            self.wait_time += delta_secs;
            self.has_waited = true;
            self.status = VehicleStatus::Waiting;
        }
    }

    /// Whether the vehicle has already passed `center` along its direction of travel
    pub fn has_crossed(&self, center: &Position) -> bool {
        let (dx, dy) = self.position.offset_from(center);
        let (ux, uy) = self.direction.unit_vector();
        dx * ux + dy * uy > 0.0
    }

    /// Whether the vehicle lies more than `buffer` outside the world rectangle
    pub fn is_outside(&self, width: f32, height: f32, buffer: f32) -> bool {
        self.position.x < -buffer
            || self.position.x > width + buffer
            || self.position.y < -buffer
            || self.position.y > height + buffer
    }

    pub fn is_emergency(&self) -> bool {
        self.class.is_emergency()
    }
}

/// Decide whether a vehicle may advance past an intersection.
///
/// `light` is the state of the light governing the vehicle's direction, if the
/// intersection has one. A missing light never blocks. A red light only
/// blocks vehicles inside `proximity_radius` that have not yet crossed the
/// centre.
pub fn may_advance(
    vehicle: &SimVehicle,
    center: &Position,
    light: Option<LightState>,
    proximity_radius: f32,
) -> bool {
    match light {
        Some(LightState::Red) => {
            vehicle.position.distance(center) >= proximity_radius || vehicle.has_crossed(center)
        }
        Some(LightState::Yellow) | Some(LightState::Green) | None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::types::SimId;

    fn north_bound(x: f32, y: f32, speed: f32) -> SimVehicle {
        SimVehicle::new(
            VehicleId(SimId(1)),
            Position::new(x, y),
            speed,
            Direction::North,
            VehicleClass::Car,
        )
    }

    #[test]
    fn red_light_holds_vehicle_and_accumulates_wait() {
        let center = Position::new(500.0, 750.0);
        let mut vehicle = north_bound(500.0, 750.0, 2.0);

        for _ in 0..10 {
            let may = may_advance(&vehicle, &center, Some(LightState::Red), 30.0);
            vehicle.advance(may, 0.1);
        }

        assert_eq!(vehicle.position, Position::new(500.0, 750.0));
        assert!((vehicle.wait_time - 1.0).abs() < 1e-4);
        assert!(vehicle.has_waited);
        assert_eq!(vehicle.status, VehicleStatus::Waiting);
    }

    #[test]
    fn green_light_moves_vehicle_without_adding_wait() {
        let center = Position::new(500.0, 750.0);
        let mut vehicle = north_bound(500.0, 750.0, 2.0);
        vehicle.wait_time = 1.0;

        for _ in 0..5 {
            let may = may_advance(&vehicle, &center, Some(LightState::Green), 30.0);
            vehicle.advance(may, 1.0);
        }

        assert!((vehicle.position.y - 740.0).abs() < 1e-4);
        assert_eq!(vehicle.position.x, 500.0);
        assert_eq!(vehicle.wait_time, 1.0);
        assert_eq!(vehicle.status, VehicleStatus::Moving);
    }

    #[test]
    fn direction_unit_vectors() {
        let cases = [
            (Direction::North, (0.0, -10.0)),
            (Direction::South, (0.0, 10.0)),
            (Direction::East, (10.0, 0.0)),
            (Direction::West, (-10.0, 0.0)),
        ];
        for (direction, (dx, dy)) in cases {
            let mut vehicle = north_bound(0.0, 0.0, 5.0);
            vehicle.direction = direction;
            vehicle.advance(true, 2.0);
            assert_eq!(vehicle.position, Position::new(dx, dy));
        }
    }

    #[test]
    fn far_vehicles_ignore_red() {
        let center = Position::new(500.0, 350.0);
        let vehicle = north_bound(500.0, 700.0, 2.0);
        assert!(may_advance(&vehicle, &center, Some(LightState::Red), 30.0));
    }

    #[test]
    fn crossed_vehicles_clear_the_box() {
        let center = Position::new(500.0, 350.0);
        let vehicle = north_bound(500.0, 340.0, 2.0);
        assert!(vehicle.has_crossed(&center));
        assert!(may_advance(&vehicle, &center, Some(LightState::Red), 30.0));
    }

    #[test]
    fn missing_light_is_permissive() {
        let center = Position::new(500.0, 350.0);
        let vehicle = north_bound(500.0, 360.0, 2.0);
        assert!(may_advance(&vehicle, &center, None, 30.0));
    }

    #[test]
    fn outside_check_uses_buffer() {
        let mut vehicle = north_bound(500.0, -40.0, 2.0);
        assert!(!vehicle.is_outside(1000.0, 700.0, 50.0));
        vehicle.position.y = -60.0;
        assert!(vehicle.is_outside(1000.0, 700.0, 50.0));
    }
}
