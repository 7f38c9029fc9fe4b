//! Core types for the signal simulation
//!
//! Plain data types shared by the kinematics, spawner and controllers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimId(pub usize);

/// A wrapper type for intersection IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntersectionId(pub SimId);

/// A wrapper type for vehicle IDs
///
/// Allocated monotonically by the world and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub SimId);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle-{}", self.0 .0)
    }
}

impl fmt::Display for IntersectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "intersection-{}", self.0 .0)
    }
}

/// Cardinal direction of travel
///
/// Screen convention: `y` grows toward the south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Fixed rotation order used to pick the next green direction
    pub const ROTATION: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit vector of travel in world coordinates
    pub fn unit_vector(self) -> (f32, f32) {
        match self {
            Direction::North => (0.0, -1.0),
            Direction::South => (0.0, 1.0),
            Direction::East => (1.0, 0.0),
            Direction::West => (-1.0, 0.0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// The direction after this one in [`Direction::ROTATION`]
    pub fn next_in_rotation(self) -> Direction {
        let index = Self::ROTATION
            .iter()
            .position(|d| *d == self)
            .unwrap_or_default();
        Self::ROTATION[(index + 1) % Self::ROTATION.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }

    /// Classify a bearing from an intersection centre into an approach sector.
    ///
    /// Sectors are named after the travel direction of traffic that approaches
    /// through them: a point south of the centre (positive `dy`) lies in the
    /// `North` sector because north-bound vehicles come from there. The four
    /// half-open 90° ranges cover the whole circle.
    pub fn approach_sector(dx: f32, dy: f32) -> Direction {
        let angle = dy.atan2(dx).to_degrees();
        if (-45.0..45.0).contains(&angle) {
            // East of the centre
            Direction::West
        } else if (45.0..135.0).contains(&angle) {
            // South of the centre
            Direction::North
        } else if (-135.0..-45.0).contains(&angle) {
            // North of the centre
            Direction::South
        } else {
            // West of the centre
            Direction::East
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single traffic light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    Red,
    Yellow,
    Green,
}

/// Lifecycle status of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Moving,
    Waiting,
    Exited,
}

/// Type of vehicle in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Car,
    Truck,
    Bus,
    Bike,
    /// Triggers signal preemption at intersections
    Emergency,
}

impl VehicleClass {
    /// Classes the spawner picks from for regular traffic
    pub const REGULAR: [VehicleClass; 4] = [
        VehicleClass::Car,
        VehicleClass::Truck,
        VehicleClass::Bus,
        VehicleClass::Bike,
    ];

    /// Footprint as (width, height) in world units
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            VehicleClass::Car => (16.0, 8.0),
            VehicleClass::Truck => (24.0, 12.0),
            VehicleClass::Bus => (20.0, 10.0),
            VehicleClass::Bike => (8.0, 5.0),
            VehicleClass::Emergency => (18.0, 9.0),
        }
    }

    pub fn is_emergency(self) -> bool {
        matches!(self, VehicleClass::Emergency)
    }
}

/// Road layout of the simulated intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// North/south traffic only
    #[serde(rename = "2lane")]
    #[value(name = "2lane")]
    TwoLane,
    /// Full four-way intersection
    #[serde(rename = "4lane")]
    #[value(name = "4lane")]
    FourLane,
}

impl Topology {
    /// Directions that carry traffic, in rotation order
    pub fn directions(self) -> &'static [Direction] {
        match self {
            Topology::TwoLane => &[Direction::North, Direction::South],
            Topology::FourLane => &Direction::ROTATION,
        }
    }

    /// Relative spread of spawned vehicle speeds around the configured base
    pub fn speed_variation(self) -> f32 {
        match self {
            Topology::TwoLane => 0.3,
            Topology::FourLane => 0.5,
        }
    }

    /// Direction that starts green when the intersection is built
    pub fn initial_green(self) -> Direction {
        match self {
            Topology::TwoLane => Direction::South,
            Topology::FourLane => Direction::East,
        }
    }
}

/// A 2D position in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Offset from `origin` to this position
    pub fn offset_from(&self, origin: &Position) -> (f32, f32) {
        (self.x - origin.x, self.y - origin.y)
    }

    pub fn translate(&self, direction: Direction, distance: f32) -> Position {
        let (ux, uy) = direction.unit_vector();
        Position {
            x: self.x + ux * distance,
            y: self.y + uy * distance,
        }
    }
}

/// Distance from an intersection centre at which its lights are drawn
pub const LIGHT_OFFSET: f32 = 50.0;

/// Lateral offset of the travel lane from the road centre line
pub const LANE_OFFSET: f32 = -5.0;

/// Seconds added to the green timer by the learning controller's extend action
pub const EXTEND_GREEN_SECS: f32 = 5.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps_around() {
        assert_eq!(Direction::North.next_in_rotation(), Direction::East);
        assert_eq!(Direction::West.next_in_rotation(), Direction::North);
    }

    #[test]
    fn sectors_cover_every_side() {
        // Screen coordinates: positive dy is south of the centre
        assert_eq!(Direction::approach_sector(0.0, 40.0), Direction::North);
        assert_eq!(Direction::approach_sector(0.0, -40.0), Direction::South);
        assert_eq!(Direction::approach_sector(40.0, 0.0), Direction::West);
        assert_eq!(Direction::approach_sector(-40.0, 0.0), Direction::East);
        // Boundaries belong to exactly one sector
        assert_eq!(Direction::approach_sector(10.0, 10.0), Direction::North);
        assert_eq!(Direction::approach_sector(-10.0, -10.0), Direction::South);
    }

    #[test]
    fn approach_sector_matches_travel_direction() {
        for direction in Direction::ROTATION {
            // A vehicle 60 units upstream of the centre
            let (ux, uy) = direction.unit_vector();
            assert_eq!(Direction::approach_sector(-ux * 60.0, -uy * 60.0), direction);
        }
    }
}
