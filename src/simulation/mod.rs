//! Signalised intersection simulation
//!
//! This module contains the whole simulation core: vehicles, the spawner,
//! traffic lights and their controllers, metrics and snapshot frames. It
//! performs no I/O apart from the console summary helpers on [`SimWorld`].

mod adaptive;
mod config;
mod controller;
mod emergency;
mod error;
mod frame;
mod intersection;
mod learning;
mod metrics;
mod schedule;
mod signal;
mod spawner;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use adaptive::{AdaptiveController, AdaptiveSettings, GREEN_PER_WAITING_VEHICLE, MAX_WAITING_BONUS};
#[allow(unused_imports)]
pub use config::{
    clamp_speed_multiplier, ControlPolicy, RushHourWindow, SimConfig, MAX_SPEED_MULTIPLIER,
    MIN_SPEED_MULTIPLIER,
};
#[allow(unused_imports)]
pub use controller::{SignalController, SignalInput};
#[allow(unused_imports)]
pub use emergency::EmergencyPreemption;
#[allow(unused_imports)]
pub use error::{FrameError, FrameResult};
#[allow(unused_imports)]
pub use frame::{
    heading_direction, parse_bridge_message, parse_frame, BridgeMessage, FrameLight, FrameVehicle,
    SimulationFrame,
};
#[allow(unused_imports)]
pub use intersection::SimIntersection;
#[allow(unused_imports)]
pub use learning::{
    DensityLevel, LearningController, LearningSettings, QTable, SignalAction, HIGH_DENSITY,
    MEDIUM_DENSITY,
};
#[allow(unused_imports)]
pub use metrics::SimulationMetrics;
#[allow(unused_imports)]
pub use schedule::{Handover, HandoverQueue};
#[allow(unused_imports)]
pub use signal::{
    build_lights, count_down, direction_in_state, grant_exclusive_green, green_count, light_for,
    next_direction, set_light, TrafficLight,
};
#[allow(unused_imports)]
pub use spawner::{entry_position, VehicleSpawner, SPAWN_MARGIN};
#[allow(unused_imports)]
pub use types::{
    Direction, IntersectionId, LightState, Position, SimId, Topology, VehicleClass, VehicleId,
    VehicleStatus, EXTEND_GREEN_SECS, LANE_OFFSET, LIGHT_OFFSET,
};
#[allow(unused_imports)]
pub use vehicle::{may_advance, SimVehicle};
pub use world::SimWorld;
