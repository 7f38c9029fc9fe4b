//! Snapshot frames
//!
//! A [`SimulationFrame`] is the read-only view handed to a sink once per
//! tick. Frames can also be read back from JSON, either in the native
//! camelCase shape or as an update message from an external simulator
//! bridge. Parsing never touches a live world.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::error::{FrameError, FrameResult};
use super::metrics::SimulationMetrics;
use super::signal::TrafficLight;
use super::types::{Direction, LightState, VehicleClass, VehicleStatus};
use super::vehicle::SimVehicle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameVehicle {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub direction: Direction,
    #[serde(rename = "type")]
    pub class: VehicleClass,
    pub wait_time: f32,
    pub status: VehicleStatus,
}

impl From<&SimVehicle> for FrameVehicle {
    fn from(vehicle: &SimVehicle) -> Self {
        Self {
            id: vehicle.id.to_string(),
            x: vehicle.position.x,
            y: vehicle.position.y,
            width: vehicle.width,
            height: vehicle.height,
            speed: vehicle.speed,
            direction: vehicle.direction,
            class: vehicle.class,
            wait_time: vehicle.wait_time,
            status: vehicle.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameLight {
    pub id: String,
    /// Governed direction; bridge lights keyed by junction have none
    pub direction: Option<Direction>,
    pub state: LightState,
    pub timer: f32,
    pub x: f32,
    pub y: f32,
}

impl From<&TrafficLight> for FrameLight {
    fn from(light: &TrafficLight) -> Self {
        Self {
            id: light.id.clone(),
            direction: Some(light.direction),
            state: light.state,
            timer: light.timer,
            x: light.position.x,
            y: light.position.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationFrame {
    pub vehicles: Vec<FrameVehicle>,
    pub traffic_lights: Vec<FrameLight>,
    pub metrics: SimulationMetrics,
    /// Simulated seconds since start
    pub time: f32,
}

impl SimulationFrame {
    pub fn capture<'a>(
        vehicles: impl IntoIterator<Item = &'a SimVehicle>,
        lights: impl IntoIterator<Item = &'a TrafficLight>,
        metrics: &SimulationMetrics,
        time: f32,
    ) -> Self {
        Self {
            vehicles: vehicles.into_iter().map(FrameVehicle::from).collect(),
            traffic_lights: lights.into_iter().map(FrameLight::from).collect(),
            metrics: metrics.clone(),
            time,
        }
    }

    /// Check the invariants every frame must satisfy
    pub fn validate(&self) -> FrameResult<()> {
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(FrameError::Invalid(format!("time {} out of range", self.time)));
        }

        let mut ids = HashSet::new();
        for vehicle in &self.vehicles {
            if !ids.insert(vehicle.id.as_str()) {
                return Err(FrameError::Invalid(format!("duplicate vehicle id {}", vehicle.id)));
            }
            if ![vehicle.x, vehicle.y, vehicle.speed].iter().all(|v| v.is_finite()) {
                return Err(FrameError::Invalid(format!(
                    "vehicle {} has a non-finite position or speed",
                    vehicle.id
                )));
            }
            if !(vehicle.wait_time >= 0.0) {
                return Err(FrameError::Invalid(format!(
                    "vehicle {} has negative wait time",
                    vehicle.id
                )));
            }
        }

        for light in &self.traffic_lights {
            if !(light.timer >= 0.0) {
                return Err(FrameError::Invalid(format!("light {} has a negative timer", light.id)));
            }
        }
        Ok(())
    }

    /// Number of direction-keyed lights showing green
    pub fn green_lights(&self) -> usize {
        self.traffic_lights
            .iter()
            .filter(|light| light.direction.is_some() && light.state == LightState::Green)
            .count()
    }
}

/// Parse and validate a native frame
pub fn parse_frame(json: &str) -> FrameResult<SimulationFrame> {
    let frame: SimulationFrame = serde_json::from_str(json)?;
    frame.validate()?;
    if frame.green_lights() > 1 {
        return Err(FrameError::Invalid(
            "more than one direction shows green".to_string(),
        ));
    }
    Ok(frame)
}

/// A message received from an external simulator bridge
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    Update(SimulationFrame),
    Error(String),
    Connection(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawMessage {
    Update(RawUpdate),
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    Connection {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUpdate {
    #[serde(default)]
    vehicles: BTreeMap<String, RawVehicle>,
    #[serde(default)]
    traffic_lights: BTreeMap<String, RawLight>,
    time: f32,
}

#[derive(Debug, Deserialize)]
struct RawVehicle {
    x: f32,
    y: f32,
    /// Degrees clockwise from north
    angle: f32,
    speed: f32,
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct RawLight {
    state: String,
    #[serde(default)]
    position: Option<RawPoint>,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    x: f32,
    y: f32,
}

/// Parse a bridge message; updates are converted into a validated frame
pub fn parse_bridge_message(json: &str) -> FrameResult<BridgeMessage> {
    match serde_json::from_str::<RawMessage>(json)? {
        RawMessage::Update(update) => convert_update(update).map(BridgeMessage::Update),
        RawMessage::Error { message } => Ok(BridgeMessage::Error(
            message.unwrap_or_else(|| "Error in simulation".to_string()),
        )),
        RawMessage::Connection { message, status } => Ok(BridgeMessage::Connection(
            message.or(status).unwrap_or_default(),
        )),
    }
}

fn convert_update(update: RawUpdate) -> FrameResult<SimulationFrame> {
    let mut vehicles = Vec::with_capacity(update.vehicles.len());
    for (id, raw) in update.vehicles {
        let class = bridge_class(&raw.kind);
        let (width, height) = class.dimensions();
        vehicles.push(FrameVehicle {
            id,
            x: raw.x,
            y: raw.y,
            width,
            height,
            speed: raw.speed,
            direction: heading_direction(raw.angle),
            class,
            wait_time: 0.0,
            status: bridge_status(&raw.status)?,
        });
    }

    let mut traffic_lights = Vec::with_capacity(update.traffic_lights.len());
    for (id, raw) in update.traffic_lights {
        let (x, y) = raw.position.map_or((0.0, 0.0), |p| (p.x, p.y));
        traffic_lights.push(FrameLight {
            direction: direction_named(&id),
            id,
            state: bridge_light_state(&raw.state)?,
            timer: 0.0,
            x,
            y,
        });
    }

    let exited = vehicles
        .iter()
        .filter(|vehicle| vehicle.status == VehicleStatus::Exited)
        .count();
    let metrics = SimulationMetrics {
        total_vehicles: vehicles.len(),
        vehicles_exited: exited,
        vehicle_count: vehicles.len() - exited,
        ..SimulationMetrics::default()
    };

    let frame = SimulationFrame {
        vehicles,
        traffic_lights,
        metrics,
        time: update.time,
    };
    frame.validate()?;
    Ok(frame)
}

/// Travel direction from a heading in degrees clockwise from north
pub fn heading_direction(angle: f32) -> Direction {
    let angle = angle.rem_euclid(360.0);
    if !(45.0..315.0).contains(&angle) {
        Direction::North
    } else if angle < 135.0 {
        Direction::East
    } else if angle < 225.0 {
        Direction::South
    } else {
        Direction::West
    }
}

fn bridge_class(kind: &str) -> VehicleClass {
    match kind.to_ascii_lowercase().as_str() {
        "truck" => VehicleClass::Truck,
        "bus" => VehicleClass::Bus,
        "bike" | "bicycle" => VehicleClass::Bike,
        "emergency" => VehicleClass::Emergency,
        _ => VehicleClass::Car,
    }
}

fn bridge_status(status: &str) -> FrameResult<VehicleStatus> {
    match status {
        "moving" => Ok(VehicleStatus::Moving),
        "waiting" => Ok(VehicleStatus::Waiting),
        "arrived" | "exited" => Ok(VehicleStatus::Exited),
        other => Err(FrameError::UnknownStatus(other.to_string())),
    }
}

/// Light state from the first signal character of a red/yellow/green string
fn bridge_light_state(state: &str) -> FrameResult<LightState> {
    match state.chars().next() {
        Some('r') | Some('u') => Ok(LightState::Red),
        Some('y') | Some('Y') => Ok(LightState::Yellow),
        Some('g') | Some('G') => Ok(LightState::Green),
        _ => Err(FrameError::UnknownLightState(state.to_string())),
    }
}

fn direction_named(id: &str) -> Option<Direction> {
    Direction::ROTATION
        .into_iter()
        .find(|direction| direction.as_str().eq_ignore_ascii_case(id))
}
