use serde_json::json;

use signal_sim::simulation::{
    parse_bridge_message, parse_frame, BridgeMessage, Direction, FrameError, LightState, SimWorld,
    VehicleClass,
};

fn busy_world() -> SimWorld {
    let mut world = SimWorld::create_test_world();
    world.inject_vehicle(Direction::North, VehicleClass::Car);
    world.inject_vehicle(Direction::East, VehicleClass::Emergency);
    for _ in 0..15 {
        world.tick(0.1);
    }
    world
}

#[test]
fn snapshot_uses_camel_case_fields() {
    let world = busy_world();
    let value = serde_json::to_value(world.snapshot()).unwrap();

    assert!(value["trafficLights"].is_array());
    assert!(value["metrics"]["averageWaitTime"].is_number());
    assert!(value["metrics"]["vehiclesExited"].is_number());
    assert_eq!(value["vehicles"][0]["id"], "vehicle-1");
    assert_eq!(value["vehicles"][0]["direction"], "north");
    assert_eq!(value["vehicles"][1]["type"], "emergency");
    assert!(value["vehicles"][0]["waitTime"].is_number());
}

#[test]
fn snapshot_reads_back() {
    let world = busy_world();
    let frame = world.snapshot();
    let text = serde_json::to_string(&frame).unwrap();
    assert_eq!(parse_frame(&text).unwrap(), frame);
}

#[test]
fn malformed_frames_are_rejected_without_touching_the_world() {
    let world = busy_world();
    let before = world.snapshot();
    let valid = serde_json::to_value(&before).unwrap();

    assert!(matches!(parse_frame("{ not json"), Err(FrameError::Json(_))));
    assert!(matches!(
        parse_frame(r#"{"vehicles": []}"#),
        Err(FrameError::Json(_))
    ));

    let mut negative_timer = valid.clone();
    negative_timer["trafficLights"][0]["timer"] = json!(-1.0);
    assert!(matches!(
        parse_frame(&negative_timer.to_string()),
        Err(FrameError::Invalid(_))
    ));

    let mut two_greens = valid.clone();
    for light in two_greens["trafficLights"].as_array_mut().unwrap() {
        light["state"] = json!("green");
    }
    assert!(matches!(
        parse_frame(&two_greens.to_string()),
        Err(FrameError::Invalid(_))
    ));

    let mut duplicate = valid.clone();
    let first = duplicate["vehicles"][0].clone();
    duplicate["vehicles"].as_array_mut().unwrap().push(first);
    assert!(matches!(
        parse_frame(&duplicate.to_string()),
        Err(FrameError::Invalid(_))
    ));

    let mut bad_direction = valid;
    bad_direction["vehicles"][0]["direction"] = json!("up");
    assert!(matches!(
        parse_frame(&bad_direction.to_string()),
        Err(FrameError::Json(_))
    ));

    assert_eq!(world.snapshot(), before);
}

#[test]
fn bridge_update_becomes_a_frame() {
    let message = json!({
        "type": "update",
        "step": 3,
        "time": 1.5,
        "vehicles": {
            "flow0.0": {"x": 100.0, "y": 50.0, "angle": 270.0, "speed": 12.0,
                        "type": "bus", "route": ["e1"], "lane": 0, "status": "waiting"}
        },
        "trafficLights": {
            "south": {"state": "y", "phases": ["G", "y", "r"], "position": {"x": 10.0, "y": 20.0}}
        }
    });

    let BridgeMessage::Update(frame) = parse_bridge_message(&message.to_string()).unwrap() else {
        panic!("expected an update");
    };
    assert_eq!(frame.vehicles[0].id, "flow0.0");
    assert_eq!(frame.vehicles[0].direction, Direction::West);
    assert_eq!(frame.vehicles[0].class, VehicleClass::Bus);
    assert_eq!(frame.traffic_lights[0].state, LightState::Yellow);
    assert_eq!(frame.traffic_lights[0].direction, Some(Direction::South));
    assert_eq!((frame.traffic_lights[0].x, frame.traffic_lights[0].y), (10.0, 20.0));
    assert!(frame.metrics.is_consistent());
}

#[test]
fn bridge_rejects_unknown_status_and_type() {
    let unknown_status = json!({
        "type": "update",
        "time": 0.0,
        "vehicles": {"v": {"x": 0.0, "y": 0.0, "angle": 0.0, "speed": 0.0,
                           "type": "car", "status": "teleported"}},
        "trafficLights": {}
    });
    assert!(matches!(
        parse_bridge_message(&unknown_status.to_string()),
        Err(FrameError::UnknownStatus(_))
    ));

    assert!(matches!(
        parse_bridge_message(r#"{"type": "control", "action": "start"}"#),
        Err(FrameError::Json(_))
    ));
}
