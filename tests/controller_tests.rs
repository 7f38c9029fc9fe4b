use rand::rngs::StdRng;
use rand::SeedableRng;

use signal_sim::simulation::{
    ControlPolicy, DensityLevel, Direction, LearningController, LightState, Position, SignalAction,
    SimConfig, SimWorld, VehicleClass,
};

fn quiet_config() -> SimConfig {
    SimConfig {
        world_width: 1000.0,
        world_height: 1500.0,
        spawn_probability: 0.0,
        ..SimConfig::default()
    }
}

fn assert_only_green(world: &SimWorld, direction: Direction) {
    for light in &world.intersections[0].lights {
        let expected = if light.direction == direction {
            LightState::Green
        } else {
            LightState::Red
        };
        assert_eq!(light.state, expected, "light {}", light.direction);
    }
}

#[test]
fn emergency_from_the_south_gets_northbound_green_in_one_tick() {
    let mut world = SimWorld::create_test_world();
    assert_eq!(world.light_state(Direction::East), Some(LightState::Green));

    world.add_vehicle(
        Position::new(495.0, 820.0),
        60.0,
        Direction::North,
        VehicleClass::Emergency,
    );
    world.tick(0.1);

    assert_only_green(&world, Direction::North);
    assert_eq!(world.intersections[0].emergency_direction(), Some(Direction::North));
}

#[test]
fn preemption_releases_once_the_vehicle_has_crossed() {
    let mut world = SimWorld::create_test_world();
    let id = world.add_vehicle(
        Position::new(495.0, 820.0),
        60.0,
        Direction::North,
        VehicleClass::Emergency,
    );

    for _ in 0..20 {
        world.tick(0.1);
        assert!(world.intersections[0].green_count() <= 1);
    }

    assert!(world.vehicle(id).unwrap().position.y < 750.0);
    assert_eq!(world.intersections[0].emergency_direction(), None);
    assert_eq!(world.intersections[0].green_count(), 1);
}

#[test]
fn emergency_overrides_an_active_yellow() {
    let config = SimConfig {
        initial_green_time: 1.0,
        ..quiet_config()
    };
    let mut world = SimWorld::new_with_seed(config, 4);
    world.tick(1.0);
    world.tick(0.1);
    assert_eq!(world.light_state(Direction::East), Some(LightState::Yellow));

    // West-bound, approaching from the east side
    world.add_vehicle(
        Position::new(580.0, 745.0),
        60.0,
        Direction::West,
        VehicleClass::Emergency,
    );
    world.tick(0.1);
    assert_only_green(&world, Direction::West);
}

#[test]
fn emergency_behind_a_yellow_light_waits_one_tick_for_green() {
    let config = SimConfig {
        initial_green_time: 1.0,
        ..quiet_config()
    };
    let mut world = SimWorld::new_with_seed(config, 4);
    world.tick(1.0);
    world.tick(0.1);
    assert_eq!(world.light_state(Direction::East), Some(LightState::Yellow));

    world.add_vehicle(
        Position::new(420.0, 745.0),
        60.0,
        Direction::East,
        VehicleClass::Emergency,
    );
    world.tick(0.1);
    assert_eq!(world.light_state(Direction::East), Some(LightState::Red));
    assert_eq!(world.intersections[0].green_count(), 0);
    assert_eq!(world.intersections[0].emergency_direction(), Some(Direction::East));

    world.tick(0.1);
    assert_only_green(&world, Direction::East);
}

#[test]
fn learning_policy_also_yields_to_emergencies() {
    let config = SimConfig {
        policy: ControlPolicy::Learning,
        ..quiet_config()
    };
    let mut world = SimWorld::new_with_seed(config, 8);
    world.add_vehicle(
        Position::new(420.0, 745.0),
        60.0,
        Direction::East,
        VehicleClass::Emergency,
    );
    world.tick(0.1);
    assert_only_green(&world, Direction::East);
}

#[test]
fn zero_delta_with_no_vehicles_changes_nothing() {
    let mut world = SimWorld::new_with_seed(quiet_config(), 1);
    let before = world.snapshot();
    for _ in 0..10 {
        world.tick(0.0);
    }
    assert_eq!(world.snapshot(), before);
}

#[test]
fn at_most_one_green_under_load() {
    for policy in [ControlPolicy::Adaptive, ControlPolicy::Learning] {
        let config = SimConfig {
            policy,
            spawn_probability: 0.9,
            emergency_probability: 0.15,
            ..SimConfig::default()
        };
        let mut world = SimWorld::new_with_seed(config, 21);
        world.set_speed(3.0);
        for _ in 0..3000 {
            world.tick(0.1);
            assert!(
                world.intersections[0].green_count() <= 1,
                "{:?} produced two greens at t={}",
                policy,
                world.time
            );
        }
    }
}

#[test]
fn adaptive_rotation_reaches_every_direction() {
    let config = SimConfig {
        initial_green_time: 1.0,
        green_jitter: 0.0,
        ..quiet_config()
    };
    let mut world = SimWorld::new_with_seed(config, 0);
    let mut seen = Vec::new();
    for _ in 0..800 {
        world.tick(0.1);
        for direction in Direction::ROTATION {
            if world.light_state(direction) == Some(LightState::Green) && !seen.contains(&direction) {
                seen.push(direction);
            }
        }
    }
    assert_eq!(
        seen,
        vec![Direction::East, Direction::South, Direction::West, Direction::North]
    );
}

#[test]
fn switching_policy_rebuilds_the_controllers() {
    let mut world = SimWorld::create_test_world();
    world.set_policy(ControlPolicy::Learning);
    assert_eq!(world.intersections[0].controller.policy(), ControlPolicy::Learning);
    assert_eq!(world.light_state(Direction::East), Some(LightState::Green));
}

#[test]
fn learning_reference_trace() {
    let config = SimConfig {
        exploration_rate: 0.0,
        ..SimConfig::default()
    };
    let mut controller = LearningController::new(&config);
    let mut rng = StdRng::seed_from_u64(99);

    for (state, reward) in [
        (DensityLevel::Low, -1.0),
        (DensityLevel::Low, -2.0),
        (DensityLevel::High, -5.0),
    ] {
        controller.step(state, reward, &mut rng);
    }

    let table = controller.table();
    assert!((table.get(DensityLevel::Low, SignalAction::ExtendGreen) + 0.2).abs() < 1e-12);
    assert!((table.get(DensityLevel::Low, SignalAction::SwitchToNext) + 0.5).abs() < 1e-12);
    assert_eq!(table.get(DensityLevel::Low, SignalAction::Maintain), 0.0);
    assert_eq!(table.best_action(DensityLevel::Low), SignalAction::Maintain);
    assert_eq!(table.max_value(DensityLevel::High), 0.0);
}
