// Full episodes over the in-memory simulator.

use queue_grid::config::{EnvConfig, GridConfig, ObservationConfig, TlType};
use queue_grid::environment::{Action, QueueGridEnv};
use queue_grid::simulation_engine::in_memory::InMemorySimulator;
use queue_grid::simulation_engine::intersections::FlowDirection;
use queue_grid::simulation_engine::simulator::VehicleQuery;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

fn config(observation: ObservationConfig, discrete: bool) -> EnvConfig {
    EnvConfig {
        grid: GridConfig {
            rows: 2,
            cols: 3,
            short_length: 60.0,
            long_length: 40.0,
            inner_length: 80.0,
            speed_limit: 15.0,
            ..GridConfig::default()
        },
        switch_time: 2.0,
        tl_type: TlType::Controlled,
        discrete,
        horizon: 120,
        observation,
        ..EnvConfig::default()
    }
}

fn populated_env(config: EnvConfig, vehicles: usize, seed: u64) -> QueueGridEnv<InMemorySimulator> {
    let mut sim = InMemorySimulator::from_config(&config.grid).unwrap();
    sim.populate(vehicles, seed);
    QueueGridEnv::new(config, sim).unwrap()
}

fn ids(env: &QueueGridEnv<InMemorySimulator>) -> BTreeSet<String> {
    env.simulator().vehicles().into_iter().map(|v| v.id).collect()
}

#[test]
fn vehicle_population_survives_a_whole_episode() {
    let mut env = populated_env(config(ObservationConfig::Full, true), 40, 9);
    let before = ids(&env);
    env.reset().unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let mut reroutes = 0;
    loop {
        let action = env.action_space().sample(&mut rng);
        let result = env.step(&action).unwrap();
        assert_eq!(result.info.num_vehicles, 40);
        assert_eq!(result.observation.len(), 3 * 40 + 3 * 6);
        reroutes += result.info.reinsertions.len();
        if result.done {
            break;
        }
    }
    assert_eq!(ids(&env), before);
    assert!(reroutes > 0, "vehicles never reached a terminal edge");
}

#[test]
fn partial_observation_length_never_changes() {
    let mut env = populated_env(config(ObservationConfig::Partial { num_observed: 2 }, false), 25, 4);
    let expected = 12 * 2 * 6 + 2 * 34 + 3 * 6;
    assert_eq!(env.observation_space().dim, expected);
    assert_eq!(env.reset().unwrap().len(), expected);

    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..60 {
        let action = env.action_space().sample(&mut rng);
        let result = env.step(&action).unwrap();
        assert_eq!(result.observation.len(), expected);
        assert!(result.observation.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn episodes_end_exactly_at_the_horizon() {
    let mut env = populated_env(config(ObservationConfig::Full, true), 5, 1);
    for _ in 0..2 {
        env.reset().unwrap();
        let mut steps = 0;
        while !env.step(&Action::Discrete(0)).unwrap().done {
            steps += 1;
        }
        assert_eq!(steps + 1, 120);
    }
}

#[test]
fn actuated_lights_are_left_to_the_simulator() {
    let mut config = config(ObservationConfig::Full, true);
    config.tl_type = TlType::Actuated;
    let mut env = populated_env(config, 10, 2);
    env.reset().unwrap();
    // All intersections request a switch.
    env.step(&Action::Discrete(63)).unwrap();

    for node in env.grid().intersections() {
        assert_eq!(env.simulator().signal_state(node), None);
        assert!(env.controller().state(node).unwrap().is_yellow);
    }
}

#[test]
fn held_lights_keep_their_direction_and_accumulate_dwell() {
    let mut env = populated_env(config(ObservationConfig::Full, false), 10, 3);
    env.reset().unwrap();
    let hold = Action::Continuous(vec![-1.0; 6]);
    let mut last = 0.0;
    for _ in 0..10 {
        env.step(&hold).unwrap();
        for (_, state) in env.controller().states() {
            assert_eq!(state.flow_direction, FlowDirection::Vertical);
            assert!(state.dwell_time > last);
        }
        last = env.controller().states().next().unwrap().1.dwell_time;
    }
}

#[test]
fn evaluation_reward_is_negative_delay() {
    let mut config = config(ObservationConfig::Partial { num_observed: 1 }, true);
    config.evaluate = true;
    let mut env = populated_env(config, 30, 6);
    env.reset().unwrap();
    for _ in 0..20 {
        let result = env.step(&Action::Discrete(0)).unwrap();
        assert_eq!(result.reward, -result.info.reward.delay);
        assert!(result.info.reward.delay >= 0.0);
    }
}
