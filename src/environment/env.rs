// env.rs
//
// Step loop tying the simulator, the signal controller, observation,
// reward and rerouting together.

use crate::config::{EnvConfig, TlType};
use crate::control_system::traffic_light_controller::{
    PhaseTiming, SignalCommand, TrafficLightController,
};
use crate::environment::action::{Action, ActionSpace};
use crate::error::{GridEnvError, Result};
use crate::flow_analyzer::observation::{BoxSpace, ObservationBuilder};
use crate::flow_analyzer::reward::{RewardBreakdown, RewardEvaluator};
use crate::simulation_engine::grid::Grid;
use crate::simulation_engine::rerouting::{BoundaryRerouter, Reinsertion};
use crate::simulation_engine::simulator::Simulator;
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub type Observation = Vec<f64>;

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// Diagnostics attached to every step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Steps taken since the last reset, including this one.
    pub step: u64,
    /// Switch requests in the applied action.
    pub switches: usize,
    /// Intersections whose phase changed this step.
    pub transitions: usize,
    pub reinsertions: Vec<Reinsertion>,
    pub num_vehicles: usize,
    pub reward: RewardBreakdown,
    /// Vehicles in the partial observation, closest first per approach.
    pub observed_ids: Vec<String>,
}

/// Traffic-light grid environment over a simulator `S`.
pub struct QueueGridEnv<S> {
    config: EnvConfig,
    grid: Grid,
    sim: S,
    controller: TrafficLightController,
    observer: ObservationBuilder,
    reward: RewardEvaluator,
    rerouter: BoundaryRerouter,
    action_space: ActionSpace,
    step_count: u64,
}

impl<S: Simulator> QueueGridEnv<S> {
    pub fn new(config: EnvConfig, sim: S) -> Result<Self> {
        config.validate()?;
        let grid = Grid::from_config(&config.grid)?;
        let timing = PhaseTiming {
            min_yellow_time: config.switch_time,
            min_green_time: config.min_green_time,
        };
        let env = Self {
            controller: TrafficLightController::initialize(&grid, timing),
            observer: ObservationBuilder::new(&grid, config.observation.clone()),
            reward: RewardEvaluator::from_config(&config),
            rerouter: BoundaryRerouter::new(&grid),
            action_space: ActionSpace::for_grid(grid.num_intersections(), config.discrete),
            step_count: 0,
            grid,
            sim,
            config,
        };
        info!(
            "queue grid {}x{}: {} intersections, {} edges, {:?} lights, {:?} observation",
            env.grid.rows(),
            env.grid.cols(),
            env.grid.num_intersections(),
            env.grid.num_edges(),
            env.config.tl_type,
            env.config.observation
        );
        Ok(env)
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn simulator(&self) -> &S {
        &self.sim
    }

    pub fn simulator_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub fn controller(&self) -> &TrafficLightController {
        &self.controller
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn is_done(&self) -> bool {
        self.step_count >= self.config.horizon
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    /// Sized for the vehicles currently in the network; constant in
    /// partial mode.
    pub fn observation_space(&self) -> BoxSpace {
        self.observer.observation_space(self.sim.vehicles().len())
    }

    fn send(&mut self, commands: &[SignalCommand]) -> Result<()> {
        if self.config.tl_type == TlType::Actuated {
            return Ok(());
        }
        for command in commands {
            self.sim
                .set_signal_state(&command.intersection.to_string(), &command.state)?;
        }
        Ok(())
    }

    pub fn reset(&mut self) -> Result<Observation> {
        self.step_count = 0;
        let commands = self.controller.reset();
        self.send(&commands)?;
        info!(
            "reset: {} vehicles, horizon {}",
            self.sim.vehicles().len(),
            self.config.horizon
        );
        self.observer.build(&self.sim, &self.controller)
    }

    pub fn step(&mut self, action: &Action) -> Result<StepResult> {
        let mask = self.action_space.decode(action)?;
        let dt = self.config.sim_step;

        let commands = self.controller.apply(&mask, dt)?;
        self.send(&commands)?;
        self.sim.simulation_step(dt)?;
        self.step_count += 1;

        let observation = self.observer.build(&self.sim, &self.controller)?;
        let reward = self.reward.evaluate(&self.sim, mask.switches());
        let reinsertions = self.rerouter.reroute(&mut self.sim)?;
        let done = self.is_done();
        debug!(
            "step {}: {} transitions, {} reroutes, reward {:.3}",
            self.step_count,
            commands.len(),
            reinsertions.len(),
            reward.reward
        );

        Ok(StepResult {
            observation,
            reward: reward.reward,
            done,
            info: StepInfo {
                step: self.step_count,
                switches: mask.switches(),
                transitions: commands.len(),
                reinsertions,
                num_vehicles: self.sim.vehicles().len(),
                reward,
                observed_ids: self.observer.observed_ids().to_vec(),
            },
        })
    }
}

/// Independent environments stepped in lockstep.
pub struct VecEnv<S> {
    envs: Vec<QueueGridEnv<S>>,
}

impl<S: Simulator> VecEnv<S> {
    /// Builds `n` copies of `config`, asking `make_sim` for each copy's
    /// simulator.
    pub fn new<F>(n: usize, config: &EnvConfig, mut make_sim: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<S>,
    {
        let envs = (0..n)
            .map(|i| QueueGridEnv::new(config.clone(), make_sim(i)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { envs })
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    pub fn envs(&self) -> &[QueueGridEnv<S>] {
        &self.envs
    }

    pub fn reset_all(&mut self) -> Result<Vec<Observation>> {
        self.envs.iter_mut().map(QueueGridEnv::reset).collect()
    }

    /// `actions[i]` goes to environment `i`.
    pub fn step(&mut self, actions: &[Action]) -> Result<Vec<StepResult>> {
        if actions.len() != self.envs.len() {
            return Err(GridEnvError::InvalidAction(format!(
                "{} actions for {} environments",
                actions.len(),
                self.envs.len()
            )));
        }
        self.envs
            .iter_mut()
            .zip(actions)
            .map(|(env, action)| env.step(action))
            .collect()
    }

    pub fn dones(&self) -> Vec<bool> {
        self.envs.iter().map(QueueGridEnv::is_done).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridConfig, ObservationConfig};
    use crate::control_system::phases::Phase;
    use crate::simulation_engine::in_memory::InMemorySimulator;
    use crate::simulation_engine::intersections::IntersectionId;
    use crate::simulation_engine::simulator::{SimulatorCommand, VehicleInsertion, VehicleQuery};

    fn config(rows: usize, cols: usize) -> EnvConfig {
        EnvConfig {
            grid: GridConfig {
                rows,
                cols,
                short_length: 100.0,
                long_length: 100.0,
                inner_length: 100.0,
                speed_limit: 10.0,
                ..GridConfig::default()
            },
            discrete: true,
            horizon: 5,
            ..EnvConfig::default()
        }
    }

    fn env(config: EnvConfig) -> QueueGridEnv<InMemorySimulator> {
        let sim = InMemorySimulator::from_config(&config.grid).unwrap();
        QueueGridEnv::new(config, sim).unwrap()
    }

    #[test]
    fn reset_sets_initial_lights() {
        let mut env = env(config(1, 2));
        env.reset().unwrap();
        for id in [0, 1] {
            let state = env.simulator().signal_state(IntersectionId::new_unchecked(id));
            assert_eq!(state, Some("GGrgrrGGrgrr"));
        }
    }

    #[test]
    fn switching_sends_yellow_then_next_green() {
        let mut env = env(config(1, 2));
        env.reset().unwrap();
        let node0 = IntersectionId::new_unchecked(0);

        // Binary 10: switch intersection 0 only.
        let result = env.step(&Action::Discrete(2)).unwrap();
        assert_eq!(result.info.switches, 1);
        assert_eq!(result.info.transitions, 1);
        assert_eq!(env.controller().state(node0).unwrap().phase, Phase::VerticalGreenToYellow);
        assert_eq!(
            env.simulator().signal_state(node0),
            Some(Phase::VerticalGreenToYellow.signal_state(1, 1).as_str())
        );
        assert_eq!(result.reward, result.info.reward.reward);
        assert_eq!(result.info.reward.switch_penalty, 1.0);

        env.step(&Action::Discrete(0)).unwrap();
        env.step(&Action::Discrete(0)).unwrap();
        assert_eq!(env.controller().state(node0).unwrap().phase, Phase::HorizontalGreen);
        assert_eq!(
            env.simulator().signal_state(node0),
            Some(Phase::HorizontalGreen.signal_state(1, 1).as_str())
        );
    }

    #[test]
    fn done_at_horizon() {
        let mut env = env(config(1, 1));
        env.reset().unwrap();
        let dones: Vec<bool> = (0..5)
            .map(|_| env.step(&Action::Discrete(0)).unwrap().done)
            .collect();
        assert_eq!(dones, [false, false, false, false, true]);
        env.reset().unwrap();
        assert_eq!(env.step_count(), 0);
    }

    #[test]
    fn actions_outside_the_space_are_rejected() {
        let mut env = env(config(1, 2));
        env.reset().unwrap();
        assert!(matches!(
            env.step(&Action::Discrete(4)),
            Err(GridEnvError::InvalidAction(_))
        ));
        assert!(env.step(&Action::Continuous(vec![1.0, 1.0])).is_err());
        assert_eq!(env.step_count(), 0);
    }

    #[test]
    fn terminal_vehicles_are_rerouted_after_the_step() {
        let mut env = env(config(1, 1));
        env.reset().unwrap();
        env.simulator_mut()
            .add_vehicle(VehicleInsertion {
                id: "exiting".to_string(),
                edge: "bot0_1".to_string(),
                type_id: "truck".to_string(),
                lane: 0,
                position: 95.0,
                speed: 10.0,
            })
            .unwrap();

        let result = env.step(&Action::Discrete(0)).unwrap();
        assert_eq!(result.info.reinsertions.len(), 1);
        assert_eq!(result.info.reinsertions[0].to_edge, "bot0_0");
        let vehicles = env.simulator().vehicles();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].edge, "bot0_0");
        assert_eq!(vehicles[0].type_id, "truck");
    }

    #[test]
    fn partial_mode_reports_observed_vehicles() {
        let mut config = config(2, 2);
        config.observation = ObservationConfig::Partial { num_observed: 2 };
        let mut env = env(config);
        env.simulator_mut().populate(20, 1);
        let len = env.observation_space().dim;
        assert_eq!(env.reset().unwrap().len(), len);

        let result = env.step(&Action::Discrete(0)).unwrap();
        assert_eq!(result.observation.len(), len);
        assert!(result.info.observed_ids.len() <= 4 * 2 * 4);
    }

    #[test]
    fn vec_env_steps_every_copy() {
        let config = config(1, 2);
        let mut envs = VecEnv::new(3, &config, |i| {
            let mut sim = InMemorySimulator::from_config(&config.grid)?;
            sim.populate(4, i as u64);
            Ok(sim)
        })
        .unwrap();
        assert_eq!(envs.num_envs(), 3);
        assert_eq!(envs.reset_all().unwrap().len(), 3);

        let actions = vec![Action::Discrete(3); 3];
        let results = envs.step(&actions).unwrap();
        assert!(results.iter().all(|r| r.info.switches == 2));
        assert!(envs.step(&actions[..2]).is_err());
        assert_eq!(envs.dones(), vec![false; 3]);
    }
}
