use crate::control_system::phases::Phase;
use crate::error::{GridEnvError, Result};
use crate::global_variables::DWELL_EPSILON;
use crate::simulation_engine::grid::Grid;
use crate::simulation_engine::intersections::{FlowDirection, IntersectionId};
use log::trace;
use serde::{Deserialize, Serialize};

/// Minimum dwell times, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub min_yellow_time: f64,
    pub min_green_time: f64,
}

/// Straight-lane counts used to render signal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLayout {
    pub horizontal: usize,
    pub vertical: usize,
}

/// Snapshot of one intersection's signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase: Phase,
    /// Seconds since `phase` began.
    pub dwell_time: f64,
    pub flow_direction: FlowDirection,
    pub is_yellow: bool,
}

impl PhaseState {
    fn entered(phase: Phase) -> Self {
        Self {
            phase,
            dwell_time: 0.0,
            flow_direction: phase.flow_direction(),
            is_yellow: phase.is_yellow(),
        }
    }
}

/// Signal state the caller must forward to the simulator before the next
/// physics step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCommand {
    pub intersection: IntersectionId,
    pub phase: Phase,
    pub state: String,
}

/// Per-intersection phase controller.
///
/// The 2-phase model (`step`) is what the environment drives: a switch
/// request on green starts the matching yellow, and a yellow always hands
/// over to the other direction once `min_yellow_time` has elapsed. The
/// protected-left phases are reachable through `request_phase`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseStateMachine {
    state: PhaseState,
    initial: Phase,
    timing: PhaseTiming,
    lanes: LaneLayout,
}

impl PhaseStateMachine {
    pub fn new(timing: PhaseTiming, lanes: LaneLayout) -> Self {
        Self {
            state: PhaseState::entered(Phase::VerticalGreen),
            initial: Phase::VerticalGreen,
            timing,
            lanes,
        }
    }

    /// Starts in (and resets to) the named phase.
    pub fn with_initial_phase(name: &str, timing: PhaseTiming, lanes: LaneLayout) -> Result<Self> {
        let initial: Phase = name.parse()?;
        Ok(Self {
            state: PhaseState::entered(initial),
            initial,
            timing,
            lanes,
        })
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn reset(&mut self) {
        self.state = PhaseState::entered(self.initial);
    }

    pub fn signal_state(&self) -> String {
        self.state
            .phase
            .signal_state(self.lanes.horizontal, self.lanes.vertical)
    }

    fn yellow_elapsed(&self) -> bool {
        self.state.dwell_time + DWELL_EPSILON >= self.timing.min_yellow_time
    }

    fn green_elapsed(&self) -> bool {
        self.state.dwell_time + DWELL_EPSILON >= self.timing.min_green_time
    }

    fn enter(&mut self, phase: Phase) -> Phase {
        trace!(
            "phase {} -> {} after {:.2}s",
            self.state.phase,
            phase,
            self.state.dwell_time
        );
        self.state = PhaseState::entered(phase);
        phase
    }

    /// Advances one simulation step of `dt` seconds. Returns the new phase
    /// when a transition happened.
    pub fn step(&mut self, switch: bool, dt: f64) -> Option<Phase> {
        let phase = self.state.phase;
        if phase.is_yellow() {
            self.state.dwell_time += dt;
            if self.yellow_elapsed() {
                return Some(self.enter(phase.no_repeat_successor()));
            }
            return None;
        }

        if switch && self.green_elapsed() {
            return Some(self.enter(phase.to_yellow()));
        }
        self.state.dwell_time += dt;
        None
    }

    /// Asks for `target` using the full phase table.
    ///
    /// From a green `X`, only `X` (hold) and `X`'s yellow are legal. From a
    /// yellow, any green is legal and is entered once the minimum yellow
    /// time has elapsed; asking for the green the yellow came from yields
    /// its no-repeat successor instead.
    pub fn request_phase(&mut self, target: Phase, dt: f64) -> Result<Option<Phase>> {
        let current = self.state.phase;

        if !current.is_yellow() {
            if target == current {
                self.state.dwell_time += dt;
                return Ok(None);
            }
            if target != current.to_yellow() {
                return Err(GridEnvError::invalid_transition(current.name(), target.name()));
            }
            if self.green_elapsed() {
                return Ok(Some(self.enter(target)));
            }
            self.state.dwell_time += dt;
            return Ok(None);
        }

        if target.is_yellow() && target != current {
            return Err(GridEnvError::invalid_transition(current.name(), target.name()));
        }
        self.state.dwell_time += dt;
        if !self.yellow_elapsed() {
            return Ok(None);
        }
        let next = if target == current || target == current.departed_green() {
            current.no_repeat_successor()
        } else {
            target
        };
        Ok(Some(self.enter(next)))
    }
}

/// One switch bit per intersection, in intersection id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchMask(pub Vec<bool>);

impl SwitchMask {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn switches(&self) -> usize {
        self.0.iter().filter(|&&bit| bit).count()
    }
}

/// Owns one `PhaseStateMachine` per intersection, indexed by
/// `IntersectionId`.
#[derive(Debug, Clone)]
pub struct TrafficLightController {
    machines: Vec<PhaseStateMachine>,
}

impl TrafficLightController {
    pub fn initialize(grid: &Grid, timing: PhaseTiming) -> Self {
        let lanes = LaneLayout {
            horizontal: grid.horizontal_lanes(),
            vertical: grid.vertical_lanes(),
        };
        let machines = grid
            .intersections()
            .map(|_| PhaseStateMachine::new(timing, lanes))
            .collect();
        Self { machines }
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// `None` when `id` comes from a larger grid.
    pub fn machine(&self, id: IntersectionId) -> Option<&PhaseStateMachine> {
        self.machines.get(id.index())
    }

    pub fn state(&self, id: IntersectionId) -> Option<&PhaseState> {
        self.machine(id).map(PhaseStateMachine::state)
    }

    pub fn states(&self) -> impl Iterator<Item = (IntersectionId, &PhaseState)> {
        self.machines
            .iter()
            .enumerate()
            .map(|(i, m)| (IntersectionId::new_unchecked(i), m.state()))
    }

    fn command(&self, index: usize) -> SignalCommand {
        let machine = &self.machines[index];
        SignalCommand {
            intersection: IntersectionId::new_unchecked(index),
            phase: machine.phase(),
            state: machine.signal_state(),
        }
    }

    /// Returns every intersection to its initial phase; the commands set the
    /// initial lights.
    pub fn reset(&mut self) -> Vec<SignalCommand> {
        for machine in &mut self.machines {
            machine.reset();
        }
        (0..self.machines.len()).map(|i| self.command(i)).collect()
    }

    /// Applies one 2-phase step to every intersection. Only intersections
    /// that changed phase produce a command.
    pub fn apply(&mut self, mask: &SwitchMask, dt: f64) -> Result<Vec<SignalCommand>> {
        if mask.len() != self.machines.len() {
            return Err(GridEnvError::InvalidAction(format!(
                "switch mask has {} bits for {} intersections",
                mask.len(),
                self.machines.len()
            )));
        }
        let mut commands = Vec::new();
        for (index, &switch) in mask.0.iter().enumerate() {
            if self.machines[index].step(switch, dt).is_some() {
                commands.push(self.command(index));
            }
        }
        Ok(commands)
    }

    /// Full-table request for one intersection.
    pub fn request_phase(
        &mut self,
        id: IntersectionId,
        target: Phase,
        dt: f64,
    ) -> Result<Option<SignalCommand>> {
        let machine_count = self.machines.len();
        let machine = self.machines.get_mut(id.index()).ok_or_else(|| {
            GridEnvError::invalid_edge(
                id.to_string(),
                format!("controller has {} intersections", machine_count),
            )
        })?;
        let changed = machine.request_phase(target, dt)?;
        Ok(changed.map(|_| self.command(id.index())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    const TIMING: PhaseTiming = PhaseTiming {
        min_yellow_time: 2.0,
        min_green_time: 0.0,
    };
    const ONE_LANE: LaneLayout = LaneLayout {
        horizontal: 1,
        vertical: 1,
    };

    #[test]
    fn starts_vertical_green() {
        let machine = PhaseStateMachine::new(TIMING, ONE_LANE);
        assert_eq!(machine.phase(), Phase::VerticalGreen);
        assert_eq!(machine.state().dwell_time, 0.0);
        assert!(!machine.state().is_yellow);
    }

    #[test]
    fn switch_goes_through_yellow_to_the_other_direction() {
        let mut machine = PhaseStateMachine::new(TIMING, ONE_LANE);
        assert_eq!(machine.step(true, 1.0), Some(Phase::VerticalGreenToYellow));
        assert_eq!(machine.state().dwell_time, 0.0);
        assert!(machine.state().is_yellow);

        assert_eq!(machine.step(false, 1.0), None);
        assert_eq!(machine.step(false, 1.0), Some(Phase::HorizontalGreen));
        assert_eq!(machine.state().dwell_time, 0.0);
        assert!(!machine.state().is_yellow);
        assert_eq!(machine.state().flow_direction, FlowDirection::Horizontal);
    }

    #[test]
    fn switch_requests_during_yellow_are_ignored() {
        let mut machine = PhaseStateMachine::new(
            PhaseTiming {
                min_yellow_time: 3.0,
                min_green_time: 0.0,
            },
            ONE_LANE,
        );
        machine.step(true, 1.0);
        assert_eq!(machine.step(true, 1.0), None);
        assert_eq!(machine.step(true, 1.0), None);
        assert_eq!(machine.phase(), Phase::VerticalGreenToYellow);
        assert_eq!(machine.step(true, 1.0), Some(Phase::HorizontalGreen));
    }

    #[test]
    fn dwell_increases_strictly_and_resets_on_transition() {
        let mut machine = PhaseStateMachine::new(TIMING, ONE_LANE);
        let actions = [false, false, true, false, false, false, true, true, false, false];
        let mut previous = machine.state().dwell_time;
        for switch in actions {
            let transitioned = machine.step(switch, 0.5).is_some();
            let dwell = machine.state().dwell_time;
            assert!(dwell >= 0.0);
            if transitioned {
                assert_eq!(dwell, 0.0);
            } else {
                assert!(dwell > previous);
            }
            previous = dwell;
        }
    }

    #[test]
    fn fractional_steps_reach_the_yellow_threshold() {
        let mut machine = PhaseStateMachine::new(TIMING, ONE_LANE);
        machine.step(true, 0.1);
        let mut steps = 0;
        while machine.step(false, 0.1).is_none() {
            steps += 1;
            assert!(steps < 20, "yellow outlived its minimum");
        }
        assert_eq!(steps + 1, 20);
    }

    #[test]
    fn minimum_green_time_gates_switching() {
        let mut machine = PhaseStateMachine::new(
            PhaseTiming {
                min_yellow_time: 1.0,
                min_green_time: 2.0,
            },
            ONE_LANE,
        );
        assert_eq!(machine.step(true, 1.0), None);
        assert_eq!(machine.step(true, 1.0), None);
        assert_eq!(machine.step(true, 1.0), Some(Phase::VerticalGreenToYellow));
    }

    #[test]
    fn request_phase_enforces_adjacency() {
        let mut machine = PhaseStateMachine::new(TIMING, ONE_LANE);
        assert!(matches!(
            machine.request_phase(Phase::HorizontalGreen, 1.0),
            Err(GridEnvError::InvalidTransition { .. })
        ));
        assert!(matches!(
            machine.request_phase(Phase::ProtectedLeftTopToYellow, 1.0),
            Err(GridEnvError::InvalidTransition { .. })
        ));
        assert_eq!(machine.request_phase(Phase::VerticalGreen, 1.0).unwrap(), None);
        assert_eq!(
            machine.request_phase(Phase::VerticalGreenToYellow, 1.0).unwrap(),
            Some(Phase::VerticalGreenToYellow)
        );
        assert!(matches!(
            machine.request_phase(Phase::HorizontalGreenToYellow, 1.0),
            Err(GridEnvError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn leaving_yellow_never_repeats_the_departed_green() {
        let mut machine = PhaseStateMachine::with_initial_phase("protected_left_right", TIMING, ONE_LANE)
            .unwrap();
        machine
            .request_phase(Phase::ProtectedLeftRightToYellow, 1.0)
            .unwrap();
        assert_eq!(machine.request_phase(Phase::ProtectedLeftRight, 1.0).unwrap(), None);
        assert_eq!(
            machine.request_phase(Phase::ProtectedLeftRight, 1.0).unwrap(),
            Some(Phase::ProtectedLeftBottom)
        );
    }

    #[test]
    fn yellow_can_hand_over_to_any_other_green() {
        let mut machine = PhaseStateMachine::new(TIMING, ONE_LANE);
        machine.step(true, 1.0);
        machine.request_phase(Phase::ProtectedLeftLeft, 1.0).unwrap();
        assert_eq!(
            machine.request_phase(Phase::ProtectedLeftLeft, 1.0).unwrap(),
            Some(Phase::ProtectedLeftLeft)
        );
        assert_eq!(machine.state().flow_direction, FlowDirection::Horizontal);
    }

    #[test]
    fn unknown_initial_phase_is_rejected() {
        assert!(matches!(
            PhaseStateMachine::with_initial_phase("all_red", TIMING, ONE_LANE),
            Err(GridEnvError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn controller_emits_commands_only_for_transitions() {
        let grid = Grid::from_config(&GridConfig {
            rows: 1,
            cols: 3,
            ..GridConfig::default()
        })
        .unwrap();
        let mut controller = TrafficLightController::initialize(&grid, TIMING);
        let initial = controller.reset();
        assert_eq!(initial.len(), 3);
        assert!(initial.iter().all(|c| c.state == "GGrgrrGGrgrr"));

        let commands = controller
            .apply(&SwitchMask(vec![false, true, false]), 1.0)
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].intersection.to_string(), "center1");
        assert_eq!(commands[0].phase, Phase::VerticalGreenToYellow);

        assert!(controller.apply(&SwitchMask(vec![true]), 1.0).is_err());
    }

    #[test]
    fn ids_from_a_larger_grid_are_not_found() {
        let small = Grid::from_config(&GridConfig {
            rows: 1,
            cols: 2,
            ..GridConfig::default()
        })
        .unwrap();
        let large = Grid::from_config(&GridConfig {
            rows: 3,
            cols: 3,
            ..GridConfig::default()
        })
        .unwrap();
        let mut controller = TrafficLightController::initialize(&small, TIMING);
        let outside = large.intersection(8).unwrap();

        assert!(controller.state(outside).is_none());
        assert!(controller.machine(outside).is_none());
        assert!(matches!(
            controller.request_phase(outside, Phase::VerticalGreenToYellow, 1.0),
            Err(GridEnvError::InvalidEdge { .. })
        ));
        let inside = small.intersection(1).unwrap();
        assert_eq!(controller.state(inside).map(|s| s.phase), Some(Phase::VerticalGreen));
    }
}
