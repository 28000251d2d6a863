// action.rs
//
// Agent actions and their translation into per-intersection switch requests.

use crate::control_system::traffic_light_controller::SwitchMask;
use crate::error::{GridEnvError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Integer in `[0, 2^n)`; the most significant of the `n` bits drives
    /// intersection 0.
    Discrete(u64),
    /// One value per intersection; positive values request a switch.
    Continuous(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionSpace {
    Discrete { n: u64 },
    Box { low: f64, high: f64, dim: usize },
}

impl ActionSpace {
    pub fn for_grid(num_intersections: usize, discrete: bool) -> Self {
        if discrete {
            ActionSpace::Discrete {
                n: 1u64 << num_intersections,
            }
        } else {
            ActionSpace::Box {
                low: -1.0,
                high: 1.0,
                dim: num_intersections,
            }
        }
    }

    /// Number of intersections the space addresses.
    pub fn num_intersections(&self) -> usize {
        match self {
            ActionSpace::Discrete { n } => n.trailing_zeros() as usize,
            ActionSpace::Box { dim, .. } => *dim,
        }
    }

    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (ActionSpace::Discrete { n }, Action::Discrete(value)) => value < n,
            (ActionSpace::Box { low, high, dim }, Action::Continuous(values)) => {
                values.len() == *dim && values.iter().all(|v| (*low..=*high).contains(v))
            }
            _ => false,
        }
    }

    pub fn decode(&self, action: &Action) -> Result<SwitchMask> {
        if !self.contains(action) {
            return Err(GridEnvError::InvalidAction(format!(
                "{action:?} is outside {self:?}"
            )));
        }
        let bits = match action {
            Action::Discrete(value) => {
                let n = self.num_intersections();
                (0..n).map(|i| (value >> (n - 1 - i)) & 1 == 1).collect()
            }
            Action::Continuous(values) => values.iter().map(|&v| v > 0.0).collect(),
        };
        Ok(SwitchMask(bits))
    }

    /// Uniformly random action, used by the rollout driver.
    pub fn sample<R: rand::Rng>(&self, rng: &mut R) -> Action {
        match self {
            ActionSpace::Discrete { n } => Action::Discrete(rng.random_range(0..*n)),
            ActionSpace::Box { low, high, dim } => {
                Action::Continuous((0..*dim).map(|_| rng.random_range(*low..=*high)).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn three_lights_decode_msb_first() {
        let space = ActionSpace::for_grid(3, true);
        assert_eq!(space, ActionSpace::Discrete { n: 8 });
        let decode = |v| space.decode(&Action::Discrete(v)).unwrap().0;
        assert_eq!(decode(0), vec![false, false, false]);
        assert_eq!(decode(1), vec![false, false, true]);
        assert_eq!(decode(4), vec![true, false, false]);
        assert_eq!(decode(6), vec![true, true, false]);
        assert_eq!(decode(7), vec![true, true, true]);
        assert!(matches!(
            space.decode(&Action::Discrete(8)),
            Err(GridEnvError::InvalidAction(_))
        ));
    }

    #[test]
    fn continuous_values_threshold_at_zero() {
        let space = ActionSpace::for_grid(4, false);
        let mask = space
            .decode(&Action::Continuous(vec![0.7, 0.0, -0.3, 1e-3]))
            .unwrap();
        assert_eq!(mask.0, vec![true, false, false, true]);
        assert_eq!(mask.switches(), 2);
        assert!(space.decode(&Action::Continuous(vec![1.0; 3])).is_err());
        assert!(space.decode(&Action::Continuous(vec![-1.0, 1.0, 0.0, 0.0])).is_ok());
        assert!(matches!(
            space.decode(&Action::Continuous(vec![7.5, 0.0, 0.0, 0.0])),
            Err(GridEnvError::InvalidAction(_))
        ));
        assert!(space.decode(&Action::Continuous(vec![0.0, f64::NAN, 0.0, 0.0])).is_err());
        assert!(space.decode(&Action::Continuous(vec![f64::NEG_INFINITY, 0.0, 0.0, 0.0])).is_err());
        assert!(space.decode(&Action::Discrete(0)).is_err());
    }

    #[test]
    fn sampled_actions_are_in_the_space() {
        let mut rng = StdRng::seed_from_u64(5);
        for space in [ActionSpace::for_grid(6, true), ActionSpace::for_grid(6, false)] {
            assert_eq!(space.num_intersections(), 6);
            for _ in 0..50 {
                assert!(space.contains(&space.sample(&mut rng)));
            }
        }
    }
}
