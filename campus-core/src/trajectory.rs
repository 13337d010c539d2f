//! Episode trajectories and generalized advantage estimation.
use crate::{error::CampusError, Env};

/// Interaction sequence of one episode.
///
/// All per-step sequences have the same length. `last_obs` is the
/// observation after the final step, used to bootstrap value estimates.
pub struct Trajectory<E: Env> {
    /// Observations on which actions were chosen.
    pub obs: Vec<E::Obs>,

    /// Flattened action indices.
    pub actions: Vec<usize>,

    /// Log-probabilities of the actions under the sampling policy.
    pub log_probs: Vec<f32>,

    /// Rewards.
    pub rewards: Vec<f32>,

    /// Value estimates of `obs`.
    pub values: Vec<f32>,

    /// Terminated or truncated after the step.
    pub dones: Vec<bool>,

    /// Observation after the final step.
    pub last_obs: E::Obs,
}

impl<E: Env> Trajectory<E> {
    /// Creates an empty trajectory starting from `init_obs`.
    pub fn new(init_obs: E::Obs) -> Self {
        Self {
            obs: Vec::new(),
            actions: Vec::new(),
            log_probs: Vec::new(),
            rewards: Vec::new(),
            values: Vec::new(),
            dones: Vec::new(),
            last_obs: init_obs,
        }
    }

    /// Appends a step. `next_obs` becomes the last observation.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        obs: E::Obs,
        act: usize,
        log_prob: f32,
        reward: f32,
        value: f32,
        done: bool,
        next_obs: E::Obs,
    ) {
        self.obs.push(obs);
        self.actions.push(act);
        self.log_probs.push(log_prob);
        self.rewards.push(reward);
        self.values.push(value);
        self.dones.push(done);
        self.last_obs = next_obs;
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if no step has been pushed.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Sum of rewards.
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }

    /// Checks that every per-step sequence has the same length.
    pub fn validate(&self) -> Result<(), CampusError> {
        let n = self.rewards.len();
        CampusError::check_len("obs", n, self.obs.len())?;
        CampusError::check_len("actions", n, self.actions.len())?;
        CampusError::check_len("log_probs", n, self.log_probs.len())?;
        CampusError::check_len("values", n, self.values.len())?;
        CampusError::check_len("dones", n, self.dones.len())
    }
}

/// Generalized advantage estimation.
///
/// Processes the episode backward:
///
/// ```text
/// delta_i = r_i + gamma * v_{i+1} * (1 - d_i) - v_i
/// gae_i   = delta_i + gamma * lambda * (1 - d_i) * gae_{i+1}
/// ```
///
/// where `v_{n} = next_value`.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    next_value: f32,
    gamma: f32,
    lambda: f32,
) -> Result<Vec<f32>, CampusError> {
    let n = rewards.len();
    CampusError::check_len("values", n, values.len())?;
    CampusError::check_len("dones", n, dones.len())?;

    let mut advantages = vec![0f32; n];
    let mut gae = 0f32;
    for i in (0..n).rev() {
        let not_done = if dones[i] { 0.0 } else { 1.0 };
        let v_next = if i + 1 < n { values[i + 1] } else { next_value };
        let delta = rewards[i] + gamma * v_next * not_done - values[i];
        gae = delta + gamma * lambda * not_done * gae;
        advantages[i] = gae;
    }
    Ok(advantages)
}

/// Returns `advantages[i] + values[i]`.
pub fn compute_returns(advantages: &[f32], values: &[f32]) -> Result<Vec<f32>, CampusError> {
    CampusError::check_len("values", advantages.len(), values.len())?;
    Ok(advantages
        .iter()
        .zip(values.iter())
        .map(|(a, v)| a + v)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_terminal_step() {
        let adv = compute_gae(&[3.0], &[1.25], &[true], 100.0, 0.99, 0.95).unwrap();
        assert_eq!(adv, vec![3.0 - 1.25]);
    }

    #[test]
    fn test_zero_discount_is_td_residual() {
        let rewards = [1.0, -2.0, 0.5, 4.0];
        let values = [0.5, 0.25, -1.0, 2.0];
        let dones = [false, false, false, false];
        let adv = compute_gae(&rewards, &values, &dones, 10.0, 0.0, 0.0).unwrap();
        for i in 0..4 {
            assert_eq!(adv[i], rewards[i] - values[i]);
        }
    }

    #[test]
    fn test_bootstrap_on_last_step() {
        // gamma = 1, lambda = 0: one-step TD residual including bootstrap
        let adv = compute_gae(&[1.0, 1.0], &[0.0, 0.0], &[false, false], 5.0, 1.0, 0.0).unwrap();
        assert_eq!(adv, vec![1.0, 6.0]);
    }

    #[test]
    fn test_monte_carlo_limit() {
        // gamma = lambda = 1 with zero values: advantages are reward-to-go
        let adv = compute_gae(
            &[1.0, 2.0, 3.0],
            &[0.0, 0.0, 0.0],
            &[false, false, true],
            7.0,
            1.0,
            1.0,
        )
        .unwrap();
        assert_eq!(adv, vec![6.0, 5.0, 3.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let err = compute_gae(&[1.0, 2.0], &[0.0], &[false, false], 0.0, 0.9, 0.9).unwrap_err();
        assert_eq!(
            err,
            CampusError::LengthMismatch {
                what: "values",
                expected: 2,
                actual: 1
            }
        );
        assert!(compute_returns(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_returns() {
        assert_eq!(
            compute_returns(&[1.0, -1.0], &[0.5, 0.5]).unwrap(),
            vec![1.5, -0.5]
        );
    }
}
