//! Q-learning agent.
use super::{QLearningConfig, QTable, QTABLE_FILE};
use anyhow::{anyhow, Result};
use campus_core::{
    record::{Record, RecordValue},
    stats,
    trajectory::Trajectory,
    Agent, Env, MultiDiscrete, Obs, Policy, Sample, Transition,
};
use log::{debug, warn};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::path::Path;

/// Q-learning agent.
///
/// Observations are discrete levels; the table row of an observation is its
/// flattened index in the observation space. The table is updated online
/// after every step with
///
/// ```text
/// Q(s, a) <- (1 - alpha) * Q(s, a) + alpha * (r + gamma * max_a' Q(s', a'))
/// ```
///
/// In training mode actions are ε-greedy with the exploration rate set by
/// the trainer. In evaluation mode actions are greedy.
pub struct QLearning {
    config: QLearningConfig,
    table: QTable,
    obs_space: MultiDiscrete,
    rng: SmallRng,
    train: bool,
    exploration_rate: f64,
    predicted: Vec<f32>,
    td_errors: Vec<f32>,
}

impl QLearning {
    /// Constructs an agent with a table of zeros.
    pub fn build(config: QLearningConfig, obs_space: MultiDiscrete, n_actions: usize) -> Result<Self> {
        config.validate()?;
        let table = QTable::new(obs_space.size(), n_actions);
        debug!(
            "Q-table with {} states and {} actions",
            table.n_states(),
            table.n_actions()
        );
        Ok(Self {
            rng: SmallRng::seed_from_u64(config.seed),
            exploration_rate: config.exploration_rate,
            config,
            table,
            obs_space,
            train: false,
            predicted: Vec::new(),
            td_errors: Vec::new(),
        })
    }

    /// Constructs an agent for the spaces of `env`.
    pub fn for_env<E: Env>(config: QLearningConfig, env: &E) -> Result<Self> {
        Self::build(
            config,
            env.observation_space().clone(),
            env.action_space().size(),
        )
    }

    /// The action-value table.
    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// Current exploration rate.
    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// Row of the table for an observation.
    ///
    /// Fails if a feature is not one of the levels of the observation space.
    pub fn state_index<O: Obs>(&self, obs: &O) -> Result<usize> {
        let levels = obs
            .features()
            .into_iter()
            .map(|f| {
                if f.is_finite() && f >= 0.0 && f.fract() == 0.0 {
                    Ok(f as usize)
                } else {
                    Err(anyhow!("Observation feature {} is not a level", f))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.obs_space.encode(&levels)?)
    }

    /// Applies the update to `(state, action)` and returns the new value.
    pub fn update(&mut self, state: usize, action: usize, reward: f32, next_state: usize) -> f32 {
        let alpha = self.config.learning_rate as f32;
        let gamma = self.config.discount_factor as f32;
        let old = self.table.get(state, action);
        let target = reward + gamma * self.table.max(next_state);
        let new = (1.0 - alpha) * old + alpha * target;
        self.table.set(state, action, new);
        self.td_errors.push(target - old);
        new
    }

    /// Probability of `act` under the ε-greedy policy, as a log.
    fn log_prob(&self, state: usize, act: usize) -> f32 {
        let eps = self.exploration_rate as f32;
        let n = self.table.n_actions() as f32;
        let greedy = if act == self.table.argmax(state) {
            1.0 - eps
        } else {
            0.0
        };
        (eps / n + greedy).ln()
    }
}

impl<E: Env> Policy<E> for QLearning {
    fn sample(&mut self, obs: &E::Obs) -> Result<Sample> {
        let state = self.state_index(obs)?;
        let act = if self.train && self.rng.gen::<f64>() <= self.exploration_rate {
            self.rng.gen_range(0..self.table.n_actions())
        } else {
            self.table.argmax(state)
        };
        let log_prob = if self.train {
            self.log_prob(state, act)
        } else {
            0.0
        };
        Ok(Sample {
            act,
            log_prob,
            value: self.table.get(state, act),
        })
    }
}

impl<E: Env> Agent<E> for QLearning {
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn observe(&mut self, transition: &Transition<E>) -> Result<()> {
        let state = self.state_index(transition.obs)?;
        let next_state = self.state_index(transition.next_obs)?;
        let q = self.update(state, transition.act, transition.reward, next_state);
        self.predicted.push(q);
        Ok(())
    }

    /// Reports the episode. The table itself is updated in
    /// [`Agent::observe`].
    ///
    /// The record contains `loss`, the mean squared temporal-difference
    /// error, `explained_variance` of the rewards by the updated values of
    /// the taken actions, and `exploration_rate`.
    fn opt(&mut self, trajectory: &Trajectory<E>) -> Result<Record> {
        let predicted = std::mem::take(&mut self.predicted);
        let td_errors = std::mem::take(&mut self.td_errors);
        let mut record = Record::from_scalar("exploration_rate", self.exploration_rate as f32);

        if predicted.len() != trajectory.len() {
            warn!(
                "{} updates for {} steps, skipping the report",
                predicted.len(),
                trajectory.len()
            );
            return Ok(record);
        }
        if !td_errors.is_empty() {
            let mse = td_errors.iter().map(|e| e * e).sum::<f32>() / td_errors.len() as f32;
            record.insert("loss", RecordValue::Scalar(mse));
        }
        let ev = stats::explained_variance(&trajectory.rewards, &predicted)?;
        record.insert("explained_variance", RecordValue::Scalar(ev as f32));
        Ok(record)
    }

    fn set_exploration_rate(&mut self, rate: f64) {
        self.exploration_rate = rate;
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        self.table.save(path.join(QTABLE_FILE))
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        let table = QTable::load(path.join(QTABLE_FILE))?;
        if (table.n_states(), table.n_actions()) != (self.table.n_states(), self.table.n_actions()) {
            return Err(anyhow!(
                "Q-table of shape {}x{} does not fit {}x{}",
                table.n_states(),
                table.n_actions(),
                self.table.n_states(),
                self.table.n_actions()
            ));
        }
        self.table = table;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> QLearning {
        let config = QLearningConfig::default()
            .learning_rate(0.5)
            .discount_factor(0.9);
        QLearning::build(config, MultiDiscrete::new(vec![2, 2]).unwrap(), 3).unwrap()
    }

    #[test]
    fn test_update_closed_form() {
        let mut agent = agent();
        // 0.5 * 0 + 0.5 * (12 + 0.9 * 0)
        assert_eq!(agent.update(1, 2, 12.0, 1), 6.0);
        // 0.5 * 6 + 0.5 * (12 + 0.9 * 6)
        assert!((agent.update(1, 2, 12.0, 1) - 11.7).abs() < 1e-5);
        assert_eq!(agent.table().argmax(1), 2);
        assert_eq!(agent.table().get(0, 0), 0.0);
    }

    #[test]
    fn test_log_prob_of_epsilon_greedy() {
        let mut agent = agent();
        agent.update(0, 1, 1.0, 0);
        agent.exploration_rate = 0.3;
        assert!((agent.log_prob(0, 1) - (0.1f32 + 0.7).ln()).abs() < 1e-6);
        assert!((agent.log_prob(0, 0) - 0.1f32.ln()).abs() < 1e-6);
    }
}
