//! Configuration of the Q-learning agent.
use anyhow::Result;
use campus_core::{
    config,
    decay::{DecayLaw, ExplorationDecay},
    error::CampusError,
    TrainerConfig,
};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::{convert::TryFrom, fs::File, io::Write, path::Path};

/// Configuration of [`QLearning`](super::QLearning), stored under the `agent`
/// key.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct QLearningConfig {
    /// The maximum number of training episodes.
    pub max_episodes: usize,

    /// Step size of the table update.
    pub learning_rate: f64,

    /// Discount factor.
    pub discount_factor: f64,

    /// Initial exploration rate.
    pub exploration_rate: f64,

    /// Exploration rate at the end of the schedule.
    pub min_exploration_rate: f64,

    /// Number of the decay law of the exploration rate, in `1..=20`.
    pub e_decay_function: u32,

    /// Interval of saving checkpoints in episodes. `0` disables checkpoints.
    pub checkpoint_interval: usize,

    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: usize,

    #[serde(default = "default_stopping_criterion")]
    pub stopping_criterion: Option<f64>,

    #[serde(default)]
    pub seed: u64,
}

fn default_moving_average_window() -> usize {
    50
}

fn default_stopping_criterion() -> Option<f64> {
    Some(0.01)
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            max_episodes: 1000,
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 1.0,
            min_exploration_rate: 0.01,
            e_decay_function: 1,
            checkpoint_interval: 0,
            moving_average_window: default_moving_average_window(),
            stopping_criterion: default_stopping_criterion(),
            seed: 0,
        }
    }
}

#[derive(Serialize)]
struct Section<'a> {
    agent: &'a QLearningConfig,
}

impl QLearningConfig {
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    pub fn learning_rate(mut self, v: f64) -> Self {
        self.learning_rate = v;
        self
    }

    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    pub fn exploration_rate(mut self, v: f64) -> Self {
        self.exploration_rate = v;
        self
    }

    pub fn min_exploration_rate(mut self, v: f64) -> Self {
        self.min_exploration_rate = v;
        self
    }

    pub fn e_decay_function(mut self, v: u32) -> Self {
        self.e_decay_function = v;
        self
    }

    pub fn checkpoint_interval(mut self, v: usize) -> Self {
        self.checkpoint_interval = v;
        self
    }

    pub fn stopping_criterion(mut self, v: Option<f64>) -> Self {
        self.stopping_criterion = v;
        self
    }

    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Checks the ranges of the values.
    pub fn validate(&self) -> Result<(), CampusError> {
        DecayLaw::try_from(self.e_decay_function)?;
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(CampusError::Config(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(CampusError::Config(format!(
                "discount_factor must be in [0, 1], got {}",
                self.discount_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration_rate)
            || self.min_exploration_rate > self.exploration_rate
        {
            return Err(CampusError::Config(format!(
                "invalid exploration rates: {} to {}",
                self.exploration_rate, self.min_exploration_rate
            )));
        }
        Ok(())
    }

    /// Exploration-rate schedule.
    pub fn decay(&self) -> Result<ExplorationDecay, CampusError> {
        ExplorationDecay::from_id(
            self.max_episodes,
            self.min_exploration_rate,
            self.exploration_rate,
            self.e_decay_function,
        )
    }

    /// Configuration of the training loop.
    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig::default()
            .max_episodes(self.max_episodes)
            .checkpoint_interval(self.checkpoint_interval)
            .moving_average_window(self.moving_average_window)
            .stopping_criterion(self.stopping_criterion)
    }

    /// Loads and validates the `agent` section of a YAML file, deep-merging
    /// `overrides` first.
    pub fn load(path: impl AsRef<Path>, overrides: Option<&Value>) -> Result<Self> {
        let config: Self = config::load_section(path, "agent", overrides)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration under the `agent` key.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&Section { agent: self })?.as_bytes())?;
        Ok(())
    }
}
