//! Configuration of the PPO agent.
use crate::Device;
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

/// Configuration of [`Ppo`](super::Ppo).
///
/// Stored in YAML files under the `agent` key.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoConfig {
    /// The maximum number of training episodes.
    pub max_episodes: usize,

    /// Initial learning rate of the Adam optimizer.
    pub learning_rate: f64,

    /// Discount factor.
    pub discount_factor: f64,

    /// Initial exploration rate.
    pub exploration_rate: f64,

    /// Exploration rate at the end of the schedule.
    pub min_exploration_rate: f64,

    /// Clipping range of the policy ratio.
    pub clip_epsilon: f64,

    /// Number of passes over the episode in an update.
    pub epochs: usize,

    /// Number of steps in a minibatch.
    pub batch_size: usize,

    /// Decay of generalized advantage estimation.
    pub gae_lambda: f64,

    /// Width of the hidden layers.
    pub hidden_units: usize,

    /// Number of the decay law of the exploration rate, in `1..=20`.
    pub e_decay_function: u32,

    /// Interval of saving checkpoints in episodes. `0` disables checkpoints.
    pub checkpoint_interval: usize,

    /// Factor applied to the learning rate every
    /// [`LR_DECAY_INTERVAL`](super::LR_DECAY_INTERVAL) updates.
    pub learning_rate_decay: f64,

    /// Temperature of the softmax of the policy head.
    pub softmax_temperature: f64,

    /// Number of episodes in the moving window of the stopping criterion.
    #[serde(default = "default_moving_average_window")]
    pub moving_average_window: usize,

    /// Threshold of the stopping criterion, `None` to disable it.
    #[serde(default = "default_stopping_criterion")]
    pub stopping_criterion: Option<f64>,

    /// Random seed.
    #[serde(default)]
    pub seed: u64,

    /// Device of the network.
    #[serde(default)]
    pub device: Device,
}

fn default_moving_average_window() -> usize {
    100
}

fn default_stopping_criterion() -> Option<f64> {
    Some(0.01)
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            max_episodes: 300,
            learning_rate: 1e-3,
            discount_factor: 0.99,
            exploration_rate: 1.0,
            min_exploration_rate: 0.01,
            clip_epsilon: 0.2,
            epochs: 4,
            batch_size: 64,
            gae_lambda: 0.95,
            hidden_units: 64,
            e_decay_function: 1,
            checkpoint_interval: 0,
            learning_rate_decay: 0.9,
            softmax_temperature: 1.0,
            moving_average_window: default_moving_average_window(),
            stopping_criterion: default_stopping_criterion(),
            seed: 0,
            device: Device::Cpu,
        }
    }
}

#[derive(Serialize)]
struct Section<'a> {
    agent: &'a PpoConfig,
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<(), CampusError> {
    if ok {
        Ok(())
    } else {
        Err(CampusError::Config(msg()))
    }
}

impl PpoConfig {
    /// Sets the number of episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.learning_rate = v;
        self
    }

    /// Sets the number of epochs of an update.
    pub fn epochs(mut self, v: usize) -> Self {
        self.epochs = v;
        self
    }

    /// Sets the minibatch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the width of the hidden layers.
    pub fn hidden_units(mut self, v: usize) -> Self {
        self.hidden_units = v;
        self
    }

    /// Sets the decay law of the exploration rate.
    pub fn e_decay_function(mut self, v: u32) -> Self {
        self.e_decay_function = v;
        self
    }

    /// Sets the checkpoint interval.
    pub fn checkpoint_interval(mut self, v: usize) -> Self {
        self.checkpoint_interval = v;
        self
    }

    /// Sets the stopping criterion.
    pub fn stopping_criterion(mut self, v: Option<f64>) -> Self {
        self.stopping_criterion = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Checks the ranges of the values.
    pub fn validate(&self) -> Result<(), CampusError> {
        DecayLaw::try_from(self.e_decay_function)?;
        check(self.learning_rate > 0.0, || {
            format!("learning_rate must be positive, got {}", self.learning_rate)
        })?;
        check((0.0..=1.0).contains(&self.discount_factor), || {
            format!("discount_factor must be in [0, 1], got {}", self.discount_factor)
        })?;
        check((0.0..=1.0).contains(&self.gae_lambda), || {
            format!("gae_lambda must be in [0, 1], got {}", self.gae_lambda)
        })?;
        check(self.clip_epsilon > 0.0 && self.clip_epsilon < 1.0, || {
            format!("clip_epsilon must be in (0, 1), got {}", self.clip_epsilon)
        })?;
        check(self.epochs > 0, || "epochs must be positive".to_string())?;
        check(self.batch_size > 0, || "batch_size must be positive".to_string())?;
        check(self.hidden_units > 0, || {
            "hidden_units must be positive".to_string()
        })?;
        check(self.softmax_temperature > 0.0, || {
            format!(
                "softmax_temperature must be positive, got {}",
                self.softmax_temperature
            )
        })?;
        check(
            self.learning_rate_decay > 0.0 && self.learning_rate_decay <= 1.0,
            || {
                format!(
                    "learning_rate_decay must be in (0, 1], got {}",
                    self.learning_rate_decay
                )
            },
        )?;
        check(self.min_exploration_rate <= self.exploration_rate, || {
            format!(
                "min_exploration_rate ({}) exceeds exploration_rate ({})",
                self.min_exploration_rate, self.exploration_rate
            )
        })
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

    /// Loads and validates the `agent` section of a YAML file.
    ///
    /// `overrides` has the layout of the file and is deep-merged into it.
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    const YAML: &str = r#"
agent:
  max_episodes: 10
  learning_rate: 0.001
  discount_factor: 0.9
  exploration_rate: 1.0
  min_exploration_rate: 0.1
  clip_epsilon: 0.2
  epochs: 2
  batch_size: 4
  gae_lambda: 0.95
  hidden_units: 16
  e_decay_function: 9
  checkpoint_interval: 5
  learning_rate_decay: 0.9
  softmax_temperature: 1.0
"#;

    #[test]
    fn test_load_and_save() -> Result<()> {
        let dir = TempDir::new("ppo_config")?;
        let path = dir.path().join("ppo.yaml");
        std::fs::write(&path, YAML)?;
        let config = PpoConfig::load(&path, None)?;
        assert_eq!(config.e_decay_function, 9);
        assert_eq!(config.moving_average_window, 100);
        assert_eq!(config.stopping_criterion, Some(0.01));
        assert_eq!(config.decay()?.law(), DecayLaw::Stepwise);

        let path2 = dir.path().join("ppo2.yaml");
        config.save(&path2)?;
        assert_eq!(PpoConfig::load(&path2, None)?, config);
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let dir = TempDir::new("ppo_config")?;
        let path = dir.path().join("ppo.yaml");
        std::fs::write(&path, YAML)?;
        let overrides: Value = serde_yaml::from_str("agent:\n  max_episodes: 3\n  seed: 7\n")?;
        let config = PpoConfig::load(&path, Some(&overrides))?;
        assert_eq!(config.max_episodes, 3);
        assert_eq!(config.seed, 7);
        assert_eq!(config.batch_size, 4);
        Ok(())
    }

    #[test]
    fn test_missing_key() -> Result<()> {
        let dir = TempDir::new("ppo_config")?;
        let path = dir.path().join("ppo.yaml");
        std::fs::write(&path, YAML.replace("  gae_lambda: 0.95\n", ""))?;
        let err = PpoConfig::load(&path, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CampusError>(),
            Some(CampusError::Config(_))
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_decay_function() {
        let config = PpoConfig::default().e_decay_function(21);
        assert_eq!(
            config.validate(),
            Err(CampusError::InvalidDecayFunction(21))
        );
        assert!(PpoConfig::default().validate().is_ok());
        assert!(PpoConfig::default().batch_size(0).validate().is_err());
    }
}
