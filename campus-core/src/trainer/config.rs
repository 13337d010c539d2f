//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The maximum number of episodes.
    pub max_episodes: usize,

    /// Interval of saving checkpoints in episodes. `0` disables checkpoints.
    pub checkpoint_interval: usize,

    /// Number of episodes in the moving window of the stopping criterion.
    pub moving_average_window: usize,

    /// Training stops when the standard deviation of the average per-step
    /// rewards in the moving window falls below this value.
    pub stopping_criterion: Option<f64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_episodes: 0,
            checkpoint_interval: 0,
            moving_average_window: 100,
            stopping_criterion: None,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the interval of saving checkpoints in episodes.
    pub fn checkpoint_interval(mut self, v: usize) -> Self {
        self.checkpoint_interval = v;
        self
    }

    /// Sets the size of the moving window of the stopping criterion.
    pub fn moving_average_window(mut self, v: usize) -> Self {
        self.moving_average_window = v;
        self
    }

    /// Sets the stopping criterion.
    pub fn stopping_criterion(mut self, v: Option<f64>) -> Self {
        self.stopping_criterion = v;
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trainer_config() -> Result<()> {
        let config = TrainerConfig::default()
            .max_episodes(300)
            .checkpoint_interval(50)
            .moving_average_window(20)
            .stopping_criterion(Some(0.01));

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer_config.yaml");
        config.save(&path)?;
        let config_ = TrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
