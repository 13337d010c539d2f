//! Configuration of [`CampusEnv`](crate::CampusEnv).
use crate::CampusParams;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`CampusEnv`](crate::CampusEnv).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CampusEnvConfig {
    /// Parameters of the campus.
    pub params: CampusParams,

    /// Number of steps after which an episode is truncated.
    pub episode_length: usize,

    /// Infection level of every course on reset.
    pub initial_level: usize,

    /// Reward of a step before penalties.
    pub base_reward: f32,

    /// Penalty of each occupancy level of each course.
    pub penalty_per_level: f32,
}

impl Default for CampusEnvConfig {
    fn default() -> Self {
        Self {
            params: CampusParams::uniform(4, 0.5),
            episode_length: 10,
            initial_level: 1,
            base_reward: 20.0,
            penalty_per_level: 2.0,
        }
    }
}

impl CampusEnvConfig {
    /// Sets the parameters of the campus.
    pub fn params(mut self, v: CampusParams) -> Self {
        self.params = v;
        self
    }

    /// Sets the episode length.
    pub fn episode_length(mut self, v: usize) -> Self {
        self.episode_length = v;
        self
    }

    /// Sets the initial infection level.
    pub fn initial_level(mut self, v: usize) -> Self {
        self.initial_level = v;
        self
    }

    /// Sets the base reward.
    pub fn base_reward(mut self, v: f32) -> Self {
        self.base_reward = v;
        self
    }

    /// Sets the penalty per occupancy level.
    pub fn penalty_per_level(mut self, v: f32) -> Self {
        self.penalty_per_level = v;
        self
    }

    /// Constructs [`CampusEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CampusEnvConfig`].
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
    fn test_serde_env_config() -> Result<()> {
        let config = CampusEnvConfig::default()
            .episode_length(4)
            .params(CampusParams::uniform(3, 0.2));
        let dir = TempDir::new("env_config")?;
        let path = dir.path().join("env.yaml");
        config.save(&path)?;
        assert_eq!(CampusEnvConfig::load(&path)?, config);
        Ok(())
    }
}
