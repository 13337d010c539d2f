//! Utilities for organizing the outputs of training runs.
use crate::config::SharedConfig;
use anyhow::Result;
use chrono::Local;
use log::info;
use std::path::{Path, PathBuf};

/// Format of the timestamp component of run directories.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Output directories of a single training run.
///
/// Both directories have the layout
/// `<root>/<agent_type>/<run_name>/<timestamp>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDirs {
    /// Directory of metrics, reports and intermediate checkpoints.
    pub results: PathBuf,

    /// Directory of the final model parameters.
    pub model: PathBuf,
}

impl RunDirs {
    /// Builds the paths of a run started now. Directories are not created.
    pub fn new(shared: &SharedConfig, agent_type: &str, run_name: &str) -> Self {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(shared, agent_type, run_name, &timestamp)
    }

    /// Builds the paths of a run with the given timestamp.
    pub fn with_timestamp(
        shared: &SharedConfig,
        agent_type: &str,
        run_name: &str,
        timestamp: &str,
    ) -> Self {
        let sub = Path::new(agent_type).join(run_name).join(timestamp);
        Self {
            results: shared.directories.results_directory.join(&sub),
            model: shared.directories.model_directory.join(sub),
        }
    }

    /// Creates both directories.
    pub fn create(&self) -> Result<()> {
        std::fs::create_dir_all(&self.results)?;
        std::fs::create_dir_all(&self.model)?;
        info!("Results directory: {}", self.results.display());
        info!("Model directory: {}", self.model.display());
        Ok(())
    }

    /// Directory of the checkpoint saved after `episode` episodes.
    pub fn checkpoint(&self, episode: usize) -> PathBuf {
        self.results.join(format!("checkpoint-{}", episode))
    }
}
