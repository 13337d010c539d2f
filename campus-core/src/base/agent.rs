//! Agent.
use super::{Env, Policy, Transition};
use crate::{record::Record, trajectory::Trajectory};
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy on an environment.
pub trait Agent<E: Env>: Policy<E> {
    /// Set the policy to training mode.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Called after every environment step during training.
    ///
    /// Online learners update their parameters here. The default does nothing.
    fn observe(&mut self, _transition: &Transition<E>) -> Result<()> {
        Ok(())
    }

    /// Performs an optimization step on a completed episode.
    ///
    /// The returned record is merged into the episode's metrics. The trainer
    /// reads `loss` and `explained_variance` from it when present.
    fn opt(&mut self, trajectory: &Trajectory<E>) -> Result<Record>;

    /// Sets the exploration rate computed by the schedule.
    fn set_exploration_rate(&mut self, rate: f64);

    /// Save the parameters of the agent in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
