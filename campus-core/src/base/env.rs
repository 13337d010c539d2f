//! Environment.
use super::{Act, Info, Obs, Step};
use crate::{record::Record, MultiDiscrete};
use anyhow::Result;

/// Represents an environment, typically an MDP.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<(Self::Obs, Self::Info)>;

    /// Performes an environment step.
    ///
    /// Fails if the action does not belong to [`Env::action_space`].
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Returns a human readable description of the current state.
    fn render(&self) -> String;

    /// Action space. Each dimension is chosen independently.
    fn action_space(&self) -> &MultiDiscrete;

    /// Observation space.
    fn observation_space(&self) -> &MultiDiscrete;
}
