//! Core functionalities.
mod agent;
mod env;
mod policy;
mod step;
pub use agent::Agent;
pub use env::Env;
pub use policy::{Policy, Sample};
use std::fmt::Debug;
pub use step::{Info, Step, Transition};

/// An observation of an environment.
pub trait Obs: Clone + Debug {
    /// Returns the observation as a feature vector, the input of agents.
    fn features(&self) -> Vec<f32>;
}

/// An action of an environment with a multi-discrete action space.
pub trait Act: Clone + Debug {
    /// Constructs an action from the level chosen in each dimension.
    fn from_levels(levels: Vec<usize>) -> Self;

    /// Returns the level chosen in each dimension.
    fn levels(&self) -> &[usize];
}
