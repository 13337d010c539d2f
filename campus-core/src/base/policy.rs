//! Policy.
use super::Env;
use anyhow::Result;

/// An action chosen by a policy together with the quantities on-policy
/// learners keep for the update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Flattened index of the action in the action space.
    pub act: usize,

    /// Log-probability of the action, `-inf` for emergency random actions.
    pub log_prob: f32,

    /// Value estimate of the observation the action was chosen on.
    pub value: f32,
}

/// A policy on an environment.
///
/// Policy is a mapping from an observation to an action.
/// The mapping can be either of deterministic or stochastic.
pub trait Policy<E: Env> {
    /// Sample an action given an observation.
    fn sample(&mut self, obs: &E::Obs) -> Result<Sample>;
}
