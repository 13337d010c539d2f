//! Proximal policy optimization agent.
//!
//! The agent holds an actor-critic network ([`ActorCritic`]) over the
//! flattened action space of the environment and is updated once per episode
//! with generalized advantage estimation and the clipped surrogate objective.
//!
//! ```no_run
//! # use anyhow::Result;
//! use campus_candle_agent::ppo::{Ppo, PpoConfig};
//!
//! # fn main() -> Result<()> {
//! let config = PpoConfig::default().hidden_units(32).seed(1);
//! // 5 observed levels, 81 joint actions
//! let agent = Ppo::build(config, 5, 81)?;
//! assert_eq!(agent.model().n_actions(), 81);
//! # Ok(())
//! # }
//! ```
mod base;
mod config;
mod model;
pub use base::{clipped_surrogate, Ppo, LR_DECAY_INTERVAL};
pub use config::PpoConfig;
pub use model::{load_saved_model, ActorCritic, MODEL_FILE};
