#![warn(missing_docs)]
//! Core functionalities of the campus reinforcement learning harness.
//!
//! This crate defines the interfaces between environments and agents
//! ([`Env`], [`Policy`], [`Agent`]), the episodic training loop ([`Trainer`]),
//! exploration-rate schedules ([`decay`]), trajectory processing
//! ([`trajectory`]) and the statistics used to summarize repeated runs
//! ([`stats`], [`report`]).
//!
//! Backends are kept out of this crate. The PPO agent lives in
//! `campus-candle-agent` and the tabular Q-learning agent in
//! `campus-tabular-agent`.
pub mod config;
pub mod decay;
pub mod error;
pub mod record;
pub mod report;
pub mod rollout;
pub mod stats;
pub mod trajectory;
pub mod util;

mod base;
pub use base::{Act, Agent, Env, Info, Obs, Policy, Sample, Step, Transition};

mod space;
pub use space::MultiDiscrete;

mod trainer;
pub use trainer::{Trainer, TrainerConfig, TrainingHistory};
