//! Reinforcement learning on a simulated campus.
//!
//! The harness consists of the following crates:
//!
//! * [campus-core](../campus_core/index.html) provides the traits between
//!   environments and agents, the training loop, exploration-rate schedules,
//!   generalized advantage estimation and the statistics of reports.
//! * [campus-env](../campus_env/index.html) has the campus environment, where
//!   the occupancy of each course is controlled under infection spread.
//! * [campus-tensorboard](../campus_tensorboard/index.html) has
//!   `TensorboardRecorder` writing records shown in TensorBoard.
//! * [campus-candle-agent](../campus_candle_agent/index.html) includes a PPO
//!   agent based on [candle](https://crates.io/crates/candle-core).
//! * [campus-tabular-agent](../campus_tabular_agent/index.html) includes a
//!   tabular Q-learning agent.
//!
//! This crate runs experiments of several independent training runs and has
//! the runnable programs `ppo_campus` and `qlearning_campus`.
pub mod experiment;
pub use experiment::{evaluate, Experiment};
