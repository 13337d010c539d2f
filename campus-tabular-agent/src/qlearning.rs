//! Q-learning with a dense table and ε-greedy exploration.
mod base;
mod config;
mod table;
pub use base::QLearning;
pub use config::QLearningConfig;
pub use table::{QTable, QTABLE_FILE};
