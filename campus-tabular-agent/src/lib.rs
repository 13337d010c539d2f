//! Tabular agents of the campus RL harness.
//!
//! These agents need no numerical backend: values are kept in a dense table
//! indexed by the flattened observation and action.
pub mod qlearning;
