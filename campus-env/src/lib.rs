#![warn(missing_docs)]
//! Campus infection-control environment.
//!
//! A campus is described by [`CampusParams`], usually read from a YAML file
//! such as `params/simulator_params.yaml`, and expanded into a
//! [`CampusState`]. [`CampusEnv`] exposes the campus as an environment of
//! `campus-core`: actions set the occupancy level of each course and
//! observations are the infection level of each course followed by the
//! community risk level.
//!
//! ```no_run
//! use anyhow::Result;
//! use campus_core::Env;
//! use campus_env::{CampusEnv, CampusEnvConfig, CampusParams};
//!
//! fn main() -> Result<()> {
//!     let params = CampusParams::load("campus-env/params/simulator_params.yaml")?;
//!     let config = CampusEnvConfig::default().params(params).episode_length(4);
//!     let mut env = CampusEnv::build(&config, 0)?;
//!     let (obs, _) = env.reset()?;
//!     println!("{:?}", obs);
//!     Ok(())
//! }
//! ```
mod campus_state;
mod config;
mod env;
pub use campus_state::{CampusParams, CampusState, CourseParams, HealthStatus, PopulationParams};
pub use config::CampusEnvConfig;
pub use env::{CampusAct, CampusEnv, CampusInfo, CampusObs, INFECTION_LEVELS, OCCUPANCY_LEVELS};
