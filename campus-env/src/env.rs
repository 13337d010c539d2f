//! Campus environment.
use crate::{CampusEnvConfig, CampusState};
use anyhow::Result;
use campus_core::{
    error::CampusError,
    record::{Record, RecordValue},
    Act, Env, Info, MultiDiscrete, Obs, Step,
};
use log::{info, trace};

/// Number of infection levels of a course, and of community risk levels.
pub const INFECTION_LEVELS: usize = 10;

/// Number of occupancy levels of a course: closed, half and full.
pub const OCCUPANCY_LEVELS: usize = 3;

/// Occupancy percentage of one occupancy level.
const PERCENT_PER_LEVEL: usize = 50;

/// Infection level of each course followed by the community risk level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampusObs(pub Vec<usize>);

impl Obs for CampusObs {
    fn features(&self) -> Vec<f32> {
        self.0.iter().map(|&v| v as f32).collect()
    }
}

/// Occupancy level of each course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampusAct(pub Vec<usize>);

impl Act for CampusAct {
    fn from_levels(levels: Vec<usize>) -> Self {
        Self(levels)
    }

    fn levels(&self) -> &[usize] {
        &self.0
    }
}

/// Information of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampusInfo {
    /// Allowed occupancy of each course in percent.
    pub allowed: Vec<usize>,

    /// Infection level of each course.
    pub infected: Vec<usize>,
}

impl Info for CampusInfo {}

/// A campus where the occupancy of each course is controlled.
///
/// Every step, each course admits students at the chosen occupancy level.
/// The infection level of the course rises by that level, up to
/// [`INFECTION_LEVELS`]` - 1`. The reward is `base_reward` minus
/// `penalty_per_level` for each occupancy level of each course. Episodes are
/// truncated after `episode_length` steps.
pub struct CampusEnv {
    config: CampusEnvConfig,
    state: CampusState,
    levels: Vec<usize>,
    risk_level: usize,
    t: usize,
    action_space: MultiDiscrete,
    observation_space: MultiDiscrete,
}

impl CampusEnv {
    fn obs(&self) -> CampusObs {
        let mut obs = self.levels.clone();
        obs.push(self.risk_level);
        CampusObs(obs)
    }

    fn info(&self, act: &[usize]) -> CampusInfo {
        CampusInfo {
            allowed: act.iter().map(|&a| a * PERCENT_PER_LEVEL).collect(),
            infected: self.levels.clone(),
        }
    }

    /// State of the campus.
    pub fn campus_state(&self) -> &CampusState {
        &self.state
    }

    /// Number of steps since the last reset.
    pub fn t(&self) -> usize {
        self.t
    }
}

impl Env for CampusEnv {
    type Config = CampusEnvConfig;
    type Obs = CampusObs;
    type Act = CampusAct;
    type Info = CampusInfo;

    /// Builds the environment. The dynamics are deterministic and the seed
    /// is not used.
    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        let state = CampusState::from_params(&config.params)?;
        if config.initial_level >= INFECTION_LEVELS {
            return Err(CampusError::Config(format!(
                "initial_level must be less than {}, got {}",
                INFECTION_LEVELS, config.initial_level
            ))
            .into());
        }
        if config.episode_length == 0 {
            return Err(CampusError::Config("episode_length must be positive".into()).into());
        }

        let n = state.total_courses();
        let risk_level = state.risk_level(INFECTION_LEVELS);
        info!("Campus with {} courses", n);

        Ok(Self {
            levels: vec![config.initial_level; n],
            risk_level,
            t: 0,
            action_space: MultiDiscrete::new(vec![OCCUPANCY_LEVELS; n])?,
            observation_space: MultiDiscrete::new(vec![INFECTION_LEVELS; n + 1])?,
            config: config.clone(),
            state,
        })
    }

    fn reset(&mut self) -> Result<(CampusObs, CampusInfo)> {
        self.levels = vec![self.config.initial_level; self.state.total_courses()];
        self.risk_level = self.state.risk_level(INFECTION_LEVELS);
        self.t = 0;
        let zeros = vec![0; self.levels.len()];
        Ok((self.obs(), self.info(&zeros)))
    }

    fn step(&mut self, a: &CampusAct) -> Result<(Step<Self>, Record)> {
        if !self.action_space.contains(&a.0) {
            return Err(CampusError::InvalidAction(format!(
                "{:?} is not in {:?}",
                a.0,
                self.action_space.nvec()
            ))
            .into());
        }

        let mut reward = self.config.base_reward;
        for (level, &occupancy) in self.levels.iter_mut().zip(a.0.iter()) {
            *level = (*level + occupancy).min(INFECTION_LEVELS - 1);
            reward -= self.config.penalty_per_level * occupancy as f32;
        }
        self.t += 1;
        let is_truncated = self.t >= self.config.episode_length;
        trace!("t = {}, levels = {:?}, reward = {}", self.t, self.levels, reward);

        let info = self.info(&a.0);
        let record = Record::from_slice(&[(
            "infection_levels",
            RecordValue::Array1(self.levels.iter().map(|&v| v as f32).collect()),
        )]);
        let step = Step::new(self.obs(), a.clone(), reward, false, is_truncated, info);
        Ok((step, record))
    }

    fn render(&self) -> String {
        let s = format!(
            "t = {}, infection levels = {:?}, community risk level = {}",
            self.t, self.levels, self.risk_level
        );
        info!("{}", s);
        s
    }

    fn action_space(&self) -> &MultiDiscrete {
        &self.action_space
    }

    fn observation_space(&self) -> &MultiDiscrete {
        &self.observation_space
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CampusParams;

    fn env(episode_length: usize) -> CampusEnv {
        let config = CampusEnvConfig::default()
            .params(CampusParams::uniform(4, 0.5))
            .episode_length(episode_length);
        CampusEnv::build(&config, 0).unwrap()
    }

    #[test]
    fn test_spaces() {
        let env = env(4);
        assert_eq!(env.action_space().nvec(), &[3, 3, 3, 3]);
        assert_eq!(env.observation_space().nvec(), &[10, 10, 10, 10, 10]);
    }

    #[test]
    fn test_reset() {
        let mut env = env(4);
        let (obs, info) = env.reset().unwrap();
        assert_eq!(obs, CampusObs(vec![1, 1, 1, 1, 5]));
        assert_eq!(info.allowed, vec![0; 4]);
        assert!(env.observation_space().contains(&obs.0));
    }

    #[test]
    fn test_reward_and_dynamics() {
        let mut env = env(4);
        env.reset().unwrap();
        let (step, _) = env.step(&CampusAct(vec![0, 1, 2, 1])).unwrap();
        assert_eq!(step.reward, 20.0 - 2.0 - 4.0 - 2.0);
        assert_eq!(step.obs, CampusObs(vec![1, 2, 3, 2, 5]));
        assert_eq!(step.info.allowed, vec![0, 50, 100, 50]);
        assert!(!step.is_done());
    }

    #[test]
    fn test_levels_saturate() {
        let mut env = env(10);
        env.reset().unwrap();
        let mut last = None;
        for _ in 0..10 {
            let (step, _) = env.step(&CampusAct(vec![2; 4])).unwrap();
            assert_eq!(step.reward, 4.0);
            last = Some(step);
        }
        let last = last.unwrap();
        assert_eq!(last.obs.0[..4], [9, 9, 9, 9]);
        assert!(last.is_truncated);
        assert!(env.observation_space().contains(&last.obs.0));
    }

    #[test]
    fn test_truncation() {
        let mut env = env(2);
        env.reset().unwrap();
        let (s1, _) = env.step(&CampusAct(vec![0; 4])).unwrap();
        let (s2, _) = env.step(&CampusAct(vec![0; 4])).unwrap();
        assert!(!s1.is_done());
        assert!(s2.is_truncated && !s2.is_terminated);
        assert_eq!(s2.reward, 20.0);

        env.reset().unwrap();
        assert_eq!(env.t(), 0);
    }

    #[test]
    fn test_malformed_actions() {
        let mut env = env(4);
        env.reset().unwrap();
        assert!(env.step(&CampusAct(vec![1, 1, 1])).is_err());
        assert!(env.step(&CampusAct(vec![1, 1, 1, 3])).is_err());
        assert_eq!(env.t(), 0);
    }

    #[test]
    fn test_render() {
        let mut env = env(4);
        env.reset().unwrap();
        assert_eq!(
            env.render(),
            "t = 0, infection levels = [1, 1, 1, 1], community risk level = 5"
        );
    }
}
