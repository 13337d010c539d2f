//! Collection of episodes and state-visit statistics.
use crate::{
    record::{Record, RecordValue},
    trajectory::Trajectory,
    Act, Agent, Env, Obs, Transition,
};
use anyhow::Result;
use log::trace;
use ordered_float::OrderedFloat;
use std::{collections::HashMap, fmt};
use xxhash_rust::xxh3::Xxh3Builder;

/// Number of decimal places kept in a [`StateKey`].
pub const KEY_DECIMALS: i32 = 4;

/// Hashable key of an observation, rounded to [`KEY_DECIMALS`] decimal places.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey(Vec<OrderedFloat<f64>>);

impl StateKey {
    /// Creates the key of a feature vector.
    pub fn new(features: &[f32]) -> Self {
        let scale = 10f64.powi(KEY_DECIMALS);
        Self(
            features
                .iter()
                .map(|&x| OrderedFloat((x as f64 * scale).round() / scale))
                .collect(),
        )
    }

    /// Rounded components.
    pub fn values(&self) -> Vec<f64> {
        self.0.iter().map(|x| x.into_inner()).collect()
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.0.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Number of visits of each state.
#[derive(Debug, Clone, Default)]
pub struct VisitCounts(HashMap<StateKey, usize, Xxh3Builder>);

impl VisitCounts {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a visit of the state observed as `obs`.
    pub fn visit<O: Obs>(&mut self, obs: &O) {
        *self.0.entry(StateKey::new(&obs.features())).or_insert(0) += 1;
    }

    /// Number of visits of a state.
    pub fn get(&self, key: &StateKey) -> usize {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct states visited.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no state has been visited.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of visits.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Entries sorted by key.
    pub fn sorted(&self) -> Vec<(&StateKey, usize)> {
        let mut entries = self.0.iter().map(|(k, &v)| (k, v)).collect::<Vec<_>>();
        entries.sort();
        entries
    }
}

/// Runs one episode of `agent` on `env`.
///
/// The environment is reset first. Actions sampled by the agent are
/// flattened indices, decoded with the action space of the environment. In
/// training mode, [`Agent::observe`] is called after every step. The state
/// in which an action is taken is counted in `visits`, so the final
/// observation of the episode is not counted.
///
/// The returned record holds the rewards of the episode (`episode_rewards`),
/// its length (`episode_length`) and the record of the last environment step.
pub fn collect_episode<E, A>(
    env: &mut E,
    agent: &mut A,
    visits: &mut VisitCounts,
) -> Result<(Trajectory<E>, Record)>
where
    E: Env,
    A: Agent<E>,
{
    let (mut obs, _) = env.reset()?;
    let mut trajectory = Trajectory::new(obs.clone());
    let mut record = Record::empty();

    loop {
        visits.visit(&obs);
        let sample = agent.sample(&obs)?;
        let levels = env.action_space().decode(sample.act)?;
        let act = E::Act::from_levels(levels);
        let (step, env_record) = env.step(&act)?;
        let done = step.is_done();
        trace!("act = {:?}, reward = {}", act.levels(), step.reward);

        if agent.is_train() {
            agent.observe(&Transition {
                obs: &obs,
                act: sample.act,
                reward: step.reward,
                next_obs: &step.obs,
                is_done: done,
            })?;
        }

        trajectory.push(
            obs,
            sample.act,
            sample.log_prob,
            step.reward,
            sample.value,
            done,
            step.obs.clone(),
        );
        record = env_record;
        obs = step.obs;

        if done {
            break;
        }
    }

    record.insert(
        "episode_rewards",
        RecordValue::Array1(trajectory.rewards.clone()),
    );
    record.insert(
        "episode_length",
        RecordValue::Scalar(trajectory.len() as f32),
    );
    Ok((trajectory, record))
}
