//! Train [`Agent`].
mod config;
use crate::{
    decay::ExplorationDecay,
    record::{Record, RecordValue::Scalar, Recorder},
    rollout::{collect_episode, VisitCounts},
    stats,
    util::RunDirs,
    Agent, Env,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::{info, warn};
use std::collections::VecDeque;

/// Metrics of a training run, one entry per episode.
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    /// Per-step rewards of each episode.
    pub episode_rewards: Vec<Vec<f32>>,

    /// Sum of the rewards of each episode.
    pub total_rewards: Vec<f32>,

    /// Loss reported by the agent, `NaN` if none.
    pub losses: Vec<f32>,

    /// Exploration rate set after each episode.
    pub exploration_rates: Vec<f64>,

    /// Explained variance reported by the agent, `NaN` if none.
    pub explained_variance: Vec<f64>,

    /// Visits of states over the whole run.
    pub visits: VisitCounts,
}

impl TrainingHistory {
    /// Number of completed episodes.
    pub fn len(&self) -> usize {
        self.total_rewards.len()
    }

    /// Returns `true` if no episode has been completed.
    pub fn is_empty(&self) -> bool {
        self.total_rewards.is_empty()
    }

    /// Average per-step reward of each episode.
    pub fn avg_rewards(&self) -> Vec<f64> {
        self.episode_rewards.iter().map(|rs| avg_reward(rs)).collect()
    }
}

fn avg_reward(rewards: &[f32]) -> f64 {
    if rewards.is_empty() {
        0.0
    } else {
        rewards.iter().map(|&r| r as f64).sum::<f64>() / rewards.len() as f64
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the episodic training loop.
///
/// # Training loop
///
/// For each `episode` in `0..max_episodes`:
///
/// 1. Collect an episode with [`collect_episode`]. In training mode the agent
///    observes every transition, so online learners are updated here.
/// 2. Call [`Agent::opt`] on the trajectory of the episode.
/// 3. Set the exploration rate of the agent to `decay.rate(episode)`.
/// 4. Write a record to the recorder with the keys `episode`,
///    `episode_reward`, `exploration_rate`, `loss`, `avg_episode_reward` and
///    `explained_variance`, together with the keys of the agent's record.
///    A failing recorder is reported with `warn!` and otherwise ignored.
/// 5. If `(episode + 1) % checkpoint_interval == 0`, save the parameters of
///    the agent in `<results>/checkpoint-<episode + 1>`.
/// 6. If the moving window of average per-step rewards is full and its
///    standard deviation is below `stopping_criterion`, stop.
///
/// At the end, the parameters are saved in the model directory of the run.
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|Env::Act|B[Env]
///     B -->|Env::Obs|A
///     B -->|"Step&lt;E: Env&gt;"|C[Trajectory]
///     C -->|Agent::opt|A
///     D[ExplorationDecay] -->|exploration rate|A
/// ```
pub struct Trainer {
    /// The maximum number of episodes.
    max_episodes: usize,

    /// Interval of saving checkpoints in episodes.
    checkpoint_interval: usize,

    /// Size of the moving window of the stopping criterion.
    moving_average_window: usize,

    /// Threshold of the stopping criterion.
    stopping_criterion: Option<f64>,

    /// Exploration-rate schedule.
    decay: ExplorationDecay,

    /// Where to save checkpoints and the trained model.
    dirs: Option<RunDirs>,
}

impl Trainer {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig, decay: ExplorationDecay) -> Self {
        Self {
            max_episodes: config.max_episodes,
            checkpoint_interval: config.checkpoint_interval,
            moving_average_window: config.moving_average_window,
            stopping_criterion: config.stopping_criterion,
            decay,
            dirs: None,
        }
    }

    /// Sets the output directories. Without them nothing is saved.
    pub fn dirs(mut self, dirs: RunDirs) -> Self {
        self.dirs = Some(dirs);
        self
    }

    fn save_params<E: Env, A: Agent<E>>(agent: &A, path: &std::path::Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        agent.save_params(path)?;
        info!("Saved the model in {:?}.", path);
        Ok(())
    }

    /// Returns `true` if the moving window is full and flat enough to stop.
    fn converged(&self, window: &VecDeque<f64>) -> bool {
        match self.stopping_criterion {
            Some(threshold) if window.len() >= self.moving_average_window => {
                let xs = window.iter().copied().collect::<Vec<_>>();
                stats::variance(&xs, 0).sqrt() < threshold
            }
            _ => false,
        }
    }

    /// Train the agent.
    pub fn train<E, A, R>(
        &mut self,
        env: &mut E,
        agent: &mut A,
        recorder: &mut R,
    ) -> Result<TrainingHistory>
    where
        E: Env,
        A: Agent<E>,
        R: Recorder + ?Sized,
    {
        let mut history = TrainingHistory::default();
        let mut window = VecDeque::with_capacity(self.moving_average_window);
        agent.train();

        for episode in 0..self.max_episodes {
            let (trajectory, env_record) = collect_episode(env, agent, &mut history.visits)?;
            trajectory.validate()?;
            let opt_record = agent.opt(&trajectory)?;

            let exploration_rate = self.decay.rate(episode);
            agent.set_exploration_rate(exploration_rate);

            let total_reward = trajectory.total_reward();
            let avg = avg_reward(&trajectory.rewards);
            let loss = opt_record.get_scalar_or("loss", f32::NAN);
            let ev = opt_record.get_scalar_or("explained_variance", f32::NAN);

            let mut record = env_record.merge(opt_record);
            record.insert("episode", Scalar(episode as f32));
            record.insert("episode_reward", Scalar(total_reward));
            record.insert("exploration_rate", Scalar(exploration_rate as f32));
            record.insert("loss", Scalar(loss));
            record.insert("avg_episode_reward", Scalar(avg as f32));
            record.insert("explained_variance", Scalar(ev));
            self.write(recorder, record);

            info!(
                "Episode {}: total reward = {}, avg reward = {:.4}, loss = {:.4}, exploration rate = {:.4}",
                episode, total_reward, avg, loss, exploration_rate
            );

            history.total_rewards.push(total_reward);
            history.episode_rewards.push(trajectory.rewards);
            history.losses.push(loss);
            history.exploration_rates.push(exploration_rate);
            history.explained_variance.push(ev as f64);

            if self.checkpoint_interval > 0 && (episode + 1) % self.checkpoint_interval == 0 {
                if let Some(dirs) = &self.dirs {
                    Self::save_params(agent, &dirs.checkpoint(episode + 1))?;
                }
            }

            if self.moving_average_window > 0 {
                if window.len() == self.moving_average_window {
                    window.pop_front();
                }
                window.push_back(avg);
                if self.converged(&window) {
                    info!("Stopping criterion met at episode {}", episode);
                    break;
                }
            }
        }

        if let Err(e) = recorder.flush() {
            warn!("Failed to flush records: {}", e);
        }
        if let Some(dirs) = &self.dirs {
            Self::save_params(agent, &dirs.model)?;
        }

        Ok(history)
    }

    fn write<R: Recorder + ?Sized>(&self, recorder: &mut R, record: Record) {
        if let Err(e) = recorder.write(record) {
            warn!("Failed to write a record: {}", e);
        }
    }
}
