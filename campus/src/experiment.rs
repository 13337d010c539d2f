//! Repeated training runs and their reports.
use anyhow::{anyhow, Result};
use campus_core::{
    config::SharedConfig,
    decay::ExplorationDecay,
    record::{NullRecorder, Recorder},
    report,
    rollout::{collect_episode, VisitCounts},
    util::{RunDirs, TIMESTAMP_FORMAT},
    Agent, Env, Trainer, TrainerConfig, TrainingHistory,
};
use campus_env::{CampusEnv, CampusEnvConfig};
use campus_tensorboard::TensorboardRecorder;
use chrono::Local;
use log::info;

/// A set of independent training runs of one agent type.
///
/// Run `i` uses the seed `i` for both the environment and the agent. The
/// outputs of the run are stored in `run-<i>` under the directories of the
/// experiment, and the per-episode summary over runs in the results
/// directory of the experiment.
pub struct Experiment {
    shared: SharedConfig,
    env_config: CampusEnvConfig,
    agent_type: String,
    run_name: String,
    timestamp: String,
    num_runs: usize,
    alpha: f64,
    beta: f64,
    tensorboard: bool,
}

impl Experiment {
    /// Constructs an experiment of a single run, timestamped now.
    pub fn new(
        shared: SharedConfig,
        env_config: CampusEnvConfig,
        agent_type: impl Into<String>,
        run_name: impl Into<String>,
    ) -> Self {
        Self {
            shared,
            env_config,
            agent_type: agent_type.into(),
            run_name: run_name.into(),
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            num_runs: 1,
            alpha: 0.05,
            beta: 0.9,
            tensorboard: true,
        }
    }

    /// Sets the number of runs.
    pub fn num_runs(mut self, v: usize) -> Self {
        self.num_runs = v;
        self
    }

    /// Sets the significance `alpha` and the population proportion `beta`
    /// of tolerance intervals.
    pub fn tolerance(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    /// Enables or disables TensorBoard records.
    pub fn tensorboard(mut self, v: bool) -> Self {
        self.tensorboard = v;
        self
    }

    /// Sets the timestamp component of the output directories.
    pub fn timestamp(mut self, v: impl Into<String>) -> Self {
        self.timestamp = v.into();
        self
    }

    /// Output directories of the experiment.
    pub fn dirs(&self) -> RunDirs {
        RunDirs::with_timestamp(&self.shared, &self.agent_type, &self.run_name, &self.timestamp)
    }

    /// Output directories of the run with `seed`.
    pub fn run_dirs(&self, seed: u64) -> RunDirs {
        let dirs = self.dirs();
        let sub = format!("run-{}", seed);
        RunDirs {
            results: dirs.results.join(&sub),
            model: dirs.model.join(sub),
        }
    }

    /// Trains an agent built by `build_agent` in every run.
    ///
    /// `finish` is called with the trained agent at the end of each run.
    /// Histories are written as CSV in the results directory of each run, and
    /// the tolerance and confidence intervals of the episode rewards in the
    /// results directory of the experiment.
    pub fn run<A, F, G>(
        &self,
        trainer_config: &TrainerConfig,
        decay: &ExplorationDecay,
        mut build_agent: F,
        mut finish: G,
    ) -> Result<Vec<TrainingHistory>>
    where
        A: Agent<CampusEnv>,
        F: FnMut(u64, &CampusEnv) -> Result<A>,
        G: FnMut(&A, &RunDirs) -> Result<()>,
    {
        if self.num_runs == 0 {
            return Err(anyhow!("The number of runs must be positive"));
        }

        let mut histories = Vec::with_capacity(self.num_runs);
        for seed in 0..self.num_runs as u64 {
            info!("Run {}/{}", seed + 1, self.num_runs);
            let dirs = self.run_dirs(seed);
            dirs.create()?;

            let mut env = CampusEnv::build(&self.env_config, seed as i64)?;
            let mut agent = build_agent(seed, &env)?;
            let mut recorder: Box<dyn Recorder> = match self.tensorboard {
                true => Box::new(TensorboardRecorder::new(dirs.results.join("tensorboard"))),
                false => Box::new(NullRecorder::new()),
            };
            let mut trainer =
                Trainer::build(trainer_config.clone(), decay.clone()).dirs(dirs.clone());
            let history = trainer.train(&mut env, &mut agent, &mut recorder)?;

            report::write_history(&dirs.results, &history)?;
            finish(&agent, &dirs)?;
            histories.push(history);
        }

        let summary = report::summarize(&histories, self.alpha, self.beta);
        report::write_summary(self.dirs().results, &summary)?;
        info!("Reports written in {}", self.dirs().results.display());
        Ok(histories)
    }
}

/// Runs `n_episodes` episodes with `agent` in evaluation mode and returns the
/// total reward of each.
pub fn evaluate<E, A>(env: &mut E, agent: &mut A, n_episodes: usize) -> Result<Vec<f32>>
where
    E: Env,
    A: Agent<E>,
{
    agent.eval();
    let mut visits = VisitCounts::new();
    let mut totals = Vec::with_capacity(n_episodes);
    for episode in 0..n_episodes {
        let (trajectory, _) = collect_episode(env, agent, &mut visits)?;
        let total = trajectory.total_reward();
        info!(
            "Evaluation episode {}: total reward = {}, final state: {}",
            episode,
            total,
            env.render()
        );
        totals.push(total);
    }
    Ok(totals)
}
