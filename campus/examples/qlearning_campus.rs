use anyhow::Result;
use campus::{evaluate, Experiment};
use campus_core::{config::SharedConfig, Agent, Env, TrainingHistory};
use campus_env::{CampusEnv, CampusEnvConfig};
use campus_tabular_agent::qlearning::{QLearning, QLearningConfig};
use clap::Parser;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

const AGENT_TYPE: &str = "q_learning";

/// Train/eval Q-learning agent in the campus environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Shared configuration with the output directories
    #[arg(long, default_value = "./campus/config/shared.yaml")]
    shared_config: PathBuf,

    /// Agent configuration
    #[arg(long, default_value = "./campus/config/q_learning.yaml")]
    agent_config: PathBuf,

    /// Environment configuration
    #[arg(long, default_value = "./campus/config/env.yaml")]
    env_config: PathBuf,

    /// YAML mapping merged into the agent configuration,
    /// e.g. "agent: {max_episodes: 10}"
    #[arg(long)]
    overrides: Option<String>,

    /// Name of the run in the output directories
    #[arg(long, default_value = "campus")]
    run_name: String,

    /// Number of independent runs
    #[arg(long, default_value_t = 1)]
    num_runs: usize,

    /// Significance level of tolerance intervals
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Population proportion of tolerance intervals
    #[arg(long, default_value_t = 0.9)]
    beta: f64,

    /// Do not write TensorBoard records
    #[arg(long, default_value_t = false)]
    no_tensorboard: bool,

    /// Evaluate the model saved in the given directory, not train
    #[arg(long)]
    eval: Option<PathBuf>,

    /// Number of evaluation episodes
    #[arg(long, default_value_t = 5)]
    eval_episodes: usize,
}

fn agent_config(args: &Args) -> Result<QLearningConfig> {
    let overrides = match &args.overrides {
        Some(s) => Some(serde_yaml::from_str::<Value>(s)?),
        None => None,
    };
    QLearningConfig::load(&args.agent_config, overrides.as_ref())
}

fn train(args: &Args) -> Result<Vec<TrainingHistory>> {
    let shared = SharedConfig::load(&args.shared_config, None)?;
    let env_config = CampusEnvConfig::load(&args.env_config)?;
    let config = agent_config(args)?;

    let experiment = Experiment::new(shared, env_config, AGENT_TYPE, &args.run_name)
        .num_runs(args.num_runs)
        .tolerance(args.alpha, args.beta)
        .tensorboard(!args.no_tensorboard);
    experiment.run(
        &config.trainer_config(),
        &config.decay()?,
        |seed, env| QLearning::for_env(config.clone().seed(seed), env),
        |agent: &QLearning, dirs| agent.table().write_csv(dirs.results.join("q_table.csv")),
    )
}

fn eval(args: &Args, model_dir: &Path) -> Result<Vec<f32>> {
    let env_config = CampusEnvConfig::load(&args.env_config)?;
    let mut env = CampusEnv::build(&env_config, 0)?;
    let mut agent = QLearning::for_env(agent_config(args)?, &env)?;
    Agent::<CampusEnv>::load_params(&mut agent, model_dir)?;
    evaluate(&mut env, &mut agent, args.eval_episodes)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match &args.eval {
        Some(model_dir) => {
            eval(&args, model_dir)?;
        }
        None => {
            train(&args)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn config_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("config")
            .join(name)
    }

    #[test]
    fn test_qlearning_campus() -> Result<()> {
        let tmp = TempDir::new("qlearning_campus")?;
        let shared = SharedConfig::default()
            .results_directory(tmp.path().join("results"))
            .model_directory(tmp.path().join("models"));
        let shared_config = tmp.path().join("shared.yaml");
        shared.save(&shared_config)?;

        let mut args = Args {
            shared_config,
            agent_config: config_path("q_learning.yaml"),
            env_config: config_path("env.yaml"),
            overrides: Some(
                "agent: {max_episodes: 3, checkpoint_interval: 0}".to_string(),
            ),
            run_name: "test".to_string(),
            num_runs: 2,
            alpha: 0.05,
            beta: 0.9,
            no_tensorboard: true,
            eval: None,
            eval_episodes: 2,
        };
        let histories = train(&args)?;
        assert_eq!(histories.len(), 2);
        assert!(histories.iter().all(|h| h.len() == 3));

        let model_dir = std::fs::read_dir(tmp.path().join("models/q_learning/test"))?
            .next()
            .unwrap()?
            .path()
            .join("run-0");
        args.eval = Some(model_dir.clone());
        let totals = eval(&args, &model_dir)?;
        assert_eq!(totals.len(), 2);

        let results = std::fs::read_dir(tmp.path().join("results/q_learning/test"))?
            .next()
            .unwrap()?
            .path();
        assert!(results.join("run-1/q_table.csv").is_file());
        assert!(results.join("tolerance_interval.csv").is_file());
        Ok(())
    }
}
