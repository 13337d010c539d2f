use anyhow::Result;
use campus::{evaluate, Experiment};
use campus_candle_agent::ppo::{Ppo, PpoConfig};
use campus_core::{config::SharedConfig, Agent, Env, TrainingHistory};
use campus_env::{CampusEnv, CampusEnvConfig};
use clap::Parser;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

const AGENT_TYPE: &str = "ppo";

/// Train/eval PPO agent in the campus environment
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Shared configuration with the output directories
    #[arg(long, default_value = "./campus/config/shared.yaml")]
    shared_config: PathBuf,

    /// Agent configuration
    #[arg(long, default_value = "./campus/config/ppo.yaml")]
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

fn agent_config(args: &Args) -> Result<PpoConfig> {
    let overrides = match &args.overrides {
        Some(s) => Some(serde_yaml::from_str::<Value>(s)?),
        None => None,
    };
    PpoConfig::load(&args.agent_config, overrides.as_ref())
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
        |seed, env| Ppo::for_env(config.clone().seed(seed), env),
        |_, _| Ok(()),
    )
}

fn eval(args: &Args, model_dir: &Path) -> Result<Vec<f32>> {
    let env_config = CampusEnvConfig::load(&args.env_config)?;
    let mut env = CampusEnv::build(&env_config, 0)?;
    let mut agent = Ppo::for_env(agent_config(args)?, &env)?;
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
