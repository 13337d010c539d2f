use anyhow::Result;
use campus_candle_agent::ppo::{load_saved_model, Ppo, PpoConfig, LR_DECAY_INTERVAL, MODEL_FILE};
use campus_core::{
    config::SharedConfig,
    record::BufferedRecorder,
    rollout::{collect_episode, VisitCounts},
    util::RunDirs,
    Agent, Env, Policy, Trainer,
};
use campus_env::{CampusEnv, CampusEnvConfig, CampusParams};
use tempdir::TempDir;

fn env(episode_length: usize) -> Result<CampusEnv> {
    let config = CampusEnvConfig::default()
        .params(CampusParams::uniform(2, 0.5))
        .episode_length(episode_length);
    CampusEnv::build(&config, 0)
}

fn config() -> PpoConfig {
    PpoConfig::default()
        .max_episodes(4)
        .epochs(2)
        .batch_size(4)
        .hidden_units(16)
        .stopping_criterion(None)
        .seed(42)
}

#[test]
fn test_train_on_campus() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut env = env(6)?;
    let config = config();
    let mut agent = Ppo::for_env(config.clone(), &env)?;
    assert_eq!(agent.model().n_actions(), 9);
    assert_eq!(agent.model().in_dim(), 3);

    let mut trainer = Trainer::build(config.trainer_config(), config.decay()?);
    let mut recorder = BufferedRecorder::new();
    let history = trainer.train(&mut env, &mut agent, &mut recorder)?;

    assert_eq!(history.len(), 4);
    assert!(history.losses.iter().all(|l| l.is_finite()));
    assert!(history.episode_rewards.iter().all(|r| r.len() == 6));
    assert_eq!(recorder.len(), 4);
    for record in recorder.iter() {
        assert!(record.get_scalar("actor_loss")?.is_finite());
        assert!(record.get_scalar("entropy")? >= 0.0);
        assert!(record.get_scalar("grad_norm")? >= 0.0);
        assert_eq!(record.get_scalar("learning_rate")?, 1e-3);
    }
    // One visit per action taken
    assert_eq!(history.visits.total(), 4 * 6);
    Ok(())
}

#[test]
fn test_learning_rate_decays_stepwise() -> Result<()> {
    let mut env = env(2)?;
    let config = config().epochs(1);
    let mut agent = Ppo::for_env(config, &env)?;
    let mut visits = VisitCounts::new();
    Agent::<CampusEnv>::train(&mut agent);
    let (trajectory, _) = collect_episode(&mut env, &mut agent, &mut visits)?;

    for _ in 0..LR_DECAY_INTERVAL - 1 {
        Agent::<CampusEnv>::opt(&mut agent, &trajectory)?;
    }
    assert_eq!(agent.learning_rate(), 1e-3);
    Agent::<CampusEnv>::opt(&mut agent, &trajectory)?;
    assert!((agent.learning_rate() - 0.9e-3).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_eval_mode_is_deterministic() -> Result<()> {
    let mut env = env(4)?;
    let mut agent = Ppo::for_env(config(), &env)?;
    Agent::<CampusEnv>::eval(&mut agent);
    let (obs, _) = env.reset()?;

    let first = Policy::<CampusEnv>::sample(&mut agent, &obs)?;
    for _ in 0..10 {
        let s = Policy::<CampusEnv>::sample(&mut agent, &obs)?;
        assert_eq!(s, first);
    }
    assert!(first.act < 9);
    assert!(first.log_prob <= 0.0);
    Ok(())
}

#[test]
fn test_checkpoint_round_trip() -> Result<()> {
    let tmp = TempDir::new("ppo")?;
    let shared = SharedConfig::default()
        .results_directory(tmp.path().join("results"))
        .model_directory(tmp.path().join("models"));
    let dirs = RunDirs::with_timestamp(&shared, "ppo", "test", "20240101-000000");

    let mut env = env(4)?;
    let config = config().checkpoint_interval(2);
    let mut agent = Ppo::for_env(config.clone(), &env)?;
    let mut trainer =
        Trainer::build(config.trainer_config(), config.decay()?).dirs(dirs.clone());
    trainer.train(&mut env, &mut agent, &mut BufferedRecorder::new())?;

    assert!(dirs.checkpoint(2).join(MODEL_FILE).is_file());
    assert!(dirs.checkpoint(4).join(MODEL_FILE).is_file());
    assert!(dirs.model.join(MODEL_FILE).is_file());

    // A fresh agent with another seed reproduces the trained one after loading
    let mut restored = Ppo::for_env(config.clone().seed(7), &env)?;
    Agent::<CampusEnv>::load_params(&mut restored, &dirs.model)?;
    let (obs, _) = env.reset()?;
    let features = [1.0, 1.0, 5.0];
    assert_eq!(
        agent.model().probs(&features)?,
        restored.model().probs(&features)?
    );

    Agent::<CampusEnv>::eval(&mut agent);
    Agent::<CampusEnv>::eval(&mut restored);
    assert_eq!(
        Policy::<CampusEnv>::sample(&mut agent, &obs)?,
        Policy::<CampusEnv>::sample(&mut restored, &obs)?
    );

    let loaded = load_saved_model(&dirs.model, 3, 16, 9, 1.0, candle_core::Device::Cpu)?;
    assert!(loaded.is_some());
    Ok(())
}

#[test]
fn test_non_finite_weights_fall_back_to_random_actions() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut env = env(3)?;
    let mut agent = Ppo::for_env(config(), &env)?;
    for var in agent.model().varmap().all_vars() {
        let nan = candle_core::Tensor::full(f32::NAN, var.dims(), var.device())?;
        var.set(&nan)?;
    }
    Agent::<CampusEnv>::train(&mut agent);

    let (obs, _) = env.reset()?;
    for _ in 0..10 {
        let sample = Policy::<CampusEnv>::sample(&mut agent, &obs)?;
        assert!(sample.act < 9);
        assert_eq!(sample.log_prob, f32::NEG_INFINITY);
    }

    // The run goes on with the fallback actions
    let mut visits = VisitCounts::new();
    let (trajectory, _) = collect_episode(&mut env, &mut agent, &mut visits)?;
    assert_eq!(trajectory.len(), 3);
    assert!(trajectory.log_probs.iter().all(|&p| p == f32::NEG_INFINITY));
    Agent::<CampusEnv>::opt(&mut agent, &trajectory)?;
    Ok(())
}
