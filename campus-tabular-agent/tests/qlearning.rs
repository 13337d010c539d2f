use anyhow::Result;
use campus_core::{
    config::SharedConfig, record::BufferedRecorder, util::RunDirs, Agent, Env, Policy, Trainer,
};
use campus_env::{CampusEnv, CampusEnvConfig, CampusParams};
use campus_tabular_agent::qlearning::{QLearning, QLearningConfig, QTable, QTABLE_FILE};
use tempdir::TempDir;

fn env() -> Result<CampusEnv> {
    let config = CampusEnvConfig::default()
        .params(CampusParams::uniform(2, 0.5))
        .episode_length(5);
    CampusEnv::build(&config, 0)
}

#[test]
fn test_train_on_campus() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let tmp = TempDir::new("qlearning")?;
    let shared = SharedConfig::default()
        .results_directory(tmp.path().join("results"))
        .model_directory(tmp.path().join("models"));
    let dirs = RunDirs::with_timestamp(&shared, "q_learning", "test", "20240101-000000");

    let mut env = env()?;
    let config = QLearningConfig::default()
        .max_episodes(6)
        .checkpoint_interval(3)
        .stopping_criterion(None)
        .seed(3);
    let mut agent = QLearning::for_env(config.clone(), &env)?;
    assert_eq!(agent.table().n_states(), 1000);
    assert_eq!(agent.table().n_actions(), 9);

    let mut trainer =
        Trainer::build(config.trainer_config(), config.decay()?).dirs(dirs.clone());
    let mut recorder = BufferedRecorder::new();
    let history = trainer.train(&mut env, &mut agent, &mut recorder)?;

    assert_eq!(history.len(), 6);
    assert!(history.losses.iter().all(|l| l.is_finite()));
    assert!(history.explained_variance.iter().all(|ev| ev.is_finite()));
    assert_eq!(history.exploration_rates[0], config.decay()?.rate(0));

    assert!(dirs.checkpoint(3).join(QTABLE_FILE).is_file());
    assert!(dirs.checkpoint(6).join(QTABLE_FILE).is_file());
    let saved = QTable::load_saved(&dirs.model)?;
    assert_eq!(saved.as_ref(), Some(agent.table()));

    let mut restored = QLearning::for_env(config, &env)?;
    Agent::<CampusEnv>::load_params(&mut restored, &dirs.model)?;
    assert_eq!(restored.table(), agent.table());
    Ok(())
}

#[test]
fn test_greedy_in_eval_mode() -> Result<()> {
    let mut env = env()?;
    let mut agent = QLearning::for_env(QLearningConfig::default(), &env)?;
    let (obs, _) = env.reset()?;
    let state = agent.state_index(&obs)?;
    agent.update(state, 4, 10.0, state);

    Agent::<CampusEnv>::eval(&mut agent);
    for _ in 0..5 {
        let s = Policy::<CampusEnv>::sample(&mut agent, &obs)?;
        assert_eq!(s.act, 4);
        assert_eq!(s.log_prob, 0.0);
        assert_eq!(s.value, 1.0);
    }
    Ok(())
}

#[test]
fn test_explores_at_full_rate() -> Result<()> {
    let mut env = env()?;
    let mut agent = QLearning::for_env(QLearningConfig::default().seed(5), &env)?;
    Agent::<CampusEnv>::train(&mut agent);
    Agent::<CampusEnv>::set_exploration_rate(&mut agent, 1.0);
    let (obs, _) = env.reset()?;

    let mut seen = [false; 9];
    for _ in 0..500 {
        let s = Policy::<CampusEnv>::sample(&mut agent, &obs)?;
        seen[s.act] = true;
        assert!((s.log_prob - (1.0f32 / 9.0).ln()).abs() < 1e-6);
    }
    assert!(seen.iter().all(|&b| b));
    Ok(())
}
