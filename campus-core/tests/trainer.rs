use anyhow::Result;
use campus_core::{
    config::SharedConfig,
    decay::{DecayLaw, ExplorationDecay},
    record::{BufferedRecorder, Record, Recorder},
    rollout::StateKey,
    trajectory::Trajectory,
    util::RunDirs,
    Act, Agent, Env, MultiDiscrete, Obs, Policy, Sample, Step, Trainer, TrainerConfig,
};
use std::path::Path;
use tempdir::TempDir;

#[derive(Clone, Debug)]
struct LineObs(usize);

impl Obs for LineObs {
    fn features(&self) -> Vec<f32> {
        vec![self.0 as f32]
    }
}

#[derive(Clone, Debug)]
struct LineAct(Vec<usize>);

impl Act for LineAct {
    fn from_levels(levels: Vec<usize>) -> Self {
        Self(levels)
    }

    fn levels(&self) -> &[usize] {
        &self.0
    }
}

/// Moves right by the chosen step; the reward is the step.
struct LineEnv {
    pos: usize,
    t: usize,
    len: usize,
    action_space: MultiDiscrete,
    observation_space: MultiDiscrete,
}

impl Env for LineEnv {
    type Config = usize;
    type Obs = LineObs;
    type Act = LineAct;
    type Info = ();

    fn build(len: &usize, _seed: i64) -> Result<Self> {
        Ok(Self {
            pos: 0,
            t: 0,
            len: *len,
            action_space: MultiDiscrete::new(vec![3])?,
            observation_space: MultiDiscrete::new(vec![2 * len + 1])?,
        })
    }

    fn reset(&mut self) -> Result<(LineObs, ())> {
        self.pos = 0;
        self.t = 0;
        Ok((LineObs(0), ()))
    }

    fn step(&mut self, a: &LineAct) -> Result<(Step<Self>, Record)> {
        self.pos += a.0[0];
        self.t += 1;
        let step = Step::new(
            LineObs(self.pos),
            a.clone(),
            a.0[0] as f32,
            false,
            self.t >= self.len,
            (),
        );
        Ok((step, Record::empty()))
    }

    fn render(&self) -> String {
        format!("pos = {}", self.pos)
    }

    fn action_space(&self) -> &MultiDiscrete {
        &self.action_space
    }

    fn observation_space(&self) -> &MultiDiscrete {
        &self.observation_space
    }
}

struct FixedAgent {
    act: usize,
    train: bool,
    opts: usize,
    observed: usize,
    rates: Vec<f64>,
}

impl FixedAgent {
    fn new(act: usize) -> Self {
        Self {
            act,
            train: false,
            opts: 0,
            observed: 0,
            rates: vec![],
        }
    }
}

impl Policy<LineEnv> for FixedAgent {
    fn sample(&mut self, _obs: &LineObs) -> Result<Sample> {
        Ok(Sample {
            act: self.act,
            log_prob: 0.0,
            value: 0.0,
        })
    }
}

impl Agent<LineEnv> for FixedAgent {
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn observe(&mut self, _transition: &campus_core::Transition<LineEnv>) -> Result<()> {
        self.observed += 1;
        Ok(())
    }

    fn opt(&mut self, trajectory: &Trajectory<LineEnv>) -> Result<Record> {
        self.opts += 1;
        Ok(Record::from_scalar("loss", trajectory.len() as f32))
    }

    fn set_exploration_rate(&mut self, rate: f64) {
        self.rates.push(rate);
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        std::fs::write(path.join("params.txt"), self.opts.to_string())?;
        Ok(())
    }

    fn load_params(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

struct FailingRecorder;

impl Recorder for FailingRecorder {
    fn write(&mut self, _record: Record) -> Result<()> {
        anyhow::bail!("unavailable")
    }
}

fn decay(max_episodes: usize) -> ExplorationDecay {
    ExplorationDecay::new(max_episodes, 0.1, 1.0, DecayLaw::Linear)
}

#[test]
fn test_training_loop_metrics() -> Result<()> {
    let mut env = LineEnv::build(&4, 0)?;
    let mut agent = FixedAgent::new(2);
    let mut recorder = BufferedRecorder::new();
    let config = TrainerConfig::default().max_episodes(5);
    let mut trainer = Trainer::build(config, decay(5));

    let history = trainer.train(&mut env, &mut agent, &mut recorder)?;

    assert_eq!(history.len(), 5);
    assert_eq!(history.total_rewards, vec![8.0; 5]);
    assert_eq!(history.episode_rewards[0], vec![2.0; 4]);
    assert_eq!(history.losses, vec![4.0; 5]);
    assert!(history.explained_variance.iter().all(|v| v.is_nan()));
    assert_eq!(agent.opts, 5);
    assert_eq!(agent.observed, 20);
    assert_eq!(agent.rates.len(), 5);
    assert!((agent.rates[1] - (1.0 - 0.9 / 5.0)).abs() < 1e-12);
    assert_eq!(history.exploration_rates, agent.rates);

    // Actions taken in states 0, 2, 4, 6 once per episode
    assert_eq!(history.visits.len(), 4);
    assert_eq!(history.visits.total(), 20);
    assert_eq!(history.visits.get(&StateKey::new(&[8.0])), 0);

    assert_eq!(recorder.len(), 5);
    let last = recorder.iter().last().unwrap();
    assert_eq!(last.get_scalar("episode")?, 4.0);
    assert_eq!(last.get_scalar("episode_reward")?, 8.0);
    assert_eq!(last.get_scalar("avg_episode_reward")?, 2.0);
    assert_eq!(last.get_array1("episode_rewards")?, vec![2.0; 4]);
    Ok(())
}

#[test]
fn test_early_stop_on_flat_rewards() -> Result<()> {
    let mut env = LineEnv::build(&2, 0)?;
    let mut agent = FixedAgent::new(1);
    let config = TrainerConfig::default()
        .max_episodes(100)
        .moving_average_window(10)
        .stopping_criterion(Some(0.01));
    let mut trainer = Trainer::build(config, decay(100));
    let history = trainer.train(&mut env, &mut agent, &mut BufferedRecorder::new())?;

    // Constant rewards: the window is flat as soon as it is full
    assert_eq!(history.len(), 10);
    Ok(())
}

#[test]
fn test_failing_recorder_does_not_abort() -> Result<()> {
    let mut env = LineEnv::build(&2, 0)?;
    let mut agent = FixedAgent::new(0);
    let config = TrainerConfig::default().max_episodes(3);
    let mut trainer = Trainer::build(config, decay(3));
    let history = trainer.train(&mut env, &mut agent, &mut FailingRecorder)?;
    assert_eq!(history.len(), 3);
    Ok(())
}

#[test]
fn test_checkpoints_and_final_model() -> Result<()> {
    let tmp = TempDir::new("trainer")?;
    let shared = SharedConfig::default()
        .results_directory(tmp.path().join("results"))
        .model_directory(tmp.path().join("models"));
    let dirs = RunDirs::with_timestamp(&shared, "fixed", "test", "20240101-000000");
    dirs.create()?;

    let mut env = LineEnv::build(&2, 0)?;
    let mut agent = FixedAgent::new(1);
    let config = TrainerConfig::default()
        .max_episodes(6)
        .checkpoint_interval(2);
    let mut trainer = Trainer::build(config, decay(6)).dirs(dirs.clone());
    trainer.train(&mut env, &mut agent, &mut BufferedRecorder::new())?;

    for ep in [2, 4, 6] {
        let saved = std::fs::read_to_string(dirs.checkpoint(ep).join("params.txt"))?;
        assert_eq!(saved, ep.to_string());
    }
    assert!(!dirs.checkpoint(3).exists());
    assert_eq!(
        std::fs::read_to_string(dirs.model.join("params.txt"))?,
        "6"
    );
    Ok(())
}
