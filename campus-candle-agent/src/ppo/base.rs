//! PPO agent.
use super::{model::MODEL_FILE, ActorCritic, PpoConfig};
use crate::opt::{clip_grad_norm, Optimizer, OptimizerConfig};
use anyhow::Result;
use campus_core::{
    record::{Record, RecordValue},
    stats,
    trajectory::{compute_gae, compute_returns, Trajectory},
    Agent, Env, Obs, Policy, Sample,
};
use candle_core::{Device, Tensor, D};
use log::{trace, warn};
use rand::{distributions::WeightedIndex, rngs::SmallRng, Rng, SeedableRng};
use std::{convert::TryFrom, path::Path};

/// Coefficient of the critic loss.
const VALUE_COEF: f64 = 0.5;

/// Coefficient of the entropy bonus.
const ENTROPY_COEF: f64 = 0.01;

/// Maximum global norm of the gradients.
const MAX_GRAD_NORM: f64 = 0.5;

/// Number of updates between two decays of the learning rate.
pub const LR_DECAY_INTERVAL: usize = 100;

/// Clipped surrogate objective `min(r * A, clip(r, 1 - eps, 1 + eps) * A)`,
/// element-wise.
pub fn clipped_surrogate(ratio: &Tensor, advantages: &Tensor, clip_epsilon: f64) -> Result<Tensor> {
    let surr1 = (ratio * advantages)?;
    let lo = (1.0 - clip_epsilon) as f32;
    let hi = (1.0 + clip_epsilon) as f32;
    let surr2 = (ratio.clamp(lo, hi)? * advantages)?;
    Ok(surr1.minimum(&surr2)?)
}

/// Policy ratio `exp(new - old)`.
///
/// Steps whose old log-probability is not finite get a ratio of exactly 1
/// with no gradient through it.
fn policy_ratio(new_log_probs: &Tensor, old_log_probs: &[f32]) -> Result<Tensor> {
    let device = new_log_probs.device();
    let n = old_log_probs.len();
    let mask = old_log_probs
        .iter()
        .map(|p| if p.is_finite() { 1f32 } else { 0f32 })
        .collect::<Vec<_>>();
    let old = old_log_probs
        .iter()
        .map(|&p| if p.is_finite() { p } else { 0f32 })
        .collect::<Vec<_>>();
    let mask = Tensor::from_vec(mask, n, device)?;
    let old = Tensor::from_vec(old, n, device)?;
    Ok(((new_log_probs - old)? * mask)?.exp()?)
}

/// Proximal policy optimization agent with an actor-critic network.
///
/// Actions are flattened indices into the action space of the environment.
/// In training mode actions are sampled from the policy; in evaluation mode
/// the most probable action is taken. The network is updated once per
/// episode by [`Agent::opt`].
pub struct Ppo {
    config: PpoConfig,
    model: ActorCritic,
    opt: Optimizer,
    rng: SmallRng,
    train: bool,
    exploration_rate: f64,
    n_updates: usize,
    device: Device,
}

impl Ppo {
    /// Constructs a PPO agent for observations of `obs_dim` features and
    /// `n_actions` actions.
    pub fn build(config: PpoConfig, obs_dim: usize, n_actions: usize) -> Result<Self> {
        config.validate()?;
        let device = Device::try_from(config.device)?;
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let model = ActorCritic::build(
            obs_dim,
            config.hidden_units,
            n_actions,
            config.softmax_temperature,
            device.clone(),
            &mut rng,
        )?;
        let opt = OptimizerConfig::Adam {
            lr: config.learning_rate,
        }
        .build(model.varmap().all_vars())?;

        Ok(Self {
            exploration_rate: config.exploration_rate,
            config,
            model,
            opt,
            rng,
            train: false,
            n_updates: 0,
            device,
        })
    }

    /// Constructs a PPO agent for the observation and action spaces of `env`.
    pub fn for_env<E: Env>(config: PpoConfig, env: &E) -> Result<Self> {
        Self::build(
            config,
            env.observation_space().ndims(),
            env.action_space().size(),
        )
    }

    /// The actor-critic network.
    pub fn model(&self) -> &ActorCritic {
        &self.model
    }

    /// Current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.opt.learning_rate()
    }

    /// Current exploration rate.
    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    fn random_action(&mut self) -> usize {
        self.rng.gen_range(0..self.model.n_actions())
    }

    /// Updates the network on one episode. Returns the losses of the last
    /// minibatch.
    fn update(
        &mut self,
        states: &Tensor,
        actions: &[u32],
        old_log_probs: &[f32],
        advantages: &[f32],
        returns: &[f32],
    ) -> Result<Record> {
        let n = actions.len();
        let batch_size = self.config.batch_size;
        let vars = self.model.varmap().all_vars();
        let mut record = Record::empty();

        for _ in 0..self.config.epochs {
            for start in (0..n).step_by(batch_size) {
                let len = batch_size.min(n - start);
                let end = start + len;
                let xs = states.narrow(0, start, len)?;
                let acts = Tensor::from_slice(&actions[start..end], (len, 1), &self.device)?;
                let adv = Tensor::from_slice(&advantages[start..end], len, &self.device)?;
                let ret = Tensor::from_slice(&returns[start..end], len, &self.device)?;

                let (log_probs, values) = self.model.forward(&xs)?;
                let new_log_probs = log_probs.gather(&acts, 1)?.squeeze(1)?;
                let ratio = policy_ratio(&new_log_probs, &old_log_probs[start..end])?;

                let actor_loss = clipped_surrogate(&ratio, &adv, self.config.clip_epsilon)?
                    .mean_all()?
                    .neg()?;
                let critic_loss = candle_nn::loss::mse(&values, &ret)?;
                let entropy = (log_probs.exp()? * &log_probs)?
                    .sum(D::Minus1)?
                    .neg()?
                    .mean_all()?;
                let loss = ((&actor_loss + (&critic_loss * VALUE_COEF)?)?
                    - (&entropy * ENTROPY_COEF)?)?;

                let mut grads = loss.backward()?;
                let grad_norm = clip_grad_norm(&mut grads, &vars, MAX_GRAD_NORM)?;
                self.opt.step(&grads)?;

                record = Record::from_slice(&[
                    ("loss", RecordValue::Scalar(loss.to_scalar::<f32>()?)),
                    ("actor_loss", RecordValue::Scalar(actor_loss.to_scalar::<f32>()?)),
                    ("critic_loss", RecordValue::Scalar(critic_loss.to_scalar::<f32>()?)),
                    ("entropy", RecordValue::Scalar(entropy.to_scalar::<f32>()?)),
                    ("grad_norm", RecordValue::Scalar(grad_norm as f32)),
                ]);
            }
        }

        self.n_updates += 1;
        if self.n_updates % LR_DECAY_INTERVAL == 0 {
            let lr = self.opt.learning_rate() * self.config.learning_rate_decay;
            self.opt.set_learning_rate(lr);
            trace!("Learning rate decayed to {}", lr);
        }

        Ok(record)
    }
}

impl<E: Env> Policy<E> for Ppo {
    /// Samples an action.
    ///
    /// If the action distribution contains a non-finite value, a uniformly
    /// random action is returned with a log-probability of `-inf`.
    fn sample(&mut self, obs: &E::Obs) -> Result<Sample> {
        let (probs, value) = self.model.probs(&obs.features())?;

        if probs.iter().any(|p| !p.is_finite()) {
            warn!("Non-finite action probabilities, taking a random action");
            return Ok(Sample {
                act: self.random_action(),
                log_prob: f32::NEG_INFINITY,
                value,
            });
        }

        let act = if self.train {
            match WeightedIndex::new(&probs) {
                Ok(dist) => self.rng.sample(dist),
                Err(e) => {
                    warn!("Invalid action distribution ({}), taking a random action", e);
                    return Ok(Sample {
                        act: self.random_action(),
                        log_prob: f32::NEG_INFINITY,
                        value,
                    });
                }
            }
        } else {
            probs
                .iter()
                .enumerate()
                .fold((0, f32::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
                .0
        };

        Ok(Sample {
            act,
            log_prob: probs[act].ln(),
            value,
        })
    }
}

impl<E: Env> Agent<E> for Ppo {
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    /// Computes advantages and returns of the episode and updates the
    /// network.
    ///
    /// The record contains `loss`, `actor_loss`, `critic_loss`, `entropy`,
    /// `grad_norm` of the last minibatch, `explained_variance` of the values
    /// with respect to the returns, `learning_rate` and `exploration_rate`.
    fn opt(&mut self, trajectory: &Trajectory<E>) -> Result<Record> {
        trajectory.validate()?;
        if trajectory.is_empty() {
            warn!("Empty trajectory, skipping the update");
            return Ok(Record::empty());
        }

        let next_value = self.model.value(&trajectory.last_obs.features())?;
        let advantages = compute_gae(
            &trajectory.rewards,
            &trajectory.values,
            &trajectory.dones,
            next_value,
            self.config.discount_factor as f32,
            self.config.gae_lambda as f32,
        )?;
        let returns = compute_returns(&advantages, &trajectory.values)?;

        let n = trajectory.len();
        let features = trajectory
            .obs
            .iter()
            .flat_map(|o| o.features())
            .collect::<Vec<_>>();
        let states = Tensor::from_vec(features, (n, self.model.in_dim()), &self.device)?;
        let actions = trajectory
            .actions
            .iter()
            .map(|&a| a as u32)
            .collect::<Vec<_>>();

        let mut record = self.update(
            &states,
            &actions,
            &trajectory.log_probs,
            &advantages,
            &returns,
        )?;

        let ev = stats::explained_variance(&returns, &trajectory.values)?;
        record.insert("explained_variance", RecordValue::Scalar(ev as f32));
        record.insert(
            "learning_rate",
            RecordValue::Scalar(self.opt.learning_rate() as f32),
        );
        record.insert(
            "exploration_rate",
            RecordValue::Scalar(self.exploration_rate as f32),
        );
        Ok(record)
    }

    /// Stores the exploration rate, reported in the records of updates.
    ///
    /// Exploration of the agent comes from sampling the policy.
    fn set_exploration_rate(&mut self, rate: f64) {
        self.exploration_rate = rate;
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        self.model.save(path.join(MODEL_FILE))
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.model.load(path.join(MODEL_FILE))
    }
}
