//! Actor-critic network of the PPO agent.
use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{linear, ops::log_softmax, Linear, Module, VarBuilder, VarMap};
use log::info;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::path::Path;

/// File name of the parameters in a model directory.
pub const MODEL_FILE: &str = "model.pt";

/// Names and input dimensions of the layers.
fn layers(in_dim: usize, hidden: usize) -> [(&'static str, usize); 4] {
    [
        ("trunk1", in_dim),
        ("trunk2", hidden),
        ("actor", hidden),
        ("critic", hidden),
    ]
}

/// Actor-critic network.
///
/// A shared trunk `Linear(in, h) -> ReLU -> Linear(h, h) -> ReLU` feeds an
/// actor head `Linear(h, n_actions)`, followed by a softmax with temperature,
/// and a critic head `Linear(h, 1)`.
pub struct ActorCritic {
    device: Device,
    varmap: VarMap,
    trunk1: Linear,
    trunk2: Linear,
    actor: Linear,
    critic: Linear,
    in_dim: usize,
    n_actions: usize,
    temperature: f64,
}

impl ActorCritic {
    /// Builds a network with weights drawn from `rng`.
    ///
    /// The weights and biases of a layer with `fan_in` inputs are uniform in
    /// `[-1/sqrt(fan_in), 1/sqrt(fan_in)]`.
    pub fn build(
        in_dim: usize,
        hidden: usize,
        n_actions: usize,
        temperature: f64,
        device: Device,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let trunk1 = linear(in_dim, hidden, vb.pp("trunk1"))?;
        let trunk2 = linear(hidden, hidden, vb.pp("trunk2"))?;
        let actor = linear(hidden, n_actions, vb.pp("actor"))?;
        let critic = linear(hidden, 1, vb.pp("critic"))?;

        {
            let data = varmap
                .data()
                .lock()
                .map_err(|e| anyhow!("Failed to lock parameters: {}", e))?;
            for (name, fan_in) in layers(in_dim, hidden) {
                let bound = 1.0 / (fan_in as f32).sqrt();
                for suffix in ["weight", "bias"] {
                    let key = format!("{}.{}", name, suffix);
                    let var = data
                        .get(&key)
                        .ok_or_else(|| anyhow!("Missing parameter {}", key))?;
                    let shape = var.shape().clone();
                    let values = (0..shape.elem_count())
                        .map(|_| rng.gen_range(-bound..=bound))
                        .collect::<Vec<f32>>();
                    var.set(&Tensor::from_vec(values, shape, &device)?)?;
                }
            }
        }

        Ok(Self {
            device,
            varmap,
            trunk1,
            trunk2,
            actor,
            critic,
            in_dim,
            n_actions,
            temperature,
        })
    }

    /// Returns log-probabilities of actions, `(batch, n_actions)`, and state
    /// values, `(batch,)`.
    pub fn forward(&self, xs: &Tensor) -> Result<(Tensor, Tensor)> {
        let h = self.trunk1.forward(xs)?.relu()?;
        let h = self.trunk2.forward(&h)?.relu()?;
        let logits = (self.actor.forward(&h)? / self.temperature)?;
        let log_probs = log_softmax(&logits, D::Minus1)?;
        let values = self.critic.forward(&h)?.squeeze(D::Minus1)?;
        Ok((log_probs, values))
    }

    /// Returns action probabilities and the value of a single observation.
    pub fn probs(&self, features: &[f32]) -> Result<(Vec<f32>, f32)> {
        let xs = Tensor::from_slice(features, (1, self.in_dim), &self.device)?;
        let (log_probs, values) = self.forward(&xs)?;
        let probs = log_probs.exp()?.squeeze(0)?.to_vec1::<f32>()?;
        let value = values.get(0)?.to_scalar::<f32>()?;
        Ok((probs, value))
    }

    /// Value of a single observation.
    pub fn value(&self, features: &[f32]) -> Result<f32> {
        Ok(self.probs(features)?.1)
    }

    /// Input dimension.
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Number of actions.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Device of the parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Parameters.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the parameters in safetensors format.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save actor-critic to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads parameters saved with [`ActorCritic::save`].
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load actor-critic from {:?}", path.as_ref());
        Ok(())
    }
}

/// Loads the network saved in `model_dir`, or `None` if there is no saved
/// model.
pub fn load_saved_model(
    model_dir: impl AsRef<Path>,
    in_dim: usize,
    hidden: usize,
    n_actions: usize,
    temperature: f64,
    device: Device,
) -> Result<Option<ActorCritic>> {
    let path = model_dir.as_ref().join(MODEL_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    // Parameters are overwritten by the loaded ones
    let mut rng = SmallRng::seed_from_u64(0);
    let mut model = ActorCritic::build(in_dim, hidden, n_actions, temperature, device, &mut rng)?;
    model.load(path)?;
    Ok(Some(model))
}
