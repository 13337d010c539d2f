//! Multi-discrete spaces of observations and actions.
use crate::error::CampusError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A product of discrete ranges `{0, .., nvec[i] - 1}`.
///
/// Elements can be flattened into a single index in `0..size()`, in
/// row-major order (the last dimension varies fastest). Agents with a single
/// discrete output use the flattened index as their action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MultiDiscrete {
    nvec: Vec<usize>,
}

impl MultiDiscrete {
    /// Creates a space. Every dimension must have at least one level.
    pub fn new(nvec: Vec<usize>) -> Result<Self, CampusError> {
        if nvec.is_empty() || nvec.iter().any(|&n| n == 0) {
            return Err(CampusError::Config(format!(
                "Invalid multi-discrete space: {:?}",
                nvec
            )));
        }
        Ok(Self { nvec })
    }

    /// Number of levels of each dimension.
    pub fn nvec(&self) -> &[usize] {
        &self.nvec
    }

    /// Number of dimensions.
    pub fn ndims(&self) -> usize {
        self.nvec.len()
    }

    /// Number of elements of the space.
    pub fn size(&self) -> usize {
        self.nvec.iter().product()
    }

    /// Returns `true` if `x` belongs to the space.
    pub fn contains(&self, x: &[usize]) -> bool {
        x.len() == self.nvec.len() && x.iter().zip(self.nvec.iter()).all(|(v, n)| v < n)
    }

    /// Flattens an element into an index in `0..size()`.
    pub fn encode(&self, x: &[usize]) -> Result<usize, CampusError> {
        if !self.contains(x) {
            return Err(CampusError::InvalidAction(format!(
                "{:?} is not in space {:?}",
                x, self.nvec
            )));
        }
        Ok(x.iter()
            .zip(self.nvec.iter())
            .fold(0, |ix, (v, n)| ix * n + v))
    }

    /// Inverse of [`MultiDiscrete::encode`].
    pub fn decode(&self, index: usize) -> Result<Vec<usize>, CampusError> {
        if index >= self.size() {
            return Err(CampusError::InvalidAction(format!(
                "Index {} is out of range for space {:?}",
                index, self.nvec
            )));
        }
        let mut rest = index;
        let mut x = vec![0; self.nvec.len()];
        for (v, n) in x.iter_mut().zip(self.nvec.iter()).rev() {
            *v = rest % n;
            rest /= n;
        }
        Ok(x)
    }

    /// Samples an element uniformly.
    pub fn sample(&self, rng: &mut impl Rng) -> Vec<usize> {
        self.nvec.iter().map(|&n| rng.gen_range(0..n)).collect()
    }
}
