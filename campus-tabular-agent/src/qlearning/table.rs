//! Dense action-value table.
use anyhow::{anyhow, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// File name of the table in a model directory.
pub const QTABLE_FILE: &str = "qtable.bin";

/// Action values of every (state, action) pair, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    n_states: usize,
    n_actions: usize,
    values: Vec<f32>,
}

impl QTable {
    /// A table of zeros.
    pub fn new(n_states: usize, n_actions: usize) -> Self {
        Self {
            n_states,
            n_actions,
            values: vec![0.0; n_states * n_actions],
        }
    }

    /// Number of states.
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Number of actions.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Values of the actions in `state`.
    pub fn row(&self, state: usize) -> &[f32] {
        let start = state * self.n_actions;
        &self.values[start..start + self.n_actions]
    }

    /// Value of `action` in `state`.
    pub fn get(&self, state: usize, action: usize) -> f32 {
        self.values[state * self.n_actions + action]
    }

    /// Sets the value of `action` in `state`.
    pub fn set(&mut self, state: usize, action: usize, value: f32) {
        self.values[state * self.n_actions + action] = value;
    }

    /// Greedy action in `state`. Ties go to the lowest index.
    pub fn argmax(&self, state: usize) -> usize {
        let row = self.row(state);
        let mut best = 0;
        for (i, &v) in row.iter().enumerate().skip(1) {
            if v > row[best] {
                best = i;
            }
        }
        best
    }

    /// Largest value in `state`.
    pub fn max(&self, state: usize) -> f32 {
        self.get(state, self.argmax(state))
    }

    /// Saves the table with bincode.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(&path)?);
        bincode::serialize_into(writer, self)?;
        info!("Save Q-table to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads a table saved with [`QTable::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(&path)?);
        let table: Self = bincode::deserialize_from(reader)?;
        if table.values.len() != table.n_states * table.n_actions {
            return Err(anyhow!(
                "Corrupted Q-table in {:?}: {} values for {}x{}",
                path.as_ref(),
                table.values.len(),
                table.n_states,
                table.n_actions
            ));
        }
        info!("Load Q-table from {:?}", path.as_ref());
        Ok(table)
    }

    /// Loads the table saved in `model_dir`, or `None` if there is none.
    pub fn load_saved(model_dir: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = model_dir.as_ref().join(QTABLE_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(Self::load(path)?))
    }

    /// Writes the table as CSV, one row per state and one column per action.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().from_path(path)?;
        let mut header = vec!["state".to_string()];
        header.extend((0..self.n_actions).map(|a| a.to_string()));
        wtr.write_record(&header)?;
        for s in 0..self.n_states {
            let mut row = vec![s.to_string()];
            row.extend(self.row(s).iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_argmax_first_of_ties() {
        let mut q = QTable::new(2, 3);
        assert_eq!(q.argmax(0), 0);
        q.set(1, 1, 2.0);
        q.set(1, 2, 2.0);
        assert_eq!(q.argmax(1), 1);
        assert_eq!(q.max(1), 2.0);
        assert_eq!(q.row(1), &[0.0, 2.0, 2.0]);
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let dir = TempDir::new("qtable")?;
        let mut q = QTable::new(4, 2);
        q.set(3, 1, -1.5);
        q.save(dir.path().join(QTABLE_FILE))?;
        assert_eq!(QTable::load_saved(dir.path())?, Some(q.clone()));

        q.write_csv(dir.path().join("q_table.csv"))?;
        let text = std::fs::read_to_string(dir.path().join("q_table.csv"))?;
        assert_eq!(text.lines().next(), Some("state,0,1"));
        assert_eq!(text.lines().last(), Some("3,0,-1.5"));

        let empty = TempDir::new("qtable_empty")?;
        assert_eq!(QTable::load_saved(empty.path())?, None);
        Ok(())
    }
}
