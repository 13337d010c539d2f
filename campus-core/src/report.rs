//! Reports of training runs written as CSV files.
//!
//! [`summarize`] aggregates the total rewards of repeated runs episode by
//! episode. Runs may have different lengths when some of them stopped early;
//! the summary of an episode only uses the runs that reached it.
use crate::{
    stats::{self, Interval},
    TrainingHistory,
};
use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::{fs::File, path::Path};

/// Statistics of the total rewards of one episode over repeated runs.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    /// Episode index.
    pub episode: usize,

    /// Number of runs that reached the episode.
    pub runs: usize,

    /// Mean of the total rewards.
    pub mean: f64,

    /// Median of the total rewards.
    pub median: f64,

    /// Tolerance interval, `None` if undefined.
    pub tolerance: Option<Interval>,

    /// Confidence interval of the mean, `None` if undefined.
    pub confidence: Option<Interval>,
}

/// Summarizes the total rewards of `histories`.
///
/// `alpha` and `beta` are the parameters of the tolerance interval. The
/// confidence interval is at 95%.
pub fn summarize(histories: &[TrainingHistory], alpha: f64, beta: f64) -> Vec<EpisodeSummary> {
    let n_episodes = histories.iter().map(|h| h.len()).max().unwrap_or(0);
    (0..n_episodes)
        .map(|episode| {
            let xs = histories
                .iter()
                .filter_map(|h| h.total_rewards.get(episode).map(|&r| r as f64))
                .collect::<Vec<_>>();
            EpisodeSummary {
                episode,
                runs: xs.len(),
                mean: stats::mean(&xs),
                median: stats::median(&xs),
                tolerance: stats::tolerance_interval(&xs, alpha, beta),
                confidence: stats::confidence_interval(&xs, 0.05),
            }
        })
        .collect()
}

#[derive(Serialize)]
struct IntervalRow {
    episode: usize,
    center: f64,
    lower: Option<f64>,
    upper: Option<f64>,
}

fn write_intervals(
    path: &Path,
    rows: impl Iterator<Item = (usize, f64, Option<Interval>)>,
) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(File::create(path)?);
    for (episode, center, interval) in rows {
        wtr.serialize(IntervalRow {
            episode,
            center,
            lower: interval.map(|i| i.lower),
            upper: interval.map(|i| i.upper),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct ToleranceRow {
    episode: usize,
    mean: f64,
    median: f64,
    lower: Option<f64>,
    upper: Option<f64>,
}

/// Writes `tolerance_interval.csv` and `confidence_interval.csv` in `dir`.
///
/// Tolerance intervals come with both the mean and the median of the
/// episode, so that curves can be drawn around either. Confidence intervals
/// are centered on the mean. Undefined intervals are written as empty fields.
pub fn write_summary(dir: impl AsRef<Path>, summary: &[EpisodeSummary]) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut wtr =
        WriterBuilder::new().from_writer(File::create(dir.join("tolerance_interval.csv"))?);
    for s in summary {
        wtr.serialize(ToleranceRow {
            episode: s.episode,
            mean: s.mean,
            median: s.median,
            lower: s.tolerance.map(|i| i.lower),
            upper: s.tolerance.map(|i| i.upper),
        })?;
    }
    wtr.flush()?;

    write_intervals(
        &dir.join("confidence_interval.csv"),
        summary.iter().map(|s| (s.episode, s.mean, s.confidence)),
    )
}

#[derive(Serialize)]
struct RewardRow {
    episode: usize,
    total_reward: f32,
    avg_reward: f64,
    loss: f32,
    exploration_rate: f64,
}

#[derive(Serialize)]
struct ExplainedVarianceRow {
    episode: usize,
    explained_variance: f64,
}

#[derive(Serialize)]
struct VisitRow {
    state: String,
    visits: usize,
}

/// Writes `rewards.csv`, `explained_variance.csv` and `states_visited.csv`
/// of a single run in `dir`.
pub fn write_history(dir: impl AsRef<Path>, history: &TrainingHistory) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut wtr = WriterBuilder::new().from_writer(File::create(dir.join("rewards.csv"))?);
    for (episode, avg_reward) in history.avg_rewards().into_iter().enumerate() {
        wtr.serialize(RewardRow {
            episode,
            total_reward: history.total_rewards[episode],
            avg_reward,
            loss: history.losses[episode],
            exploration_rate: history.exploration_rates[episode],
        })?;
    }
    wtr.flush()?;

    let mut wtr =
        WriterBuilder::new().from_writer(File::create(dir.join("explained_variance.csv"))?);
    for (episode, &explained_variance) in history.explained_variance.iter().enumerate() {
        wtr.serialize(ExplainedVarianceRow {
            episode,
            explained_variance,
        })?;
    }
    wtr.flush()?;

    let mut wtr = WriterBuilder::new().from_writer(File::create(dir.join("states_visited.csv"))?);
    for (state, visits) in history.visits.sorted() {
        wtr.serialize(VisitRow {
            state: state.to_string(),
            visits,
        })?;
    }
    wtr.flush()?;

    Ok(())
}
