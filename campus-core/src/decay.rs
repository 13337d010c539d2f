//! Exploration-rate schedules.
//!
//! [`ExplorationDecay`] maps the index of an episode to an exploration rate
//! with one of the twenty laws of [`DecayLaw`]. Laws are selected in
//! configuration files by their number, `e_decay_function: 1..=20`.
use crate::error::CampusError;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, f64::consts::PI};

/// Number of buckets of [`DecayLaw::Stepwise`].
const STEPS: usize = 10;

/// Exponent of [`DecayLaw::CustomPolynomial`].
const CUSTOM_POWER: i32 = 3;

/// Decay laws of the exploration rate, numbered from 1 in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DecayLaw {
    /// `r0 * exp(-e / E)`.
    Exponential,
    /// Linear from `r0` to `rmin`.
    Linear,
    /// `r0 * (1 - e / E)^2`.
    Polynomial,
    /// `r0 / (1 + e)`.
    InverseTime,
    /// Half sine wave around the midpoint of `r0` and `rmin`.
    Sine,
    /// Logarithmic from `r0` to `rmin`.
    Logarithmic,
    /// `rmin + (r0 - rmin) (1 - tanh(e / E)) / 2`.
    HyperbolicTangent,
    /// `r0 * (1 - sqrt(e / E))`.
    SquareRoot,
    /// Ten equal buckets, each lowering the rate by `(r0 - rmin) / 10`.
    Stepwise,
    /// `r0 / sqrt(e + 1)`.
    InverseSquareRoot,
    /// Logistic curve centered at `E / 2`.
    Sigmoid,
    /// `r0 * (1 - (e / E)^2)`.
    Quadratic,
    /// `r0 * (1 - (e / E)^3)`.
    Cubic,
    /// `rmin + (r0 - rmin) sin^2(pi e / E)`.
    SineSquared,
    /// `rmin + (r0 - rmin) cos^2(pi e / E)`.
    CosineSquared,
    /// `r0 * exp(-exp(e / E))`.
    DoubleExponential,
    /// `rmin + (r0 - rmin) / (1 + ln(e + 1))`.
    LogLogistic,
    /// `rmin + (r0 - rmin) / (1 + H(e + 1))`, `H` the harmonic numbers.
    HarmonicSeries,
    /// Linear down to `rmin` at `E / 2`, then constant.
    PiecewiseLinear,
    /// `r0 * (1 - (e / E)^p)` with `p = 3`.
    CustomPolynomial,
}

impl DecayLaw {
    /// All laws in numbering order.
    pub const ALL: [DecayLaw; 20] = [
        DecayLaw::Exponential,
        DecayLaw::Linear,
        DecayLaw::Polynomial,
        DecayLaw::InverseTime,
        DecayLaw::Sine,
        DecayLaw::Logarithmic,
        DecayLaw::HyperbolicTangent,
        DecayLaw::SquareRoot,
        DecayLaw::Stepwise,
        DecayLaw::InverseSquareRoot,
        DecayLaw::Sigmoid,
        DecayLaw::Quadratic,
        DecayLaw::Cubic,
        DecayLaw::SineSquared,
        DecayLaw::CosineSquared,
        DecayLaw::DoubleExponential,
        DecayLaw::LogLogistic,
        DecayLaw::HarmonicSeries,
        DecayLaw::PiecewiseLinear,
        DecayLaw::CustomPolynomial,
    ];

    /// Number of the law used in configuration files.
    pub fn id(&self) -> u32 {
        DecayLaw::ALL
            .iter()
            .position(|l| l == self)
            .map_or(0, |i| i as u32 + 1)
    }
}

impl TryFrom<u32> for DecayLaw {
    type Error = CampusError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            1..=20 => Ok(DecayLaw::ALL[id as usize - 1]),
            _ => Err(CampusError::InvalidDecayFunction(id)),
        }
    }
}

impl From<DecayLaw> for u32 {
    fn from(law: DecayLaw) -> u32 {
        law.id()
    }
}

/// Computes exploration rates over a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationDecay {
    max_episodes: usize,
    min_rate: f64,
    initial_rate: f64,
    law: DecayLaw,
}

impl ExplorationDecay {
    /// Creates a schedule.
    pub fn new(max_episodes: usize, min_rate: f64, initial_rate: f64, law: DecayLaw) -> Self {
        Self {
            max_episodes,
            min_rate,
            initial_rate,
            law,
        }
    }

    /// Creates a schedule from the number of a law.
    pub fn from_id(
        max_episodes: usize,
        min_rate: f64,
        initial_rate: f64,
        id: u32,
    ) -> Result<Self, CampusError> {
        Ok(Self::new(
            max_episodes,
            min_rate,
            initial_rate,
            DecayLaw::try_from(id)?,
        ))
    }

    /// The decay law.
    pub fn law(&self) -> DecayLaw {
        self.law
    }

    /// The exploration rate after `episode` episodes.
    pub fn rate(&self, episode: usize) -> f64 {
        let e = episode as f64;
        let n = self.max_episodes as f64;
        let r0 = self.initial_rate;
        let rmin = self.min_rate;
        let span = r0 - rmin;

        match self.law {
            DecayLaw::Exponential => r0 * (-e / n).exp(),
            DecayLaw::Linear => r0 - span * (e / n),
            DecayLaw::Polynomial => r0 * (1.0 - e / n).powi(2),
            DecayLaw::InverseTime => r0 / (1.0 + e),
            DecayLaw::Sine => rmin + 0.5 * span * (1.0 + (PI * e / n).sin()),
            DecayLaw::Logarithmic => r0 - span * (e + 1.0).ln() / (n + 1.0).ln(),
            DecayLaw::HyperbolicTangent => rmin + 0.5 * span * (1.0 - (e / n).tanh()),
            DecayLaw::SquareRoot => r0 * (1.0 - (e / n).sqrt()),
            DecayLaw::Stepwise => {
                let width = (self.max_episodes / STEPS).max(1);
                let step = span / STEPS as f64;
                r0 - (episode / width) as f64 * step
            }
            DecayLaw::InverseSquareRoot => r0 / (e + 1.0).sqrt(),
            DecayLaw::Sigmoid => {
                let midpoint = n / 2.0;
                let smoothness = n / 10.0;
                rmin + span / (1.0 + ((e - midpoint) / smoothness).exp())
            }
            DecayLaw::Quadratic => r0 * (1.0 - (e / n).powi(2)),
            DecayLaw::Cubic => r0 * (1.0 - (e / n).powi(3)),
            DecayLaw::SineSquared => rmin + span * (PI * e / n).sin().powi(2),
            DecayLaw::CosineSquared => rmin + span * (PI * e / n).cos().powi(2),
            DecayLaw::DoubleExponential => r0 * (-(e / n).exp()).exp(),
            DecayLaw::LogLogistic => rmin + span / (1.0 + (e + 1.0).ln()),
            DecayLaw::HarmonicSeries => {
                let h: f64 = (1..=episode + 1).map(|k| 1.0 / k as f64).sum();
                rmin + span / (1.0 + h)
            }
            DecayLaw::PiecewiseLinear => {
                if e < n / 2.0 {
                    r0 - span * (2.0 * e / n)
                } else {
                    rmin
                }
            }
            DecayLaw::CustomPolynomial => r0 * (1.0 - (e / n).powi(CUSTOM_POWER)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E: usize = 1000;
    const R0: f64 = 1.0;
    const RMIN: f64 = 0.1;

    fn schedule(law: DecayLaw) -> ExplorationDecay {
        ExplorationDecay::new(E, RMIN, R0, law)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_ids_round_trip() {
        for (i, law) in DecayLaw::ALL.iter().enumerate() {
            assert_eq!(law.id(), i as u32 + 1);
            assert_eq!(DecayLaw::try_from(i as u32 + 1).unwrap(), *law);
        }
    }

    #[test]
    fn test_invalid_id() {
        assert_eq!(
            DecayLaw::try_from(0),
            Err(CampusError::InvalidDecayFunction(0))
        );
        assert_eq!(
            ExplorationDecay::from_id(E, RMIN, R0, 21),
            Err(CampusError::InvalidDecayFunction(21))
        );
    }

    #[test]
    fn test_initial_rate() {
        use DecayLaw::*;
        for law in [
            Exponential,
            Linear,
            Polynomial,
            InverseTime,
            Logarithmic,
            SquareRoot,
            Stepwise,
            InverseSquareRoot,
            Quadratic,
            Cubic,
            CosineSquared,
            PiecewiseLinear,
            CustomPolynomial,
        ] {
            assert!(approx(schedule(law).rate(0), R0), "{:?}", law);
        }

        // Laws whose value at episode 0 is defined relative to the midpoint or minimum
        let mid = RMIN + 0.5 * (R0 - RMIN);
        assert!(approx(schedule(Sine).rate(0), mid));
        assert!(approx(schedule(HyperbolicTangent).rate(0), mid));
        assert!(approx(schedule(SineSquared).rate(0), RMIN));
        assert!(approx(schedule(LogLogistic).rate(0), R0));
        assert!(approx(schedule(HarmonicSeries).rate(0), mid));
        assert!(approx(schedule(DoubleExponential).rate(0), R0 * (-1f64).exp()));
        assert!(schedule(Sigmoid).rate(0) > 0.99 * R0);
    }

    #[test]
    fn test_trend_toward_min() {
        use DecayLaw::*;
        let monotonic = [
            Exponential,
            Linear,
            Polynomial,
            InverseTime,
            Logarithmic,
            HyperbolicTangent,
            SquareRoot,
            Stepwise,
            InverseSquareRoot,
            Sigmoid,
            Quadratic,
            Cubic,
            DoubleExponential,
            LogLogistic,
            HarmonicSeries,
            PiecewiseLinear,
            CustomPolynomial,
        ];
        for law in monotonic {
            let s = schedule(law);
            let rates = (0..=E).map(|e| s.rate(e)).collect::<Vec<_>>();
            assert!(
                rates.windows(2).all(|w| w[1] <= w[0] + 1e-12),
                "{:?} is not non-increasing",
                law
            );
            assert!(rates[E] < rates[0], "{:?}", law);
        }

        // Reaching the minimum (or below) at the end of the budget
        for law in [Linear, Logarithmic, Stepwise, PiecewiseLinear] {
            assert!(schedule(law).rate(E) <= RMIN + 1e-9, "{:?}", law);
        }
        for law in [Polynomial, SquareRoot, Quadratic, Cubic, CustomPolynomial] {
            assert!(approx(schedule(law).rate(E), 0.0), "{:?}", law);
        }
        assert!(approx(schedule(CosineSquared).rate(E / 2), RMIN));
        assert!(approx(schedule(SineSquared).rate(E), RMIN));
        assert!(schedule(Sine).rate(E) <= schedule(Sine).rate(E / 2));
    }

    #[test]
    fn test_stepwise_buckets() {
        let s = schedule(DecayLaw::Stepwise);
        let step = (R0 - RMIN) / 10.0;
        assert!(approx(s.rate(99), R0));
        assert!(approx(s.rate(100), R0 - step));
        assert!(approx(s.rate(550), R0 - 5.0 * step));

        // Budgets smaller than the number of buckets do not divide by zero
        let s = ExplorationDecay::new(5, RMIN, R0, DecayLaw::Stepwise);
        assert!(s.rate(3).is_finite());
    }
}
