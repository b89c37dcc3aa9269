//! Synthetic taxpayer incomes.
//!
//! Incomes are lognormal, calibrated so the distribution's median and mean
//! hit the configured targets. All randomness comes from an [`IncomeRng`]
//! seeded by the caller; nothing here touches a thread or process RNG.

use std::f64::consts::PI;

use log::debug;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::Serialize;

use super::error::{ModelError, ModelResult};

/// `X ~ LN(mu, sigma)` with `median = exp(mu)` and
/// `mean = exp(mu + sigma^2 / 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogNormalParams {
    pub median: f64,
    pub mean: f64,
    pub mu: f64,
    pub sigma: f64,
}

impl LogNormalParams {
    pub fn from_median_mean(median: f64, mean: f64) -> ModelResult<Self> {
        if !median.is_finite() || !mean.is_finite() {
            return Err(ModelError::InvalidParameters(
                "median and mean income must be finite".to_string(),
            ));
        }
        if median <= 0.0 || mean <= 0.0 {
            return Err(ModelError::InvalidParameters(format!(
                "median ({median}) and mean ({mean}) income must be > 0"
            )));
        }
        if mean <= median {
            return Err(ModelError::InvalidParameters(format!(
                "mean income ({mean}) must exceed median income ({median}) for a right-skewed distribution"
            )));
        }

        let mu = median.ln();
        let sigma = (2.0 * (mean.ln() - mu)).sqrt();
        Ok(Self {
            median,
            mean,
            mu,
            sigma,
        })
    }

    fn draw(&self, rng: &mut IncomeRng) -> f64 {
        (self.mu + self.sigma * rng.standard_normal()).exp()
    }
}

/// Seeded generator threaded through every draw.
pub struct IncomeRng {
    inner: Pcg64Mcg,
    cached_normal: Option<f64>,
}

impl IncomeRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
            cached_normal: None,
        }
    }

    /// Uniform in the open interval (0, 1).
    pub fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.inner.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    /// Box-Muller; the second variate of each pair is kept for the next call.
    pub fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.next_f64();
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached_normal = Some(r * theta.sin());
        r * theta.cos()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomeSample {
    incomes: Vec<f64>,
    params: LogNormalParams,
    seed: u64,
    population: u64,
}

impl IncomeSample {
    pub fn incomes(&self) -> &[f64] {
        &self.incomes
    }

    pub fn len(&self) -> usize {
        self.incomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incomes.is_empty()
    }

    pub fn params(&self) -> LogNormalParams {
        self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Taxpayers represented by the sample.
    pub fn population(&self) -> u64 {
        self.population
    }

    /// Taxpayers each draw stands for.
    pub fn weight(&self) -> f64 {
        self.population as f64 / self.incomes.len() as f64
    }

    pub fn mean(&self) -> f64 {
        self.incomes.iter().sum::<f64>() / self.incomes.len() as f64
    }

    pub fn median(&self) -> f64 {
        self.percentile(50.0)
    }

    pub fn percentile(&self, p: f64) -> f64 {
        let mut values = self.incomes.clone();
        percentile(&mut values, p)
    }
}

pub fn sample(count: usize, median: f64, mean: f64, seed: u64) -> ModelResult<IncomeSample> {
    sample_scaled(count, count as u64, median, mean, seed)
}

/// Draws `count` incomes that together stand for `population` taxpayers.
pub fn sample_scaled(
    count: usize,
    population: u64,
    median: f64,
    mean: f64,
    seed: u64,
) -> ModelResult<IncomeSample> {
    let params = LogNormalParams::from_median_mean(median, mean)?;
    if count == 0 {
        return Err(ModelError::InvalidParameters(
            "income sample must contain at least one draw".to_string(),
        ));
    }
    if population == 0 {
        return Err(ModelError::InvalidParameters(
            "represented population must be > 0".to_string(),
        ));
    }

    debug!(
        "drawing {count} incomes for {population} taxpayers (mu={:.4}, sigma={:.4}, seed={seed})",
        params.mu, params.sigma
    );

    let mut rng = IncomeRng::new(seed);
    let incomes = (0..count).map(|_| params.draw(&mut rng)).collect();

    Ok(IncomeSample {
        incomes,
        params,
        seed,
        population,
    })
}

fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
