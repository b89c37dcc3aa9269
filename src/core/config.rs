//! Economic assumptions for a projection run.
//!
//! Every default lives here. The CLI and the HTTP front end both start from
//! [`Assumptions::default`] and override fields, so a fixed console run and a
//! slider-driven request go through the same code path.

use serde::{Deserialize, Serialize};

use super::error::{ModelError, ModelResult};
use super::types::{ScenarioSpec, UpratingPolicy};

pub const DEFAULT_BASE_YEAR: u32 = 2024;
pub const MIN_BASE_YEAR: u32 = 1900;
pub const MAX_BASE_YEAR: u32 = 9999;
pub const DEFAULT_PERSONAL_ALLOWANCE: f64 = 12_570.0;
pub const DEFAULT_BASIC_RATE_LIMIT: f64 = 50_270.0;
pub const DEFAULT_HIGHER_RATE_LIMIT: f64 = 125_140.0;
pub const DEFAULT_BASIC_RATE: f64 = 0.20;
pub const DEFAULT_HIGHER_RATE: f64 = 0.40;
pub const DEFAULT_ADDITIONAL_RATE: f64 = 0.45;
pub const DEFAULT_TAPER_THRESHOLD: f64 = 100_000.0;

/// HMRC estimate of UK income taxpayers, 2024.
pub const DEFAULT_POPULATION: u64 = 34_700_000;
pub const DEFAULT_SAMPLE_SIZE: usize = 200_000;
/// ONS ASHE 2024 calibration targets.
pub const DEFAULT_MEDIAN_INCOME: f64 = 35_000.0;
pub const DEFAULT_MEAN_INCOME: f64 = 42_000.0;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_HORIZON_YEARS: u32 = 5;

pub const DEFAULT_CPI: f64 = 0.025;
pub const DEFAULT_RPI: f64 = 0.035;
pub const DEFAULT_WAGE_GROWTH: f64 = 0.040;

pub const FROZEN_SCENARIO: &str = "frozen";
pub const CPI_SCENARIO: &str = "cpi";
pub const WAGE_SCENARIO: &str = "wage";
pub const RPI_SCENARIO: &str = "rpi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Assumptions {
    pub base_year: u32,
    pub population: u64,
    /// Draws actually taken; each represents `population / sample_size`
    /// taxpayers.
    pub sample_size: usize,
    pub median_income: f64,
    pub mean_income: f64,
    pub seed: u64,
    pub horizon_years: u32,

    pub cpi_rate: f64,
    pub rpi_rate: f64,
    pub wage_growth_rate: f64,

    pub personal_allowance: f64,
    pub basic_rate_limit: f64,
    pub higher_rate_limit: f64,
    pub basic_rate: f64,
    pub higher_rate: f64,
    pub additional_rate: f64,
    pub allowance_taper: bool,
    pub taper_threshold: f64,

    /// Annual growth applied to every income at evaluation time. Zero keeps
    /// the distribution fixed so only the threshold policy varies.
    pub income_growth_rate: f64,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            base_year: DEFAULT_BASE_YEAR,
            population: DEFAULT_POPULATION,
            sample_size: DEFAULT_SAMPLE_SIZE,
            median_income: DEFAULT_MEDIAN_INCOME,
            mean_income: DEFAULT_MEAN_INCOME,
            seed: DEFAULT_SEED,
            horizon_years: DEFAULT_HORIZON_YEARS,
            cpi_rate: DEFAULT_CPI,
            rpi_rate: DEFAULT_RPI,
            wage_growth_rate: DEFAULT_WAGE_GROWTH,
            personal_allowance: DEFAULT_PERSONAL_ALLOWANCE,
            basic_rate_limit: DEFAULT_BASIC_RATE_LIMIT,
            higher_rate_limit: DEFAULT_HIGHER_RATE_LIMIT,
            basic_rate: DEFAULT_BASIC_RATE,
            higher_rate: DEFAULT_HIGHER_RATE,
            additional_rate: DEFAULT_ADDITIONAL_RATE,
            allowance_taper: false,
            taper_threshold: DEFAULT_TAPER_THRESHOLD,
            income_growth_rate: 0.0,
        }
    }
}

impl Assumptions {
    /// The four threshold policies compared in every run, in display order.
    pub fn scenarios(&self) -> ModelResult<Vec<ScenarioSpec>> {
        Ok(vec![
            ScenarioSpec::frozen(FROZEN_SCENARIO),
            ScenarioSpec::new(CPI_SCENARIO, UpratingPolicy::CpiLinked, self.cpi_rate)?,
            ScenarioSpec::new(
                WAGE_SCENARIO,
                UpratingPolicy::WageLinked,
                self.wage_growth_rate,
            )?,
            ScenarioSpec::new(RPI_SCENARIO, UpratingPolicy::RpiLinked, self.rpi_rate)?,
        ])
    }

    pub fn validate(&self) -> ModelResult<()> {
        if !(MIN_BASE_YEAR..=MAX_BASE_YEAR).contains(&self.base_year) {
            return Err(ModelError::InvalidParameters(format!(
                "base year {} must be between {MIN_BASE_YEAR} and {MAX_BASE_YEAR}",
                self.base_year
            )));
        }
        if self.population == 0 {
            return Err(ModelError::InvalidParameters(
                "population must be > 0".to_string(),
            ));
        }
        if self.sample_size == 0 {
            return Err(ModelError::InvalidParameters(
                "sample size must be > 0".to_string(),
            ));
        }
        if self.horizon_years == 0 {
            return Err(ModelError::InvalidHorizon(
                "horizon must cover at least one year".to_string(),
            ));
        }
        for (name, rate) in [
            ("CPI rate", self.cpi_rate),
            ("RPI rate", self.rpi_rate),
            ("wage growth rate", self.wage_growth_rate),
            ("income growth rate", self.income_growth_rate),
        ] {
            if !rate.is_finite() || rate <= -1.0 {
                return Err(ModelError::InvalidParameters(format!(
                    "{name} must be finite and > -100%"
                )));
            }
        }
        Ok(())
    }
}
