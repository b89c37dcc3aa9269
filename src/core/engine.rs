use std::collections::HashSet;

use log::{debug, trace};

use super::bands::BandSchedule;
use super::config::DEFAULT_BASE_YEAR;
use super::error::{ModelError, ModelResult};
use super::sampler::IncomeSample;
use super::types::{ProjectionRow, ScenarioSpec, tax_year_label};
use super::uprating::{uprate, uprate_factor};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionOptions {
    /// First tax year of the horizon, used only for labels.
    pub base_year: u32,
    /// Annual growth applied to incomes at evaluation time. The sample
    /// itself is never modified.
    pub income_growth: f64,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            base_year: DEFAULT_BASE_YEAR,
            income_growth: 0.0,
        }
    }
}

#[derive(Debug, Default)]
struct RevenueAccumulator {
    tax: f64,
    income: f64,
    individual_rates: f64,
    count: usize,
}

impl RevenueAccumulator {
    fn push(&mut self, income: f64, tax: f64) {
        self.tax += tax;
        self.income += income;
        if income > 0.0 {
            self.individual_rates += tax / income;
        }
        self.count += 1;
    }

    fn weighted_rate(&self) -> f64 {
        if self.income > 0.0 {
            self.tax / self.income
        } else {
            0.0
        }
    }

    fn mean_individual_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.individual_rates / self.count as f64
        }
    }
}

/// Aggregate tax over the sample under one schedule, with every income
/// multiplied by `income_index`.
fn accumulate(
    sample: &IncomeSample,
    schedule: &BandSchedule,
    income_index: f64,
) -> RevenueAccumulator {
    let mut acc = RevenueAccumulator::default();
    for &base_income in sample.incomes() {
        let income = base_income * income_index;
        acc.push(income, schedule.tax_unchecked(income));
    }
    acc
}

/// Total revenue (in pounds, scaled to the represented population).
pub(crate) fn total_revenue(
    sample: &IncomeSample,
    schedule: &BandSchedule,
    income_index: f64,
) -> f64 {
    accumulate(sample, schedule, income_index).tax * sample.weight()
}

pub fn project(
    sample: &IncomeSample,
    scenarios: &[ScenarioSpec],
    horizon_years: u32,
    base: &BandSchedule,
) -> ModelResult<Vec<ProjectionRow>> {
    project_with(
        sample,
        scenarios,
        horizon_years,
        base,
        &ProjectionOptions::default(),
    )
}

pub fn project_with(
    sample: &IncomeSample,
    scenarios: &[ScenarioSpec],
    horizon_years: u32,
    base: &BandSchedule,
    options: &ProjectionOptions,
) -> ModelResult<Vec<ProjectionRow>> {
    validate_run(scenarios, horizon_years, base, options)?;

    debug!(
        "projecting {} scenarios over {horizon_years} years on {} incomes",
        scenarios.len(),
        sample.len()
    );

    let mut rows = Vec::with_capacity(scenarios.len() * horizon_years as usize);
    for year_index in 0..horizon_years {
        let income_index = uprate_factor(options.income_growth, year_index);
        // Checked against the horizon in `validate_run`.
        let tax_year = tax_year_label(options.base_year + year_index);

        for scenario in scenarios {
            let schedule = uprate(base, scenario.rate, year_index)?;
            let acc = accumulate(sample, &schedule, income_index);
            let total_revenue = acc.tax * sample.weight();

            trace!(
                "{tax_year} {}: revenue {total_revenue:.0}, effective rate {:.4}",
                scenario.name,
                acc.weighted_rate()
            );

            rows.push(ProjectionRow {
                year_index,
                tax_year: tax_year.clone(),
                scenario: scenario.name.clone(),
                policy: scenario.policy,
                uprating_rate: scenario.rate,
                total_revenue,
                avg_effective_rate: acc.weighted_rate(),
                mean_individual_rate: acc.mean_individual_rate(),
                income_index,
                schedule,
            });
        }
    }

    Ok(rows)
}

fn validate_run(
    scenarios: &[ScenarioSpec],
    horizon_years: u32,
    base: &BandSchedule,
    options: &ProjectionOptions,
) -> ModelResult<()> {
    if scenarios.is_empty() {
        return Err(ModelError::EmptyScenarioSet);
    }
    if horizon_years < 1 {
        return Err(ModelError::InvalidHorizon(
            "projection horizon must be at least one year".to_string(),
        ));
    }
    if options.base_year.checked_add(horizon_years).is_none() {
        return Err(ModelError::InvalidParameters(format!(
            "base year {} plus {horizon_years} years is out of range",
            options.base_year
        )));
    }
    if !options.income_growth.is_finite() || options.income_growth <= -1.0 {
        return Err(ModelError::InvalidParameters(
            "income growth must be finite and > -100%".to_string(),
        ));
    }
    let last_year = horizon_years - 1;
    let last_index = uprate_factor(options.income_growth, last_year);
    if !last_index.is_finite() || last_index <= 0.0 {
        return Err(ModelError::InvalidHorizon(format!(
            "income growth of {} over {last_year} years gives index {last_index}",
            options.income_growth
        )));
    }

    let mut seen = HashSet::new();
    for scenario in scenarios {
        if !scenario.rate.is_finite() || scenario.rate <= -1.0 {
            return Err(ModelError::InvalidParameters(format!(
                "scenario '{}' has an invalid uprating rate",
                scenario.name
            )));
        }
        if !seen.insert(scenario.name.as_str()) {
            return Err(ModelError::InvalidParameters(format!(
                "duplicate scenario name '{}'",
                scenario.name
            )));
        }
        // Growth is monotone in years, so the final year bounds every other.
        uprate(base, scenario.rate, last_year)?;
    }
    Ok(())
}
