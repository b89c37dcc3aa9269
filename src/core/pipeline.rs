//! Entry points used by the console and HTTP front ends.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::analytics::{
    base_year_revenue, drag_table, fiscal_drag, revenue_gap, spending_baseline, summarise,
};
use super::bands::{BandSchedule, base_schedule};
use super::config::{Assumptions, FROZEN_SCENARIO};
use super::engine::{ProjectionOptions, project, project_with};
use super::error::ModelResult;
use super::sampler::{IncomeSample, LogNormalParams, sample, sample_scaled};
use super::types::{BaselineRow, DragRow, ProjectionRow, ScenarioSpec, ScenarioSummary};

/// Draws one income per taxpayer.
pub fn build_income_sample(
    population: u64,
    median_income: f64,
    mean_income: f64,
    seed: u64,
) -> ModelResult<IncomeSample> {
    sample(population as usize, median_income, mean_income, seed)
}

/// Draws `sample_size` incomes standing for `population` taxpayers.
pub fn build_scaled_income_sample(
    sample_size: usize,
    population: u64,
    median_income: f64,
    mean_income: f64,
    seed: u64,
) -> ModelResult<IncomeSample> {
    sample_scaled(sample_size, population, median_income, mean_income, seed)
}

/// Runs every `(name, rate)` pair, in the given order. The uprating index is
/// inferred from each name (see [`ScenarioSpec::from_rate`]).
pub fn run_projection(
    sample: &IncomeSample,
    scenario_rates: &[(&str, f64)],
    horizon_years: u32,
    base: &BandSchedule,
) -> ModelResult<Vec<ProjectionRow>> {
    let scenarios = scenario_rates
        .iter()
        .map(|&(name, rate)| ScenarioSpec::from_rate(name, rate))
        .collect::<ModelResult<Vec<_>>>()?;
    project(sample, &scenarios, horizon_years, base)
}

/// Fiscal drag of the `frozen` scenario against full wage indexation.
pub fn compute_fiscal_drag(
    sample: &IncomeSample,
    rows: &[ProjectionRow],
    wage_growth_rate: f64,
) -> ModelResult<BTreeMap<u32, f64>> {
    Ok(fiscal_drag(sample, rows, FROZEN_SCENARIO, wage_growth_rate)?
        .into_iter()
        .collect())
}

pub fn compute_spending_baseline(
    base_year_revenue: f64,
    rpi_rate: f64,
    horizon_years: u32,
) -> ModelResult<Vec<f64>> {
    spending_baseline(base_year_revenue, rpi_rate, horizon_years)
}

pub fn compute_revenue_gap(
    rows: &[ProjectionRow],
    baseline: &[f64],
) -> ModelResult<Vec<BaselineRow>> {
    revenue_gap(rows, baseline)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalDragPoint {
    pub year_index: u32,
    pub tax_year: String,
    pub drag: f64,
}

/// Everything a front end shows for one set of assumptions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    pub assumptions: Assumptions,
    pub distribution: LogNormalParams,
    pub rows: Vec<ProjectionRow>,
    pub spending_baseline: Vec<f64>,
    pub revenue_gaps: Vec<BaselineRow>,
    pub fiscal_drag: Vec<FiscalDragPoint>,
    pub drag_table: Vec<DragRow>,
    pub summaries: Vec<ScenarioSummary>,
}

pub fn sample_for(assumptions: &Assumptions) -> ModelResult<IncomeSample> {
    assumptions.validate()?;
    build_scaled_income_sample(
        assumptions.sample_size,
        assumptions.population,
        assumptions.median_income,
        assumptions.mean_income,
        assumptions.seed,
    )
}

pub fn run_report(assumptions: &Assumptions) -> ModelResult<ProjectionReport> {
    let sample = sample_for(assumptions)?;
    run_report_with_sample(assumptions, &sample)
}

/// Same as [`run_report`] but on a sample the caller already holds, so a
/// change of rates alone does not redraw incomes.
pub fn run_report_with_sample(
    assumptions: &Assumptions,
    sample: &IncomeSample,
) -> ModelResult<ProjectionReport> {
    assumptions.validate()?;
    let base = base_schedule(assumptions)?;
    let scenarios = assumptions.scenarios()?;
    let options = ProjectionOptions {
        base_year: assumptions.base_year,
        income_growth: assumptions.income_growth_rate,
    };

    let rows = project_with(sample, &scenarios, assumptions.horizon_years, &base, &options)?;
    let base_revenue = base_year_revenue(&rows, FROZEN_SCENARIO)?;
    let baseline = spending_baseline(
        base_revenue,
        assumptions.rpi_rate,
        assumptions.horizon_years,
    )?;
    let revenue_gaps = revenue_gap(&rows, &baseline)?;
    let drag = fiscal_drag(sample, &rows, FROZEN_SCENARIO, assumptions.wage_growth_rate)?;
    let drag_by_year = drag_table(&rows, FROZEN_SCENARIO)?;
    let summaries = summarise(&rows);

    debug!(
        "report ready: {} rows, base-year revenue {:.1}bn",
        rows.len(),
        base_revenue / 1e9
    );

    let fiscal_drag = drag
        .into_iter()
        .zip(revenue_gaps.iter())
        .map(|((year_index, drag), gap_row)| FiscalDragPoint {
            year_index,
            tax_year: gap_row.tax_year.clone(),
            drag,
        })
        .collect();

    Ok(ProjectionReport {
        assumptions: assumptions.clone(),
        distribution: sample.params(),
        rows,
        spending_baseline: baseline,
        revenue_gaps,
        fiscal_drag,
        drag_table: drag_by_year,
        summaries,
    })
}
