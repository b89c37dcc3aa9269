use std::collections::BTreeMap;

use super::bands::BandSchedule;
use super::engine::total_revenue;
use super::error::{ModelError, ModelResult};
use super::sampler::IncomeSample;
use super::types::{BaselineRow, DragRow, ProjectionRow, ScenarioGap, ScenarioSummary};
use super::uprating::{uprate, uprate_factor};

/// Scenario names in the order they first appear in the table.
pub fn scenario_names(rows: &[ProjectionRow]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for row in rows {
        if !names.contains(&row.scenario.as_str()) {
            names.push(row.scenario.as_str());
        }
    }
    names
}

fn rows_by_year(rows: &[ProjectionRow]) -> BTreeMap<u32, Vec<&ProjectionRow>> {
    let mut years: BTreeMap<u32, Vec<&ProjectionRow>> = BTreeMap::new();
    for row in rows {
        years.entry(row.year_index).or_default().push(row);
    }
    years
}

fn scenario_rows<'a>(
    rows: &'a [ProjectionRow],
    scenario: &str,
) -> ModelResult<Vec<&'a ProjectionRow>> {
    let mut matched: Vec<&ProjectionRow> = rows.iter().filter(|r| r.scenario == scenario).collect();
    if matched.is_empty() {
        return Err(ModelError::UnknownScenario(scenario.to_string()));
    }
    matched.sort_by_key(|r| r.year_index);
    Ok(matched)
}

pub fn base_year_revenue(rows: &[ProjectionRow], scenario: &str) -> ModelResult<f64> {
    scenario_rows(rows, scenario)?
        .into_iter()
        .find(|r| r.year_index == 0)
        .map(|r| r.total_revenue)
        .ok_or_else(|| {
            ModelError::InvalidHorizon(format!("scenario '{scenario}' has no base-year row"))
        })
}

/// Extra revenue the frozen scenario raises over a counterfactual in which
/// its base-year thresholds had been uprated at `reference_rate`. The
/// counterfactual is re-run over the same sample (and the same income
/// index) as each frozen row.
pub fn fiscal_drag(
    sample: &IncomeSample,
    rows: &[ProjectionRow],
    frozen_scenario: &str,
    reference_rate: f64,
) -> ModelResult<Vec<(u32, f64)>> {
    let frozen = scenario_rows(rows, frozen_scenario)?;
    let base: &BandSchedule = frozen
        .iter()
        .find(|r| r.year_index == 0)
        .map(|r| &r.schedule)
        .ok_or_else(|| {
            ModelError::InvalidHorizon(format!(
                "scenario '{frozen_scenario}' has no base-year row"
            ))
        })?;

    frozen
        .iter()
        .map(|row| -> ModelResult<(u32, f64)> {
            let indexed = uprate(base, reference_rate, row.year_index)?;
            let counterfactual = total_revenue(sample, &indexed, row.income_index);
            Ok((row.year_index, row.total_revenue - counterfactual))
        })
        .collect()
}

/// Base-year revenue compounded at RPI; element 0 is `base_year_revenue`.
pub fn spending_baseline(
    base_year_revenue: f64,
    rpi_rate: f64,
    horizon_years: u32,
) -> ModelResult<Vec<f64>> {
    if horizon_years < 1 {
        return Err(ModelError::InvalidHorizon(
            "spending baseline needs at least one year".to_string(),
        ));
    }
    if !base_year_revenue.is_finite() {
        return Err(ModelError::InvalidParameters(
            "base-year revenue must be finite".to_string(),
        ));
    }
    if !rpi_rate.is_finite() || rpi_rate <= -1.0 {
        return Err(ModelError::InvalidParameters(format!(
            "RPI rate {rpi_rate} must be finite and > -1"
        )));
    }

    Ok((0..horizon_years)
        .map(|year| base_year_revenue * uprate_factor(rpi_rate, year))
        .collect())
}

pub fn revenue_gap(rows: &[ProjectionRow], baseline: &[f64]) -> ModelResult<Vec<BaselineRow>> {
    rows_by_year(rows)
        .into_iter()
        .map(|(year_index, year_rows)| -> ModelResult<BaselineRow> {
            let baseline_value = *baseline.get(year_index as usize).ok_or_else(|| {
                ModelError::InvalidHorizon(format!(
                    "baseline covers {} years but the projection reaches year {year_index}",
                    baseline.len()
                ))
            })?;
            Ok(BaselineRow {
                year_index,
                tax_year: year_rows[0].tax_year.clone(),
                baseline: baseline_value,
                gaps: year_rows
                    .iter()
                    .map(|r| ScenarioGap {
                        scenario: r.scenario.clone(),
                        gap: r.total_revenue - baseline_value,
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Frozen revenue minus every other scenario, year by year.
pub fn drag_table(rows: &[ProjectionRow], frozen_scenario: &str) -> ModelResult<Vec<DragRow>> {
    scenario_rows(rows, frozen_scenario)?;

    rows_by_year(rows)
        .into_iter()
        .map(|(year_index, year_rows)| -> ModelResult<DragRow> {
            let frozen = year_rows
                .iter()
                .find(|r| r.scenario == frozen_scenario)
                .ok_or_else(|| ModelError::UnknownScenario(frozen_scenario.to_string()))?;
            Ok(DragRow {
                year_index,
                tax_year: frozen.tax_year.clone(),
                versus: year_rows
                    .iter()
                    .filter(|r| r.scenario != frozen_scenario)
                    .map(|r| ScenarioGap {
                        scenario: r.scenario.clone(),
                        gap: frozen.total_revenue - r.total_revenue,
                    })
                    .collect(),
            })
        })
        .collect()
}

pub fn summarise(rows: &[ProjectionRow]) -> Vec<ScenarioSummary> {
    scenario_names(rows)
        .into_iter()
        .filter_map(|name| {
            let series = scenario_rows(rows, name).ok()?;
            let first = series.first()?.total_revenue;
            let last = series.last()?.total_revenue;
            Some(ScenarioSummary {
                scenario: name.to_string(),
                base_revenue: first,
                final_revenue: last,
                cumulative_revenue: series.iter().map(|r| r.total_revenue).sum(),
                total_growth: if first != 0.0 { last / first - 1.0 } else { 0.0 },
            })
        })
        .collect()
}
