use serde::{Deserialize, Serialize};

use super::bands::BandSchedule;
use super::error::{ModelError, ModelResult};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpratingPolicy {
    Frozen,
    CpiLinked,
    WageLinked,
    RpiLinked,
}

impl UpratingPolicy {
    pub fn label(self) -> &'static str {
        match self {
            UpratingPolicy::Frozen => "Frozen Thresholds",
            UpratingPolicy::CpiLinked => "CPI-Uprated",
            UpratingPolicy::WageLinked => "Wage-Growth-Uprated",
            UpratingPolicy::RpiLinked => "RPI-Uprated",
        }
    }

    /// Infers the index a scenario follows from its name. A zero rate is
    /// always treated as frozen.
    pub fn infer(name: &str, rate: f64) -> Option<Self> {
        if rate == 0.0 {
            return Some(UpratingPolicy::Frozen);
        }
        let lowered = name.to_ascii_lowercase();
        if lowered.contains("frozen") {
            None
        } else if lowered.contains("cpi") || lowered.contains("inflation") {
            Some(UpratingPolicy::CpiLinked)
        } else if lowered.contains("wage") || lowered.contains("awe") {
            Some(UpratingPolicy::WageLinked)
        } else if lowered.contains("rpi") {
            Some(UpratingPolicy::RpiLinked)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSpec {
    pub name: String,
    pub policy: UpratingPolicy,
    pub rate: f64,
}

impl ScenarioSpec {
    pub fn new(name: impl Into<String>, policy: UpratingPolicy, rate: f64) -> ModelResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::InvalidParameters(
                "scenario name must not be empty".to_string(),
            ));
        }
        if !rate.is_finite() || rate <= -1.0 {
            return Err(ModelError::InvalidParameters(format!(
                "scenario '{name}' has uprating rate {rate}; must be finite and > -1"
            )));
        }
        if policy == UpratingPolicy::Frozen && rate != 0.0 {
            return Err(ModelError::InvalidParameters(format!(
                "frozen scenario '{name}' must have a zero uprating rate"
            )));
        }
        Ok(Self { name, policy, rate })
    }

    pub fn frozen(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: UpratingPolicy::Frozen,
            rate: 0.0,
        }
    }

    pub fn from_rate(name: &str, rate: f64) -> ModelResult<Self> {
        let policy = UpratingPolicy::infer(name, rate).ok_or_else(|| {
            ModelError::InvalidParameters(format!(
                "cannot tell which index scenario '{name}' follows; name it after cpi, wage or rpi"
            ))
        })?;
        Self::new(name, policy, rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRow {
    pub year_index: u32,
    pub tax_year: String,
    pub scenario: String,
    pub policy: UpratingPolicy,
    pub uprating_rate: f64,
    pub total_revenue: f64,
    pub avg_effective_rate: f64,
    pub mean_individual_rate: f64,
    pub income_index: f64,
    pub schedule: BandSchedule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioGap {
    pub scenario: String,
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineRow {
    pub year_index: u32,
    pub tax_year: String,
    pub baseline: f64,
    pub gaps: Vec<ScenarioGap>,
}

impl BaselineRow {
    pub fn gap_for(&self, scenario: &str) -> Option<f64> {
        self.gaps
            .iter()
            .find(|g| g.scenario == scenario)
            .map(|g| g.gap)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragRow {
    pub year_index: u32,
    pub tax_year: String,
    pub versus: Vec<ScenarioGap>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub scenario: String,
    pub base_revenue: f64,
    pub final_revenue: f64,
    pub cumulative_revenue: f64,
    pub total_growth: f64,
}

/// Formats a UK tax year as `2024/25`.
pub fn tax_year_label(start_year: u32) -> String {
    format!("{start_year}/{:02}", (start_year % 100 + 1) % 100)
}
