mod analytics;
mod bands;
mod config;
mod engine;
mod error;
mod pipeline;
mod sampler;
mod types;
mod uprating;

pub use analytics::{
    base_year_revenue, drag_table, fiscal_drag, revenue_gap, scenario_names, spending_baseline,
    summarise,
};
pub use bands::{
    AllowanceTaper, BandSchedule, TaxBand, base_schedule, effective_rate, get_base_schedule,
    tax_owed,
};
pub use config::{
    Assumptions, CPI_SCENARIO, DEFAULT_ADDITIONAL_RATE, DEFAULT_BASE_YEAR, DEFAULT_BASIC_RATE,
    DEFAULT_BASIC_RATE_LIMIT, DEFAULT_CPI, DEFAULT_HIGHER_RATE, DEFAULT_HIGHER_RATE_LIMIT,
    DEFAULT_HORIZON_YEARS, DEFAULT_MEAN_INCOME, DEFAULT_MEDIAN_INCOME, DEFAULT_PERSONAL_ALLOWANCE,
    DEFAULT_POPULATION, DEFAULT_RPI, DEFAULT_SAMPLE_SIZE, DEFAULT_SEED, DEFAULT_TAPER_THRESHOLD,
    DEFAULT_WAGE_GROWTH, FROZEN_SCENARIO, MAX_BASE_YEAR, MIN_BASE_YEAR, RPI_SCENARIO,
    WAGE_SCENARIO,
};
pub use engine::{ProjectionOptions, project, project_with};
pub use error::{ModelError, ModelResult};
pub use pipeline::{
    FiscalDragPoint, ProjectionReport, build_income_sample, build_scaled_income_sample,
    compute_fiscal_drag, compute_revenue_gap, compute_spending_baseline, run_projection,
    run_report, run_report_with_sample, sample_for,
};
pub use sampler::{IncomeRng, IncomeSample, LogNormalParams, sample, sample_scaled};
pub use types::{
    BaselineRow, DragRow, ProjectionRow, ScenarioGap, ScenarioSpec, ScenarioSummary,
    UpratingPolicy, tax_year_label,
};
pub use uprating::{uprate, uprate_factor};
