use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::core::{
    Assumptions, BandSchedule, DEFAULT_ADDITIONAL_RATE, DEFAULT_BASE_YEAR, DEFAULT_BASIC_RATE,
    DEFAULT_BASIC_RATE_LIMIT, DEFAULT_CPI, DEFAULT_HIGHER_RATE, DEFAULT_HIGHER_RATE_LIMIT,
    DEFAULT_HORIZON_YEARS, DEFAULT_MEAN_INCOME, DEFAULT_MEDIAN_INCOME, DEFAULT_PERSONAL_ALLOWANCE,
    DEFAULT_POPULATION, DEFAULT_RPI, DEFAULT_SAMPLE_SIZE, DEFAULT_SEED, DEFAULT_TAPER_THRESHOLD,
    DEFAULT_WAGE_GROWTH, IncomeSample, MAX_BASE_YEAR, MIN_BASE_YEAR, ProjectionReport,
    UpratingPolicy, base_schedule, effective_rate, run_report, run_report_with_sample, sample_for,
    scenario_names, tax_owed, tax_year_label, uprate,
};

#[derive(Parser, Debug)]
#[command(
    name = "uk-fiscal-drag",
    about = "UK income tax revenue under frozen and index-linked thresholds"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print revenue, baseline and fiscal drag tables.
    Project(ProjectArgs),
    /// Serve the JSON API for the interactive front end.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_WAGE_GROWTH * 100.0,
        help = "Annual wage growth (AWE) in percent; reference for fiscal drag"
    )]
    wage_growth: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_CPI * 100.0,
        help = "Annual CPI inflation in percent"
    )]
    cpi: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_RPI * 100.0,
        help = "Annual RPI inflation in percent; grows the spending baseline"
    )]
    rpi: f64,
    #[arg(long, default_value_t = DEFAULT_POPULATION, help = "Number of income taxpayers")]
    population: u64,
    #[arg(
        long,
        default_value_t = DEFAULT_SAMPLE_SIZE,
        help = "Synthetic incomes actually drawn"
    )]
    sample_size: usize,
    #[arg(long, default_value_t = DEFAULT_MEDIAN_INCOME)]
    median_income: f64,
    #[arg(long, default_value_t = DEFAULT_MEAN_INCOME)]
    mean_income: f64,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    #[arg(
        long,
        default_value_t = DEFAULT_HORIZON_YEARS,
        help = "Years projected, base year included"
    )]
    horizon: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_BASE_YEAR,
        help = "First calendar year of the base tax year"
    )]
    base_year: u32,
    #[arg(long, default_value_t = DEFAULT_PERSONAL_ALLOWANCE)]
    personal_allowance: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_BASIC_RATE_LIMIT,
        help = "Upper income bound for the basic rate band"
    )]
    basic_rate_limit: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_HIGHER_RATE_LIMIT,
        help = "Upper income bound for the higher rate band"
    )]
    higher_rate_limit: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_BASIC_RATE * 100.0,
        help = "Basic tax rate in percent"
    )]
    basic_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_HIGHER_RATE * 100.0,
        help = "Higher tax rate in percent"
    )]
    higher_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_ADDITIONAL_RATE * 100.0,
        help = "Additional tax rate in percent"
    )]
    additional_rate: f64,
    #[arg(long, help = "Withdraw the personal allowance above the taper threshold")]
    allowance_taper: bool,
    #[arg(long, default_value_t = DEFAULT_TAPER_THRESHOLD)]
    taper_threshold: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Annual income growth in percent; 0 holds the distribution fixed"
    )]
    income_growth: f64,
    #[arg(long, help = "Emit the full report as JSON")]
    json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    wage_growth: Option<f64>,
    cpi: Option<f64>,
    rpi: Option<f64>,
    population: Option<u64>,
    sample_size: Option<usize>,
    median_income: Option<f64>,
    mean_income: Option<f64>,
    seed: Option<u64>,
    horizon: Option<u32>,
    base_year: Option<u32>,
    personal_allowance: Option<f64>,
    basic_rate_limit: Option<f64>,
    higher_rate_limit: Option<f64>,
    basic_rate: Option<f64>,
    higher_rate: Option<f64>,
    additional_rate: Option<f64>,
    allowance_taper: Option<bool>,
    taper_threshold: Option<f64>,
    income_growth: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPolicy {
    Frozen,
    #[serde(alias = "cpi-linked", alias = "inflation")]
    Cpi,
    #[serde(alias = "wage-linked", alias = "awe")]
    Wage,
    #[serde(alias = "rpi-linked")]
    Rpi,
}

impl From<ApiPolicy> for UpratingPolicy {
    fn from(value: ApiPolicy) -> Self {
        match value {
            ApiPolicy::Frozen => UpratingPolicy::Frozen,
            ApiPolicy::Cpi => UpratingPolicy::CpiLinked,
            ApiPolicy::Wage => UpratingPolicy::WageLinked,
            ApiPolicy::Rpi => UpratingPolicy::RpiLinked,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaxQuery {
    income: f64,
    #[serde(default)]
    year: u32,
    policy: Option<ApiPolicy>,
    #[serde(default)]
    allowance_taper: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaxResponse {
    income: f64,
    tax_year: String,
    policy: UpratingPolicy,
    tax: f64,
    effective_rate: f64,
    schedule: BandSchedule,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_assumptions(args: ProjectArgs) -> Result<Assumptions, String> {
    for (name, rate) in [
        ("--wage-growth", args.wage_growth),
        ("--cpi", args.cpi),
        ("--rpi", args.rpi),
        ("--income-growth", args.income_growth),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    for (name, rate) in [
        ("--basic-rate", args.basic_rate),
        ("--higher-rate", args.higher_rate),
        ("--additional-rate", args.additional_rate),
    ] {
        if !(0.0..=100.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    if args.population == 0 {
        return Err("--population must be > 0".to_string());
    }

    if args.sample_size == 0 {
        return Err("--sample-size must be > 0".to_string());
    }

    if args.horizon == 0 {
        return Err("--horizon must be > 0".to_string());
    }

    if !(MIN_BASE_YEAR..=MAX_BASE_YEAR).contains(&args.base_year) {
        return Err(format!(
            "--base-year must be between {MIN_BASE_YEAR} and {MAX_BASE_YEAR}"
        ));
    }

    if args.median_income <= 0.0 || args.mean_income <= 0.0 {
        return Err("--median-income and --mean-income must be > 0".to_string());
    }

    if args.mean_income <= args.median_income {
        return Err("--mean-income must be > --median-income".to_string());
    }

    if !args.personal_allowance.is_finite() || args.personal_allowance <= 0.0 {
        return Err("--personal-allowance must be > 0".to_string());
    }

    if args.basic_rate_limit <= args.personal_allowance {
        return Err("--basic-rate-limit must be > --personal-allowance".to_string());
    }

    if args.higher_rate_limit <= args.basic_rate_limit {
        return Err("--higher-rate-limit must be > --basic-rate-limit".to_string());
    }

    if !args.taper_threshold.is_finite() || args.taper_threshold < 0.0 {
        return Err("--taper-threshold must be >= 0".to_string());
    }

    Ok(Assumptions {
        base_year: args.base_year,
        population: args.population,
        sample_size: args.sample_size,
        median_income: args.median_income,
        mean_income: args.mean_income,
        seed: args.seed,
        horizon_years: args.horizon,
        cpi_rate: args.cpi / 100.0,
        rpi_rate: args.rpi / 100.0,
        wage_growth_rate: args.wage_growth / 100.0,
        personal_allowance: args.personal_allowance,
        basic_rate_limit: args.basic_rate_limit,
        higher_rate_limit: args.higher_rate_limit,
        basic_rate: args.basic_rate / 100.0,
        higher_rate: args.higher_rate / 100.0,
        additional_rate: args.additional_rate / 100.0,
        allowance_taper: args.allowance_taper,
        taper_threshold: args.taper_threshold,
        income_growth_rate: args.income_growth / 100.0,
    })
}

pub async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Project(args) => run_console(args),
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
    }
}

fn run_console(args: ProjectArgs) -> Result<(), String> {
    let json = args.json;
    let assumptions = build_assumptions(args)?;
    let report = run_report(&assumptions).map_err(|e| e.to_string())?;

    if json {
        let body = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("failed to serialize report: {e}"))?;
        println!("{body}");
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn bn(amount: f64) -> String {
    format!("{:.1}", amount / 1e9)
}

/// Plain-text tables for the console, amounts in £ billion.
fn render_report(report: &ProjectionReport) -> String {
    let a = &report.assumptions;
    let names = scenario_names(&report.rows);
    let rule = "=".repeat(80);
    let mut out = String::new();

    out.push_str("\nUK Income Tax Revenue Projections\n");
    out.push_str(&rule);
    out.push('\n');
    out.push_str("Assumptions:\n");
    out.push_str(&format!(
        "  Annual wage growth (AWE):  {:.1}%  [fiscal drag reference]\n",
        a.wage_growth_rate * 100.0
    ));
    out.push_str(&format!("  Annual CPI inflation:      {:.1}%\n", a.cpi_rate * 100.0));
    out.push_str(&format!(
        "  Annual RPI inflation:      {:.1}%  [spending growth proxy]\n",
        a.rpi_rate * 100.0
    ));
    out.push_str(&format!(
        "  Income growth:             {:.1}%\n",
        a.income_growth_rate * 100.0
    ));
    out.push_str(&format!(
        "  Number of taxpayers:       {}  ({} sampled, seed {})\n",
        a.population, a.sample_size, a.seed
    ));
    out.push_str(&rule);
    out.push('\n');

    out.push_str(&format!("{:<10}", "Tax Year"));
    for name in &names {
        out.push_str(&format!("{:>14}", format!("{name} (£bn)")));
    }
    out.push_str(&format!("{:>16}\n", "RPI base (£bn)"));
    for gap_row in &report.revenue_gaps {
        out.push_str(&format!("{:<10}", gap_row.tax_year));
        for gap in &gap_row.gaps {
            out.push_str(&format!("{:>14}", bn(gap.gap + gap_row.baseline)));
        }
        out.push_str(&format!("{:>16}\n", bn(gap_row.baseline)));
    }
    out.push('\n');

    out.push_str("Revenue minus RPI spending baseline (£bn):\n");
    out.push_str(&format!("{:<10}", "Tax Year"));
    for name in &names {
        out.push_str(&format!("{:>14}", name));
    }
    out.push('\n');
    for gap_row in &report.revenue_gaps {
        out.push_str(&format!("{:<10}", gap_row.tax_year));
        for gap in &gap_row.gaps {
            out.push_str(&format!("{:>14}", bn(gap.gap)));
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str("Fiscal drag (extra revenue from frozen thresholds, £bn):\n");
    out.push_str(&format!("{:<10}{:>14}", "Tax Year", "vs indexed"));
    if let Some(first) = report.drag_table.first() {
        for gap in &first.versus {
            out.push_str(&format!("{:>14}", format!("vs {}", gap.scenario)));
        }
    }
    out.push('\n');
    for (point, row) in report.fiscal_drag.iter().zip(&report.drag_table) {
        out.push_str(&format!("{:<10}{:>14}", point.tax_year, bn(point.drag)));
        for gap in &row.versus {
            out.push_str(&format!("{:>14}", bn(gap.gap)));
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SampleKey {
    population: u64,
    sample_size: usize,
    median_bits: u64,
    mean_bits: u64,
    seed: u64,
}

impl SampleKey {
    fn of(assumptions: &Assumptions) -> Self {
        Self {
            population: assumptions.population,
            sample_size: assumptions.sample_size,
            median_bits: assumptions.median_income.to_bits(),
            mean_bits: assumptions.mean_income.to_bits(),
            seed: assumptions.seed,
        }
    }
}

/// Most recent income sample, so that moving a rate slider does not redraw
/// incomes.
#[derive(Clone, Default)]
struct SampleCache {
    latest: Arc<Mutex<Option<(SampleKey, Arc<IncomeSample>)>>>,
}

impl SampleCache {
    fn get_or_draw(&self, assumptions: &Assumptions) -> Result<Arc<IncomeSample>, String> {
        let key = SampleKey::of(assumptions);
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((cached_key, sample)) = latest.as_ref() {
            if *cached_key == key {
                return Ok(Arc::clone(sample));
            }
        }

        let sample = Arc::new(sample_for(assumptions).map_err(|e| e.to_string())?);
        *latest = Some((key, Arc::clone(&sample)));
        Ok(sample)
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/tax", get(tax_handler))
        .fallback(not_found_handler)
        .with_state(SampleCache::default());

    let listener = TcpListener::bind(addr).await?;
    info!("fiscal drag HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    State(cache): State<SampleCache>,
    Query(payload): Query<ProjectPayload>,
) -> Response {
    project_handler_impl(&cache, payload)
}

async fn project_post_handler(
    State(cache): State<SampleCache>,
    Json(payload): Json<ProjectPayload>,
) -> Response {
    project_handler_impl(&cache, payload)
}

fn project_handler_impl(cache: &SampleCache, payload: ProjectPayload) -> Response {
    let assumptions = match assumptions_from_payload(payload) {
        Ok(assumptions) => assumptions,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let sample = match cache.get_or_draw(&assumptions) {
        Ok(sample) => sample,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match run_report_with_sample(&assumptions, &sample) {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn tax_handler(Query(query): Query<TaxQuery>) -> Response {
    match tax_response(query) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn tax_response(query: TaxQuery) -> Result<TaxResponse, String> {
    let assumptions = Assumptions {
        allowance_taper: query.allowance_taper,
        ..Assumptions::default()
    };
    let policy: UpratingPolicy = query.policy.unwrap_or(ApiPolicy::Frozen).into();
    let rate = match policy {
        UpratingPolicy::Frozen => 0.0,
        UpratingPolicy::CpiLinked => assumptions.cpi_rate,
        UpratingPolicy::WageLinked => assumptions.wage_growth_rate,
        UpratingPolicy::RpiLinked => assumptions.rpi_rate,
    };

    let base = base_schedule(&assumptions).map_err(|e| e.to_string())?;
    let schedule = uprate(&base, rate, query.year).map_err(|e| e.to_string())?;
    let tax = tax_owed(query.income, &schedule).map_err(|e| e.to_string())?;
    let effective_rate = effective_rate(query.income, &schedule).map_err(|e| e.to_string())?;
    let start_year = assumptions
        .base_year
        .checked_add(query.year)
        .ok_or_else(|| format!("year {} is out of range", query.year))?;

    Ok(TaxResponse {
        income: query.income,
        tax_year: tax_year_label(start_year),
        policy,
        tax,
        effective_rate,
        schedule,
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn assumptions_from_json(json: &str) -> Result<Assumptions, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    assumptions_from_payload(payload)
}

fn assumptions_from_payload(payload: ProjectPayload) -> Result<Assumptions, String> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.wage_growth {
        args.wage_growth = v;
    }
    if let Some(v) = payload.cpi {
        args.cpi = v;
    }
    if let Some(v) = payload.rpi {
        args.rpi = v;
    }
    if let Some(v) = payload.population {
        args.population = v;
    }
    if let Some(v) = payload.sample_size {
        args.sample_size = v;
    }
    if let Some(v) = payload.median_income {
        args.median_income = v;
    }
    if let Some(v) = payload.mean_income {
        args.mean_income = v;
    }
    if let Some(v) = payload.seed {
        args.seed = v;
    }
    if let Some(v) = payload.horizon {
        args.horizon = v;
    }
    if let Some(v) = payload.base_year {
        args.base_year = v;
    }
    if let Some(v) = payload.personal_allowance {
        args.personal_allowance = v;
    }
    if let Some(v) = payload.basic_rate_limit {
        args.basic_rate_limit = v;
    }
    if let Some(v) = payload.higher_rate_limit {
        args.higher_rate_limit = v;
    }
    if let Some(v) = payload.basic_rate {
        args.basic_rate = v;
    }
    if let Some(v) = payload.higher_rate {
        args.higher_rate = v;
    }
    if let Some(v) = payload.additional_rate {
        args.additional_rate = v;
    }
    if let Some(v) = payload.allowance_taper {
        args.allowance_taper = v;
    }
    if let Some(v) = payload.taper_threshold {
        args.taper_threshold = v;
    }
    if let Some(v) = payload.income_growth {
        args.income_growth = v;
    }

    build_assumptions(args)
}

fn default_args_for_api() -> ProjectArgs {
    let defaults = Assumptions::default();
    ProjectArgs {
        wage_growth: defaults.wage_growth_rate * 100.0,
        cpi: defaults.cpi_rate * 100.0,
        rpi: defaults.rpi_rate * 100.0,
        population: defaults.population,
        sample_size: defaults.sample_size,
        median_income: defaults.median_income,
        mean_income: defaults.mean_income,
        seed: defaults.seed,
        horizon: defaults.horizon_years,
        base_year: defaults.base_year,
        personal_allowance: defaults.personal_allowance,
        basic_rate_limit: defaults.basic_rate_limit,
        higher_rate_limit: defaults.higher_rate_limit,
        basic_rate: defaults.basic_rate * 100.0,
        higher_rate: defaults.higher_rate * 100.0,
        additional_rate: defaults.additional_rate * 100.0,
        allowance_taper: defaults.allowance_taper,
        taper_threshold: defaults.taper_threshold,
        income_growth: defaults.income_growth_rate * 100.0,
        json: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_golden_snapshot(path: &str, actual: &str) {
        let update = matches!(
            std::env::var("UPDATE_GOLDEN").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );
        let snapshot_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(path);

        if update {
            if let Some(parent) = snapshot_path.parent() {
                fs::create_dir_all(parent).expect("failed to create snapshot directory");
            }
            fs::write(&snapshot_path, actual).expect("failed to write golden snapshot");
            return;
        }

        let expected = fs::read_to_string(&snapshot_path).unwrap_or_else(|_| {
            panic!("missing golden snapshot at {path}; run with UPDATE_GOLDEN=1 to generate")
        });
        assert_eq!(
            actual, expected,
            "snapshot mismatch for {path}; run with UPDATE_GOLDEN=1 to refresh if expected"
        );
    }

    fn sample_args() -> ProjectArgs {
        let mut args = default_args_for_api();
        args.sample_size = 2_000;
        args
    }

    #[test]
    fn default_args_round_trip_to_default_assumptions() {
        let assumptions = build_assumptions(default_args_for_api()).expect("valid defaults");
        let defaults = Assumptions::default();
        assert_approx(assumptions.cpi_rate, defaults.cpi_rate);
        assert_approx(assumptions.rpi_rate, defaults.rpi_rate);
        assert_approx(assumptions.wage_growth_rate, defaults.wage_growth_rate);
        assert_approx(assumptions.basic_rate, defaults.basic_rate);
        assert_approx(assumptions.additional_rate, defaults.additional_rate);
        assert_eq!(assumptions.population, defaults.population);
        assert_eq!(assumptions.horizon_years, defaults.horizon_years);
    }

    #[test]
    fn clap_parses_project_flags_as_percentages() {
        let cli = Cli::try_parse_from([
            "uk-fiscal-drag",
            "project",
            "--cpi",
            "3",
            "--wage-growth",
            "5.5",
            "--allowance-taper",
            "--json",
        ])
        .expect("valid command line");
        let Command::Project(args) = cli.command else {
            panic!("expected project subcommand");
        };
        assert!(args.json);
        let assumptions = build_assumptions(args).expect("valid inputs");
        assert_approx(assumptions.cpi_rate, 0.03);
        assert_approx(assumptions.wage_growth_rate, 0.055);
        assert_approx(assumptions.rpi_rate, 0.035);
        assert!(assumptions.allowance_taper);
    }

    #[test]
    fn bare_project_command_matches_default_assumptions() {
        let cli = Cli::try_parse_from(["uk-fiscal-drag", "project"]).expect("valid command line");
        let Command::Project(args) = cli.command else {
            panic!("expected project subcommand");
        };
        let assumptions = build_assumptions(args).expect("valid defaults");
        assert_eq!(assumptions, Assumptions::default());
    }

    #[test]
    fn clap_parses_serve_port() {
        let cli = Cli::try_parse_from(["uk-fiscal-drag", "serve", "--port", "9001"])
            .expect("valid command line");
        assert!(matches!(cli.command, Command::Serve { port: 9001 }));
    }

    #[test]
    fn build_assumptions_rejects_mean_not_above_median() {
        let mut args = sample_args();
        args.median_income = 40_000.0;
        args.mean_income = 35_000.0;
        let err = build_assumptions(args).expect_err("must reject skew");
        assert!(err.contains("--mean-income"));
    }

    #[test]
    fn build_assumptions_rejects_invalid_band_order() {
        let mut args = sample_args();
        args.basic_rate_limit = 10_000.0;
        let err = build_assumptions(args).expect_err("must reject bad threshold order");
        assert!(err.contains("--basic-rate-limit"));
    }

    #[test]
    fn build_assumptions_rejects_out_of_range_rates() {
        let mut args = sample_args();
        args.higher_rate = 120.0;
        let err = build_assumptions(args).expect_err("must reject rate > 100");
        assert!(err.contains("--higher-rate"));

        let mut args = sample_args();
        args.rpi = -100.0;
        let err = build_assumptions(args).expect_err("must reject rpi <= -100");
        assert!(err.contains("--rpi"));

        let mut args = sample_args();
        args.horizon = 0;
        let err = build_assumptions(args).expect_err("must reject zero horizon");
        assert!(err.contains("--horizon"));
    }

    #[test]
    fn build_assumptions_rejects_out_of_range_base_year() {
        for base_year in [1_899, 10_000, u32::MAX] {
            let mut args = sample_args();
            args.base_year = base_year;
            let err = build_assumptions(args).expect_err("must reject base year");
            assert!(err.contains("--base-year"), "{err}");
        }

        let err = assumptions_from_json(r#"{"baseYear": 4294967295}"#).expect_err("must reject");
        assert!(err.contains("--base-year"));
    }

    #[test]
    fn assumptions_from_json_parses_web_keys() {
        let json = r#"{
          "wageGrowth": 3.2,
          "cpi": 1.9,
          "rpi": 2.8,
          "sampleSize": 1234,
          "medianIncome": 30000,
          "meanIncome": 38000,
          "horizon": 4,
          "baseYear": 2025,
          "allowanceTaper": true,
          "incomeGrowth": 4
        }"#;
        let assumptions = assumptions_from_json(json).expect("json should parse");
        assert_approx(assumptions.wage_growth_rate, 0.032);
        assert_approx(assumptions.cpi_rate, 0.019);
        assert_approx(assumptions.rpi_rate, 0.028);
        assert_eq!(assumptions.sample_size, 1234);
        assert_approx(assumptions.median_income, 30_000.0);
        assert_approx(assumptions.mean_income, 38_000.0);
        assert_eq!(assumptions.horizon_years, 4);
        assert_eq!(assumptions.base_year, 2025);
        assert!(assumptions.allowance_taper);
        assert_approx(assumptions.income_growth_rate, 0.04);
        assert_eq!(assumptions.population, DEFAULT_POPULATION);
    }

    #[test]
    fn assumptions_from_json_reports_bad_payload() {
        let err = assumptions_from_json(r#"{"cpi": "fast"}"#).expect_err("must reject");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn sample_cache_reuses_draws_until_distribution_changes() {
        let cache = SampleCache::default();
        let mut assumptions = build_assumptions(sample_args()).expect("valid inputs");

        let first = cache.get_or_draw(&assumptions).expect("sample");
        assumptions.cpi_rate = 0.05;
        assumptions.wage_growth_rate = 0.01;
        let second = cache.get_or_draw(&assumptions).expect("sample");
        assert!(Arc::ptr_eq(&first, &second));

        assumptions.seed += 1;
        let third = cache.get_or_draw(&assumptions).expect("sample");
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn tax_response_uprates_schedule_for_requested_year() {
        let query = TaxQuery {
            income: 60_000.0,
            year: 0,
            policy: None,
            allowance_taper: false,
        };
        let frozen = tax_response(query).expect("valid query");
        assert_approx(frozen.tax, 11_432.0);
        assert_eq!(frozen.tax_year, "2024/25");

        let query = TaxQuery {
            income: 60_000.0,
            year: 3,
            policy: Some(ApiPolicy::Wage),
            allowance_taper: false,
        };
        let indexed = tax_response(query).expect("valid query");
        assert!(indexed.tax < frozen.tax);
        assert_eq!(indexed.tax_year, "2027/28");
        assert_eq!(indexed.policy, UpratingPolicy::WageLinked);
    }

    #[test]
    fn tax_response_rejects_years_past_representable_thresholds() {
        let query = TaxQuery {
            income: 60_000.0,
            year: 20_000,
            policy: Some(ApiPolicy::Wage),
            allowance_taper: false,
        };
        assert!(tax_response(query).is_err());

        let query = TaxQuery {
            income: 60_000.0,
            year: u32::MAX,
            policy: None,
            allowance_taper: false,
        };
        let err = tax_response(query).expect_err("must reject");
        assert!(err.contains("out of range"));
    }

    #[test]
    fn golden_snapshot_wage_linked_tax_json() {
        let query = TaxQuery {
            income: 60_000.0,
            year: 2,
            policy: Some(ApiPolicy::Wage),
            allowance_taper: false,
        };
        let response = tax_response(query).expect("valid query");
        let json = format!(
            "{}\n",
            serde_json::to_string(&response).expect("response should serialize")
        );

        assert_golden_snapshot("tests/golden/tax_wage_linked.json", &json);
    }

    #[test]
    fn tax_response_rejects_negative_income() {
        let query = TaxQuery {
            income: -10.0,
            year: 0,
            policy: None,
            allowance_taper: false,
        };
        let err = tax_response(query).expect_err("must reject");
        assert!(err.contains("Invalid income"));
    }

    #[test]
    fn rendered_report_lists_every_year_and_scenario() {
        let assumptions = build_assumptions(sample_args()).expect("valid inputs");
        let report = run_report(&assumptions).expect("report");
        let text = render_report(&report);
        for label in [
            "2024/25",
            "2028/29",
            "frozen (£bn)",
            "wage (£bn)",
            "Fiscal drag",
            "vs rpi",
        ] {
            assert!(text.contains(label), "missing {label}");
        }
    }

    #[test]
    fn error_response_serializes_message() {
        let body = serde_json::to_string(&ErrorResponse {
            error: "bad".to_string(),
        })
        .expect("error should serialize");
        assert_eq!(body, r#"{"error":"bad"}"#);
    }
}
