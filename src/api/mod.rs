mod report;

use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    DurationBounds, HistoricalData, InvestmentType, NestEggError, SimulationParams, Summary,
    run_simulation,
};

pub use report::{CHART_CASE_LIMIT, chart_outcomes, group_thousands, render_report, write_chart_csv};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

/// Largest `numCases` the HTTP API accepts in one request.
const MAX_API_CASES: u32 = 1_000_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliInvestmentType {
    Stocks,
    Bonds,
    #[value(name = "sb_blend", alias = "sb-blend")]
    SbBlend,
    #[value(name = "sbc_blend", alias = "sbc-blend")]
    SbcBlend,
}

impl From<CliInvestmentType> for InvestmentType {
    fn from(value: CliInvestmentType) -> Self {
        match value {
            CliInvestmentType::Stocks => InvestmentType::Stocks,
            CliInvestmentType::Bonds => InvestmentType::Bonds,
            CliInvestmentType::SbBlend => InvestmentType::SbBlend,
            CliInvestmentType::SbcBlend => InvestmentType::SbcBlend,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApiInvestmentType {
    #[serde(alias = "sp500", alias = "stock")]
    Stocks,
    #[serde(alias = "tbond", alias = "bond")]
    Bonds,
    #[serde(alias = "sbBlend", alias = "sb-blend")]
    SbBlend,
    #[serde(alias = "sbcBlend", alias = "sbc-blend")]
    SbcBlend,
}

impl From<ApiInvestmentType> for CliInvestmentType {
    fn from(value: ApiInvestmentType) -> Self {
        match value {
            ApiInvestmentType::Stocks => CliInvestmentType::Stocks,
            ApiInvestmentType::Bonds => CliInvestmentType::Bonds,
            ApiInvestmentType::SbBlend => CliInvestmentType::SbBlend,
            ApiInvestmentType::SbcBlend => CliInvestmentType::SbcBlend,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Monte Carlo odds of outliving a retirement portfolio, replaying historical returns and inflation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one simulation and print the summary.
    Run(RunArgs),
    /// Serve the JSON API and the outcome chart page.
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    #[arg(
        long,
        env = "NESTEGG_DATA_DIR",
        default_value = "data",
        help = "Directory holding the historical return and inflation files (percent per line)"
    )]
    pub data_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,
    #[command(flatten)]
    sim: SimArgs,
    #[arg(long, help = "Write the first 3000 outcomes as case,remaining CSV")]
    pub chart_csv: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub data: DataArgs,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

#[derive(Args, Debug, Clone)]
struct SimArgs {
    #[arg(long, value_enum, default_value_t = CliInvestmentType::Bonds)]
    investment_type: CliInvestmentType,
    #[arg(long, default_value_t = 2_000_000, help = "Value of investments at start of retirement")]
    start_value: i64,
    #[arg(long, default_value_t = 80_000, help = "Annual pre-tax withdrawal in today's money")]
    withdrawal: i64,
    #[arg(long, default_value_t = 18)]
    min_years: u32,
    #[arg(long, default_value_t = 25)]
    most_likely_years: u32,
    #[arg(long, default_value_t = 40)]
    max_years: u32,
    #[arg(long, default_value_t = 50_000)]
    num_cases: u32,
    #[arg(long, help = "Base seed; a random one is chosen and logged when omitted")]
    seed: Option<u64>,
}

impl Default for SimArgs {
    fn default() -> Self {
        Self {
            investment_type: CliInvestmentType::Bonds,
            start_value: 2_000_000,
            withdrawal: 80_000,
            min_years: 18,
            most_likely_years: 25,
            max_years: 40,
            num_cases: 50_000,
            seed: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    investment_type: Option<ApiInvestmentType>,
    start_value: Option<i64>,
    withdrawal: Option<i64>,
    min_years: Option<u32>,
    most_likely_years: Option<u32>,
    max_years: Option<u32>,
    num_cases: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    investment_type: InvestmentType,
    investment_description: &'static str,
    start_value: i64,
    withdrawal: i64,
    duration: DurationBounds,
    /// Decimal string so browsers can replay seeds above 2^53 exactly.
    seed: String,
    #[serde(flatten)]
    summary: Summary,
    chart_outcomes: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_params(args: SimArgs) -> Result<SimulationParams, NestEggError> {
    if args.num_cases == 0 {
        return Err(NestEggError::configuration("--num-cases must be > 0"));
    }

    let duration = DurationBounds::new(args.min_years, args.most_likely_years, args.max_years)
        .map_err(|_| {
            NestEggError::configuration(format!(
                "problem with input years {}-{}-{}: requires min < most likely < max",
                args.min_years, args.most_likely_years, args.max_years
            ))
        })?;

    let params = SimulationParams {
        investment_type: args.investment_type.into(),
        start_value: args.start_value,
        withdrawal: args.withdrawal,
        duration,
        num_cases: args.num_cases,
        seed: args.seed.unwrap_or_else(random_seed),
    };
    params.validate()?;
    Ok(params)
}

/// Random base seed kept below 2^53 so it survives a round trip through a JS number.
fn random_seed() -> u64 {
    rand::random::<u64>() >> 11
}

/// Runs the `run` subcommand: load history, simulate, print the report.
pub fn run_cli(args: RunArgs) -> Result<(), NestEggError> {
    let params = build_params(args.sim)?;
    let history = HistoricalData::load_dir(&args.data.data_dir)?;
    info!(seed = params.seed, "using base seed");

    let result = run_simulation(&params, &history)?;
    println!();
    print!("{}", render_report(&params, &result.summary));

    if let Some(path) = args.chart_csv.as_deref() {
        write_chart_csv(path, &result.outcomes)?;
        info!(path = %path.display(), cases = chart_outcomes(&result.outcomes).len(), "wrote chart data");
    }
    Ok(())
}

type AppState = Arc<HistoricalData>;

pub async fn run_http_server(port: u16, history: HistoricalData) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "nestegg HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router(Arc::new(history))).await
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    State(state): State<AppState>,
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(state, payload).await,
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

async fn simulate_post_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(state, payload).await,
        Err(rejection) => rejected_payload(rejection.body_text()),
    }
}

fn rejected_payload(detail: String) -> Response {
    let err = NestEggError::configuration(format!("Invalid request payload: {detail}"));
    warn!(error = %err, "rejected simulate request");
    error_response(status_for(&err), &err.to_string())
}

async fn simulate_handler_impl(state: AppState, payload: SimulatePayload) -> Response {
    let params = match params_from_payload(payload) {
        Ok(params) => params,
        Err(err) => {
            warn!(error = %err, "rejected simulate request");
            return error_response(status_for(&err), &err.to_string());
        }
    };

    let run_params = params.clone();
    let joined =
        tokio::task::spawn_blocking(move || run_simulation(&run_params, &state)).await;
    match joined {
        Ok(Ok(result)) => json_response(
            StatusCode::OK,
            build_simulate_response(&params, &result.summary, &result.outcomes),
        ),
        Ok(Err(err)) => {
            warn!(error = %err, "simulation failed");
            error_response(status_for(&err), &err.to_string())
        }
        Err(join_err) => {
            error!(error = %join_err, "simulation task panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "simulation failed")
        }
    }
}

fn status_for(err: &NestEggError) -> StatusCode {
    if err.is_configuration() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
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
fn params_from_json(json: &str) -> Result<SimulationParams, NestEggError> {
    let payload = serde_json::from_str::<SimulatePayload>(json).map_err(|e| {
        NestEggError::configuration(format!("Invalid API JSON payload: {e}"))
    })?;
    params_from_payload(payload)
}

fn params_from_payload(payload: SimulatePayload) -> Result<SimulationParams, NestEggError> {
    let mut args = SimArgs::default();

    if let Some(v) = payload.investment_type {
        args.investment_type = v.into();
    }
    if let Some(v) = payload.start_value {
        args.start_value = v;
    }
    if let Some(v) = payload.withdrawal {
        args.withdrawal = v;
    }
    if let Some(v) = payload.min_years {
        args.min_years = v;
    }
    if let Some(v) = payload.most_likely_years {
        args.most_likely_years = v;
    }
    if let Some(v) = payload.max_years {
        args.max_years = v;
    }
    if let Some(v) = payload.num_cases {
        if v > MAX_API_CASES {
            return Err(NestEggError::configuration(format!(
                "numCases must be <= {MAX_API_CASES}"
            )));
        }
        args.num_cases = v;
    }
    args.seed = payload.seed;

    build_params(args)
}

fn build_simulate_response(
    params: &SimulationParams,
    summary: &Summary,
    outcomes: &[i64],
) -> SimulateResponse {
    SimulateResponse {
        investment_type: params.investment_type,
        investment_description: params.investment_type.description(),
        start_value: params.start_value,
        withdrawal: params.withdrawal,
        duration: params.duration,
        seed: params.seed.to_string(),
        summary: *summary,
        chart_outcomes: chart_outcomes(outcomes).to_vec(),
    }
}
