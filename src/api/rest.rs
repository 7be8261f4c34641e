// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Analysis endpoints are stateless
// request/response wrappers around the analytic core; playback endpoints
// drive the shared `PlaybackController`.
//
// Error mapping:
//   InvalidInput      =>  400
//   InsufficientData  =>  422
//   upstream fetch    =>  502
//
// CORS is configured permissively for development.
// =============================================================================

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis::{FractalAnnotation, FractalDetector, FractalPoint, HurstConfig, HurstEstimator};
use crate::app_state::{AppState, DashboardSnapshot};
use crate::error::AnalysisError;
use crate::indicators::mean_reversion::calculate_mean_reversion;
use crate::indicators::momentum::{calculate_momentum, calculate_roc, pct_change};
use crate::indicators::seasonality::{
    compare_monthly, monthly_returns, turn_of_year, MonthlyComparison, MonthlyReturn, PricePoint,
    TurnOfYear,
};
use crate::indicators::sma::{crossover_events, crossover_signals, CrossoverEvent};
use crate::market_data::{synthetic, CandleSeries};
use crate::playback::{DataSource, HurstView, PlaybackController, PlaybackState};
use crate::runtime_config::RuntimeConfig;
use crate::series::{ensure_finite, PriceSeries};
use crate::types::{SeriesKind, TradeSignal};

/// Default length of the `/analysis/hurst/demo` random walk.
const DEFAULT_DEMO_LENGTH: usize = 1000;
/// Upper bound on the demo length to keep the endpoint cheap.
const MAX_DEMO_LENGTH: usize = 100_000;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        // ── Stateless analysis ──────────────────────────────────────
        .route("/api/v1/analysis/fractals", post(analyze_fractals))
        .route("/api/v1/analysis/hurst", post(analyze_hurst))
        .route("/api/v1/analysis/hurst/demo", get(hurst_demo))
        .route("/api/v1/analysis/indicators", post(analyze_indicators))
        .route("/api/v1/analysis/seasonality", post(analyze_seasonality))
        // ── Playback ────────────────────────────────────────────────
        .route("/api/v1/playback", get(playback_snapshot))
        .route("/api/v1/playback/start", post(playback_start))
        .route("/api/v1/playback/pause", post(playback_pause))
        .route("/api/v1/playback/reset", post(playback_reset))
        .route("/api/v1/playback/scale", post(playback_scale))
        // ── Configuration ───────────────────────────────────────────
        .route("/api/v1/config", get(get_config).post(set_config))
        // ── WebSocket (handled separately in ws module but mounted here) ─
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

/// Every failure a handler can report.
#[derive(Debug)]
pub enum ApiError {
    Analysis(AnalysisError),
    Upstream(anyhow::Error),
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        Self::Analysis(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::Analysis(e @ AnalysisError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, e.kind(), e.to_string())
            }
            Self::Analysis(e @ AnalysisError::InsufficientData { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.kind(), e.to_string())
            }
            Self::Upstream(e) => (StatusCode::BAD_GATEWAY, "upstream", format!("{e:#}")),
        };

        (
            status,
            Json(serde_json::json!({ "error": message, "kind": kind })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    };
    Json(resp)
}

// =============================================================================
// Fractals
// =============================================================================

#[derive(Deserialize)]
struct FractalRequest {
    high: Vec<f64>,
    low: Vec<f64>,
}

#[derive(Serialize)]
struct FractalResponse {
    #[serde(flatten)]
    annotation: FractalAnnotation,
    points: Vec<FractalPoint>,
}

async fn analyze_fractals(Json(req): Json<FractalRequest>) -> ApiResult<FractalResponse> {
    let annotation = FractalDetector::detect(&req.high, &req.low)?;
    let points = annotation.points();
    Ok(Json(FractalResponse { annotation, points }))
}

// =============================================================================
// Hurst exponent
// =============================================================================

#[derive(Deserialize)]
struct HurstRequest {
    series: Vec<f64>,
    /// Optional sample times; indices are used when absent.
    #[serde(default)]
    timestamps: Option<Vec<i64>>,
    #[serde(default)]
    kind: Option<SeriesKind>,
    #[serde(default)]
    simplified: Option<bool>,
}

#[derive(Serialize)]
struct HurstResponse {
    #[serde(flatten)]
    view: HurstView,
    config: HurstConfig,
    /// `(ln scale, ln R/S)` pairs.
    log_log: Vec<(f64, f64)>,
    regression_line: Vec<(f64, f64)>,
}

fn estimate_hurst(series: &[f64], config: HurstConfig) -> Result<HurstResponse, AnalysisError> {
    let estimator = HurstEstimator::new(config);
    let result = estimator.estimate(series)?;
    let log_log = result.log_log_points();
    let regression_line = result.regression_line();
    Ok(HurstResponse {
        view: HurstView::from(result),
        config: estimator.config(),
        log_log,
        regression_line,
    })
}

async fn analyze_hurst(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HurstRequest>,
) -> ApiResult<HurstResponse> {
    let defaults = state.runtime_config.read().hurst;
    let config = HurstConfig {
        kind: req.kind.unwrap_or(defaults.kind),
        simplified: req.simplified.unwrap_or(defaults.simplified),
    };
    let series = match req.timestamps {
        Some(timestamps) => PriceSeries::new(&timestamps, req.series)?,
        None => PriceSeries::from_values(req.series)?,
    };
    Ok(Json(estimate_hurst(series.values(), config)?))
}

#[derive(Deserialize)]
struct DemoQuery {
    length: Option<usize>,
    seed: Option<u64>,
}

#[derive(Serialize)]
struct HurstDemoResponse {
    length: usize,
    seed: u64,
    series: Vec<f64>,
    hurst: HurstResponse,
}

/// Hurst exponent of a seeded Gaussian random walk, with the log-log data
/// needed to plot the fit.
async fn hurst_demo(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DemoQuery>,
) -> ApiResult<HurstDemoResponse> {
    let length = query.length.unwrap_or(DEFAULT_DEMO_LENGTH);
    if length > MAX_DEMO_LENGTH {
        return Err(AnalysisError::InvalidInput(format!(
            "length {length} exceeds the maximum of {MAX_DEMO_LENGTH}"
        ))
        .into());
    }
    let seed = query.seed.unwrap_or_else(|| state.runtime_config.read().synthetic_seed);
    let simplified = state.runtime_config.read().hurst.simplified;

    let series = synthetic::random_walk(length, seed);
    let hurst = estimate_hurst(
        &series,
        HurstConfig {
            kind: SeriesKind::RandomWalk,
            simplified,
        },
    )?;

    Ok(Json(HurstDemoResponse {
        length,
        seed,
        series,
        hurst,
    }))
}

// =============================================================================
// Indicators
// =============================================================================

#[derive(Deserialize)]
struct IndicatorRequest {
    closes: Vec<f64>,
    #[serde(default)]
    momentum_window: Option<usize>,
    #[serde(default)]
    roc_period: Option<usize>,
    #[serde(default)]
    mean_reversion_window: Option<usize>,
    #[serde(default)]
    sma_short: Option<usize>,
    #[serde(default)]
    sma_long: Option<usize>,
}

/// Index of the first input bar each series starts at.
#[derive(Serialize)]
struct IndicatorWarmup {
    momentum: usize,
    rate_of_change: usize,
    mean_reversion: usize,
    pct_change: usize,
    crossover: usize,
}

#[derive(Serialize)]
struct IndicatorResponse {
    momentum: Vec<f64>,
    rate_of_change: Vec<f64>,
    mean_reversion: Vec<f64>,
    pct_change: Vec<f64>,
    crossover_signals: Vec<TradeSignal>,
    crossover_events: Vec<CrossoverEvent>,
    warmup: IndicatorWarmup,
}

async fn analyze_indicators(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IndicatorRequest>,
) -> ApiResult<IndicatorResponse> {
    ensure_finite(&req.closes, "closes")?;

    let (momentum_window, mean_reversion_window, sma_short, sma_long) = {
        let config = state.runtime_config.read();
        (
            req.momentum_window.unwrap_or(config.momentum_window),
            req.mean_reversion_window.unwrap_or(config.mean_reversion_window),
            req.sma_short.unwrap_or(config.sma_short),
            req.sma_long.unwrap_or(config.sma_long),
        )
    };
    let roc_period = req.roc_period.unwrap_or(momentum_window);
    let closes = &req.closes;

    Ok(Json(IndicatorResponse {
        momentum: calculate_momentum(closes, momentum_window),
        rate_of_change: calculate_roc(closes, roc_period),
        mean_reversion: calculate_mean_reversion(closes, mean_reversion_window),
        pct_change: pct_change(closes),
        crossover_signals: crossover_signals(closes, sma_short, sma_long),
        crossover_events: crossover_events(closes, sma_short, sma_long),
        warmup: IndicatorWarmup {
            momentum: momentum_window,
            rate_of_change: roc_period,
            mean_reversion: mean_reversion_window.saturating_sub(1),
            pct_change: 1,
            crossover: sma_long.saturating_sub(1),
        },
    }))
}

// =============================================================================
// Seasonality
// =============================================================================

#[derive(Deserialize)]
struct SeasonalityRequest {
    small: Vec<PricePoint>,
    large: Vec<PricePoint>,
}

#[derive(Serialize)]
struct SeasonalityResponse {
    small_returns: Vec<MonthlyReturn>,
    large_returns: Vec<MonthlyReturn>,
    comparison: Vec<MonthlyComparison>,
    turn_of_year: Vec<TurnOfYear>,
}

async fn analyze_seasonality(Json(req): Json<SeasonalityRequest>) -> ApiResult<SeasonalityResponse> {
    let small_returns = monthly_returns(&req.small);
    let large_returns = monthly_returns(&req.large);
    let comparison = compare_monthly(&small_returns, &large_returns);
    let turn_of_year = turn_of_year(&comparison);

    Ok(Json(SeasonalityResponse {
        small_returns,
        large_returns,
        comparison,
        turn_of_year,
    }))
}

// =============================================================================
// Playback
// =============================================================================

async fn playback_snapshot(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    Json(state.build_snapshot())
}

#[derive(Serialize)]
struct ControlResponse {
    source: DataSource,
    state: PlaybackState,
    scale: usize,
    visible: usize,
    total: usize,
    changed: bool,
    message: String,
}

fn control_response(state: &AppState, changed: bool, message: impl Into<String>) -> Json<ControlResponse> {
    let pc = state.playback.read();
    Json(ControlResponse {
        source: pc.source().clone(),
        state: pc.state(),
        scale: pc.scale(),
        visible: pc.visible_len(),
        total: pc.candles().len(),
        changed,
        message: message.into(),
    })
}

#[derive(Deserialize)]
struct StartRequest {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

/// An empty or whitespace-only body means "no request"; anything else must
/// parse as a [`StartRequest`].
fn parse_start_request(body: &[u8]) -> Result<Option<StartRequest>, AnalysisError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| AnalysisError::InvalidInput(format!("malformed start request: {e}")))
}

/// Start playback. With a JSON body, fresh klines are fetched from Binance
/// (missing fields fall back to the configured defaults) and replace the
/// buffer first. A body that does not parse is rejected before anything
/// changes.
async fn playback_start(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ControlResponse>, ApiError> {
    if let Some(req) = parse_start_request(&body)? {
        let (symbol, interval, limit) = {
            let config = state.runtime_config.read();
            (
                req.symbol.unwrap_or_else(|| config.default_symbol.clone()).to_uppercase(),
                req.interval.unwrap_or_else(|| config.default_interval.clone()),
                req.limit.unwrap_or(config.kline_limit),
            )
        };

        let candles = match fetch_candles(&state, &symbol, &interval, limit).await {
            Ok(c) => c,
            Err(e) => {
                warn!(symbol = %symbol, interval = %interval, error = %e, "Kline fetch failed");
                state.push_error(format!("kline fetch for {symbol} {interval} failed: {e:#}"));
                return Err(ApiError::Upstream(e));
            }
        };

        let count = candles.len();
        state.update_playback(|pc| {
            pc.load(candles, DataSource::Binance { symbol: symbol.clone(), interval: interval.clone() });
            pc.start();
            true
        });
        info!(symbol = %symbol, interval = %interval, count, "Playback started on fresh klines");
        return Ok(control_response(&state, true, format!("loaded {count} {symbol} {interval} candles")));
    }

    let changed = state.update_playback(PlaybackController::start);
    Ok(control_response(&state, changed, "playback started"))
}

async fn fetch_candles(
    state: &AppState,
    symbol: &str,
    interval: &str,
    limit: u32,
) -> anyhow::Result<CandleSeries> {
    let candles = state.binance.get_klines(symbol, interval, limit).await?;
    if candles.is_empty() {
        anyhow::bail!("Binance returned no klines for {symbol} {interval}");
    }
    Ok(CandleSeries::new(candles)?)
}

async fn playback_pause(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let changed = state.update_playback(PlaybackController::pause);
    control_response(&state, changed, "playback paused")
}

async fn playback_reset(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let changed = state.update_playback(PlaybackController::reset);
    control_response(&state, changed, "playback reset")
}

#[derive(Deserialize)]
struct ScaleRequest {
    scale: usize,
}

async fn playback_scale(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScaleRequest>,
) -> Json<ControlResponse> {
    let mut applied = 0;
    let changed = state.update_playback(|pc| {
        let before = pc.scale();
        applied = pc.set_scale(req.scale);
        applied != before
    });
    control_response(&state, changed, format!("scale set to {applied}"))
}

// =============================================================================
// Configuration
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> Json<RuntimeConfig> {
    Json(state.runtime_config.read().clone())
}

#[derive(Deserialize)]
struct ConfigUpdate {
    #[serde(default)]
    hurst_kind: Option<SeriesKind>,
    #[serde(default)]
    hurst_simplified: Option<bool>,
    #[serde(default)]
    dashboard_min_hurst_samples: Option<usize>,
    #[serde(default)]
    momentum_window: Option<usize>,
    #[serde(default)]
    mean_reversion_window: Option<usize>,
    #[serde(default)]
    sma_short: Option<usize>,
    #[serde(default)]
    sma_long: Option<usize>,
    #[serde(default)]
    playback_tick_ms: Option<u64>,
    #[serde(default)]
    default_symbol: Option<String>,
    #[serde(default)]
    default_interval: Option<String>,
    #[serde(default)]
    kline_limit: Option<u32>,
}

#[derive(Serialize)]
struct ConfigResponse {
    config: RuntimeConfig,
    changes: Vec<String>,
}

fn validate_update(config: &RuntimeConfig) -> Result<(), AnalysisError> {
    if config.momentum_window == 0 || config.mean_reversion_window == 0 {
        return Err(AnalysisError::InvalidInput(
            "indicator windows must be positive".to_string(),
        ));
    }
    if config.sma_short == 0 || config.sma_short >= config.sma_long {
        return Err(AnalysisError::InvalidInput(format!(
            "sma_short ({}) must be positive and below sma_long ({})",
            config.sma_short, config.sma_long
        )));
    }
    if config.playback_tick_ms == 0 {
        return Err(AnalysisError::InvalidInput(
            "playback_tick_ms must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Partial update: only the fields present in the body change. The result
/// is validated as a whole before it replaces the live config.
async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> ApiResult<ConfigResponse> {
    let mut config = state.runtime_config.read().clone();
    let mut changes = Vec::new();

    macro_rules! apply_field {
        ($update_field:ident, $($config_field:ident).+) => {
            if let Some(val) = update.$update_field.clone() {
                if config.$($config_field).+ != val {
                    changes.push(format!(
                        "{}: {:?} -> {:?}",
                        stringify!($update_field),
                        config.$($config_field).+,
                        val
                    ));
                    config.$($config_field).+ = val;
                }
            }
        };
    }

    apply_field!(hurst_kind, hurst.kind);
    apply_field!(hurst_simplified, hurst.simplified);
    apply_field!(dashboard_min_hurst_samples, dashboard_min_hurst_samples);
    apply_field!(momentum_window, momentum_window);
    apply_field!(mean_reversion_window, mean_reversion_window);
    apply_field!(sma_short, sma_short);
    apply_field!(sma_long, sma_long);
    apply_field!(playback_tick_ms, playback_tick_ms);
    apply_field!(default_symbol, default_symbol);
    apply_field!(default_interval, default_interval);
    apply_field!(kline_limit, kline_limit);

    if changes.is_empty() {
        return Ok(Json(ConfigResponse { config, changes }));
    }

    validate_update(&config)?;
    *state.runtime_config.write() = config.clone();
    info!(changes = ?changes, "Runtime config updated");

    // Save to disk (best-effort).
    if let Err(e) = config.save(&state.config_path) {
        warn!(error = %e, "Failed to save runtime config to disk");
    }

    state.increment_version();
    Ok(Json(ConfigResponse { config, changes }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(tag: &str) -> Arc<AppState> {
        let dir = std::env::temp_dir().join(format!("fractal-lab-rest-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = RuntimeConfig {
            synthetic_length: 200,
            initial_scale: 50,
            binance_base_url: "http://127.0.0.1:1".to_string(),
            ..RuntimeConfig::default()
        };
        Arc::new(AppState::new(config, dir.join("fractal_lab.json")).unwrap())
    }

    async fn send(
        state: &Arc<AppState>,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_ok() {
        let state = test_state("health");
        let (status, body) = send(&state, "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["state_version"], 1);
    }

    #[tokio::test]
    async fn fractals_single_peak() {
        let state = test_state("fractals");
        let req = serde_json::json!({
            "high": [1.0, 2.0, 5.0, 2.0, 1.0, 1.5],
            "low":  [0.5, 1.0, 3.0, 1.0, 0.5, 1.0],
        });
        let (status, body) = send(&state, "POST", "/api/v1/analysis/fractals", Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["up"][2], true);
        assert_eq!(body["points"].as_array().unwrap().len(), 1);
        assert_eq!(body["points"][0]["index"], 2);
        assert_eq!(body["points"][0]["kind"], "up");
    }

    #[tokio::test]
    async fn fractals_length_mismatch_is_400() {
        let state = test_state("fractals-bad");
        let req = serde_json::json!({ "high": [1.0, 2.0, 3.0, 2.0, 1.0], "low": [1.0] });
        let (status, body) = send(&state, "POST", "/api/v1/analysis/fractals", Some(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
        assert!(body["error"].as_str().unwrap().starts_with("invalid input"));
    }

    #[tokio::test]
    async fn hurst_short_series_is_422() {
        let state = test_state("hurst-short");
        let req = serde_json::json!({ "series": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0] });
        let (status, body) = send(&state, "POST", "/api/v1/analysis/hurst", Some(req)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "insufficient_data");
    }

    #[tokio::test]
    async fn hurst_non_positive_price_is_400() {
        let state = test_state("hurst-neg");
        let mut series: Vec<f64> = (1..=64).map(|x| x as f64).collect();
        series[10] = -1.0;
        let req = serde_json::json!({ "series": series, "kind": "price" });
        let (status, _) = send(&state, "POST", "/api/v1/analysis/hurst", Some(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn hurst_rejects_unordered_timestamps() {
        let state = test_state("hurst-ts");
        let series = synthetic::random_walk(64, 1);
        let mut timestamps: Vec<i64> = (0..64).collect();
        timestamps.swap(3, 4);
        let req = serde_json::json!({ "series": series, "timestamps": timestamps, "kind": "random_walk" });
        let (status, body) = send(&state, "POST", "/api/v1/analysis/hurst", Some(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("strictly increasing"));
    }

    #[tokio::test]
    async fn hurst_random_walk() {
        let state = test_state("hurst-rw");
        let series = synthetic::random_walk(1000, 42);
        let req = serde_json::json!({ "series": series, "kind": "random_walk" });
        let (status, body) = send(&state, "POST", "/api/v1/analysis/hurst", Some(req)).await;
        assert_eq!(status, StatusCode::OK);

        let h = body["h"].as_f64().unwrap();
        assert!(h.is_finite());
        let scales = body["scales"].as_array().unwrap().len();
        assert_eq!(body["fluctuations"].as_array().unwrap().len(), scales);
        assert_eq!(body["regression_line"].as_array().unwrap().len(), scales);
        assert_eq!(body["config"]["kind"], "random_walk");
        assert!(body["regime"].is_string());
    }

    #[tokio::test]
    async fn hurst_demo_defaults() {
        let state = test_state("demo");
        let (status, body) = send(&state, "GET", "/api/v1/analysis/hurst/demo?length=600&seed=7", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["length"], 600);
        assert_eq!(body["seed"], 7);
        assert_eq!(body["series"].as_array().unwrap().len(), 600);
        assert!(body["hurst"]["h"].as_f64().is_some());

        let (status, _) = send(&state, "GET", "/api/v1/analysis/hurst/demo?length=10", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&state, "GET", "/api/v1/analysis/hurst/demo?length=1000000", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn indicators_hand_computed() {
        let state = test_state("indicators");
        let req = serde_json::json!({
            "closes": [10.0, 11.0, 13.0, 12.0, 15.0],
            "momentum_window": 2,
            "mean_reversion_window": 2,
            "sma_short": 1,
            "sma_long": 2,
        });
        let (status, body) = send(&state, "POST", "/api/v1/analysis/indicators", Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["momentum"], serde_json::json!([3.0, 1.0, 3.0]));
        assert_eq!(body["mean_reversion"], serde_json::json!([0.5, 1.0, -0.5, 1.5]));
        assert_eq!(body["crossover_signals"], serde_json::json!(["buy", "buy", "sell", "buy"]));
        assert_eq!(body["warmup"]["crossover"], 1);
        assert_eq!(body["pct_change"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn indicators_reject_null_close() {
        let state = test_state("indicators-null");
        let req = serde_json::json!({ "closes": [1.0, null, 2.0] });
        // `null` is not an f64: rejected by the JSON extractor itself.
        let (status, _) = send(&state, "POST", "/api/v1/analysis/indicators", Some(req)).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn seasonality_pairs_months() {
        let state = test_state("seasonality");
        // 2021-11-30, 2021-12-31, 2022-01-31 (UTC midnight).
        let times = [1_638_230_400_000_i64, 1_640_908_800_000, 1_643_587_200_000];
        let small: Vec<_> = times
            .iter()
            .zip([100.0, 110.0, 99.0])
            .map(|(t, c)| serde_json::json!({ "time": t, "close": c }))
            .collect();
        let large: Vec<_> = times
            .iter()
            .zip([200.0, 202.0, 212.1])
            .map(|(t, c)| serde_json::json!({ "time": t, "close": c }))
            .collect();

        let req = serde_json::json!({ "small": small, "large": large });
        let (status, body) = send(&state, "POST", "/api/v1/analysis/seasonality", Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comparison"].as_array().unwrap().len(), 2);
        assert_eq!(body["comparison"][0]["month"], 12);
        // December 2021 has no January 2021 partner.
        assert_eq!(body["turn_of_year"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn playback_controls() {
        let state = test_state("playback");

        let (status, body) = send(&state, "POST", "/api/v1/playback/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["is_running"], true);
        assert_eq!(body["changed"], true);

        state.tick_playback();
        state.tick_playback();

        let (_, body) = send(&state, "POST", "/api/v1/playback/pause", None).await;
        assert_eq!(body["state"]["is_running"], false);
        assert_eq!(body["state"]["cursor"], 2);
        assert_eq!(body["visible"], 2);

        let (_, body) = send(&state, "GET", "/api/v1/playback", None).await;
        assert_eq!(body["playback"]["visible"], 2);
        assert!(body["playback"]["fractals"].is_null());

        let (_, body) = send(&state, "POST", "/api/v1/playback/reset", None).await;
        assert_eq!(body["state"]["cursor"], 0);
        assert_eq!(body["visible"], 50);

        let req = serde_json::json!({ "scale": 5000 });
        let (_, body) = send(&state, "POST", "/api/v1/playback/scale", Some(req)).await;
        assert_eq!(body["scale"], 200);
        assert_eq!(body["changed"], true);
    }

    #[tokio::test]
    async fn playback_start_fetch_failure_is_502() {
        let state = test_state("fetch-fail");
        let req = serde_json::json!({ "symbol": "btcusdt", "interval": "1m", "limit": 10 });
        let (status, body) = send(&state, "POST", "/api/v1/playback/start", Some(req)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "upstream");

        // The synthetic buffer is untouched and the failure is recorded.
        let snap = state.build_snapshot();
        assert_eq!(snap.playback.total, 200);
        assert!(!snap.playback.state.is_running);
        assert_eq!(snap.recent_errors.len(), 1);
    }

    async fn send_raw(state: &Arc<AppState>, uri: &str, body: &'static str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn playback_start_rejects_malformed_body() {
        let state = test_state("start-malformed");
        let version = state.current_state_version();

        let req = serde_json::json!({ "symbol": "ETHUSDT", "limit": "abc" });
        let (status, body) = send(&state, "POST", "/api/v1/playback/start", Some(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");

        let (status, body) = send_raw(&state, "/api/v1/playback/start", r#"{"symbol": "ETHUSDT""#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");

        // Nothing moved: still the idle synthetic buffer, no fetch attempted.
        let snap = state.build_snapshot();
        assert!(!snap.playback.state.is_running);
        assert_eq!(snap.playback.source, DataSource::Synthetic { seed: 42 });
        assert!(snap.recent_errors.is_empty());
        assert_eq!(state.current_state_version(), version);
    }

    #[tokio::test]
    async fn playback_start_blank_json_body_is_plain_start() {
        let state = test_state("start-blank");
        let (status, body) = send_raw(&state, "/api/v1/playback/start", "  \n").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["is_running"], true);
        assert_eq!(body["source"]["type"], "synthetic");
    }

    #[tokio::test]
    async fn config_partial_update_is_persisted() {
        let state = test_state("config");
        let req = serde_json::json!({ "hurst_kind": "change", "sma_short": 5 });
        let (status, body) = send(&state, "POST", "/api/v1/config", Some(req)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changes"].as_array().unwrap().len(), 2);
        assert_eq!(body["config"]["hurst"]["kind"], "change");
        assert_eq!(state.runtime_config.read().sma_short, 5);

        let saved = RuntimeConfig::load(&state.config_path).unwrap();
        assert_eq!(saved.hurst.kind, SeriesKind::Change);

        let (_, body) = send(&state, "GET", "/api/v1/config", None).await;
        assert_eq!(body["sma_short"], 5);
    }

    #[tokio::test]
    async fn config_rejects_inverted_sma_windows() {
        let state = test_state("config-bad");
        let req = serde_json::json!({ "sma_short": 60 });
        let (status, body) = send(&state, "POST", "/api/v1/config", Some(req)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
        assert_eq!(state.runtime_config.read().sma_short, 10);
    }
}
