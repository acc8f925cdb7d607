//! Analysis API Routes
//!
//! Ticker analysis through the market-data provider, plus a stateless
//! endpoint that evaluates a caller-supplied snapshot.

use analysis_core::{
    AnalysisMode, FinancialSnapshot, FundamentalAnalysis, IndustryBenchmark, RecommendationReport,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub snapshot: FinancialSnapshot,
    #[serde(default)]
    pub benchmark: Option<IndustryBenchmark>,
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analysis/:symbol", get(analyze_symbol))
        .route("/api/evaluate", post(evaluate_snapshot))
}

async fn analyze_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<ApiResponse<FundamentalAnalysis>>, AppError> {
    let mode = match query.mode.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<AnalysisMode>()?,
        _ => AnalysisMode::default(),
    };

    let analysis = state.orchestrator.analyze(&symbol, mode).await?;
    tracing::info!(
        "Analysis for {}: {}",
        analysis.ticker,
        analysis
            .report
            .iter()
            .map(|row| format!("{}={}", row.metric, row.recommendation))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(Json(ApiResponse::success(analysis)))
}

async fn evaluate_snapshot(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RecommendationReport>>, AppError> {
    let Json(request) = payload?;
    let report = state
        .orchestrator
        .evaluate(&request.snapshot, request.benchmark.as_ref())?;
    Ok(Json(ApiResponse::success(report)))
}
