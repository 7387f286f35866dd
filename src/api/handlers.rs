//! Request handlers for trades and the stats summary.

use std::sync::Arc;

use anyhow::anyhow;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use crate::db::Database;
use crate::models::{NewTrade, StatsSummary, Trade, TradePatch};
use crate::stats::StatsCalculator;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn create_trade(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewTrade>,
) -> Result<(StatusCode, Json<Trade>), ApiError> {
    payload.validate()?;

    let trade = state.db.create(&payload).await?;
    info!(trade_id = trade.id, symbol = %trade.symbol, side = %trade.side, "Trade created");

    Ok((StatusCode::CREATED, Json(trade)))
}

pub async fn list_trades(State(state): State<AppState>) -> Result<Json<Vec<Trade>>, ApiError> {
    let trades = state.db.list_all().await?;
    Ok(Json(trades))
}

pub async fn get_trade(
    State(state): State<AppState>,
    ApiPath(trade_id): ApiPath<i64>,
) -> Result<Json<Trade>, ApiError> {
    state
        .db
        .get(trade_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Full or partial update; fields missing from the body are left unchanged.
pub async fn update_trade(
    State(state): State<AppState>,
    ApiPath(trade_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<TradePatch>,
) -> Result<Json<Trade>, ApiError> {
    let trade = state
        .db
        .update(trade_id, &patch)
        .await?
        .ok_or(ApiError::NotFound)?;

    info!(trade_id, closed = trade.is_closed(), "Trade updated");
    Ok(Json(trade))
}

pub async fn delete_trade(
    State(state): State<AppState>,
    ApiPath(trade_id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete(trade_id).await? {
        return Err(ApiError::NotFound);
    }

    info!(trade_id, "Trade deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats_summary(State(state): State<AppState>) -> Result<Json<StatsSummary>, ApiError> {
    let trades = state.db.list_all().await?;
    let summary = StatsCalculator::summarize(&trades);
    if !summary.is_finite() {
        return Err(ApiError::Internal(anyhow!(
            "stats summary overflowed over {} trades",
            summary.total_trades
        )));
    }

    debug!(
        total = summary.total_trades,
        winrate = summary.winrate,
        realized_pnl = summary.realized_pnl,
        "Computed stats summary"
    );
    Ok(Json(summary))
}
