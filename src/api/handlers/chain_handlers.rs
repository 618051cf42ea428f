use super::super::ApiState;
use super::{normalize_address, resolve_candle_query, resolve_day_limit};
use crate::types::*;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

pub async fn get_bundle(
    Path(chain_id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<BundleInfo>, StatusCode> {
    match state.database.get_bundle(chain_id).await {
        Ok(Some(bundle)) => Ok(Json(BundleInfo {
            chain_id,
            eth_price: bundle.eth_price,
        })),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get bundle for chain {}: {}", chain_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_factory(
    Path(chain_id): Path<i64>,
    State(state): State<ApiState>,
) -> Result<Json<Factory>, StatusCode> {
    match state.database.get_factory(chain_id).await {
        Ok(Some(factory)) => Ok(Json(factory)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get factory for chain {}: {}", chain_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_token(
    Path((chain_id, address)): Path<(i64, String)>,
    State(state): State<ApiState>,
) -> Result<Json<Token>, StatusCode> {
    let address = normalize_address(&address)?;
    match state.database.get_token(chain_id, &address).await {
        Ok(Some(token)) => Ok(Json(token)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get token {} on chain {}: {}", address, chain_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// 交易对详情，附带两个代币的记录
pub async fn get_pool(
    Path((chain_id, address)): Path<(i64, String)>,
    State(state): State<ApiState>,
) -> Result<Json<PoolDetail>, StatusCode> {
    let address = normalize_address(&address)?;
    let pool = match state.database.get_pool(chain_id, &address).await {
        Ok(Some(pool)) => pool,
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get pool {} on chain {}: {}", address, chain_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let token0 = state.database.get_token(chain_id, &pool.token0).await;
    let token1 = state.database.get_token(chain_id, &pool.token1).await;
    match (token0, token1) {
        (Ok(token0), Ok(token1)) => Ok(Json(PoolDetail {
            chain_id,
            pool,
            token0,
            token1,
        })),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Failed to get tokens of pool {}: {}", address, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_candles(
    Path((chain_id, address)): Path<(i64, String)>,
    Query(params): Query<CandleQuery>,
    State(state): State<ApiState>,
) -> Result<Json<CandleSeries>, StatusCode> {
    let address = normalize_address(&address)?;
    let (resolution, limit) = resolve_candle_query(&params)?;

    match state
        .database
        .get_candles(chain_id, &address, resolution, limit, params.before)
        .await
    {
        Ok(candles) => Ok(Json(CandleSeries {
            chain_id,
            pool: address,
            resolution_minutes: resolution.minutes(),
            candles,
        })),
        Err(e) => {
            tracing::error!("Failed to get candles for pool {}: {}", address, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_token_days(
    Path((chain_id, address)): Path<(i64, String)>,
    Query(params): Query<DayDataQuery>,
    State(state): State<ApiState>,
) -> Result<Json<TokenDaySeries>, StatusCode> {
    let address = normalize_address(&address)?;
    let limit = resolve_day_limit(&params)?;

    match state.database.get_token_days(chain_id, &address, limit, params.before).await {
        Ok(days) => Ok(Json(TokenDaySeries {
            chain_id,
            token: address,
            days,
        })),
        Err(e) => {
            tracing::error!("Failed to get day data for token {}: {}", address, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_factory_days(
    Path(chain_id): Path<i64>,
    Query(params): Query<DayDataQuery>,
    State(state): State<ApiState>,
) -> Result<Json<FactoryDaySeries>, StatusCode> {
    let limit = resolve_day_limit(&params)?;

    match state.database.get_factory_days(chain_id, limit, params.before).await {
        Ok(days) => Ok(Json(FactoryDaySeries { chain_id, days })),
        Err(e) => {
            tracing::error!("Failed to get factory day data for chain {}: {}", chain_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
