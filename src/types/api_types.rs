use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Candle, FactoryDayData, Pool, Token, TokenDayData};

#[derive(Debug, Clone, Deserialize)]
pub struct CandleQuery {
    /// 周期（分钟），默认 60
    pub resolution: Option<i64>,
    pub limit: Option<i64>,
    /// 只返回 start_unix 小于该值的K线
    pub before: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DayDataQuery {
    pub limit: Option<i64>,
    /// 只返回 date 小于该值的汇总
    pub before: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenDaySeries {
    pub chain_id: i64,
    pub token: String,
    pub days: Vec<TokenDayData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactoryDaySeries {
    pub chain_id: i64,
    pub days: Vec<FactoryDayData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolDetail {
    pub chain_id: i64,
    pub pool: Pool,
    pub token0: Option<Token>,
    pub token1: Option<Token>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandleSeries {
    pub chain_id: i64,
    pub pool: String,
    pub resolution_minutes: i64,
    pub candles: Vec<Candle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleInfo {
    pub chain_id: i64,
    pub eth_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainBlockStatus {
    pub chain_id: i64,
    pub last_processed_block: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}
