use super::snapshot_operations::{
    candle_from_row, factory_day_from_row, factory_from_row, pool_from_row, token_day_from_row, token_from_row,
};
use crate::database::utils::safe_get_decimal;
use crate::types::*;
use anyhow::Result;
use sqlx::PgPool;

pub const MAX_CANDLE_LIMIT: i64 = 1000;
pub const MAX_DAY_DATA_LIMIT: i64 = 1000;

pub struct QueryOperations;

impl QueryOperations {
    pub async fn get_bundle(pool: &PgPool, chain_id: i64) -> Result<Option<ReferenceBundle>> {
        let row = sqlx::query("SELECT eth_price FROM bundles WHERE chain_id = $1")
            .bind(chain_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|row| ReferenceBundle {
            eth_price: safe_get_decimal(&row, "eth_price"),
        }))
    }

    pub async fn get_factory(pool: &PgPool, chain_id: i64) -> Result<Option<Factory>> {
        let row = sqlx::query("SELECT * FROM factories WHERE chain_id = $1")
            .bind(chain_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(factory_from_row))
    }

    pub async fn get_token(pool: &PgPool, chain_id: i64, address: &str) -> Result<Option<Token>> {
        let row = sqlx::query("SELECT * FROM tokens WHERE chain_id = $1 AND id = $2")
            .bind(chain_id)
            .bind(address)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(token_from_row))
    }

    pub async fn get_pool(pool: &PgPool, chain_id: i64, address: &str) -> Result<Option<Pool>> {
        let row = sqlx::query("SELECT * FROM pools WHERE chain_id = $1 AND id = $2")
            .bind(chain_id)
            .bind(address)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(pool_from_row))
    }

    /// 按时间倒序返回，`before` 为不含的桶起始时间上界
    pub async fn get_candles(
        pool: &PgPool,
        chain_id: i64,
        address: &str,
        resolution: CandleResolution,
        limit: i64,
        before: Option<i64>,
    ) -> Result<Vec<Candle>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM candles
            WHERE chain_id = $1
              AND pool_address = $2
              AND resolution_minutes = $3
              AND ($4::BIGINT IS NULL OR start_unix < $4)
            ORDER BY bucket_id DESC
            LIMIT $5
            "#,
        )
        .bind(chain_id)
        .bind(address)
        .bind(resolution.minutes())
        .bind(before)
        .bind(limit.clamp(1, MAX_CANDLE_LIMIT))
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().filter_map(candle_from_row).collect())
    }

    /// 按日期倒序，`before` 为不含的当天起始时间上界
    pub async fn get_token_days(
        pool: &PgPool,
        chain_id: i64,
        address: &str,
        limit: i64,
        before: Option<i64>,
    ) -> Result<Vec<TokenDayData>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM token_day_data
            WHERE chain_id = $1
              AND token_address = $2
              AND ($3::BIGINT IS NULL OR date < $3)
            ORDER BY day_id DESC
            LIMIT $4
            "#,
        )
        .bind(chain_id)
        .bind(address)
        .bind(before)
        .bind(limit.clamp(1, MAX_DAY_DATA_LIMIT))
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(token_day_from_row).collect())
    }

    pub async fn get_factory_days(
        pool: &PgPool,
        chain_id: i64,
        limit: i64,
        before: Option<i64>,
    ) -> Result<Vec<FactoryDayData>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM factory_day_data
            WHERE chain_id = $1
              AND ($2::BIGINT IS NULL OR date < $2)
            ORDER BY day_id DESC
            LIMIT $3
            "#,
        )
        .bind(chain_id)
        .bind(before)
        .bind(limit.clamp(1, MAX_DAY_DATA_LIMIT))
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(factory_day_from_row).collect())
    }
}
