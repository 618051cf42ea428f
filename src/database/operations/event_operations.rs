use crate::types::ChainBlockStatus;
use crate::database::utils::{safe_get_datetime, safe_get_i64};
use anyhow::Result;
use sqlx::{PgPool, Postgres, Transaction};

// 事件类型常量，工厂和交易对日志共用一个游标
pub const EVENT_TYPE_UNIFIED: &str = "unified";

pub struct EventOperations;

impl EventOperations {
    pub async fn initialize_last_processed_block(
        pool: &PgPool,
        chain_id: i64,
        start_block: u64,
    ) -> Result<()> {
        sqlx::query(
            r#"
        INSERT INTO last_processed_blocks (chain_id, event_type, last_block_number)
        VALUES ($1, $2, $3)
        ON CONFLICT (chain_id, event_type) DO NOTHING
        "#,
        )
        .bind(chain_id)
        .bind(EVENT_TYPE_UNIFIED)
        .bind(start_block as i64)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn get_last_processed_block(pool: &PgPool, chain_id: i64) -> Result<Option<u64>> {
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT last_block_number FROM last_processed_blocks WHERE chain_id = $1 AND event_type = $2",
        )
        .bind(chain_id)
        .bind(EVENT_TYPE_UNIFIED)
        .fetch_optional(pool)
        .await?;

        Ok(result.map(|block| block.max(0) as u64))
    }

    /// 和实体写入放在同一个事务里
    pub async fn update_last_processed_block(
        tx: &mut Transaction<'_, Postgres>,
        chain_id: i64,
        block_number: u64,
    ) -> Result<()> {
        sqlx::query(
            r#"
        INSERT INTO last_processed_blocks (chain_id, event_type, last_block_number)
        VALUES ($1, $2, $3)
        ON CONFLICT (chain_id, event_type)
        DO UPDATE SET
            last_block_number = $3,
            updated_at = NOW()
        "#,
        )
        .bind(chain_id)
        .bind(EVENT_TYPE_UNIFIED)
        .bind(block_number as i64)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn get_all_last_processed_blocks(pool: &PgPool) -> Result<Vec<ChainBlockStatus>> {
        let rows = sqlx::query(
            "SELECT chain_id, last_block_number, updated_at FROM last_processed_blocks WHERE event_type = $1 ORDER BY chain_id",
        )
        .bind(EVENT_TYPE_UNIFIED)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ChainBlockStatus {
                chain_id: safe_get_i64(row, "chain_id"),
                last_processed_block: safe_get_i64(row, "last_block_number"),
                updated_at: safe_get_datetime(row, "updated_at"),
            })
            .collect())
    }
}
