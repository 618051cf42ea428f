use anyhow::Result;
use sqlx::PgPool;

pub struct SystemOperations;

impl SystemOperations {
    pub async fn create_tables(pool: &PgPool) -> Result<()> {
        // Create tokens table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                chain_id BIGINT NOT NULL,
                id VARCHAR(42) NOT NULL,
                symbol TEXT NOT NULL,
                name TEXT NOT NULL,
                decimals INTEGER NOT NULL,
                total_supply NUMERIC NOT NULL DEFAULT 0,
                derived_eth NUMERIC NOT NULL DEFAULT 0,
                trade_volume NUMERIC NOT NULL DEFAULT 0,
                trade_volume_usd NUMERIC NOT NULL DEFAULT 0,
                untracked_volume_usd NUMERIC NOT NULL DEFAULT 0,
                total_liquidity NUMERIC NOT NULL DEFAULT 0,
                tx_count BIGINT NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (chain_id, id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Create pools table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pools (
                chain_id BIGINT NOT NULL,
                id VARCHAR(42) NOT NULL,
                token0 VARCHAR(42) NOT NULL,
                token1 VARCHAR(42) NOT NULL,
                reserve0 NUMERIC NOT NULL DEFAULT 0,
                reserve1 NUMERIC NOT NULL DEFAULT 0,
                total_supply NUMERIC NOT NULL DEFAULT 0,
                reserve_eth NUMERIC NOT NULL DEFAULT 0,
                reserve_usd NUMERIC NOT NULL DEFAULT 0,
                tracked_reserve_eth NUMERIC NOT NULL DEFAULT 0,
                token0_price NUMERIC NOT NULL DEFAULT 0,
                token1_price NUMERIC NOT NULL DEFAULT 0,
                price_usd NUMERIC NOT NULL DEFAULT 0,
                volume_token0 NUMERIC NOT NULL DEFAULT 0,
                volume_token1 NUMERIC NOT NULL DEFAULT 0,
                volume_usd NUMERIC NOT NULL DEFAULT 0,
                untracked_volume_usd NUMERIC NOT NULL DEFAULT 0,
                tx_count BIGINT NOT NULL DEFAULT 0,
                liquidity_provider_count BIGINT NOT NULL DEFAULT 0,
                buy_txs BIGINT NOT NULL DEFAULT 0,
                sell_txs BIGINT NOT NULL DEFAULT 0,
                buy_volume_usd NUMERIC NOT NULL DEFAULT 0,
                sell_volume_usd NUMERIC NOT NULL DEFAULT 0,
                initial_reserve0 NUMERIC NOT NULL DEFAULT 0,
                initial_reserve1 NUMERIC NOT NULL DEFAULT 0,
                initial_reserve NUMERIC NOT NULL DEFAULT 0,
                fdv NUMERIC NOT NULL DEFAULT 0,
                token_total_supply NUMERIC NOT NULL DEFAULT 0,
                created_at_timestamp BIGINT NOT NULL,
                created_at_block_number BIGINT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (chain_id, id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Create candles table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candles (
                chain_id BIGINT NOT NULL,
                id TEXT NOT NULL,
                pool_address VARCHAR(42) NOT NULL,
                resolution_minutes BIGINT NOT NULL,
                bucket_id BIGINT NOT NULL,
                start_unix BIGINT NOT NULL,
                token0 VARCHAR(42) NOT NULL,
                token1 VARCHAR(42) NOT NULL,
                open NUMERIC NOT NULL,
                high NUMERIC NOT NULL,
                low NUMERIC NOT NULL,
                close NUMERIC NOT NULL,
                price_usd NUMERIC NOT NULL,
                base_price_usd NUMERIC NOT NULL,
                price_change NUMERIC NOT NULL DEFAULT 0,
                volume_token0 NUMERIC NOT NULL DEFAULT 0,
                volume_token1 NUMERIC NOT NULL DEFAULT 0,
                volume_usd NUMERIC NOT NULL DEFAULT 0,
                volume_change NUMERIC NOT NULL DEFAULT 0,
                txns BIGINT NOT NULL DEFAULT 0,
                swap_txns BIGINT NOT NULL DEFAULT 0,
                buy_txs BIGINT NOT NULL DEFAULT 0,
                sell_txs BIGINT NOT NULL DEFAULT 0,
                buy_volume_usd NUMERIC NOT NULL DEFAULT 0,
                sell_volume_usd NUMERIC NOT NULL DEFAULT 0,
                total_supply NUMERIC NOT NULL DEFAULT 0,
                reserve0 NUMERIC NOT NULL DEFAULT 0,
                reserve1 NUMERIC NOT NULL DEFAULT 0,
                reserve_usd NUMERIC NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (chain_id, pool_address, resolution_minutes, bucket_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Create bundles / factories tables (每条链一行)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bundles (
                chain_id BIGINT PRIMARY KEY,
                eth_price NUMERIC NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS factories (
                chain_id BIGINT PRIMARY KEY,
                pair_count BIGINT NOT NULL DEFAULT 0,
                tx_count BIGINT NOT NULL DEFAULT 0,
                total_volume_usd NUMERIC NOT NULL DEFAULT 0,
                total_volume_eth NUMERIC NOT NULL DEFAULT 0,
                untracked_volume_usd NUMERIC NOT NULL DEFAULT 0,
                total_liquidity_usd NUMERIC NOT NULL DEFAULT 0,
                total_liquidity_eth NUMERIC NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Create token_day_data / factory_day_data tables
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS token_day_data (
                chain_id BIGINT NOT NULL,
                id TEXT NOT NULL,
                token_address VARCHAR(42) NOT NULL,
                day_id BIGINT NOT NULL,
                date BIGINT NOT NULL,
                price_usd NUMERIC NOT NULL DEFAULT 0,
                daily_volume_token NUMERIC NOT NULL DEFAULT 0,
                daily_volume_eth NUMERIC NOT NULL DEFAULT 0,
                daily_volume_usd NUMERIC NOT NULL DEFAULT 0,
                daily_txns BIGINT NOT NULL DEFAULT 0,
                total_liquidity_token NUMERIC NOT NULL DEFAULT 0,
                total_liquidity_eth NUMERIC NOT NULL DEFAULT 0,
                total_liquidity_usd NUMERIC NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (chain_id, token_address, day_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS factory_day_data (
                chain_id BIGINT NOT NULL,
                day_id BIGINT NOT NULL,
                date BIGINT NOT NULL,
                daily_volume_usd NUMERIC NOT NULL DEFAULT 0,
                daily_volume_eth NUMERIC NOT NULL DEFAULT 0,
                daily_volume_untracked NUMERIC NOT NULL DEFAULT 0,
                total_volume_usd NUMERIC NOT NULL DEFAULT 0,
                total_volume_eth NUMERIC NOT NULL DEFAULT 0,
                total_liquidity_usd NUMERIC NOT NULL DEFAULT 0,
                total_liquidity_eth NUMERIC NOT NULL DEFAULT 0,
                tx_count BIGINT NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (chain_id, day_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Create liquidity_positions table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS liquidity_positions (
                chain_id BIGINT NOT NULL,
                id TEXT NOT NULL,
                pool_address VARCHAR(42) NOT NULL,
                user_address VARCHAR(42) NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (chain_id, id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Create last_processed_blocks table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS last_processed_blocks (
                chain_id BIGINT NOT NULL,
                event_type VARCHAR(50) NOT NULL,
                last_block_number BIGINT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (chain_id, event_type)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Self::create_indexes(pool).await?;
        Ok(())
    }

    pub async fn create_indexes(pool: &PgPool) -> Result<(), sqlx::Error> {
        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_pools_tokens ON pools(chain_id, token0, token1)",
            "CREATE INDEX IF NOT EXISTS idx_candles_latest ON candles(chain_id, pool_address, resolution_minutes, bucket_id DESC)",
            "CREATE INDEX IF NOT EXISTS idx_positions_pool ON liquidity_positions(chain_id, pool_address)",
        ];
        for index_sql in indexes {
            sqlx::query(index_sql).execute(pool).await?;
        }
        Ok(())
    }

    pub async fn health_check(pool: &PgPool) -> Result<bool, sqlx::Error> {
        sqlx::query("SELECT 1 as health_check")
            .fetch_one(pool)
            .await?;
        Ok(true)
    }
}
