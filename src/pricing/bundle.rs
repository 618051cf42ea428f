//! 参考资产 USD 价格
//!
//! 由已索引的稳定币交易对按原生资产储备加权得出。

use rust_decimal::Decimal;

use crate::config::PricingConfig;
use crate::engine::store::EntityStore;
use crate::utils::{safe_add, safe_div, safe_mul};

/// 参考资产的 USD 价格
///
/// 已索引的稳定币交易对按原生资产一侧储备加权平均；一个都没有或权重为零时返回0。
pub fn eth_price_in_usd<S: EntityStore + ?Sized>(config: &PricingConfig, store: &S) -> Decimal {
    let mut weighted = Decimal::ZERO;
    let mut total_weight = Decimal::ZERO;

    for stable in &config.stablecoin_pools {
        let Some(pool) = store.load_pool(&stable.address) else {
            continue;
        };
        let (stable_per_native, native_reserve) = if stable.native_is_token0 {
            (pool.token1_price, pool.reserve0)
        } else {
            (pool.token0_price, pool.reserve1)
        };
        weighted = safe_add(weighted, safe_mul(stable_per_native, native_reserve));
        total_weight = safe_add(total_weight, native_reserve);
    }

    safe_div(weighted, total_weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StablecoinPool;
    use crate::engine::store::{ChangeSet, MemoryStore};
    use crate::types::Pool;

    fn stable_pool(id: &str, token0_price: i64, token1_price: i64, reserve0: i64, reserve1: i64) -> Pool {
        let mut pool = Pool::new(id.into(), "0xt0".into(), "0xt1".into(), 0, 0);
        pool.token0_price = Decimal::from(token0_price);
        pool.token1_price = Decimal::from(token1_price);
        pool.reserve0 = Decimal::from(reserve0);
        pool.reserve1 = Decimal::from(reserve1);
        pool
    }

    fn config() -> PricingConfig {
        let mut config = PricingConfig::ethereum();
        config.stablecoin_pools = vec![
            StablecoinPool { address: "0xusdc".into(), native_is_token0: false },
            StablecoinPool { address: "0xusdt".into(), native_is_token0: true },
        ];
        config
    }

    #[test]
    fn test_no_stable_pools_is_zero() {
        assert_eq!(eth_price_in_usd(&config(), &MemoryStore::new()), Decimal::ZERO);
    }

    #[test]
    fn test_weighted_by_native_reserve() {
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::default();
        // USDC/WETH: 2000 USDC per WETH, 30 WETH
        changes.upsert_pool(stable_pool("0xusdc", 2000, 0, 60_000, 30));
        // WETH/USDT: 2100 USDT per WETH, 10 WETH
        changes.upsert_pool(stable_pool("0xusdt", 0, 2100, 10, 21_000));
        store.apply(changes);

        // (2000*30 + 2100*10) / 40 = 2025
        assert_eq!(eth_price_in_usd(&config(), &store), Decimal::from(2025));
    }

    #[test]
    fn test_single_pool_and_zero_weight() {
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::default();
        changes.upsert_pool(stable_pool("0xusdc", 1800, 0, 18_000, 10));
        store.apply(changes);
        assert_eq!(eth_price_in_usd(&config(), &store), Decimal::from(1800));

        let mut empty = MemoryStore::new();
        let mut changes = ChangeSet::default();
        changes.upsert_pool(stable_pool("0xusdc", 1800, 0, 0, 0));
        empty.apply(changes);
        assert_eq!(eth_price_in_usd(&config(), &empty), Decimal::ZERO);
    }
}
