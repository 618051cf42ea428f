//! 参考价格解析
//!
//! 按白名单顺序查找与目标代币直接配对、且流动性足够的交易对，单跳推导 derived_eth。

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::PricingConfig;
use crate::engine::chain::ChainReader;
use crate::engine::store::EntityStore;
use crate::types::Token;
use crate::utils::{address_id, parse_address, safe_mul};

pub struct ReferencePriceResolver<'a, C: ChainReader + ?Sized> {
    config: &'a PricingConfig,
    chain: &'a C,
}

impl<'a, C: ChainReader + ?Sized> ReferencePriceResolver<'a, C> {
    pub fn new(config: &'a PricingConfig, chain: &'a C) -> Self {
        Self { config, chain }
    }

    /// 每个代币折合多少参考资产
    ///
    /// wrapped native 本身为1；getPair 调用失败时整个代币直接返回0，不再尝试后面的白名单。
    pub fn find_eth_per_token<S: EntityStore + ?Sized>(&self, store: &S, token: &Token) -> Decimal {
        if self.config.is_wrapped_native(&token.id) {
            return Decimal::ONE;
        }

        let Some(token_address) = parse_address(&token.id) else {
            warn!("⚠️ 无效的代币地址: {}", token.id);
            return Decimal::ZERO;
        };

        for quote in &self.config.whitelist {
            let Some(quote_address) = parse_address(quote) else {
                continue;
            };

            let pool_address = match self.chain.query_pool_existence(token_address, quote_address) {
                Ok(address) => address,
                Err(e) => {
                    warn!("⚠️ getPair({}, {}) 失败，参考价格置0: {}", token.id, quote, e);
                    return Decimal::ZERO;
                }
            };
            if pool_address.is_zero() {
                continue;
            }

            let pool_id = address_id(&pool_address);
            let Some(pool) = store.load_pool(&pool_id) else {
                debug!("交易对 {} 尚未索引，跳过", pool_id);
                continue;
            };
            if pool.reserve_eth <= self.config.minimum_liquidity_threshold_eth {
                continue;
            }

            let (rate, other_id) = if pool.token0 == token.id {
                (pool.token1_price, &pool.token1)
            } else if pool.token1 == token.id {
                (pool.token0_price, &pool.token0)
            } else {
                continue;
            };

            match store.load_token(other_id) {
                Some(other) => return safe_mul(rate, other.derived_eth),
                None => {
                    warn!("⚠️ 交易对 {} 的代币 {} 不存在", pool_id, other_id);
                    continue;
                }
            }
        }

        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::chain::testing::StaticChain;
    use crate::engine::store::{ChangeSet, MemoryStore};
    use crate::types::{Pool, TokenInfo};
    use ethers::types::Address;
    use std::str::FromStr;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn token(n: u64, derived_eth: &str) -> Token {
        let mut token = Token::new(
            address_id(&addr(n)),
            TokenInfo { symbol: format!("T{}", n), name: format!("T{}", n), decimals: 18, total_supply: Decimal::ZERO },
        );
        token.derived_eth = Decimal::from_str(derived_eth).unwrap();
        token
    }

    fn pool(n: u64, token0: u64, token1: u64, token0_price: &str, token1_price: &str, reserve_eth: &str) -> Pool {
        let mut pool = Pool::new(address_id(&addr(n)), address_id(&addr(token0)), address_id(&addr(token1)), 0, 0);
        pool.token0_price = Decimal::from_str(token0_price).unwrap();
        pool.token1_price = Decimal::from_str(token1_price).unwrap();
        pool.reserve_eth = Decimal::from_str(reserve_eth).unwrap();
        pool
    }

    // 1 = WETH, 2 = USDC, 3 = DAI, 9 = 目标代币
    fn config() -> PricingConfig {
        let mut config = PricingConfig::ethereum();
        config.wrapped_native = address_id(&addr(1));
        config.whitelist = vec![address_id(&addr(1)), address_id(&addr(2)), address_id(&addr(3))];
        config.minimum_liquidity_threshold_eth = Decimal::from(2);
        config
    }

    fn store(pools: Vec<Pool>, tokens: Vec<Token>) -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::default();
        pools.into_iter().for_each(|p| changes.upsert_pool(p));
        tokens.into_iter().for_each(|t| changes.upsert_token(t));
        store.apply(changes);
        store
    }

    #[test]
    fn test_wrapped_native_is_one() {
        let config = config();
        let chain = StaticChain::default();
        let resolver = ReferencePriceResolver::new(&config, &chain);
        assert_eq!(resolver.find_eth_per_token(&MemoryStore::new(), &token(1, "0")), Decimal::ONE);
        assert!(chain.pair_queries.borrow().is_empty());
    }

    #[test]
    fn test_first_qualifying_whitelist_entry_wins() {
        let config = config();
        // token9/WETH 流动性不足, token9/USDC 合格, token9/DAI 也合格但排在后面
        let chain = StaticChain::default()
            .with_pair(addr(9), addr(1), addr(100))
            .with_pair(addr(9), addr(2), addr(200))
            .with_pair(addr(9), addr(3), addr(300));
        let store = store(
            vec![
                pool(100, 9, 1, "100", "0.01", "1"),
                pool(200, 2, 9, "4", "0.25", "10"),
                pool(300, 3, 9, "8", "0.125", "10"),
            ],
            vec![token(1, "1"), token(2, "0.0005"), token(3, "0.0004"), token(9, "0")],
        );

        let resolver = ReferencePriceResolver::new(&config, &chain);
        // token9 是 pool 200 的 token1: token0_price(4 USDC per token9) × 0.0005
        assert_eq!(resolver.find_eth_per_token(&store, &token(9, "0")), Decimal::from_str("0.002").unwrap());
        assert_eq!(chain.pair_queries.borrow().len(), 2);
    }

    #[test]
    fn test_reserve_eth_must_exceed_floor() {
        let config = config();
        let chain = StaticChain::default().with_pair(addr(9), addr(1), addr(100));
        let at_floor = store(vec![pool(100, 9, 1, "100", "0.01", "2")], vec![token(1, "1")]);
        let resolver = ReferencePriceResolver::new(&config, &chain);
        assert_eq!(resolver.find_eth_per_token(&at_floor, &token(9, "0")), Decimal::ZERO);

        let above = store(vec![pool(100, 9, 1, "100", "0.01", "2.0001")], vec![token(1, "1")]);
        assert_eq!(resolver.find_eth_per_token(&above, &token(9, "0")), Decimal::from_str("0.01").unwrap());
    }

    #[test]
    fn test_call_failure_short_circuits() {
        let config = config();
        let mut chain = StaticChain::default()
            .with_pair(addr(9), addr(2), addr(200));
        chain.failing_pair_queries.push((addr(9), addr(1)));
        let store = store(vec![pool(200, 2, 9, "4", "0.25", "10")], vec![token(2, "0.0005")]);

        let resolver = ReferencePriceResolver::new(&config, &chain);
        assert_eq!(resolver.find_eth_per_token(&store, &token(9, "0")), Decimal::ZERO);
        assert_eq!(chain.pair_queries.borrow().len(), 1);
    }

    #[test]
    fn test_unindexed_pool_is_skipped() {
        let config = config();
        let chain = StaticChain::default()
            .with_pair(addr(9), addr(1), addr(100))
            .with_pair(addr(9), addr(3), addr(300));
        let store = store(vec![pool(300, 3, 9, "8", "0.125", "10")], vec![token(3, "0.0004")]);

        let resolver = ReferencePriceResolver::new(&config, &chain);
        assert_eq!(resolver.find_eth_per_token(&store, &token(9, "0")), Decimal::from_str("0.0032").unwrap());
    }

    #[test]
    fn test_no_pools_is_zero() {
        let config = config();
        let chain = StaticChain::default();
        let resolver = ReferencePriceResolver::new(&config, &chain);
        assert_eq!(resolver.find_eth_per_token(&MemoryStore::new(), &token(9, "0")), Decimal::ZERO);
        assert_eq!(chain.pair_queries.borrow().len(), 3);
    }
}
