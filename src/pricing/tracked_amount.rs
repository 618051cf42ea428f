//! 受白名单约束的统计金额
//!
//! LP 少于 5 个的交易对需要满足最小 USD 流动性才计入成交量，流动性统计不设门槛。

use rust_decimal::Decimal;

use super::WhitelistMatch;
use crate::config::PricingConfig;
use crate::types::{Pool, Token};
use crate::utils::{safe_add, safe_div, safe_mul};

/// 低于该 LP 数量的交易对需要通过流动性门槛
const MIN_LIQUIDITY_PROVIDERS: i64 = 5;

pub struct TrackedAmountCalculator<'a> {
    config: &'a PricingConfig,
}

impl<'a> TrackedAmountCalculator<'a> {
    pub fn new(config: &'a PricingConfig) -> Self {
        Self { config }
    }

    /// 计入统计的成交额 (USD)
    pub fn tracked_volume_usd(
        &self,
        pool: &Pool,
        amount0: Decimal,
        token0: &Token,
        amount1: Decimal,
        token1: &Token,
        eth_price: Decimal,
    ) -> Decimal {
        if self.config.is_untracked_pair(&pool.id) {
            return Decimal::ZERO;
        }

        let price0 = safe_mul(token0.derived_eth, eth_price);
        let price1 = safe_mul(token1.derived_eth, eth_price);
        let whitelist = WhitelistMatch::classify(self.config, &token0.id, &token1.id);

        if pool.liquidity_provider_count < MIN_LIQUIDITY_PROVIDERS {
            let reserve0_usd = safe_mul(pool.reserve0, price0);
            let reserve1_usd = safe_mul(pool.reserve1, price1);
            let threshold = self.config.minimum_usd_threshold_new_pairs;
            let two = Decimal::TWO;

            let below = match whitelist {
                WhitelistMatch::Both => safe_add(reserve0_usd, reserve1_usd) < threshold,
                WhitelistMatch::Token0Only => safe_mul(reserve0_usd, two) < threshold,
                WhitelistMatch::Token1Only => safe_mul(reserve1_usd, two) < threshold,
                WhitelistMatch::Neither => false,
            };
            if below {
                return Decimal::ZERO;
            }
        }

        match whitelist {
            WhitelistMatch::Both => {
                safe_div(safe_add(safe_mul(amount0, price0), safe_mul(amount1, price1)), Decimal::TWO)
            }
            WhitelistMatch::Token0Only => safe_mul(amount0, price0),
            WhitelistMatch::Token1Only => safe_mul(amount1, price1),
            WhitelistMatch::Neither => Decimal::ZERO,
        }
    }

    /// 计入统计的流动性 (USD)，只有一侧在白名单时按两倍计算
    pub fn tracked_liquidity_usd(
        &self,
        pool_id: &str,
        amount0: Decimal,
        token0: &Token,
        amount1: Decimal,
        token1: &Token,
        eth_price: Decimal,
    ) -> Decimal {
        if self.config.is_untracked_pair(pool_id) {
            return Decimal::ZERO;
        }

        let price0 = safe_mul(token0.derived_eth, eth_price);
        let price1 = safe_mul(token1.derived_eth, eth_price);

        match WhitelistMatch::classify(self.config, &token0.id, &token1.id) {
            WhitelistMatch::Both => safe_add(safe_mul(amount0, price0), safe_mul(amount1, price1)),
            WhitelistMatch::Token0Only => safe_mul(safe_mul(amount0, price0), Decimal::TWO),
            WhitelistMatch::Token1Only => safe_mul(safe_mul(amount1, price1), Decimal::TWO),
            WhitelistMatch::Neither => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenInfo;
    use std::str::FromStr;

    const WETH: &str = "0x00000000000000000000000000000000000000e0";
    const USDC: &str = "0x00000000000000000000000000000000000000c0";
    const FOO: &str = "0x00000000000000000000000000000000000000f0";
    const BAR: &str = "0x00000000000000000000000000000000000000b0";

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn config() -> PricingConfig {
        let mut config = PricingConfig::ethereum();
        config.wrapped_native = WETH.into();
        config.whitelist = vec![WETH.into(), USDC.into()];
        config.minimum_usd_threshold_new_pairs = dec("400000");
        config.untracked_pairs = vec!["0xrebase".into()];
        config
    }

    fn token(id: &str, derived_eth: &str) -> Token {
        let mut token = Token::new(
            id.into(),
            TokenInfo { symbol: "T".into(), name: "T".into(), decimals: 18, total_supply: Decimal::ZERO },
        );
        token.derived_eth = dec(derived_eth);
        token
    }

    fn pool(token0: &str, token1: &str, reserve0: &str, reserve1: &str, providers: i64) -> Pool {
        let mut pool = Pool::new("0xpool".into(), token0.into(), token1.into(), 0, 0);
        pool.reserve0 = dec(reserve0);
        pool.reserve1 = dec(reserve1);
        pool.liquidity_provider_count = providers;
        pool
    }

    #[test]
    fn test_thin_new_pool_is_gated() {
        // 只有 WETH 在白名单: reserve1 10 WETH × 2000 × 2 = 40000 < 400000
        let config = config();
        let calc = TrackedAmountCalculator::new(&config);
        let foo = token(FOO, "0.01");
        let weth = token(WETH, "1");
        let thin = pool(FOO, WETH, "1000", "10", 1);
        let eth = dec("2000");
        assert_eq!(calc.tracked_volume_usd(&thin, dec("100"), &foo, dec("1"), &weth, eth), Decimal::ZERO);

        // LP 达到 5 个后不再受门槛限制
        let mature = pool(FOO, WETH, "1000", "10", 5);
        assert_eq!(calc.tracked_volume_usd(&mature, dec("100"), &foo, dec("1"), &weth, eth), dec("2000"));
    }

    #[test]
    fn test_gate_threshold_is_strict_less_than() {
        // 100 WETH × 2000 × 2 = 400000, 恰好等于门槛时计入
        let config = config();
        let calc = TrackedAmountCalculator::new(&config);
        let foo = token(FOO, "0.01");
        let weth = token(WETH, "1");
        let deep = pool(FOO, WETH, "10000", "100", 0);
        assert_eq!(
            calc.tracked_volume_usd(&deep, dec("100"), &foo, dec("1"), &weth, dec("2000")),
            dec("2000")
        );
    }

    #[test]
    fn test_both_whitelisted_averages() {
        let config = config();
        let calc = TrackedAmountCalculator::new(&config);
        let usdc = token(USDC, "0.0005");
        let weth = token(WETH, "1");
        let deep = pool(USDC, WETH, "1000000", "500", 10);
        // (2000 × 1 + 1 × 2000) / 2
        let volume = calc.tracked_volume_usd(&deep, dec("2000"), &usdc, dec("1"), &weth, dec("2000"));
        assert_eq!(volume, dec("2000"));

        let liquidity = calc.tracked_liquidity_usd("0xpool", dec("1000000"), &usdc, dec("500"), &weth, dec("2000"));
        assert_eq!(liquidity, dec("2000000"));
    }

    #[test]
    fn test_two_stablecoin_pool_with_six_providers() {
        const DAI: &str = "0x00000000000000000000000000000000000000d0";
        let mut config = config();
        config.whitelist.push(DAI.into());
        let calc = TrackedAmountCalculator::new(&config);
        let usdc = token(USDC, "0.0005");
        let dai = token(DAI, "0.0005");
        let eth = dec("2000");

        // 两侧单价都是 1 USD: (100 × 1 + 99 × 1) / 2
        let stable = pool(USDC, DAI, "1000000", "1000000", 6);
        assert_eq!(calc.tracked_volume_usd(&stable, dec("100"), &usdc, dec("99"), &dai, eth), dec("99.5"));

        // 储备合计 200000 USD 低于门槛：6 个 LP 不受限制，4 个 LP 被过滤
        let thin = pool(USDC, DAI, "100000", "100000", 6);
        assert_eq!(calc.tracked_volume_usd(&thin, dec("100"), &usdc, dec("99"), &dai, eth), dec("99.5"));
        let gated = pool(USDC, DAI, "100000", "100000", 4);
        assert_eq!(calc.tracked_volume_usd(&gated, dec("100"), &usdc, dec("99"), &dai, eth), Decimal::ZERO);
    }

    #[test]
    fn test_neither_whitelisted_is_ungated_zero() {
        let config = config();
        let calc = TrackedAmountCalculator::new(&config);
        let foo = token(FOO, "1");
        let bar = token(BAR, "1");
        let p = pool(FOO, BAR, "1", "1", 0);
        assert_eq!(calc.tracked_volume_usd(&p, dec("10"), &foo, dec("10"), &bar, dec("2000")), Decimal::ZERO);
        assert_eq!(calc.tracked_liquidity_usd("0xpool", dec("10"), &foo, dec("10"), &bar, dec("2000")), Decimal::ZERO);
    }

    #[test]
    fn test_single_side_liquidity_is_doubled() {
        let config = config();
        let calc = TrackedAmountCalculator::new(&config);
        let usdc = token(USDC, "0.0005");
        let bar = token(BAR, "0");
        // 1000 USDC × 0.0005 × 2000 = 1000 USD, 乘2
        let liquidity = calc.tracked_liquidity_usd("0xpool", dec("1000"), &usdc, dec("50"), &bar, dec("2000"));
        assert_eq!(liquidity, dec("2000"));
    }

    #[test]
    fn test_untracked_pairs_contribute_nothing() {
        let config = config();
        let calc = TrackedAmountCalculator::new(&config);
        let usdc = token(USDC, "0.0005");
        let weth = token(WETH, "1");
        let mut rebasing = pool(USDC, WETH, "1000000", "500", 10);
        rebasing.id = "0xrebase".into();
        assert_eq!(calc.tracked_volume_usd(&rebasing, dec("2000"), &usdc, dec("1"), &weth, dec("2000")), Decimal::ZERO);
        assert_eq!(calc.tracked_liquidity_usd("0xrebase", dec("1"), &usdc, dec("1"), &weth, dec("2000")), Decimal::ZERO);
    }
}
