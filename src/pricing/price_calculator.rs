//! 交易对价格计算
//!
//! 以白名单一侧作为报价资产，计算另一侧每单位的 USD 价格。

use rust_decimal::Decimal;

use super::{PricedSide, WhitelistMatch};
use crate::config::PricingConfig;
use crate::utils::{safe_div, safe_mul};

pub struct PoolPriceCalculator<'a> {
    config: &'a PricingConfig,
}

impl<'a> PoolPriceCalculator<'a> {
    pub fn new(config: &'a PricingConfig) -> Self {
        Self { config }
    }

    /// 被定价的一侧；两侧都不在白名单时返回 None
    pub fn priced_side(&self, token0: &str, token1: &str) -> Option<PricedSide> {
        match WhitelistMatch::classify(self.config, token0, token1) {
            WhitelistMatch::Both | WhitelistMatch::Token1Only => Some(PricedSide::Token0),
            WhitelistMatch::Token0Only => Some(PricedSide::Token1),
            WhitelistMatch::Neither => None,
        }
    }

    /// 交易对价格 (USD)
    ///
    /// 报价资产是 wrapped native 时乘以参考资产价格，否则视报价资产为 1 USD。
    pub fn pool_price_usd(
        &self,
        token0: &str,
        token1: &str,
        reserve0: Decimal,
        reserve1: Decimal,
        eth_price: Decimal,
    ) -> Decimal {
        if reserve0.is_zero() || reserve1.is_zero() {
            return Decimal::ZERO;
        }

        let (ratio, quote_token) = match self.priced_side(token0, token1) {
            Some(PricedSide::Token0) => (safe_div(reserve1, reserve0), token1),
            Some(PricedSide::Token1) => (safe_div(reserve0, reserve1), token0),
            None => return Decimal::ZERO,
        };

        if self.config.is_wrapped_native(quote_token) {
            safe_mul(ratio, eth_price)
        } else {
            ratio
        }
    }

    /// 被定价代币的总供应量
    pub fn priced_token_total_supply(
        &self,
        token0: &str,
        token1: &str,
        token0_supply: Decimal,
        token1_supply: Decimal,
    ) -> Decimal {
        match self.priced_side(token0, token1) {
            Some(PricedSide::Token0) => token0_supply,
            Some(PricedSide::Token1) => token1_supply,
            None => Decimal::ZERO,
        }
    }

    /// 完全稀释估值 = 被定价代币总供应量 × 价格
    pub fn fdv(&self, priced_supply: Decimal, price_usd: Decimal) -> Decimal {
        if price_usd.is_zero() {
            return Decimal::ZERO;
        }
        safe_mul(priced_supply, price_usd)
    }

    /// 报价资产一侧的初始储备
    pub fn initial_reserve(
        &self,
        token0: &str,
        token1: &str,
        initial_reserve0: Decimal,
        initial_reserve1: Decimal,
    ) -> Decimal {
        match self.priced_side(token0, token1) {
            Some(PricedSide::Token0) => initial_reserve1,
            Some(PricedSide::Token1) => initial_reserve0,
            None => Decimal::ZERO,
        }
    }
}
