//! 价格推导
//!
//! 交易对 USD 价格、代币参考价格、参考资产 USD 价格以及受白名单约束的统计金额。

pub mod bundle;
pub mod price_calculator;
pub mod reference_resolver;
pub mod tracked_amount;

pub use bundle::eth_price_in_usd;
pub use price_calculator::PoolPriceCalculator;
pub use reference_resolver::ReferencePriceResolver;
pub use tracked_amount::TrackedAmountCalculator;

use crate::config::PricingConfig;

/// 交易对两侧代币的白名单命中情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistMatch {
    Both,
    Token0Only,
    Token1Only,
    Neither,
}

impl WhitelistMatch {
    pub fn classify(config: &PricingConfig, token0: &str, token1: &str) -> Self {
        match (config.is_whitelisted(token0), config.is_whitelisted(token1)) {
            (true, true) => WhitelistMatch::Both,
            (true, false) => WhitelistMatch::Token0Only,
            (false, true) => WhitelistMatch::Token1Only,
            (false, false) => WhitelistMatch::Neither,
        }
    }

    pub fn token0_whitelisted(self) -> bool {
        matches!(self, WhitelistMatch::Both | WhitelistMatch::Token0Only)
    }

    pub fn token1_whitelisted(self) -> bool {
        matches!(self, WhitelistMatch::Both | WhitelistMatch::Token1Only)
    }
}

/// 交易对中被定价的一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricedSide {
    Token0,
    Token1,
}
