//! 交易分析工具
//!
//! 根据白名单一侧的资金流向判断买卖方向

use rust_decimal::Decimal;

/// 交易类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

/// 交易分析工具
pub struct TradeAnalyzer;

impl TradeAnalyzer {
    /// 判断一笔 swap 的买卖方向
    ///
    /// 只有 token0 在白名单时，付入 token0 即为买入；其余情况看 token1 是否付入。
    pub fn classify(
        token0_whitelisted: bool,
        token1_whitelisted: bool,
        amount0_in: Decimal,
        amount1_in: Decimal,
    ) -> TradeType {
        let is_buy = if token0_whitelisted && !token1_whitelisted {
            amount0_in > Decimal::ZERO
        } else {
            amount1_in > Decimal::ZERO
        };

        if is_buy {
            TradeType::Buy
        } else {
            TradeType::Sell
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_token0_paid_in_is_buy() {
        let t = TradeAnalyzer::classify(true, false, Decimal::from(100), Decimal::ZERO);
        assert_eq!(t, TradeType::Buy);
        let t = TradeAnalyzer::classify(true, false, Decimal::ZERO, Decimal::from(5));
        assert_eq!(t, TradeType::Sell);
    }

    #[test]
    fn test_other_cases_follow_token1_inflow() {
        for (w0, w1) in [(false, true), (true, true), (false, false)] {
            assert_eq!(
                TradeAnalyzer::classify(w0, w1, Decimal::ZERO, Decimal::ONE),
                TradeType::Buy
            );
            assert_eq!(
                TradeAnalyzer::classify(w0, w1, Decimal::ONE, Decimal::ZERO),
                TradeType::Sell
            );
        }
    }
}
