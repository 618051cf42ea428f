//! 通用工具函数
//!
//! 金额换算、交易方向判断和受保护的 Decimal 运算

pub mod amount_converter;
pub mod trade_analyzer;

pub use amount_converter::AmountConverter;
pub use trade_analyzer::{TradeAnalyzer, TradeType};

use ethers::types::Address;
use rust_decimal::Decimal;

/// 统一的地址 id 格式：小写 0x 十六进制
pub fn address_id(address: &Address) -> String {
    format!("{:?}", address)
}

/// 解析配置中的地址字符串，大小写不敏感
pub fn parse_address(value: &str) -> Option<Address> {
    value.trim().to_lowercase().parse::<Address>().ok()
}

/// 除数为零或溢出时返回0
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// 溢出时返回0
pub fn safe_mul(left: Decimal, right: Decimal) -> Decimal {
    left.checked_mul(right).unwrap_or(Decimal::ZERO)
}

/// 累加用，溢出时停在 `Decimal::MAX` / `Decimal::MIN`
pub fn safe_add(left: Decimal, right: Decimal) -> Decimal {
    left.saturating_add(right)
}

pub fn safe_sub(left: Decimal, right: Decimal) -> Decimal {
    left.saturating_sub(right)
}
