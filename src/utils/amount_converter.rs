//! 金额转换工具
//!
//! 链上原始整数金额 (U256) 按代币精度换算为 Decimal

use ethers::types::U256;
use rust_decimal::Decimal;

/// Decimal 尾数最多容纳 28 位十进制数字
const MAX_MANTISSA_DIGITS: usize = 28;
const MAX_SCALE: u32 = 28;

/// 金额转换工具
pub struct AmountConverter;

impl AmountConverter {
    /// 将原始金额转换为实际金额（考虑精度）
    ///
    /// 超出 Decimal 精度的低位数字会被截断，整体超出范围时饱和到 `Decimal::MAX`。
    /// `decimals == 0` 时返回原始数值。
    pub fn convert_token_to_decimal(raw_amount: U256, decimals: u32) -> Decimal {
        if raw_amount.is_zero() {
            return Decimal::ZERO;
        }

        // value = mantissa * 10^exponent
        let mut mantissa = raw_amount.to_string();
        let mut exponent = -(decimals as i64);
        while mantissa.len() > MAX_MANTISSA_DIGITS {
            mantissa.pop();
            exponent += 1;
        }

        let mut mantissa: i128 = match mantissa.parse() {
            Ok(value) => value,
            Err(_) => return Decimal::ZERO,
        };

        if exponent >= 0 {
            let mut value = Decimal::from_i128_with_scale(mantissa, 0);
            for _ in 0..exponent {
                value = match value.checked_mul(Decimal::TEN) {
                    Some(next) => next,
                    None => return Decimal::MAX,
                };
            }
            return value;
        }

        let mut scale = (-exponent) as u32;
        while scale > MAX_SCALE {
            mantissa /= 10;
            scale -= 1;
        }
        Decimal::try_from_i128_with_scale(mantissa, scale).unwrap_or(Decimal::ZERO)
    }

    /// 精度字段为负数或缺省时按 0 处理
    pub fn convert_with_decimals(raw_amount: U256, decimals: i32) -> Decimal {
        Self::convert_token_to_decimal(raw_amount, decimals.max(0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_convert_with_token_decimals() {
        let one_eth = U256::exp10(18);
        assert_eq!(AmountConverter::convert_token_to_decimal(one_eth, 18), Decimal::ONE);

        let usdc = U256::from(1_234_567u64);
        assert_eq!(
            AmountConverter::convert_token_to_decimal(usdc, 6),
            Decimal::from_str("1.234567").unwrap()
        );
    }

    #[test]
    fn test_zero_decimals_returns_raw_value() {
        let raw = U256::from(42u64);
        assert_eq!(AmountConverter::convert_token_to_decimal(raw, 0), Decimal::from(42));
        assert_eq!(AmountConverter::convert_with_decimals(raw, -3), Decimal::from(42));
    }

    #[test]
    fn test_large_amounts_are_truncated_not_panicking() {
        // 10^40 wei, 18 位精度 => 10^22
        let raw = U256::exp10(40);
        let expected = Decimal::from_str("10000000000000000000000").unwrap();
        assert_eq!(AmountConverter::convert_token_to_decimal(raw, 18), expected);

        // 超过 Decimal 上限时饱和
        assert_eq!(AmountConverter::convert_token_to_decimal(U256::MAX, 0), Decimal::MAX);
    }

    #[test]
    fn test_tiny_amounts_with_high_decimals() {
        let raw = U256::from(1u64);
        assert_eq!(AmountConverter::convert_token_to_decimal(raw, 30), Decimal::ZERO);
        assert_eq!(
            AmountConverter::convert_token_to_decimal(raw, 18),
            Decimal::from_str("0.000000000000000001").unwrap()
        );
    }
}
