pub mod chain_handlers;
pub mod status_handlers;

pub use chain_handlers::*;
pub use status_handlers::*;

use crate::types::{CandleQuery, CandleResolution, DayDataQuery};
use crate::utils::{address_id, parse_address};
use axum::http::StatusCode;

pub const DEFAULT_CANDLE_RESOLUTION: i64 = 60;
pub const DEFAULT_CANDLE_LIMIT: i64 = 100;
pub const DEFAULT_DAY_DATA_LIMIT: i64 = 30;

/// 路径中的地址统一成小写 0x 形式，非法地址返回 400
pub fn normalize_address(raw: &str) -> Result<String, StatusCode> {
    parse_address(raw)
        .map(|address| address_id(&address))
        .ok_or(StatusCode::BAD_REQUEST)
}

pub fn resolve_candle_query(query: &CandleQuery) -> Result<(CandleResolution, i64), StatusCode> {
    let resolution = CandleResolution::from_minutes(query.resolution.unwrap_or(DEFAULT_CANDLE_RESOLUTION))
        .ok_or(StatusCode::BAD_REQUEST)?;
    let limit = query.limit.unwrap_or(DEFAULT_CANDLE_LIMIT);
    if limit <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok((resolution, limit))
}

pub fn resolve_day_limit(query: &DayDataQuery) -> Result<i64, StatusCode> {
    match query.limit.unwrap_or(DEFAULT_DAY_DATA_LIMIT) {
        limit if limit > 0 => Ok(limit),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        let normalized = normalize_address("0xC02AAA39B223FE8D0A0E5C4F27EAD9083C756CC2").unwrap();
        assert_eq!(normalized, "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
        assert_eq!(normalize_address("weth"), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_candle_query_defaults_and_validation() {
        let query = CandleQuery { resolution: None, limit: None, before: None };
        assert_eq!(resolve_candle_query(&query), Ok((CandleResolution::OneHour, DEFAULT_CANDLE_LIMIT)));

        let query = CandleQuery { resolution: Some(15), limit: None, before: None };
        assert_eq!(resolve_candle_query(&query), Err(StatusCode::BAD_REQUEST));

        let query = CandleQuery { resolution: Some(1440), limit: Some(0), before: None };
        assert_eq!(resolve_candle_query(&query), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_day_limit_defaults_and_validation() {
        let query = DayDataQuery { limit: None, before: None };
        assert_eq!(resolve_day_limit(&query), Ok(DEFAULT_DAY_DATA_LIMIT));
        let query = DayDataQuery { limit: Some(7), before: Some(86_400) };
        assert_eq!(resolve_day_limit(&query), Ok(7));
        let query = DayDataQuery { limit: Some(-1), before: None };
        assert_eq!(resolve_day_limit(&query), Err(StatusCode::BAD_REQUEST));
    }
}
