//! 数据库工具函数
//!
//! 行字段安全读取和通用 SQL 拼装

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::Row;

pub fn safe_get_string(row: &PgRow, column: &str) -> String {
    row.try_get::<String, _>(column)
        .unwrap_or_else(|_| "".to_string())
}

pub fn safe_get_i32(row: &PgRow, column: &str) -> i32 {
    row.try_get::<i32, _>(column).unwrap_or(0)
}

pub fn safe_get_i64(row: &PgRow, column: &str) -> i64 {
    row.try_get::<i64, _>(column).unwrap_or(0)
}

pub fn safe_get_decimal(row: &PgRow, column: &str) -> Decimal {
    row.try_get::<Decimal, _>(column)
        .unwrap_or_else(|_| Decimal::ZERO)
}

pub fn safe_get_datetime(row: &PgRow, column: &str) -> DateTime<Utc> {
    row.try_get::<DateTime<Utc>, _>(column)
        .unwrap_or_else(|_| Utc::now())
}

/// INSERT ... ON CONFLICT DO UPDATE，除冲突键外的列全部覆盖
pub fn upsert_sql(table: &str, columns: &[&str], conflict: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !conflict.contains(c))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();

    let on_conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}, updated_at = NOW()", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        table,
        columns.join(", "),
        placeholders.join(", "),
        conflict.join(", "),
        on_conflict
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_layout() {
        let sql = upsert_sql("bundles", &["chain_id", "eth_price"], &["chain_id"]);
        assert_eq!(
            sql,
            "INSERT INTO bundles (chain_id, eth_price) VALUES ($1, $2) ON CONFLICT (chain_id) \
             DO UPDATE SET eth_price = EXCLUDED.eth_price, updated_at = NOW()"
        );

        let sql = upsert_sql("liquidity_positions", &["chain_id", "id"], &["chain_id", "id"]);
        assert!(sql.ends_with("ON CONFLICT (chain_id, id) DO NOTHING"));
    }
}
