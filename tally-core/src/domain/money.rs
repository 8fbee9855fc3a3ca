//! Wire-format helpers for amounts and dates
//!
//! The backend stores amounts in numeric columns and dates as `YYYY-MM-DD`.
//! Rows written by older clients may carry numeric strings or full ISO
//! timestamps, so both are accepted when reading.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value as JsonValue;

use super::result::{Error, Result};

/// Largest amount a draft may carry. Fits a `numeric(14,2)` column and
/// survives the JSON number round trip exactly.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Parse a user-entered amount ("12", "12.50", " 1200 ")
pub fn parse_amount(input: &str) -> Option<Decimal> {
    input.trim().parse::<Decimal>().ok()
}

/// Parse a form amount: positive, rounded to cents, at most [`MAX_AMOUNT`]
pub fn parse_positive_amount(input: &str) -> Result<Decimal> {
    let amount = parse_amount(input)
        .map(round_cents)
        .filter(|a| *a > Decimal::ZERO)
        .ok_or_else(|| Error::validation("Please enter a valid amount"))?;
    if amount > MAX_AMOUNT {
        return Err(Error::validation("Amount is too large"));
    }
    Ok(amount)
}

/// Parse a date that is either `YYYY-MM-DD` or an ISO timestamp
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let head = input.get(..10).unwrap_or(input);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Serde adapter: Decimal <-> JSON number (numeric strings accepted on read)
pub mod amount {
    use super::*;

    /// A JSON number when `f64` holds the value exactly, otherwise the
    /// decimal text
    pub fn serialize<S>(value: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.to_f64() {
            Some(f) if f.to_string().parse::<Decimal>().ok() == Some(*value) => {
                serializer.serialize_f64(f)
            }
            _ => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let value: JsonValue = Deserialize::deserialize(deserializer)?;
        match value {
            JsonValue::Number(n) => n
                .to_string()
                .parse::<Decimal>()
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain))
                .ok_or_else(|| D::Error::custom(format!("invalid amount: {}", n))),
            JsonValue::String(s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|e| D::Error::custom(format!("invalid amount: {}", e))),
            _ => Err(D::Error::custom("expected number or string for amount")),
        }
    }
}

/// Serde adapter: calendar date written as `YYYY-MM-DD`, timestamps accepted on read
pub mod date {
    use super::*;

    pub fn serialize<S>(value: &NaiveDate, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        parse_date(&s).ok_or_else(|| D::Error::custom(format!("invalid date: {}", s)))
    }
}

/// Round a decimal amount to two places for display and totals
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Row {
        #[serde(with = "amount")]
        amount: Decimal,
        #[serde(with = "date")]
        date: NaiveDate,
    }

    #[test]
    fn test_amount_accepts_number_and_string() {
        let a: Row = serde_json::from_str(r#"{"amount": 85000, "date": "2025-01-15"}"#).unwrap();
        assert_eq!(a.amount, Decimal::new(85000, 0));

        let b: Row = serde_json::from_str(r#"{"amount": "12.50", "date": "2025-01-15"}"#).unwrap();
        assert_eq!(b.amount, Decimal::new(1250, 2));
    }

    #[test]
    fn test_amount_rejects_garbage() {
        let r: std::result::Result<Row, _> = serde_json::from_str(r#"{"amount": true, "date": "2025-01-15"}"#);
        assert!(r.is_err());
    }

    #[test]
    fn test_date_accepts_timestamp() {
        let row: Row =
            serde_json::from_str(r#"{"amount": 1, "date": "2025-03-04T10:20:30.000Z"}"#).unwrap();
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
    }

    #[test]
    fn test_amount_serializes_as_number() {
        let row = Row {
            amount: Decimal::new(3200, 0),
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["amount"], serde_json::json!(3200.0));
        assert_eq!(json["date"], serde_json::json!("2025-01-01"));
    }

    #[test]
    fn test_amount_serialization_is_exact() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let row = Row { amount: MAX_AMOUNT, date };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("999999999999.99"));
        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back.amount, MAX_AMOUNT);

        // Beyond f64 precision the exact text is written instead
        let precise: Decimal = "1234567890123456.78".parse().unwrap();
        let json = serde_json::to_value(&Row { amount: precise, date }).unwrap();
        assert_eq!(json["amount"], serde_json::json!("1234567890123456.78"));
    }

    #[test]
    fn test_parse_positive_amount() {
        assert_eq!(parse_positive_amount("12.346").unwrap(), Decimal::new(1235, 2));
        assert_eq!(parse_positive_amount("999999999999.99").unwrap(), MAX_AMOUNT);
        assert_eq!(
            parse_positive_amount("1000000000000").unwrap_err().to_string(),
            "Validation error: Amount is too large"
        );
        assert_eq!(
            parse_positive_amount("79228162514264337593543950335").unwrap_err().to_string(),
            "Validation error: Amount is too large"
        );
        assert!(parse_positive_amount("0").is_err());
        assert!(parse_positive_amount("0.001").is_err());
        assert!(parse_positive_amount("-5").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(" 12.5 "), Some(Decimal::new(125, 1)));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }
}
