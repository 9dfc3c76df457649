//! Response handling shared by the vendor clients.

use chrono::NaiveDate;
use reqwest::{Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use trading_core::error::BrokerError;

/// Map a transport failure.
pub(crate) fn transport(e: reqwest::Error) -> BrokerError {
    BrokerError::RemoteUnavailable(e.to_string())
}

/// Read a JSON body, classifying HTTP-level failures.
///
/// 401/403 are authentication failures; 429 and 5xx are transient. Other
/// 4xx bodies are returned so the caller can read the vendor's error text.
pub(crate) async fn read_json(resp: Response) -> Result<Value, BrokerError> {
    let status = resp.status();
    let text = resp.text().await.map_err(transport)?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BrokerError::Authentication(format!("{}: {}", status, text)));
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(BrokerError::RemoteUnavailable(format!("{}: {}", status, text)));
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Ok(value),
        Err(_) if status.is_success() && text.trim().is_empty() => Ok(Value::Null),
        Err(e) => Err(BrokerError::RemoteUnavailable(format!(
            "{}: unreadable response ({}): {}",
            status,
            e,
            truncate(&text, 200)
        ))),
    }
}

/// Decimal from a JSON string or number field.
pub(crate) fn decimal(value: &Value, key: &str) -> Option<Decimal> {
    match value.get(key)? {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

/// Decimal field, zero when missing or malformed.
pub(crate) fn decimal_or_zero(value: &Value, key: &str) -> Decimal {
    decimal(value, key).unwrap_or(Decimal::ZERO)
}

/// Integer from a JSON string or number field.
pub(crate) fn integer(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Non-empty string field.
pub(crate) fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Dates arrive as `2026-01-27`, `27-Jan-2026`, `27Jan2026` or an ISO timestamp.
pub(crate) fn date(value: &Value, key: &str) -> Option<NaiveDate> {
    let raw = text(value, key)?;
    let head = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&raw, "%d-%b-%Y"))
        .or_else(|_| NaiveDate::parse_from_str(&raw, "%d%b%Y"))
        .ok()
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

pub(crate) fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_decimal_from_string_and_number() {
        let v = json!({"a": "1234.50", "b": 99.25, "c": "n/a", "d": 1.5e3});
        assert_eq!(decimal(&v, "a"), Some(dec!(1234.50)));
        assert_eq!(decimal(&v, "b"), Some(dec!(99.25)));
        assert_eq!(decimal(&v, "c"), None);
        assert_eq!(decimal(&v, "d"), Some(dec!(1500)));
        assert_eq!(decimal_or_zero(&v, "missing"), Decimal::ZERO);
    }

    #[test]
    fn test_integer_and_text() {
        let v = json!({"q": "75", "n": -50, "s": "  NIFTY ", "e": ""});
        assert_eq!(integer(&v, "q"), Some(75));
        assert_eq!(integer(&v, "n"), Some(-50));
        assert_eq!(text(&v, "s").as_deref(), Some("NIFTY"));
        assert_eq!(text(&v, "e"), None);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 27);
        assert_eq!(date(&json!({"d": "2026-01-27T06:00:00.000Z"}), "d"), expected);
        assert_eq!(date(&json!({"d": "27-Jan-2026"}), "d"), expected);
        assert_eq!(date(&json!({"d": "27Jan2026"}), "d"), expected);
        assert_eq!(date(&json!({"d": "soon"}), "d"), None);
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("₹₹₹", 2), "₹₹");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
