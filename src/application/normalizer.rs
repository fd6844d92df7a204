//! Event Normalizer
//!
//! Turns a raw, untyped JSON message into a canonical [`PriceEvent`].
//! A missing symbol is the only condition that drops a message; every other
//! malformed field degrades to a documented default so one corrupt field
//! never costs the whole record. Timestamps are truncated to whole-minute
//! precision here, which is what fixes the candle bucket key for the rest
//! of the pipeline.

use crate::domain::errors::NormalizeError;
use crate::domain::market::PriceEvent;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

/// Explicit parse-with-fallback result, so callers (and tests) can tell a
/// genuine zero apart from an unparsable field that was defaulted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackParsed<T> {
    pub value: T,
    pub used_default: bool,
}

impl<T> FallbackParsed<T> {
    fn parsed(value: T) -> Self {
        Self {
            value,
            used_default: false,
        }
    }

    fn defaulted(value: T) -> Self {
        Self {
            value,
            used_default: true,
        }
    }
}

/// Drop seconds and sub-second precision; the result is the minute bucket.
pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Coerce a JSON number or numeric string to a `Decimal`. Anything else
/// falls back to zero rather than failing the record. The zero-default is a
/// deliberate (if questionable) policy carried over from the source system.
pub fn parse_price(raw: Option<&Value>) -> FallbackParsed<Decimal> {
    match raw {
        Some(Value::Number(n)) => {
            let parsed = n
                .as_i64()
                .map(Decimal::from)
                .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain));
            match parsed {
                Some(d) => FallbackParsed::parsed(d),
                None => FallbackParsed::defaulted(Decimal::ZERO),
            }
        }
        Some(Value::String(s)) => match Decimal::from_str(s.trim()) {
            Ok(d) => FallbackParsed::parsed(d),
            Err(_) => FallbackParsed::defaulted(Decimal::ZERO),
        },
        _ => FallbackParsed::defaulted(Decimal::ZERO),
    }
}

/// Integer volume, defaulting to 0 when absent or unparsable. Negative
/// values pass through unvalidated.
pub fn parse_volume(raw: Option<&Value>) -> FallbackParsed<i64> {
    match raw {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => FallbackParsed::parsed(v),
            None => FallbackParsed::defaulted(0),
        },
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(v) => FallbackParsed::parsed(v),
            Err(_) => FallbackParsed::defaulted(0),
        },
        _ => FallbackParsed::defaulted(0),
    }
}

/// Parse an ISO-8601 timestamp, accepting a trailing `Z`, an explicit
/// offset, or a naive datetime (assumed UTC), with optional sub-second
/// fraction. Absent, blank or unparsable values fall back to `now`.
pub fn parse_timestamp(raw: Option<&Value>, now: DateTime<Utc>) -> FallbackParsed<DateTime<Utc>> {
    let Some(s) = raw.and_then(Value::as_str) else {
        return FallbackParsed::defaulted(now);
    };
    let s = s.trim();
    if s.is_empty() {
        return FallbackParsed::defaulted(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return FallbackParsed::parsed(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return FallbackParsed::parsed(naive.and_utc());
    }

    FallbackParsed::defaulted(now)
}

/// Normalize one raw message into a `PriceEvent`, or fail with
/// [`NormalizeError`] when the message is structurally unusable.
pub fn normalize(raw: &Value, now: DateTime<Utc>) -> Result<PriceEvent, NormalizeError> {
    let obj = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let symbol = obj
        .get("symbol")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if symbol.is_empty() {
        return Err(NormalizeError::MissingSymbol);
    }

    let price = parse_price(obj.get("price"));
    if price.used_default {
        warn!("Unparsable price for {}; defaulting to 0", symbol);
    }
    let volume = parse_volume(obj.get("volume"));
    let timestamp = parse_timestamp(obj.get("timestamp"), now);

    let source = obj
        .get("source")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string();

    Ok(PriceEvent {
        symbol: symbol.to_string(),
        timestamp: truncate_to_minute(timestamp.value),
        price: price.value,
        volume: volume.value,
        source,
    })
}
