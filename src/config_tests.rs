use crate::config::{Config, Mode};
use std::collections::HashMap;

fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    let map: HashMap<&str, &str> = vars.iter().copied().collect();
    move |key| map.get(key).map(|v| v.to_string())
}

#[test]
fn test_defaults() {
    let config = Config::from_lookup(|_| None).unwrap();

    assert_eq!(config.mode, Mode::Mock);
    assert_eq!(
        config.symbols,
        vec!["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"]
    );
    assert_eq!(config.z_score_threshold, 2.5);
    assert_eq!(config.history_limit, 30);
    assert_eq!(config.candle_ttl_days, 30);
    assert_eq!(config.price_ttl_days, 7);
    assert!(config.alert_webhook_url.is_none());
}

#[test]
fn test_overrides() {
    let vars = [
        ("MODE", "stdin"),
        ("SYMBOLS", " nvda , amd "),
        ("Z_SCORE_THRESHOLD", "3.0"),
        ("HISTORY_LIMIT", "10"),
        ("ALERT_WEBHOOK_URL", "https://hooks.example/finpulse"),
    ];
    let config = Config::from_lookup(lookup(&vars)).unwrap();

    assert_eq!(config.mode, Mode::Stdin);
    assert_eq!(config.symbols, vec!["NVDA", "AMD"]);
    assert_eq!(config.z_score_threshold, 3.0);
    assert_eq!(config.history_limit, 10);
    assert_eq!(
        config.alert_webhook_url.as_deref(),
        Some("https://hooks.example/finpulse")
    );
}

#[test]
fn test_invalid_mode_is_rejected() {
    let vars = [("MODE", "kinesis")];
    assert!(Config::from_lookup(lookup(&vars)).is_err());
}

#[test]
fn test_invalid_threshold_is_rejected() {
    let vars = [("Z_SCORE_THRESHOLD", "-1.0")];
    assert!(Config::from_lookup(lookup(&vars)).is_err());

    let vars = [("Z_SCORE_THRESHOLD", "very high")];
    assert!(Config::from_lookup(lookup(&vars)).is_err());
}

#[test]
fn test_history_limit_floor() {
    let vars = [("HISTORY_LIMIT", "1")];
    assert!(Config::from_lookup(lookup(&vars)).is_err());
}

#[test]
fn test_blank_webhook_is_ignored() {
    let vars = [("ALERT_WEBHOOK_URL", "   ")];
    let config = Config::from_lookup(lookup(&vars)).unwrap();
    assert!(config.alert_webhook_url.is_none());
}

#[test]
fn test_empty_symbols_rejected() {
    let vars = [("SYMBOLS", " , ,")];
    assert!(Config::from_lookup(lookup(&vars)).is_err());
}
