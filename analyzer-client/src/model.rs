//! Typed response models for the stock-analyzer backend.
//!
//! Every numeric field is optional: the backend omits or nulls any
//! indicator it could not compute, and the display layer renders a
//! placeholder rather than failing. Records are immutable once
//! received and owned transiently by the view layer for one render
//! cycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Candle timeframes the crude-oil endpoints aggregate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    H4,
    H1,
    M15,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::H4, Timeframe::H1, Timeframe::M15];

    /// Wire label used in query parameters and response keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::H4 => "4H",
            Timeframe::H1 => "1H",
            Timeframe::M15 => "15M",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl serde::Serialize for Timeframe {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How a ratio field is scaled on the wire.
///
/// The backend is inconsistent across endpoints: the crude
/// `/indicators/latest` endpoint delivers `volumeRatio` as an
/// already-multiplied percentage, while the equity
/// `/analysis/indicators/{symbol}` endpoint delivers a 0-1 fraction.
/// The scale travels with the records instead of being unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioScale {
    /// Value is a 0-1 fraction; multiply by 100 for display.
    Fraction,
    /// Value is already a percentage.
    Percent,
}

impl RatioScale {
    /// Normalize a raw ratio to percentage points for display.
    pub fn to_percent(&self, value: Option<f64>) -> Option<f64> {
        match self {
            RatioScale::Fraction => value.map(|v| v * 100.0),
            RatioScale::Percent => value,
        }
    }
}

/// One timestamped indicator snapshot from the crude-oil endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub close: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub rsi14: Option<f64>,
    /// Raw crossover label ("bullish" / "bearish"); null or anything
    /// unmapped classifies as neutral downstream.
    #[serde(default)]
    pub macd_crossover_signal: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub obv: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub vwap: Option<f64>,
    /// Scaled per [`RatioScale::Percent`] on this endpoint.
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub volume_ratio: Option<f64>,
    #[serde(default)]
    pub data_quality_flag: Option<String>,
}

/// Per-timeframe OHLCV record counts plus a readiness flag.
///
/// Recomputed on every poll, never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsSummary {
    #[serde(default)]
    pub counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub ready_for_calculation: bool,
}

impl StatsSummary {
    pub fn total_records(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn count(&self, timeframe: Timeframe) -> Option<u64> {
        self.counts.get(timeframe.as_str()).copied()
    }
}

/// Daily technical-indicator row from the equity analysis endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityIndicator {
    pub calculation_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub rsi14: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub vwap: Option<f64>,
    /// Scaled per [`RatioScale::Fraction`] on this endpoint.
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub volume_ratio: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub macd_histogram: Option<f64>,
}

/// Daily close/volume row from `/api/v1/analysis/prices/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub trade_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub close_price: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub volume: Option<f64>,
}

/// One BTST ("Buy Today Sell Tomorrow") recommendation. The category
/// and confidence are backend-computed and opaque to this layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BtstRecommendation {
    pub symbol: String,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub analysis_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub buy_reason: Option<String>,
}

/// Summary returned by the OHLCV load operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    #[serde(default)]
    pub records_loaded: u64,
}

/// Summary returned by the indicator calculation operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationReport {
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub execution_time_ms: u64,
}

/// Accept a JSON number, a numeric string, or null.
///
/// The backend serializes some decimals as strings (`closePrice`) and
/// nulls anything it could not compute.
fn de_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null,
    }

    match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => Ok(s.trim().parse().ok()),
        Some(Raw::Null) | None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_record_tolerates_missing_numerics() {
        let json = r#"{
            "timestamp": "2024-03-01T10:00:00Z",
            "close": 82.45,
            "rsi14": null,
            "macdCrossoverSignal": "bullish",
            "volumeRatio": 112.5
        }"#;

        let record: IndicatorRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.close, Some(82.45));
        assert_eq!(record.rsi14, None);
        assert_eq!(record.obv, None);
        assert_eq!(record.vwap, None);
        assert_eq!(record.macd_crossover_signal.as_deref(), Some("bullish"));
        assert_eq!(record.volume_ratio, Some(112.5));
        assert_eq!(record.data_quality_flag, None);
    }

    #[test]
    fn test_price_record_parses_string_close() {
        let json = r#"{"tradeDate": "2024-03-01", "closePrice": "3412.70", "volume": 120000}"#;
        let record: PriceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.close_price, Some(3412.70));
        assert_eq!(record.volume, Some(120_000.0));
    }

    #[test]
    fn test_stats_summary_totals() {
        let json = r#"{
            "counts": {"4H": 120, "1H": 480, "15M": 1920},
            "ready_for_calculation": true
        }"#;
        let stats: StatsSummary = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_records(), 2520);
        assert_eq!(stats.count(Timeframe::H1), Some(480));
        assert!(stats.ready_for_calculation);
    }

    #[test]
    fn test_ratio_scale_to_percent() {
        assert_eq!(RatioScale::Fraction.to_percent(Some(0.42)), Some(42.0));
        assert_eq!(RatioScale::Percent.to_percent(Some(42.0)), Some(42.0));
        assert_eq!(RatioScale::Fraction.to_percent(None), None);
    }
}
