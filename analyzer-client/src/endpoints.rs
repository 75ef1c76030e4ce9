//! Typed wrappers over every backend operation the dashboard uses.
//!
//! Each wrapper builds the query string, issues the request through
//! [`ApiClient::call`], unwraps the `{success, data, error}` envelope
//! where the backend uses one, and decodes into the `model` types.
//! Validation of required user input happens here, before any request
//! is issued.

use crate::client::{ApiClient, CallOptions};
use crate::error::ClientError;
use crate::model::{
    BtstRecommendation, CalculationReport, EquityIndicator, IndicatorRecord, LoadReport,
    PriceRecord, StatsSummary, Timeframe,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use url::form_urlencoded::Serializer as QuerySerializer;

/// Export format for the crude indicator download endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadFormat {
    Csv,
    Json,
}

impl DownloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadFormat::Csv => "csv",
            DownloadFormat::Json => "json",
        }
    }
}

/// Request body for `/api/v1/crude/calculate-indicators`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateIndicatorsRequest {
    pub symbol: String,
    pub timeframes: Vec<Timeframe>,
    pub recalculate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDateTime>,
}

/// Filter set for the crude indicator download endpoint.
#[derive(Debug, Clone)]
pub struct DownloadIndicatorsQuery {
    pub timeframes: Vec<Timeframe>,
    pub format: DownloadFormat,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub data_quality: Vec<String>,
}

impl ApiClient {
    /// Probe the main service health endpoint.
    pub async fn system_health(&self) -> Result<(), ClientError> {
        self.call("/actuator/health").await.map(|_| ())
    }

    /// Probe the crude-oil service health endpoint.
    pub async fn crude_health(&self) -> Result<(), ClientError> {
        self.call("/api/v1/crude/health").await.map(|_| ())
    }

    /// Per-timeframe OHLCV record counts for one symbol.
    pub async fn ohlcv_stats(&self, symbol: &str) -> Result<StatsSummary, ClientError> {
        let symbol = require(symbol, "symbol")?;
        let query = encode_query(&[("symbol", symbol.to_string())]);

        let value = self
            .call(&format!("/api/v1/crude/ohlcv-stats?{}", query))
            .await?
            .into_json()?;
        let value = expect_success(value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Pull OHLCV candles from the upstream feed into the backend.
    pub async fn load_ohlcv_data(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<LoadReport, ClientError> {
        let symbol = require(symbol, "symbol")?;
        let query = encode_query(&[
            ("symbol", symbol.to_string()),
            ("startDate", start_date.to_string()),
            ("endDate", end_date.to_string()),
        ]);

        let value = self
            .call_with(
                &format!("/api/v1/crude/load-ohlcv-data?{}", query),
                CallOptions::post(),
            )
            .await?
            .into_json()?;
        let value = expect_success(value)?;
        let report: LoadReport = serde_json::from_value(value)?;
        info!(records = report.records_loaded, "OHLCV load complete");
        Ok(report)
    }

    /// Trigger server-side indicator calculation.
    pub async fn calculate_indicators(
        &self,
        request: &CalculateIndicatorsRequest,
    ) -> Result<CalculationReport, ClientError> {
        if request.timeframes.is_empty() {
            return Err(ClientError::Validation(
                "select at least one timeframe".to_string(),
            ));
        }

        let value = self
            .call_with(
                "/api/v1/crude/calculate-indicators",
                CallOptions::post_json(serde_json::to_value(request)?),
            )
            .await?
            .into_json()?;
        let value = expect_success(value)?;
        let data = value
            .get("data")
            .cloned()
            .ok_or_else(|| ClientError::Decode("missing data field".to_string()))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Most recent indicator records, keyed by timeframe label.
    pub async fn latest_indicators(
        &self,
        timeframes: &[Timeframe],
        limit: u32,
    ) -> Result<BTreeMap<String, Vec<IndicatorRecord>>, ClientError> {
        if timeframes.is_empty() {
            return Err(ClientError::Validation(
                "select at least one timeframe".to_string(),
            ));
        }

        let query = encode_query(&[
            ("timeframes", join_timeframes(timeframes)),
            ("limit", limit.to_string()),
        ]);

        let value = self
            .call(&format!("/api/v1/crude/indicators/latest?{}", query))
            .await?
            .into_json()?;
        parse_latest_indicators(value)
    }

    /// Download crude indicators to `dest_dir`; returns the written path.
    pub async fn download_indicators(
        &self,
        query: &DownloadIndicatorsQuery,
        dest_dir: &Path,
    ) -> Result<PathBuf, ClientError> {
        if query.timeframes.is_empty() {
            return Err(ClientError::Validation(
                "select at least one timeframe".to_string(),
            ));
        }

        let mut pairs = vec![
            ("timeframes", join_timeframes(&query.timeframes)),
            ("format", query.format.as_str().to_string()),
        ];
        if let Some(start) = query.start_date {
            pairs.push(("startDate", start.format("%Y-%m-%dT%H:%M").to_string()));
        }
        if let Some(end) = query.end_date {
            pairs.push(("endDate", end.format("%Y-%m-%dT%H:%M").to_string()));
        }
        if !query.data_quality.is_empty() {
            pairs.push(("dataQuality", query.data_quality.join(",")));
        }
        let params = encode_query(&pairs);

        let bytes = self
            .fetch_bytes(&format!("/api/v1/crude/download-indicators?{}", params))
            .await?;
        save_download(
            dest_dir,
            "crude_oil_indicators",
            query.format.as_str(),
            &bytes,
        )
        .await
    }

    /// BTST recommendations filtered by category.
    pub async fn btst_recommendations(
        &self,
        recommendation: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<BtstRecommendation>, ClientError> {
        let mut pairs = vec![("recommendation", recommendation.to_string())];
        if let Some(date) = date {
            pairs.push(("date", date.to_string()));
        }
        let query = encode_query(&pairs);

        let value = self
            .call(&format!("/api/v1/analysis/btst/recommendations?{}", query))
            .await?
            .into_json()?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run the BTST analysis pipeline for a trading date.
    pub async fn run_btst_analysis(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<BtstRecommendation>, ClientError> {
        let endpoint = with_optional_date("/api/v1/analysis/btst/run", date);
        let value = self.call(&endpoint).await?.into_json()?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run the technical-indicator pipeline; returns stocks processed.
    pub async fn run_technical_analysis(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<usize, ClientError> {
        let endpoint = with_optional_date("/api/v1/analysis/technical/run", date);
        let value = self.call(&endpoint).await?.into_json()?;
        let rows: Vec<serde_json::Value> = serde_json::from_value(value)?;
        Ok(rows.len())
    }

    /// Daily technical indicators for one equity symbol.
    pub async fn equity_indicators(
        &self,
        symbol: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<EquityIndicator>, ClientError> {
        let symbol = require(symbol, "symbol")?;
        let endpoint = with_optional_date(
            &format!("/api/v1/analysis/indicators/{}", symbol.to_uppercase()),
            date,
        );
        let value = self.call(&endpoint).await?.into_json()?;
        Ok(serde_json::from_value(value)?)
    }

    /// Daily close prices for one equity symbol.
    pub async fn equity_prices(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PriceRecord>, ClientError> {
        let symbol = require(symbol, "symbol")?;
        let query = encode_query(&[("days", days.to_string())]);

        let value = self
            .call(&format!(
                "/api/v1/analysis/prices/{}?{}",
                symbol.to_uppercase(),
                query
            ))
            .await?
            .into_json()?;
        let records: Vec<PriceRecord> = serde_json::from_value(value)?;
        if records.is_empty() {
            return Err(ClientError::EmptyResult(format!(
                "no price data for {}",
                symbol.to_uppercase()
            )));
        }
        Ok(records)
    }

    /// All equity indicators for a date as JSON rows.
    pub async fn all_indicators_json(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<Vec<serde_json::Value>, ClientError> {
        let endpoint = with_optional_date("/api/v1/analysis/indicators/all/json", date);
        let value = self.call(&endpoint).await?.into_json()?;
        Ok(serde_json::from_value(value)?)
    }

    /// Download the all-indicators CSV; returns the written path.
    pub async fn download_all_indicators(
        &self,
        date: Option<NaiveDate>,
        dest_dir: &Path,
    ) -> Result<PathBuf, ClientError> {
        let endpoint = with_optional_date("/api/v1/analysis/indicators/all", date);
        let bytes = self.fetch_bytes(&endpoint).await?;
        save_download(dest_dir, "all_indicators", "csv", &bytes).await
    }

    /// Download a per-symbol indicator bundle as ZIP.
    pub async fn download_bulk_indicators(
        &self,
        symbols: &str,
        date: Option<NaiveDate>,
        dest_dir: &Path,
    ) -> Result<PathBuf, ClientError> {
        let symbols = require(symbols, "symbols")?;
        let mut pairs = vec![("symbols", symbols.to_string())];
        if let Some(date) = date {
            pairs.push(("date", date.to_string()));
        }
        let query = encode_query(&pairs);

        let bytes = self
            .fetch_bytes(&format!(
                "/api/v1/analysis/indicators/bulk/download?{}",
                query
            ))
            .await?;
        save_download(dest_dir, "bulk_indicators", "zip", &bytes).await
    }

    /// Pull live market data into the backend; plain-text outcome.
    pub async fn fetch_live_data(&self) -> Result<String, ClientError> {
        Ok(self
            .call("/api/v1/analysis/fetch-live-data")
            .await?
            .into_text())
    }

    /// Ingest the end-of-day bhavcopy file for a date; plain-text outcome.
    pub async fn download_bhavcopy(&self, date: NaiveDate) -> Result<String, ClientError> {
        let query = encode_query(&[("date", date.to_string())]);
        Ok(self
            .call(&format!("/api/v1/analysis/download-bhavcopy?{}", query))
            .await?
            .into_text())
    }

    /// Re-authenticate the backend's upstream session with a TOTP code.
    /// A single opaque call; no token handling happens client side.
    pub async fn reauthenticate(&self, totp: &str) -> Result<String, ClientError> {
        let totp = require(totp, "TOTP code")?;
        let query = encode_query(&[("totp", totp.to_string())]);
        Ok(self
            .call(&format!("/reauthenticate?{}", query))
            .await?
            .into_text())
    }
}

/// Generated filename for a saved download: `<dataset>_<ISO-date>.<ext>`.
pub fn download_filename(dataset: &str, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        dataset,
        Utc::now().format("%Y-%m-%d"),
        extension
    )
}

async fn save_download(
    dest_dir: &Path,
    dataset: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<PathBuf, ClientError> {
    let path = dest_dir.join(download_filename(dataset, extension));
    tokio::fs::write(&path, bytes).await?;
    info!(path = %path.display(), size = bytes.len(), "download saved");
    Ok(path)
}

/// Unwrap the `{success, ..., error}` envelope some endpoints use.
/// Endpoints without the envelope pass through untouched.
fn expect_success(value: serde_json::Value) -> Result<serde_json::Value, ClientError> {
    match value.get("success").and_then(|v| v.as_bool()) {
        Some(true) | None => Ok(value),
        Some(false) => {
            let message = value
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("operation failed")
                .to_string();
            Err(ClientError::Backend(message))
        }
    }
}

fn parse_latest_indicators(
    value: serde_json::Value,
) -> Result<BTreeMap<String, Vec<IndicatorRecord>>, ClientError> {
    let value = expect_success(value)?;
    let data = value
        .get("data")
        .cloned()
        .ok_or_else(|| ClientError::Decode("missing data field".to_string()))?;
    let by_timeframe: BTreeMap<String, Vec<IndicatorRecord>> = serde_json::from_value(data)?;

    if by_timeframe.values().all(|records| records.is_empty()) {
        return Err(ClientError::EmptyResult(
            "no indicator records for the selected timeframes".to_string(),
        ));
    }
    Ok(by_timeframe)
}

fn require<'a>(value: &'a str, what: &str) -> Result<&'a str, ClientError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ClientError::Validation(format!("please enter a {}", what)))
    } else {
        Ok(trimmed)
    }
}

fn join_timeframes(timeframes: &[Timeframe]) -> String {
    timeframes
        .iter()
        .map(Timeframe::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn with_optional_date(endpoint: &str, date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => {
            let query = encode_query(&[("date", date.to_string())]);
            format!("{}?{}", endpoint, query)
        }
        None => endpoint.to_string(),
    }
}

/// Percent-encode query pairs into a finished query string.
///
/// The serializer is confined here so no endpoint future carries it
/// across an await point; the futures must stay `Send` for
/// `tokio::spawn`.
fn encode_query(pairs: &[(&str, String)]) -> String {
    let mut query = QuerySerializer::new(String::new());
    for (key, value) in pairs {
        query.append_pair(key, value);
    }
    query.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_download_filename_shape() {
        let name = download_filename("crude_oil_indicators", "csv");
        assert!(name.starts_with("crude_oil_indicators_"));
        assert!(name.ends_with(".csv"));
        // dataset + "_" + YYYY-MM-DD + "." + ext
        assert_eq!(name.len(), "crude_oil_indicators_".len() + 10 + 4);
    }

    #[test]
    fn test_expect_success_envelope() {
        assert!(expect_success(json!({"success": true, "counts": {}})).is_ok());
        assert!(expect_success(json!({"plain": "response"})).is_ok());

        let err = expect_success(json!({"success": false, "error": "feed offline"})).unwrap_err();
        assert!(matches!(err, ClientError::Backend(msg) if msg == "feed offline"));
    }

    #[test]
    fn test_parse_latest_indicators() {
        let value = json!({
            "success": true,
            "data": {
                "4H": [{
                    "timestamp": "2024-03-01T10:00:00Z",
                    "close": 82.45,
                    "rsi14": 61.2,
                    "macdCrossoverSignal": "bullish",
                    "volumeRatio": 108.0,
                    "dataQualityFlag": "GOOD"
                }],
                "1H": []
            }
        });

        let parsed = parse_latest_indicators(value).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["4H"].len(), 1);
        assert_eq!(parsed["4H"][0].rsi14, Some(61.2));
    }

    #[test]
    fn test_parse_latest_indicators_empty_is_error() {
        let value = json!({"success": true, "data": {"4H": [], "15M": []}});
        assert!(matches!(
            parse_latest_indicators(value),
            Err(ClientError::EmptyResult(_))
        ));
    }

    #[test]
    fn test_require_rejects_blank_input() {
        assert!(matches!(
            require("   ", "symbol"),
            Err(ClientError::Validation(_))
        ));
        assert_eq!(require(" TCS ", "symbol").unwrap(), "TCS");
    }

    #[test]
    fn test_calculate_request_body_shape() {
        let request = CalculateIndicatorsRequest {
            symbol: "BRN".to_string(),
            timeframes: vec![Timeframe::H4, Timeframe::M15],
            recalculate: false,
            start_date: None,
            end_date: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["symbol"], "BRN");
        assert_eq!(body["timeframes"], json!(["4H", "15M"]));
        assert_eq!(body["recalculate"], false);
        assert!(body.get("startDate").is_none());
    }

    #[test]
    fn test_encode_query_joins_and_escapes_pairs() {
        assert_eq!(
            encode_query(&[
                ("symbol", "BRN".to_string()),
                ("limit", "50".to_string())
            ]),
            "symbol=BRN&limit=50"
        );
        assert_eq!(
            encode_query(&[("timeframes", "4H,1H".to_string())]),
            "timeframes=4H%2C1H"
        );
    }

    fn require_send<T: Send>(_: &T) {}

    // Every endpoint future is handed to tokio::spawn by the dashboard
    // dispatcher, so each must be Send. This fails to compile if a
    // non-Send local is ever held across an await again.
    #[test]
    fn test_endpoint_futures_are_send() {
        let client = ApiClient::new("http://localhost:8080");
        let dir = std::path::PathBuf::from(".");

        require_send(&client.system_health());
        require_send(&client.crude_health());
        require_send(&client.ohlcv_stats("BRN"));
        require_send(&client.load_ohlcv_data(
            "BRN",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        ));
        require_send(&client.latest_indicators(&[Timeframe::H1], 50));
        let download = DownloadIndicatorsQuery {
            timeframes: vec![Timeframe::H4],
            format: DownloadFormat::Csv,
            start_date: None,
            end_date: None,
            data_quality: Vec::new(),
        };
        require_send(&client.download_indicators(&download, &dir));
        require_send(&client.btst_recommendations("BUY", None));
        require_send(&client.run_btst_analysis(None));
        require_send(&client.run_technical_analysis(None));
        require_send(&client.equity_indicators("TCS", None));
        require_send(&client.equity_prices("TCS", 30));
        require_send(&client.all_indicators_json(None));
        require_send(&client.download_all_indicators(None, &dir));
        require_send(&client.download_bulk_indicators("TCS,INFY", None, &dir));
        require_send(&client.fetch_live_data());
        require_send(&client.download_bhavcopy(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        ));
        require_send(&client.reauthenticate("123456"));
    }

    #[test]
    fn test_optional_date_query() {
        assert_eq!(
            with_optional_date("/api/v1/analysis/btst/run", None),
            "/api/v1/analysis/btst/run"
        );
        let dated = with_optional_date(
            "/api/v1/analysis/btst/run",
            NaiveDate::from_ymd_opt(2024, 3, 1),
        );
        assert_eq!(dated, "/api/v1/analysis/btst/run?date=2024-03-01");
    }
}
