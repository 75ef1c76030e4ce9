//! Keyboard actions and their backend execution.
//!
//! Every dashboard control maps to one [`Action`]; a single dispatch
//! table routes the action to its handler, which calls the client,
//! formats the result into panel lines and chart series, and applies
//! the outcome to the owning widget under the state lock. Handlers run
//! as detached tasks and are never cancelled; each completion writes
//! the whole widget, so overlapping triggers settle on whichever
//! response resolved last.

use crate::shared::format::{
    self, abbreviate_large, classify_cross_signal, classify_histogram, classify_oscillator,
    fixed_decimal, percentage,
};
use crate::shared::series::ChartSeries;
use crate::shared::state::{PanelId, ServiceStatus, SharedState, SystemHealth, ToastKind};
use analyzer_client::{
    ApiClient, BtstRecommendation, CalculateIndicatorsRequest, ClientError, DownloadFormat,
    DownloadIndicatorsQuery, EquityIndicator, IndicatorRecord, PriceRecord, RatioScale,
    StatsSummary, Timeframe,
};
use chrono::{Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Everything a keystroke can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RefreshStats,
    CheckSystemStatus,
    LoadCrudeCharts,
    LoadEquityCharts,
    LoadCrudeData,
    CalculateCrudeIndicators,
    ViewCrudeLatest,
    RunBtstAnalysis,
    FetchBtstRecommendations,
    CalculateStockIndicators,
    DownloadIndicators,
    DownloadAllIndicators,
    BulkDownload,
    FetchLiveData,
    DownloadBhavcopy,
    Reauthenticate,
}

impl Action {
    /// Widget that owns this action's lifecycle and output.
    pub fn panel(&self) -> PanelId {
        match self {
            Action::RefreshStats => PanelId::Stats,
            Action::CheckSystemStatus => PanelId::System,
            Action::LoadCrudeCharts | Action::ViewCrudeLatest => PanelId::CrudeCharts,
            Action::LoadEquityCharts => PanelId::EquityCharts,
            Action::RunBtstAnalysis | Action::FetchBtstRecommendations => PanelId::Btst,
            Action::LoadCrudeData
            | Action::CalculateCrudeIndicators
            | Action::CalculateStockIndicators
            | Action::DownloadIndicators
            | Action::DownloadAllIndicators
            | Action::BulkDownload
            | Action::FetchLiveData
            | Action::DownloadBhavcopy
            | Action::Reauthenticate => PanelId::Operations,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::RefreshStats => "Refresh stats",
            Action::CheckSystemStatus => "Check system status",
            Action::LoadCrudeCharts => "Load crude charts",
            Action::LoadEquityCharts => "Load equity charts",
            Action::LoadCrudeData => "Load OHLCV data",
            Action::CalculateCrudeIndicators => "Calculate crude indicators",
            Action::ViewCrudeLatest => "View latest crude indicators",
            Action::RunBtstAnalysis => "Run BTST analysis",
            Action::FetchBtstRecommendations => "Fetch BTST recommendations",
            Action::CalculateStockIndicators => "Run technical analysis",
            Action::DownloadIndicators => "Download crude indicators",
            Action::DownloadAllIndicators => "Download all equity indicators",
            Action::BulkDownload => "Bulk indicator download",
            Action::FetchLiveData => "Fetch live data",
            Action::DownloadBhavcopy => "Download bhavcopy",
            Action::Reauthenticate => "Re-authenticate session",
        }
    }
}

/// Input values the actions draw from, resolved once at startup from
/// environment variables with interactive-free defaults.
#[derive(Debug, Clone)]
pub struct ActionInput {
    pub crude_symbol: String,
    pub equity_symbol: String,
    pub equity_days: u32,
    pub timeframe: Timeframe,
    pub timeframes: Vec<Timeframe>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub recommendation: String,
    pub bulk_symbols: String,
    pub totp: String,
    pub download_dir: PathBuf,
    pub format: DownloadFormat,
}

impl Default for ActionInput {
    fn default() -> Self {
        let today = Utc::now().date_naive();
        Self {
            crude_symbol: std::env::var("ANALYZER_CRUDE_SYMBOL")
                .unwrap_or_else(|_| "BRN".to_string()),
            equity_symbol: std::env::var("ANALYZER_EQUITY_SYMBOL")
                .unwrap_or_else(|_| "TCS".to_string()),
            equity_days: std::env::var("ANALYZER_EQUITY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            timeframe: Timeframe::H1,
            timeframes: Timeframe::ALL.to_vec(),
            start_date: today - chrono::Duration::days(60),
            end_date: today,
            recommendation: "BUY".to_string(),
            bulk_symbols: std::env::var("ANALYZER_BULK_SYMBOLS").unwrap_or_default(),
            totp: std::env::var("ANALYZER_TOTP").unwrap_or_default(),
            download_dir: std::env::var("ANALYZER_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            format: DownloadFormat::Csv,
        }
    }
}

/// Result of one completed action, applied to its widget wholesale.
#[derive(Debug)]
pub struct Outcome {
    pub lines: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub toast: Option<(ToastKind, String)>,
    pub stats: Option<StatsSummary>,
    pub health: Option<SystemHealth>,
}

impl Outcome {
    fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            series: Vec::new(),
            toast: None,
            stats: None,
            health: None,
        }
    }

    fn with_series(mut self, series: Vec<ChartSeries>) -> Self {
        self.series = series;
        self
    }

    fn with_toast(mut self, kind: ToastKind, message: impl Into<String>) -> Self {
        self.toast = Some((kind, message.into()));
        self
    }
}

/// Spawns one detached task per triggered action.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<ApiClient>,
    state: SharedState,
    input: ActionInput,
}

impl Dispatcher {
    pub fn new(client: Arc<ApiClient>, state: SharedState, input: ActionInput) -> Self {
        Self {
            client,
            state,
            input,
        }
    }

    /// Trigger an action. Marks the widget loading immediately; the
    /// handler runs detached and applies its own completion.
    pub async fn trigger(&self, action: Action) {
        let panel = action.panel();
        {
            let mut state = self.state.lock().await;
            state.widget_mut(panel).begin_load();
        }
        info!(action = action.label(), "action dispatched");

        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        let input = self.input.clone();
        tokio::spawn(async move {
            let outcome = execute(&client, action, &input).await;
            apply_outcome(&state, panel, outcome).await;
        });
    }
}

/// Run one action against the backend and format its result.
pub async fn execute(
    client: &ApiClient,
    action: Action,
    input: &ActionInput,
) -> Result<Outcome, ClientError> {
    match action {
        Action::RefreshStats => {
            let stats = client.ohlcv_stats(&input.crude_symbol).await?;
            let lines = stats_lines(&input.crude_symbol, &stats);
            Ok(Outcome {
                stats: Some(stats),
                ..Outcome::lines(lines)
            })
        }
        Action::CheckSystemStatus => {
            let (api, crude) = futures::join!(client.system_health(), client.crude_health());
            let health = health_from_probes(api, crude);
            let lines = health_lines(&health);
            Ok(Outcome {
                health: Some(health),
                ..Outcome::lines(lines)
            })
        }
        Action::LoadCrudeCharts | Action::ViewCrudeLatest => {
            let limit = if action == Action::LoadCrudeCharts { 50 } else { 1 };
            let by_timeframe = client.latest_indicators(&[input.timeframe], limit).await?;
            let records = by_timeframe
                .get(input.timeframe.as_str())
                .cloned()
                .unwrap_or_default();
            let (lines, series) = crude_panel(input.timeframe, records);
            Ok(Outcome::lines(lines).with_series(series))
        }
        Action::LoadEquityCharts => {
            let (prices, indicators) = futures::join!(
                client.equity_prices(&input.equity_symbol, input.equity_days),
                client.equity_indicators(&input.equity_symbol, None),
            );
            let prices = prices?;
            let indicators = indicators.unwrap_or_default();
            let lines = equity_lines(&input.equity_symbol, &prices, &indicators);
            let series = equity_series(&prices);
            Ok(Outcome::lines(lines).with_series(series))
        }
        Action::LoadCrudeData => {
            let report = client
                .load_ohlcv_data(&input.crude_symbol, input.start_date, input.end_date)
                .await?;
            let message = format!("Loaded {} OHLCV records", report.records_loaded);
            Ok(Outcome::lines(vec![message.clone()])
                .with_toast(ToastKind::Success, message))
        }
        Action::CalculateCrudeIndicators => {
            let request = CalculateIndicatorsRequest {
                symbol: input.crude_symbol.clone(),
                timeframes: input.timeframes.clone(),
                recalculate: false,
                start_date: None,
                end_date: None,
            };
            let report = client.calculate_indicators(&request).await?;
            let message = format!(
                "Calculated {} records in {}ms",
                report.total_records, report.execution_time_ms
            );
            Ok(Outcome::lines(vec![message.clone()])
                .with_toast(ToastKind::Success, message))
        }
        Action::RunBtstAnalysis => {
            let recommendations = client.run_btst_analysis(None).await?;
            let message = format!("BTST analysis produced {} signals", recommendations.len());
            Ok(Outcome::lines(btst_lines(&recommendations))
                .with_toast(ToastKind::Success, message))
        }
        Action::FetchBtstRecommendations => {
            let recommendations = client
                .btst_recommendations(&input.recommendation, None)
                .await?;
            Ok(Outcome::lines(btst_lines(&recommendations)))
        }
        Action::CalculateStockIndicators => {
            let processed = client.run_technical_analysis(None).await?;
            let message = format!("Technical analysis ran for {} stocks", processed);
            Ok(Outcome::lines(vec![message.clone()])
                .with_toast(ToastKind::Success, message))
        }
        Action::DownloadIndicators => {
            let query = DownloadIndicatorsQuery {
                timeframes: input.timeframes.clone(),
                format: input.format,
                start_date: None,
                end_date: None,
                data_quality: Vec::new(),
            };
            let path = client
                .download_indicators(&query, &input.download_dir)
                .await?;
            let message = format!("Saved {}", path.display());
            Ok(Outcome::lines(vec![message.clone()])
                .with_toast(ToastKind::Success, message))
        }
        Action::DownloadAllIndicators => {
            let path = client
                .download_all_indicators(None, &input.download_dir)
                .await?;
            let message = format!("Saved {}", path.display());
            Ok(Outcome::lines(vec![message.clone()])
                .with_toast(ToastKind::Success, message))
        }
        Action::BulkDownload => {
            let path = client
                .download_bulk_indicators(&input.bulk_symbols, None, &input.download_dir)
                .await?;
            let message = format!("Saved {}", path.display());
            Ok(Outcome::lines(vec![message.clone()])
                .with_toast(ToastKind::Success, message))
        }
        Action::FetchLiveData => {
            let outcome = client.fetch_live_data().await?;
            Ok(Outcome::lines(vec![outcome.clone()]).with_toast(ToastKind::Info, outcome))
        }
        Action::DownloadBhavcopy => {
            let outcome = client.download_bhavcopy(input.end_date).await?;
            Ok(Outcome::lines(vec![outcome.clone()]).with_toast(ToastKind::Info, outcome))
        }
        Action::Reauthenticate => {
            let outcome = client.reauthenticate(&input.totp).await?;
            Ok(Outcome::lines(vec![outcome.clone()]).with_toast(ToastKind::Success, outcome))
        }
    }
}

/// Apply a completed action to its widget. Errors land as an inline
/// widget message plus a toast; the triggering control is restored
/// either way.
pub async fn apply_outcome(state: &SharedState, panel: PanelId, result: Result<Outcome, ClientError>) {
    let mut state = state.lock().await;
    match result {
        Ok(outcome) => {
            if let Some(stats) = outcome.stats {
                state.stats_summary = Some(stats);
            }
            if let Some(health) = outcome.health {
                state.health = health;
            }
            if let Some((kind, message)) = outcome.toast {
                state.toasts.push(kind, message);
            }
            state.widget_mut(panel).render(outcome.lines, outcome.series);
            state.touch();
        }
        Err(err) => {
            error!(panel = panel.title(), %err, "action failed");
            let message = err.to_string();
            state.toasts.push(ToastKind::Error, message.clone());
            state.widget_mut(panel).fail(message);
        }
    }
}

fn health_from_probes(
    api: Result<(), ClientError>,
    crude: Result<(), ClientError>,
) -> SystemHealth {
    let mut health = SystemHealth::default();
    match api {
        Ok(()) => health.api = ServiceStatus::Online,
        Err(err) => {
            health.api = ServiceStatus::Offline;
            health.api_detail = err.to_string();
        }
    }
    match crude {
        Ok(()) => health.crude = ServiceStatus::Online,
        Err(err) => {
            health.crude = ServiceStatus::Offline;
            health.crude_detail = err.to_string();
        }
    }
    health
}

fn health_lines(health: &SystemHealth) -> Vec<String> {
    let mut lines = vec![
        format!("API:   {}", health.api.label()),
        format!("Crude: {}", health.crude.label()),
    ];
    if !health.api_detail.is_empty() {
        lines.push(format!("  {}", health.api_detail));
    }
    if !health.crude_detail.is_empty() {
        lines.push(format!("  {}", health.crude_detail));
    }
    lines
}

fn stats_lines(symbol: &str, stats: &StatsSummary) -> Vec<String> {
    let mut lines = vec![format!("Symbol: {}", symbol)];
    for timeframe in Timeframe::ALL {
        lines.push(format!(
            "{:>3}: {}",
            timeframe.as_str(),
            abbreviate_large(stats.count(timeframe).map(|c| c as f64)),
        ));
    }
    lines.push(format!(
        "Total: {}",
        abbreviate_large(Some(stats.total_records() as f64))
    ));
    lines.push(
        if stats.ready_for_calculation {
            "Ready for calculation".to_string()
        } else {
            "Insufficient data".to_string()
        },
    );
    lines
}

/// Build the crude panel content from wire-order records. The latest
/// indicators endpoint returns records newest first; the summary and
/// chart series want oldest first.
fn crude_panel(
    timeframe: Timeframe,
    mut records: Vec<IndicatorRecord>,
) -> (Vec<String>, Vec<ChartSeries>) {
    records.reverse();
    (crude_lines(timeframe, &records), crude_series(&records))
}

/// Summary lines for the crude panel from oldest-first records.
fn crude_lines(timeframe: Timeframe, records: &[IndicatorRecord]) -> Vec<String> {
    let Some(latest) = records.last() else {
        return vec!["Waiting for data...".to_string()];
    };

    let rsi_level = classify_oscillator(latest.rsi14, 30.0, 70.0);
    let cross = classify_cross_signal(latest.macd_crossover_signal.as_deref());
    vec![
        format!("Timeframe: {}", timeframe),
        format!("Close:  {}", fixed_decimal(latest.close, 2)),
        format!(
            "RSI 14: {} ({})",
            fixed_decimal(latest.rsi14, 1),
            rsi_level.label()
        ),
        format!("MACD:   {}", cross.label()),
        format!("OBV:    {}", abbreviate_large(latest.obv)),
        format!("VWAP:   {}", fixed_decimal(latest.vwap, 2)),
        format!(
            "Volume: {}",
            percentage(RatioScale::Percent.to_percent(latest.volume_ratio), 1)
        ),
        format!(
            "As of:  {}",
            format::relative_time(latest.timestamp, Utc::now())
        ),
    ]
}

fn crude_series(records: &[IndicatorRecord]) -> Vec<ChartSeries> {
    if records.is_empty() {
        return Vec::new();
    }
    vec![
        ChartSeries::from_records("close", records, |r| r.close),
        ChartSeries::from_records("rsi14", records, |r| r.rsi14),
        ChartSeries::from_records("vwap", records, |r| r.vwap),
    ]
}

/// Equity summary, joining the price tape with the indicator rows by
/// calculation date. The indicator ratio arrives as a 0-1 fraction on
/// this endpoint.
fn equity_lines(
    symbol: &str,
    prices: &[PriceRecord],
    indicators: &[EquityIndicator],
) -> Vec<String> {
    let Some(latest_price) = prices.last() else {
        return vec!["Waiting for data...".to_string()];
    };

    let by_date: BTreeMap<NaiveDate, &EquityIndicator> = indicators
        .iter()
        .filter_map(|row| row.calculation_date.map(|date| (date, row)))
        .collect();
    let latest_indicator = latest_price
        .trade_date
        .and_then(|date| by_date.get(&date).copied())
        .or_else(|| by_date.values().next_back().copied());

    let mut lines = vec![
        format!("Symbol: {}", symbol.to_uppercase()),
        format!("Close:  {}", fixed_decimal(latest_price.close_price, 2)),
        format!("Volume: {}", abbreviate_large(latest_price.volume)),
    ];
    if let Some(row) = latest_indicator {
        let rsi_level = classify_oscillator(row.rsi14, 30.0, 70.0);
        lines.push(format!(
            "RSI 14: {} ({})",
            fixed_decimal(row.rsi14, 1),
            rsi_level.label()
        ));
        lines.push(format!("VWAP:   {}", fixed_decimal(row.vwap, 2)));
        lines.push(format!(
            "Volume ratio: {}",
            percentage(RatioScale::Fraction.to_percent(row.volume_ratio), 1)
        ));
        lines.push(format!(
            "MACD:   {}",
            classify_histogram(row.macd_histogram).label()
        ));
    }
    lines
}

fn equity_series(prices: &[PriceRecord]) -> Vec<ChartSeries> {
    if prices.is_empty() {
        return Vec::new();
    }
    let mut close = ChartSeries::new("close");
    let mut volume = ChartSeries::new("volume");
    for price in prices {
        let label = price
            .trade_date
            .map(|d| format!("{} {}", month_abbrev(d), d.day()))
            .unwrap_or_default();
        close.push(label.clone(), price.close_price);
        volume.push(label, price.volume);
    }
    vec![close, volume]
}

fn month_abbrev(date: NaiveDate) -> &'static str {
    match date.month() {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

fn btst_lines(recommendations: &[BtstRecommendation]) -> Vec<String> {
    if recommendations.is_empty() {
        return vec!["No signals".to_string()];
    }
    recommendations
        .iter()
        .map(|rec| {
            format!(
                "{:<12} {:<5} {}  {}",
                rec.symbol,
                rec.recommendation.as_deref().unwrap_or("-"),
                percentage(rec.confidence_score, 0),
                rec.buy_reason.as_deref().unwrap_or(""),
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::state::{DashboardState, WidgetPhase};

    fn record(timestamp: &str, close: f64, rsi: f64) -> IndicatorRecord {
        serde_json::from_value(serde_json::json!({
            "timestamp": timestamp,
            "close": close,
            "rsi14": rsi,
            "macdCrossoverSignal": "bullish",
            "obv": 1_300_000.0,
            "vwap": close - 0.2,
            "volumeRatio": 112.5,
        }))
        .unwrap()
    }

    #[test]
    fn test_every_action_has_a_panel() {
        let actions = [
            Action::RefreshStats,
            Action::CheckSystemStatus,
            Action::LoadCrudeCharts,
            Action::LoadEquityCharts,
            Action::LoadCrudeData,
            Action::CalculateCrudeIndicators,
            Action::ViewCrudeLatest,
            Action::RunBtstAnalysis,
            Action::FetchBtstRecommendations,
            Action::CalculateStockIndicators,
            Action::DownloadIndicators,
            Action::DownloadAllIndicators,
            Action::BulkDownload,
            Action::FetchLiveData,
            Action::DownloadBhavcopy,
            Action::Reauthenticate,
        ];
        for action in actions {
            assert!(!action.label().is_empty());
            let _ = action.panel();
        }
    }

    #[test]
    fn test_crude_lines_format_latest_record() {
        let records = vec![
            record("2024-03-01T09:00:00Z", 81.90, 55.0),
            record("2024-03-01T10:00:00Z", 82.45, 61.2),
        ];

        let lines = crude_lines(Timeframe::H1, &records);
        assert!(lines.iter().any(|l| l.contains("82.45")));
        assert!(lines.iter().any(|l| l.contains("61.2") && l.contains("neutral")));
        assert!(lines.iter().any(|l| l.contains("bullish")));
        assert!(lines.iter().any(|l| l.contains("1.3M")));
        // percent-scaled endpoint: no re-multiplication
        assert!(lines.iter().any(|l| l.contains("112.5%")));
    }

    #[test]
    fn test_crude_panel_reverses_newest_first_wire_order() {
        // wire order: newest record first
        let records = vec![
            record("2024-03-01T10:00:00Z", 82.45, 61.2),
            record("2024-03-01T09:00:00Z", 81.90, 55.0),
        ];

        let (lines, series) = crude_panel(Timeframe::H1, records);

        // the summary reflects the newest snapshot, not the oldest
        assert!(lines.iter().any(|l| l.contains("Close:") && l.contains("82.45")));

        // series plot oldest to newest
        let close = series.iter().find(|s| s.metric == "close").unwrap();
        assert_eq!(close.values(), vec![81.90, 82.45]);
        assert_eq!(close.latest(), Some(82.45));
    }

    #[test]
    fn test_crude_lines_placeholder_when_empty() {
        assert_eq!(
            crude_lines(Timeframe::H4, &[]),
            vec!["Waiting for data...".to_string()]
        );
    }

    #[test]
    fn test_equity_lines_scale_fraction_ratio() {
        let prices: Vec<PriceRecord> = serde_json::from_value(serde_json::json!([
            {"tradeDate": "2024-03-01", "closePrice": 3412.70, "volume": 1_500_000.0}
        ]))
        .unwrap();
        let indicators: Vec<EquityIndicator> = serde_json::from_value(serde_json::json!([
            {"calculationDate": "2024-03-01", "rsi14": 72.0, "vwap": 3400.1,
             "volumeRatio": 0.42, "macdHistogram": 1.3}
        ]))
        .unwrap();

        let lines = equity_lines("tcs", &prices, &indicators);
        assert!(lines.iter().any(|l| l.contains("TCS")));
        assert!(lines.iter().any(|l| l.contains("3412.70")));
        // fraction-scaled endpoint: 0.42 displays as 42.0%
        assert!(lines.iter().any(|l| l.contains("42.0%")));
        assert!(lines.iter().any(|l| l.contains("overbought")));
        assert!(lines.iter().any(|l| l.contains("bullish")));
    }

    #[test]
    fn test_btst_lines() {
        let recommendations: Vec<BtstRecommendation> = serde_json::from_value(serde_json::json!([
            {"symbol": "RELIANCE", "recommendation": "BUY", "confidenceScore": 78.0,
             "buyReason": "volume breakout"}
        ]))
        .unwrap();

        let lines = btst_lines(&recommendations);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("RELIANCE"));
        assert!(lines[0].contains("78%"));
        assert!(lines[0].contains("volume breakout"));

        assert_eq!(btst_lines(&[]), vec!["No signals".to_string()]);
    }

    #[tokio::test]
    async fn test_apply_outcome_success_renders_widget() {
        let state = DashboardState::shared();
        {
            state.lock().await.widget_mut(PanelId::Btst).begin_load();
        }

        let outcome = Outcome::lines(vec!["RELIANCE BUY 78%".to_string()])
            .with_toast(ToastKind::Success, "BTST analysis produced 1 signals");
        apply_outcome(&state, PanelId::Btst, Ok(outcome)).await;

        let mut state = state.lock().await;
        assert_eq!(state.btst.phase, WidgetPhase::Rendered);
        assert!(!state.btst.is_loading());
        assert_eq!(state.toasts.active(Utc::now()).len(), 1);
    }

    #[tokio::test]
    async fn test_apply_outcome_http_error_is_inline_and_restores_control() {
        let state = DashboardState::shared();
        {
            state.lock().await.widget_mut(PanelId::Stats).begin_load();
        }

        let err = ClientError::Http {
            status: 500,
            body: "internal error".to_string(),
        };
        apply_outcome(&state, PanelId::Stats, Err(err)).await;

        let state = state.lock().await;
        assert_eq!(state.stats.phase, WidgetPhase::Failed);
        let inline = state.stats.error.as_deref().unwrap();
        assert!(inline.contains("500"));
        assert!(inline.contains("internal error"));
        // the triggering control is usable again
        assert!(state.stats.can_trigger());
    }

    #[tokio::test]
    async fn test_apply_outcome_overlap_last_resolved_wins() {
        let state = DashboardState::shared();
        {
            let mut s = state.lock().await;
            s.widget_mut(PanelId::CrudeCharts).begin_load();
            s.widget_mut(PanelId::CrudeCharts).begin_load();
        }

        apply_outcome(
            &state,
            PanelId::CrudeCharts,
            Ok(Outcome::lines(vec!["stale".to_string()])
                .with_series(vec![ChartSeries::new("close")])),
        )
        .await;
        apply_outcome(
            &state,
            PanelId::CrudeCharts,
            Ok(Outcome::lines(vec!["fresh".to_string()])
                .with_series(vec![ChartSeries::new("close")])),
        )
        .await;

        let state = state.lock().await;
        assert_eq!(state.crude_charts.lines, vec!["fresh".to_string()]);
        assert_eq!(state.crude_charts.chart.series().len(), 1);
        assert!(!state.crude_charts.is_loading());
    }

    #[test]
    fn test_health_from_probes() {
        let health = health_from_probes(
            Ok(()),
            Err(ClientError::Network("connection refused".to_string())),
        );
        assert_eq!(health.api, ServiceStatus::Online);
        assert_eq!(health.crude, ServiceStatus::Offline);
        assert!(health.crude_detail.contains("connection refused"));
        assert!(health.any_online());
    }
}
