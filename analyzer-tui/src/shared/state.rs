//! Dashboard state: one explicit state object per widget, shared
//! behind a lock between the render loop, the dispatcher tasks, and
//! the pollers.
//!
//! Each widget runs the `Idle → Loading → (Rendered | Failed)` cycle.
//! Overlapping loads of the same widget are legal and never cancelled;
//! every completion writes its whole result under the lock, so the
//! visible state is whichever response resolved last.

use crate::shared::series::{ChartBinding, ChartSeries};
use analyzer_client::StatsSummary;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Load cycle of a single widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetPhase {
    #[default]
    Idle,
    Loading,
    Rendered,
    Failed,
}

/// Per-widget view state. Owned by [`DashboardState`]; nothing here is
/// process-global.
#[derive(Debug, Default)]
pub struct WidgetState {
    pub phase: WidgetPhase,
    /// Formatted body lines for the panel.
    pub lines: Vec<String>,
    /// Inline error text, present only while `Failed`.
    pub error: Option<String>,
    pub chart: ChartBinding,
    pub last_update: Option<DateTime<Utc>>,
    /// In-flight load count; the triggering control is disabled while
    /// this is non-zero.
    in_flight: u32,
}

impl WidgetState {
    /// Enter `Loading`. Re-entry while already loading is allowed:
    /// pollers refresh on their timer regardless of prior state.
    pub fn begin_load(&mut self) {
        self.phase = WidgetPhase::Loading;
        self.in_flight += 1;
    }

    /// Complete a load with rendered content, rebinding the chart.
    pub fn render(&mut self, lines: Vec<String>, series: Vec<ChartSeries>) {
        self.settle();
        self.phase = WidgetPhase::Rendered;
        self.lines = lines;
        self.error = None;
        if !series.is_empty() {
            self.chart.bind(series);
        }
        self.last_update = Some(Utc::now());
    }

    /// Complete a load with an error. The widget keeps its previous
    /// content behind the inline message and is immediately
    /// re-triggerable.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.settle();
        self.phase = WidgetPhase::Failed;
        self.error = Some(message.into());
    }

    fn settle(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Whether the triggering control is disabled (spinner showing).
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// A `Failed` widget counts as idle for triggering purposes.
    pub fn can_trigger(&self) -> bool {
        !self.is_loading()
    }
}

/// Dashboard panels, one widget each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    Stats,
    System,
    CrudeCharts,
    EquityCharts,
    Btst,
    Operations,
}

impl PanelId {
    pub fn title(&self) -> &'static str {
        match self {
            PanelId::Stats => "OHLCV STATS",
            PanelId::System => "SYSTEM STATUS",
            PanelId::CrudeCharts => "CRUDE OIL",
            PanelId::EquityCharts => "EQUITY",
            PanelId::Btst => "BTST SIGNALS",
            PanelId::Operations => "OPERATIONS",
        }
    }
}

/// Transient notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Bounded queue of transient notifications, auto-expired after a TTL.
#[derive(Debug)]
pub struct Toasts {
    queue: VecDeque<Toast>,
    ttl: Duration,
    capacity: usize,
}

impl Default for Toasts {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            ttl: Duration::from_secs(5),
            capacity: 4,
        }
    }
}

impl Toasts {
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) {
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        self.queue.push_back(Toast {
            kind,
            message: message.into(),
            raised_at: Utc::now(),
        });
    }

    /// Live toasts, pruning anything past its TTL.
    pub fn active(&mut self, now: DateTime<Utc>) -> &VecDeque<Toast> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::seconds(5));
        while let Some(front) = self.queue.front() {
            if now.signed_duration_since(front.raised_at) > ttl {
                self.queue.pop_front();
            } else {
                break;
            }
        }
        &self.queue
    }
}

/// Reachability of one backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    #[default]
    Unknown,
    Online,
    Offline,
}

impl ServiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceStatus::Online => "Online",
            ServiceStatus::Offline => "Offline",
            ServiceStatus::Unknown => "...",
        }
    }
}

/// Health of the backend services the dashboard probes.
#[derive(Debug, Clone, Default)]
pub struct SystemHealth {
    pub api: ServiceStatus,
    pub api_detail: String,
    pub crude: ServiceStatus,
    pub crude_detail: String,
}

impl SystemHealth {
    pub fn any_online(&self) -> bool {
        self.api == ServiceStatus::Online || self.crude == ServiceStatus::Online
    }
}

/// Whole-dashboard state shared between the render loop and all
/// background tasks.
#[derive(Debug, Default)]
pub struct DashboardState {
    pub stats: WidgetState,
    pub system: WidgetState,
    pub crude_charts: WidgetState,
    pub equity_charts: WidgetState,
    pub btst: WidgetState,
    pub operations: WidgetState,

    /// Latest stats snapshot, replaced on every poll.
    pub stats_summary: Option<StatsSummary>,
    pub health: SystemHealth,
    pub toasts: Toasts,
    pub last_update: Option<DateTime<Utc>>,
}

pub type SharedState = Arc<Mutex<DashboardState>>;

impl DashboardState {
    pub fn shared() -> SharedState {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn widget_mut(&mut self, panel: PanelId) -> &mut WidgetState {
        match panel {
            PanelId::Stats => &mut self.stats,
            PanelId::System => &mut self.system,
            PanelId::CrudeCharts => &mut self.crude_charts,
            PanelId::EquityCharts => &mut self.equity_charts,
            PanelId::Btst => &mut self.btst,
            PanelId::Operations => &mut self.operations,
        }
    }

    pub fn widget(&self, panel: PanelId) -> &WidgetState {
        match panel {
            PanelId::Stats => &self.stats,
            PanelId::System => &self.system,
            PanelId::CrudeCharts => &self.crude_charts,
            PanelId::EquityCharts => &self.equity_charts,
            PanelId::Btst => &self.btst,
            PanelId::Operations => &self.operations,
        }
    }

    pub fn touch(&mut self) {
        self.last_update = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_cycle() {
        let mut widget = WidgetState::default();
        assert_eq!(widget.phase, WidgetPhase::Idle);
        assert!(widget.can_trigger());

        widget.begin_load();
        assert!(widget.is_loading());
        assert!(!widget.can_trigger());

        widget.render(vec!["Close: 82.45".to_string()], Vec::new());
        assert_eq!(widget.phase, WidgetPhase::Rendered);
        assert!(widget.can_trigger());
        assert!(widget.error.is_none());
        assert!(widget.last_update.is_some());
    }

    #[test]
    fn test_failed_widget_is_retriggerable_and_keeps_error_inline() {
        let mut widget = WidgetState::default();
        widget.begin_load();
        widget.fail("HTTP 500: internal error");

        assert_eq!(widget.phase, WidgetPhase::Failed);
        assert!(widget.can_trigger());
        let inline = widget.error.as_deref().unwrap();
        assert!(inline.contains("500"));
        assert!(inline.contains("internal error"));
    }

    #[test]
    fn test_overlapping_loads_last_to_resolve_wins() {
        let mut widget = WidgetState::default();

        // two loads triggered before either resolves
        widget.begin_load();
        widget.begin_load();
        assert!(widget.is_loading());

        // the first-issued request resolves second: its content stays
        widget.render(
            vec!["second response".to_string()],
            vec![ChartSeries::new("close")],
        );
        assert!(widget.is_loading());

        widget.render(
            vec!["first response".to_string()],
            vec![ChartSeries::new("close")],
        );
        assert!(!widget.is_loading());
        assert_eq!(widget.lines, vec!["first response".to_string()]);

        // exactly one chart bound, one per completed load
        assert_eq!(widget.chart.series().len(), 1);
        assert_eq!(widget.chart.generation(), 2);
    }

    #[test]
    fn test_overlap_error_then_success_leaves_rendered() {
        let mut widget = WidgetState::default();
        widget.begin_load();
        widget.begin_load();

        widget.fail("network error: connection refused");
        widget.render(vec!["recovered".to_string()], Vec::new());

        assert_eq!(widget.phase, WidgetPhase::Rendered);
        assert!(widget.error.is_none());
        assert!(!widget.is_loading());
    }

    #[test]
    fn test_toasts_expire_and_bound() {
        let mut toasts = Toasts::default();
        for i in 0..6 {
            toasts.push(ToastKind::Info, format!("toast {}", i));
        }
        let now = Utc::now();
        // capacity bounds the queue
        assert_eq!(toasts.active(now).len(), 4);

        let later = now + chrono::Duration::seconds(6);
        assert!(toasts.active(later).is_empty());
    }
}
