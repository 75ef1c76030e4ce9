/// Analyzer TUI - Shared Library
///
/// This library backs the dashboard binary with:
/// - Pure display formatting and threshold classification
/// - Per-widget view state with the Idle/Loading/Rendered/Failed cycle
/// - Chart series derivation and single-owner chart binding
/// - The action dispatch table and fixed-interval pollers
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::dispatch::{Action, ActionInput, Dispatcher, Outcome, apply_outcome, execute};
pub use shared::format::{
    CrossSignal, OscillatorLevel, PLACEHOLDER, abbreviate_large, classify_cross_signal,
    classify_histogram, classify_oscillator, display_date, fixed_decimal, percentage,
    relative_time,
};
pub use shared::poller::{STATS_INTERVAL, SYSTEM_INTERVAL, spawn_pollers};
pub use shared::series::{ChartBinding, ChartSeries};
pub use shared::state::{
    DashboardState, PanelId, ServiceStatus, SharedState, SystemHealth, Toast, ToastKind, Toasts,
    WidgetPhase, WidgetState,
};
