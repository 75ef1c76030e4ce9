/// Shared modules for the analyzer dashboard
pub mod dispatch;
pub mod format;
pub mod poller;
pub mod series;
pub mod state;
