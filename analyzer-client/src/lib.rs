//! HTTP client for the stock-analyzer backend API.
//!
//! The backend is an opaque HTTP service returning JSON, plain text,
//! and download blobs (CSV/ZIP). This crate owns the request side of
//! the dashboard contract: one normalized call path, typed response
//! models with fully optional numerics, and an error taxonomy that the
//! view layer can surface without special cases.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod model;

pub use client::{ApiBody, ApiClient, CallOptions};
pub use endpoints::{
    CalculateIndicatorsRequest, DownloadFormat, DownloadIndicatorsQuery, download_filename,
};
pub use error::ClientError;
pub use model::{
    BtstRecommendation, CalculationReport, EquityIndicator, IndicatorRecord, LoadReport,
    PriceRecord, RatioScale, StatsSummary, Timeframe,
};
