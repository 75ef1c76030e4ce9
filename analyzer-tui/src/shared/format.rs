//! Display formatting and threshold classification.
//!
//! Every function here is pure and total: `None` renders as the `"-"`
//! placeholder, never `NaN`, never a panic. These rules are the
//! contract between raw backend JSON and what lands on screen.

use chrono::{DateTime, Utc};
use ratatui::style::Color;

/// Placeholder for missing numeric data.
pub const PLACEHOLDER: &str = "-";

/// Fixed-decimal rendering: `fixed_decimal(Some(82.456), 2)` → "82.46".
pub fn fixed_decimal(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => PLACEHOLDER.to_string(),
    }
}

/// Large-number abbreviation: ≥1e6 → one decimal + "M", ≥1e3 → one
/// decimal + "K", otherwise the plain number.
pub fn abbreviate_large(value: Option<f64>) -> String {
    let Some(v) = value else {
        return PLACEHOLDER.to_string();
    };

    if v >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if v >= 1_000.0 {
        format!("{:.1}K", v / 1_000.0)
    } else if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        v.to_string()
    }
}

/// Fixed-decimal with a trailing percent sign.
pub fn percentage(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}%", decimals, v),
        None => PLACEHOLDER.to_string(),
    }
}

/// Oscillator zone for bounded indicators such as RSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscillatorLevel {
    Overbought,
    Oversold,
    Neutral,
}

impl OscillatorLevel {
    pub fn label(&self) -> &'static str {
        match self {
            OscillatorLevel::Overbought => "overbought",
            OscillatorLevel::Oversold => "oversold",
            OscillatorLevel::Neutral => "neutral",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            OscillatorLevel::Overbought => Color::Rgb(255, 69, 58),
            OscillatorLevel::Oversold => Color::Rgb(0, 255, 127),
            OscillatorLevel::Neutral => Color::Rgb(255, 215, 0),
        }
    }
}

/// Classify a bounded oscillator against its band. `None` is neutral.
pub fn classify_oscillator(value: Option<f64>, low: f64, high: f64) -> OscillatorLevel {
    match value {
        Some(v) if v >= high => OscillatorLevel::Overbought,
        Some(v) if v <= low => OscillatorLevel::Oversold,
        _ => OscillatorLevel::Neutral,
    }
}

/// Direction derived from a crossover label or histogram sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossSignal {
    Bullish,
    Bearish,
    Neutral,
}

impl CrossSignal {
    pub fn label(&self) -> &'static str {
        match self {
            CrossSignal::Bullish => "bullish",
            CrossSignal::Bearish => "bearish",
            CrossSignal::Neutral => "neutral",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            CrossSignal::Bullish => Color::Rgb(0, 255, 127),
            CrossSignal::Bearish => Color::Rgb(255, 69, 58),
            CrossSignal::Neutral => Color::Rgb(255, 215, 0),
        }
    }
}

/// Map a backend crossover label. Unmapped strings and `None` are
/// neutral, never an error.
pub fn classify_cross_signal(signal: Option<&str>) -> CrossSignal {
    match signal {
        Some("bullish") => CrossSignal::Bullish,
        Some("bearish") => CrossSignal::Bearish,
        _ => CrossSignal::Neutral,
    }
}

/// Derive a crossover signal from a MACD histogram value. The equity
/// endpoints send the histogram instead of a precomputed label.
pub fn classify_histogram(value: Option<f64>) -> CrossSignal {
    match value {
        Some(v) if v > 0.0 => CrossSignal::Bullish,
        Some(v) if v < 0.0 => CrossSignal::Bearish,
        _ => CrossSignal::Neutral,
    }
}

/// Human-readable age of a timestamp, floor division at every step:
/// under a minute → "Just now", under an hour → "Nm ago", under a day
/// → "Nh ago", under a week → "Nd ago", otherwise the absolute date.
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        display_date(timestamp)
    }
}

/// Absolute date rendering: "Mar 1, 2024 10:00".
pub fn display_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%b %-d, %Y %H:%M").to_string()
}
