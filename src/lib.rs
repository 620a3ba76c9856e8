//! # pinscan - incremental group pin-bar scanner
//!
//! Scans a forward-growing series of price bars and flags composite candles
//! (one bar, or a short run of consecutive bars folded into one) whose body
//! is small relative to their total range.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use pinscan::prelude::*;
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let bars: Vec<Bar> = (0..6)
//!     .map(|i| {
//!         let time = t0 + chrono::Duration::hours(4 * i);
//!         Bar::new(101.0, 110.0, 100.0, 109.0, time)
//!     })
//!     .collect();
//!
//! let config = ScannerConfig {
//!     max_window_size: GroupSize::new(2).unwrap(),
//!     bar_count_limit: 0,
//!     thresholds: SignalThresholds::new(Percent::new(90).unwrap(), 5.0).unwrap(),
//! };
//!
//! let mut scanner = PatternScanner::initialize(bars.len(), config);
//! let events = scanner.scan_all(&bars);
//! assert!(events.iter().all(|e| e.window_size == 1));
//! ```

pub mod composite;
pub mod indicators;
pub mod logging;
pub mod params;
pub mod render;
pub mod scanner;
pub mod series;
pub mod window;

pub mod prelude {
    pub use crate::{
        // Core
        composite::{CompositeCandle, SignalThresholds},
        // Indicators
        indicators::*,
        logging::IndicatorLog,
        // Parameters
        params::{ParamMeta, ParamType, ParamValue, ParameterizedIndicator},
        render::{ChartRenderer, Color, LineStyle, RecordingChart, Rectangle, VerticalLine},
        // Parallel
        scan_parallel,
        scanner::{PatternScanner, ScanCursor, ScannerConfig},
        series::{Bar, BarBuffer, BarSeries},
        window::{first_eligible_index, window_start},
        GroupSize,
        OHLCExt,
        // Errors
        PatternError,
        Percent,
        Result,
        ScanError,
        ScanResult,
        SignalEvent,
        SymbolInfo,
        OHLC,
    };
}

use chrono::{DateTime, Utc};

use composite::CompositeCandle;
use scanner::{PatternScanner, ScannerConfig};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors that can occur while configuring or replaying a scan
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid OHLC at index {index}: {reason}")]
    InvalidOHLC { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Whole percentage in range 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(u8);

impl Percent {
    /// Create a new Percent, validating the value is in [0, 100]
    pub fn new(value: u32) -> Result<Self> {
        if value > 100 {
            return Err(PatternError::OutOfRange {
                field: "Percent",
                value: value as f64,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self(value as u8))
    }

    /// Unchecked constructor for constants. Debug builds panic outside [0, 100].
    #[doc(hidden)]
    pub const fn new_const(value: u8) -> Self {
        debug_assert!(value <= 100, "percent must be in [0, 100]");
        Self(value)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl serde::Serialize for Percent {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = u32::deserialize(d)?;
        Percent::new(value).map_err(serde::de::Error::custom)
    }
}

/// Number of consecutive bars folded into one composite (1..=3)
///
/// Larger groups clutter the chart, so the upper bound is kept small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupSize(usize);

impl GroupSize {
    pub const MAX: usize = 3;

    /// Create a new GroupSize, validating value is in [1, 3]
    pub fn new(value: usize) -> Result<Self> {
        if !(1..=Self::MAX).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "GroupSize",
                value: value as f64,
                min: 1.0,
                max: Self::MAX as f64,
            });
        }
        Ok(Self(value))
    }

    /// Unchecked constructor for constants. Debug builds panic outside [1, 3].
    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        debug_assert!(value >= 1 && value <= Self::MAX, "group size must be in [1, 3]");
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for GroupSize {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for GroupSize {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        GroupSize::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core price bar trait
pub trait OHLC {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn open_time(&self) -> DateTime<Utc>;
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCExt: OHLC {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Upper body edge. Open wins when open == close.
    #[inline]
    fn upper_edge(&self) -> f64 {
        if self.close() > self.open() {
            self.close()
        } else {
            self.open()
        }
    }

    #[inline]
    fn lower_edge(&self) -> f64 {
        if self.close() > self.open() {
            self.open()
        } else {
            self.close()
        }
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// Validate OHLC data consistency
    fn validate(&self) -> Result<()> {
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(PatternError::InvalidOHLC {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(PatternError::InvalidOHLC {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidOHLC {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLC + ?Sized> OHLCExt for T {}

/// Validate every bar, reporting the first offending index
pub fn validate_bars<T: OHLC>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            PatternError::InvalidOHLC { reason, .. } => PatternError::InvalidOHLC { index: i, reason },
            other => other,
        })?;
    }
    Ok(())
}

// ============================================================
// SYMBOL
// ============================================================

/// Instrument the bars belong to
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    /// Chart period label, e.g. "H4"
    pub time_frame: String,
    /// Price units per pip
    pub pip_size: f64,
}

impl SymbolInfo {
    pub fn new(name: impl Into<String>, time_frame: impl Into<String>, pip_size: f64) -> Result<Self> {
        if pip_size.is_nan() || pip_size <= 0.0 || pip_size.is_infinite() {
            return Err(PatternError::InvalidValue("pip size must be positive and finite"));
        }
        Ok(Self {
            name: name.into(),
            time_frame: time_frame.into(),
            pip_size,
        })
    }

    /// Convert a distance in pips to price units
    #[inline]
    pub fn pips_to_price(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }

    /// Convert a price distance to pips
    #[inline]
    pub fn price_to_pips(&self, price: f64) -> f64 {
        price / self.pip_size
    }
}

// ============================================================
// SIGNAL EVENT - result of one offer (Copy, no allocations)
// ============================================================

/// A qualifying composite candle ending at `end_index`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SignalEvent {
    pub start_index: usize,
    pub end_index: usize,
    pub window_size: usize,
    pub candle: CompositeCandle,
}

impl SignalEvent {
    #[inline]
    pub fn high_price(&self) -> f64 {
        self.candle.high_price
    }

    #[inline]
    pub fn low_price(&self) -> f64 {
        self.candle.low_price
    }

    #[inline]
    pub fn upper_price(&self) -> f64 {
        self.candle.upper_price
    }

    #[inline]
    pub fn lower_price(&self) -> f64 {
        self.candle.lower_price
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.candle.is_up
    }

    /// The two price levels that bound the drawn marker.
    ///
    /// Upper-anchored: (high, lower body edge). Lower-anchored: (upper body edge, low).
    pub fn extent_prices(&self) -> (f64, f64) {
        if self.candle.is_up {
            (self.candle.high_price, self.candle.lower_price)
        } else {
            (self.candle.upper_price, self.candle.low_price)
        }
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of replaying a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub signals: Vec<SignalEvent>,
}

/// Error from replaying a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Replay independent instruments in parallel, one scanner per instrument
pub fn scan_parallel<'a, T, I>(config: ScannerConfig, instruments: I) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLC + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            scan_instrument(config, bars)
                .map(|signals| ScanResult {
                    symbol: symbol.to_string(),
                    signals,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

fn scan_instrument<T: OHLC>(config: ScannerConfig, bars: &[T]) -> Result<Vec<SignalEvent>> {
    validate_bars(bars)?;

    let mut scanner = PatternScanner::initialize(bars.len(), config);
    if !scanner.is_valid() {
        return Err(PatternError::InsufficientData {
            need: window::MIN_HISTORY.max(config.max_window_size.get()),
            got: bars.len(),
        });
    }

    Ok(scanner.scan_all(bars))
}

// ============================================================
// TESTS
// ============================================================
