//! Composite candle: a run of consecutive bars folded into one shape, then
//! tested against a body-percent ceiling and a minimum-range floor.

use crate::series::BarSeries;
use crate::window::{highest_high, lowest_low};
use crate::{PatternError, Percent, Result, OHLC};

/// Signal thresholds for a composite candle
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SignalThresholds {
    /// Largest core height, as a percent of the range, that still counts as a signal
    pub max_body_percent: Percent,
    /// Smallest range, in price units, that counts as a signal
    pub min_height: f64,
}

impl SignalThresholds {
    pub fn new(max_body_percent: Percent, min_height: f64) -> Result<Self> {
        if min_height.is_nan() || min_height.is_infinite() {
            return Err(PatternError::InvalidValue(
                "min height cannot be NaN or infinite",
            ));
        }
        if min_height < 0.0 {
            return Err(PatternError::OutOfRange {
                field: "min_height",
                value: min_height,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(Self {
            max_body_percent,
            min_height,
        })
    }
}

/// One or more bars folded into a single candle and classified
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CompositeCandle {
    pub high_price: f64,
    pub low_price: f64,
    pub open_price: f64,
    pub close_price: f64,
    /// Larger of open/close (open on a tie)
    pub upper_price: f64,
    /// Smaller of open/close (close on a tie)
    pub lower_price: f64,
    /// `high_price - low_price`
    pub range: f64,
    /// Body plus the wick between the body and its nearer extreme
    pub core_height: f64,
    /// `core_height` as a percent of `range`. None for a flat composite.
    pub core_percent: Option<f64>,
    /// Body sits near the high (hammer-like). Ties resolve to true.
    pub is_up: bool,
    pub is_signal: bool,
}

impl CompositeCandle {
    /// Fold bars `[start, end]` of `series` and classify the result.
    ///
    /// Panics if `start > end` or `end` is outside the series.
    pub fn classify<S: BarSeries + ?Sized>(
        series: &S,
        start: usize,
        end: usize,
        thresholds: &SignalThresholds,
    ) -> Self {
        assert!(start <= end, "composite window start {start} is after end {end}");
        assert!(
            end < series.count(),
            "composite window end {end} is outside a series of {} bars",
            series.count()
        );

        let high = highest_high(series, start, end);
        let low = lowest_low(series, start, end);
        let open = series.bar(start).open();
        let close = series.bar(end).close();

        Self::from_prices(high, low, open, close, thresholds)
    }

    /// Classify a single bar
    pub fn from_bar<B: OHLC + ?Sized>(bar: &B, thresholds: &SignalThresholds) -> Self {
        Self::from_prices(bar.high(), bar.low(), bar.open(), bar.close(), thresholds)
    }

    /// Classify an already-folded composite
    pub fn from_prices(high: f64, low: f64, open: f64, close: f64, thresholds: &SignalThresholds) -> Self {
        let (upper, lower) = if close > open { (close, open) } else { (open, close) };

        let upper_to_low = upper - low;
        let lower_to_high = high - lower;

        // Smaller distance wins: body near the low is lower-anchored.
        let (core_height, is_up) = if upper_to_low < lower_to_high {
            (upper_to_low, false)
        } else {
            (lower_to_high, true)
        };

        let range = high - low;
        let core_percent = (range > 0.0).then(|| core_height * 100.0 / range);

        let is_signal = range >= thresholds.min_height
            && core_percent.is_some_and(|p| p <= thresholds.max_body_percent.as_f64());

        Self {
            high_price: high,
            low_price: low,
            open_price: open,
            close_price: close,
            upper_price: upper,
            lower_price: lower,
            range,
            core_height,
            core_percent,
            is_up,
            is_signal,
        }
    }
}
