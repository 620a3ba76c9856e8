//! Per-bar range histogram with cross star and pin bar markers.
//!
//! Heights are reported in pips. A cross star has a body that is a small
//! share of the range; a pin bar has a small core height on one side. When a
//! bar is both, the pin marker is lifted above the cross marker.

use std::collections::HashMap;

use crate::composite::{CompositeCandle, SignalThresholds};
use crate::logging::IndicatorLog;
use crate::params::{
    check_known, get_count, get_flag, get_percent, ParamMeta, ParamValue, ParameterizedIndicator,
};
use crate::scanner::ScanCursor;
use crate::series::BarSeries;
use crate::window::{draw_distance, format_time_frame, DEFAULT_BUFFER_SIZE};
use crate::{OHLCExt, PatternError, Percent, Result, SymbolInfo, OHLC};

/// Marker offset, in draw distances, for the first marker on a bar
pub const FIRST_MARKER_OFFSET: f64 = 1.0;
/// Offset for a second marker on the same bar
pub const SECOND_MARKER_OFFSET: f64 = 2.5;

const DRAW_DISTANCE_BARS: usize = 10;
const DRAW_DISTANCE_FACTOR: f64 = 5.0;

// ============================================================
// CONFIG
// ============================================================

const PRICE_RANGE_PARAMS: &[ParamMeta] = &[
    ParamMeta::int(
        "BarCount",
        200.0,
        (0.0, i32::MAX as f64),
        "Bars to compute counted back from the newest, 0 = all",
    ),
    ParamMeta::int("MinHeight", 15.0, (0.0, i32::MAX as f64), "Smallest bar range in pips"),
    ParamMeta::flag(
        "DrawBelowMinHeight",
        false,
        "Also output bars shorter than MinHeight",
    ),
    ParamMeta::int(
        "CrossPercent",
        8.0,
        (1.0, 20.0),
        "Largest body, as a percent of the range, for a cross star",
    ),
    ParamMeta::int(
        "PinPercent",
        25.0,
        (1.0, 40.0),
        "Largest core height, as a percent of the range, for a pin bar",
    ),
    ParamMeta::flag("LogAllBars", true, "Log every bar, not only the newest"),
];

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceRangeConfig {
    pub bar_count: usize,
    /// Pips
    pub min_height: u32,
    pub draw_below_min_height: bool,
    pub cross_percent: Percent,
    pub pin_percent: Percent,
    pub log_all_bars: bool,
}

impl Default for PriceRangeConfig {
    fn default() -> Self {
        Self {
            bar_count: 200,
            min_height: 15,
            draw_below_min_height: false,
            cross_percent: Percent::new_const(8),
            pin_percent: Percent::new_const(25),
            log_all_bars: true,
        }
    }
}

impl PriceRangeConfig {
    pub fn validate(&self) -> Result<()> {
        PRICE_RANGE_PARAMS[1].validate(self.min_height as f64)?;
        PRICE_RANGE_PARAMS[3].validate(self.cross_percent.as_f64())?;
        PRICE_RANGE_PARAMS[4].validate(self.pin_percent.as_f64())
    }
}

impl ParameterizedIndicator for PriceRangeConfig {
    fn param_meta() -> &'static [ParamMeta] {
        PRICE_RANGE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_known(params, PRICE_RANGE_PARAMS)?;
        let min_height = get_count(params, &PRICE_RANGE_PARAMS[1])?;
        Ok(Self {
            bar_count: get_count(params, &PRICE_RANGE_PARAMS[0])?,
            min_height: u32::try_from(min_height)
                .map_err(|_| PatternError::InvalidValue("MinHeight does not fit in 32 bits"))?,
            draw_below_min_height: get_flag(params, &PRICE_RANGE_PARAMS[2])?,
            cross_percent: get_percent(params, &PRICE_RANGE_PARAMS[3])?,
            pin_percent: get_percent(params, &PRICE_RANGE_PARAMS[4])?,
            log_all_bars: get_flag(params, &PRICE_RANGE_PARAMS[5])?,
        })
    }

    fn indicator_name() -> &'static str {
        "PriceRange"
    }

    fn describe(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("BarCount", ParamValue::Int(self.bar_count as i64)),
            ("MinHeight", ParamValue::Int(self.min_height as i64)),
            ("DrawBelowMinHeight", ParamValue::Bool(self.draw_below_min_height)),
            ("CrossPercent", ParamValue::Int(self.cross_percent.get() as i64)),
            ("PinPercent", ParamValue::Int(self.pin_percent.get() as i64)),
            ("LogAllBars", ParamValue::Bool(self.log_all_bars)),
        ]
    }
}

// ============================================================
// OUTPUT
// ============================================================

/// Output for one bar. Heights and marker positions are in pips.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PriceRangeReading {
    pub index: usize,
    pub bar_height: f64,
    pub body_height: f64,
    /// Marker position when the bar is a cross star
    pub cross_star: Option<f64>,
    /// Marker position when the bar is a pin bar
    pub pin_bar: Option<f64>,
}

/// Marker position above a bar of `bar_height`
#[inline]
pub fn marker_position(bar_height: f64, distance: f64, offset: f64) -> f64 {
    bar_height + distance * offset
}

// ============================================================
// INDICATOR
// ============================================================

#[derive(Debug, Clone)]
pub struct PriceRange {
    cursor: ScanCursor,
    config: PriceRangeConfig,
    log: IndicatorLog,
    symbol: SymbolInfo,
    pin_thresholds: SignalThresholds,
}

impl PriceRange {
    pub fn new<S: BarSeries + ?Sized>(
        series: &S,
        symbol: SymbolInfo,
        config: PriceRangeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let cursor = ScanCursor::new(series.count(), config.bar_count, DEFAULT_BUFFER_SIZE);
        let log = IndicatorLog::new(&symbol, PriceRangeConfig::indicator_name(), config.log_all_bars);
        log.started(&config.describe());

        Ok(Self {
            cursor,
            config,
            log,
            symbol,
            pin_thresholds: SignalThresholds::new(config.pin_percent, 0.0)?,
        })
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cursor.is_valid()
    }

    pub fn config(&self) -> &PriceRangeConfig {
        &self.config
    }

    /// Compute the bar at `index`.
    ///
    /// None when the offer is ignored, or when the bar is shorter than
    /// `min_height` and short bars are not drawn.
    pub fn calculate<S: BarSeries + ?Sized>(&mut self, series: &S, index: usize) -> Option<PriceRangeReading> {
        if !self.cursor.accepts(index) {
            return None;
        }
        self.cursor.mark_processed(index);

        let bar = series.bar(index);
        let bar_height = self.symbol.price_to_pips(bar.range());
        if !self.config.draw_below_min_height && bar_height < self.config.min_height as f64 {
            return None;
        }

        let body_height = self.symbol.price_to_pips(bar.body());
        let distance = draw_distance(
            series,
            self.symbol.pip_size,
            DRAW_DISTANCE_BARS,
            DRAW_DISTANCE_FACTOR,
        );
        let time = format_time_frame(bar.open_time(), true);
        let mut offset = FIRST_MARKER_OFFSET;

        let cross_star = cross_percent(bar)
            .filter(|&p| p <= self.config.cross_percent.as_f64())
            .map(|percent| {
                self.log.info(
                    series,
                    index,
                    format_args!("CrsStr at [{time}], height = {bar_height:.1}, percent = {percent:.1}%"),
                );
                let position = marker_position(bar_height, distance, offset);
                offset = SECOND_MARKER_OFFSET;
                position
            });

        let candle = CompositeCandle::from_bar(bar, &self.pin_thresholds);
        let pin_bar = match candle.core_percent {
            Some(percent) if candle.is_signal => {
                self.log.info(
                    series,
                    index,
                    format_args!("PinBar at [{time}], height = {bar_height:.1}, percent = {percent:.1}%"),
                );
                Some(marker_position(bar_height, distance, offset))
            }
            _ => None,
        };

        Some(PriceRangeReading {
            index,
            bar_height,
            body_height,
            cross_star,
            pin_bar,
        })
    }
}

/// Body as a percent of the range, None for a flat bar
fn cross_percent<B: OHLC + ?Sized>(bar: &B) -> Option<f64> {
    let range = bar.range();
    (range > 0.0).then(|| bar.body() * 100.0 / range)
}
