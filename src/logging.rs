//! Per-indicator logging handle.
//!
//! Each indicator owns one [`IndicatorLog`]. Records go through `tracing`
//! with the handle's name attached, so nothing process-wide is configured here.

use std::fmt;

use tracing::info;

use crate::params::ParamValue;
use crate::series::BarSeries;
use crate::SymbolInfo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorLog {
    name: String,
    log_all_bars: bool,
}

impl IndicatorLog {
    /// Handle named `{symbol}-{time_frame}-{indicator}`.
    ///
    /// With `log_all_bars == false` only records produced while evaluating the
    /// most recent bar are written.
    pub fn new(symbol: &SymbolInfo, indicator: &str, log_all_bars: bool) -> Self {
        Self {
            name: format!("{}-{}-{}", symbol.name, symbol.time_frame, indicator),
            log_all_bars,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log_all_bars(&self) -> bool {
        self.log_all_bars
    }

    /// Whether a record produced while evaluating `index` should be written
    pub fn enabled_for<S: BarSeries + ?Sized>(&self, series: &S, index: usize) -> bool {
        self.log_all_bars || series.is_last_index(index)
    }

    /// Start record listing the active parameters. Always written.
    pub fn started(&self, params: &[(&'static str, ParamValue)]) {
        info!(indicator = %self.name, "{}", start_message(&self.name, params));
    }

    /// Info record for the bar at `index`
    pub fn info<S: BarSeries + ?Sized>(&self, series: &S, index: usize, message: impl fmt::Display) {
        if self.enabled_for(series, index) {
            info!(
                indicator = %self.name,
                index,
                live = series.is_last_index(index) && series.is_last_bar_open(),
                "{message}"
            );
        }
    }
}

/// `Indicator <name> is started: a=1, b="x"`, or `... is started without parameter.`
pub fn start_message(name: &str, params: &[(&'static str, ParamValue)]) -> String {
    if params.is_empty() {
        return format!("Indicator {name} is started without parameter.");
    }

    let list = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Indicator {name} is started: {list}")
}
