//! Vertical separators between trading weeks.
//!
//! A gap of more than 36 hours between two consecutive bars is taken as a
//! weekend; a dotted line is drawn halfway across it.

use std::collections::HashMap;

use chrono::TimeDelta;

use crate::logging::IndicatorLog;
use crate::params::{check_known, get_count, ParamMeta, ParamValue, ParameterizedIndicator};
use crate::render::{ChartRenderer, Color, LineStyle, VerticalLine};
use crate::scanner::ScanCursor;
use crate::series::BarSeries;
use crate::window::{format_time_frame, time_frame_seconds, DEFAULT_BUFFER_SIZE};
use crate::{Result, SymbolInfo};

/// Shortest gap, in seconds, treated as a week change
pub const WEEK_CHANGE_SECONDS: i64 = 129_600;

/// Longest bar period the separator runs on (daily)
pub const MAX_TIME_FRAME_SECONDS: i64 = 86_400;

const WEEK_SEPARATOR_PARAMS: &[ParamMeta] = &[ParamMeta::int(
    "BarCount",
    500.0,
    (0.0, i32::MAX as f64),
    "Bars to check counted back from the newest, 0 = all",
)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeekSeparatorConfig {
    pub bar_count: usize,
}

impl Default for WeekSeparatorConfig {
    fn default() -> Self {
        Self { bar_count: 500 }
    }
}

impl ParameterizedIndicator for WeekSeparatorConfig {
    fn param_meta() -> &'static [ParamMeta] {
        WEEK_SEPARATOR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_known(params, WEEK_SEPARATOR_PARAMS)?;
        Ok(Self {
            bar_count: get_count(params, &WEEK_SEPARATOR_PARAMS[0])?,
        })
    }

    fn indicator_name() -> &'static str {
        "WeekSeparator"
    }

    fn describe(&self) -> Vec<(&'static str, ParamValue)> {
        vec![("BarCount", ParamValue::Int(self.bar_count as i64))]
    }
}

#[derive(Debug, Clone)]
pub struct WeekSeparator {
    cursor: ScanCursor,
    log: IndicatorLog,
}

impl WeekSeparator {
    /// Inert on series with fewer than three bars or a period above one day
    pub fn new<S: BarSeries + ?Sized>(series: &S, symbol: &SymbolInfo, config: WeekSeparatorConfig) -> Self {
        let mut cursor = ScanCursor::new(series.count(), config.bar_count, DEFAULT_BUFFER_SIZE);
        match time_frame_seconds(series) {
            Some(seconds) if seconds <= MAX_TIME_FRAME_SECONDS => {}
            _ => cursor.disable(),
        }

        let log = IndicatorLog::new(symbol, WeekSeparatorConfig::indicator_name(), true);
        log.started(&config.describe());

        Self { cursor, log }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cursor.is_valid()
    }

    /// Check the gap before `index`, drawing a separator across it if it is a weekend
    pub fn calculate<S, R>(&mut self, series: &S, index: usize, chart: &mut R) -> Option<VerticalLine>
    where
        S: BarSeries + ?Sized,
        R: ChartRenderer,
    {
        if !self.cursor.accepts(index) {
            return None;
        }
        self.cursor.mark_processed(index);

        let previous = series.open_time(index - 1);
        let gap = (series.open_time(index) - previous).num_seconds();
        if gap <= WEEK_CHANGE_SECONDS {
            return None;
        }

        let line = VerticalLine {
            name: format!("WS[{index}]"),
            time: previous + TimeDelta::seconds(gap >> 1),
            color: Color::Yellow,
            thickness: 1,
            style: LineStyle::Dots,
        };
        self.log.info(
            series,
            index,
            format_args!("{} at [{}]", line.name, format_time_frame(line.time, false)),
        );
        chart.draw_vertical_line(line.clone());

        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::render::RecordingChart;
    use crate::series::Bar;

    fn symbol() -> SymbolInfo {
        SymbolInfo::new("EURUSD", "H4", 0.0001).unwrap()
    }

    fn bars_at(times: &[DateTime<Utc>]) -> Vec<Bar> {
        times
            .iter()
            .map(|&t| Bar::new(1.1, 1.2, 1.0, 1.15, t))
            .collect()
    }

    /// Friday 16:00, 20:00, then Sunday 22:00 and Monday 02:00
    fn across_weekend() -> Vec<Bar> {
        let friday = Utc.with_ymd_and_hms(2024, 3, 8, 16, 0, 0).unwrap();
        let sunday = Utc.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap();
        bars_at(&[
            friday,
            friday + Duration::hours(4),
            sunday,
            sunday + Duration::hours(4),
        ])
    }

    #[test]
    fn test_line_halfway_across_weekend() {
        let bars = across_weekend();
        let mut separator = WeekSeparator::new(&bars, &symbol(), WeekSeparatorConfig::default());
        let mut chart = RecordingChart::new();

        let lines: Vec<VerticalLine> = (0..bars.len())
            .filter_map(|i| separator.calculate(&bars, i, &mut chart))
            .collect();

        assert_eq!(lines.len(), 1);
        let line = chart.line("WS[2]").unwrap();
        // 50 hour gap, line 25 hours after Friday 20:00
        assert_eq!(line.time, Utc.with_ymd_and_hms(2024, 3, 9, 21, 0, 0).unwrap());
        assert_eq!(line.style, LineStyle::Dots);
        assert_eq!(line.color, Color::Yellow);
    }

    #[test]
    fn test_gap_at_threshold_is_not_a_week() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let bars = bars_at(&[
            t0,
            t0 + Duration::hours(1),
            t0 + Duration::hours(2),
            t0 + Duration::hours(38),
        ]);
        let mut separator = WeekSeparator::new(&bars, &symbol(), WeekSeparatorConfig::default());
        let mut chart = RecordingChart::new();
        assert!(separator.calculate(&bars, 3, &mut chart).is_none());
        assert!(chart.is_empty());
    }

    #[test]
    fn test_weekly_bars_are_inert() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap();
        let bars = bars_at(&[t0, t0 + Duration::days(7), t0 + Duration::days(14)]);
        let separator = WeekSeparator::new(&bars, &symbol(), WeekSeparatorConfig::default());
        assert!(!separator.is_valid());
    }

    #[test]
    fn test_daily_bars_are_valid() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let bars = bars_at(&[t0, t0 + Duration::days(1), t0 + Duration::days(2)]);
        let separator = WeekSeparator::new(&bars, &symbol(), WeekSeparatorConfig::default());
        assert!(separator.is_valid());
    }

    #[test]
    fn test_short_series_is_inert() {
        let bars = across_weekend();
        let separator = WeekSeparator::new(&bars[..2], &symbol(), WeekSeparatorConfig::default());
        assert!(!separator.is_valid());
    }
}
