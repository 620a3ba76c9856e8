//! Group pin bar indicator
//!
//! Folds 1..=`group_size` consecutive bars into a composite candle and marks
//! composites whose core height is a small share of their range. Signals are
//! drawn as rectangles and logged in pips.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::composite::SignalThresholds;
use crate::logging::IndicatorLog;
use crate::params::{
    check_known, get_count, get_flag, get_percent, ParamMeta, ParamValue, ParameterizedIndicator,
};
use crate::render::{ChartRenderer, Rectangle};
use crate::scanner::{PatternScanner, ScannerConfig};
use crate::series::BarSeries;
use crate::window::format_time_frame;
use crate::{GroupSize, Percent, Result, SignalEvent, SymbolInfo};

// ============================================================
// CONFIG
// ============================================================

const GROUP_PIN_BAR_PARAMS: &[ParamMeta] = &[
    ParamMeta::int(
        "BarCount",
        500.0,
        (0.0, i32::MAX as f64),
        "Bars to scan counted back from the newest, 0 = all",
    ),
    ParamMeta::int(
        "GroupSize",
        2.0,
        (1.0, 3.0),
        "Most bars folded into one composite",
    ),
    ParamMeta::int("MinPips", 20.0, (0.0, 100.0), "Smallest composite range in pips"),
    ParamMeta::int(
        "Percent",
        30.0,
        (0.0, 100.0),
        "Largest core height as a percent of the composite range",
    ),
    ParamMeta::flag("LogAllBars", true, "Log every bar, not only the newest"),
];

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupPinBarConfig {
    /// 0 = no limit
    pub bar_count: usize,
    pub group_size: GroupSize,
    pub min_pips: u32,
    pub percent: Percent,
    pub log_all_bars: bool,
}

impl Default for GroupPinBarConfig {
    fn default() -> Self {
        Self {
            bar_count: 500,
            group_size: GroupSize::new_const(2),
            min_pips: 20,
            percent: Percent::new_const(30),
            log_all_bars: true,
        }
    }
}

impl GroupPinBarConfig {
    pub fn validate(&self) -> Result<()> {
        GROUP_PIN_BAR_PARAMS[2].validate(self.min_pips as f64)
    }

    /// Scanner settings with the pip threshold converted to price units
    pub fn scanner_config(&self, symbol: &SymbolInfo) -> Result<ScannerConfig> {
        Ok(ScannerConfig {
            max_window_size: self.group_size,
            bar_count_limit: self.bar_count,
            thresholds: SignalThresholds::new(
                self.percent,
                symbol.pips_to_price(self.min_pips as f64),
            )?,
        })
    }
}

impl ParameterizedIndicator for GroupPinBarConfig {
    fn param_meta() -> &'static [ParamMeta] {
        GROUP_PIN_BAR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        check_known(params, GROUP_PIN_BAR_PARAMS)?;
        Ok(Self {
            bar_count: get_count(params, &GROUP_PIN_BAR_PARAMS[0])?,
            group_size: GroupSize::new(get_count(params, &GROUP_PIN_BAR_PARAMS[1])?)?,
            min_pips: get_count(params, &GROUP_PIN_BAR_PARAMS[2])? as u32,
            percent: get_percent(params, &GROUP_PIN_BAR_PARAMS[3])?,
            log_all_bars: get_flag(params, &GROUP_PIN_BAR_PARAMS[4])?,
        })
    }

    fn indicator_name() -> &'static str {
        "GroupPinBar"
    }

    fn describe(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            ("BarCount", ParamValue::Int(self.bar_count as i64)),
            ("GroupSize", ParamValue::Int(self.group_size.get() as i64)),
            ("MinPips", ParamValue::Int(self.min_pips as i64)),
            ("Percent", ParamValue::Int(self.percent.get() as i64)),
            ("LogAllBars", ParamValue::Bool(self.log_all_bars)),
        ]
    }
}

// ============================================================
// SIGNAL RECORD
// ============================================================

/// Log line for one signal, heights in pips
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalRecord {
    pub open_time: DateTime<Utc>,
    pub window_size: usize,
    pub height_pips: f64,
    pub core_pips: f64,
    pub core_percent: f64,
}

impl SignalRecord {
    pub fn new(open_time: DateTime<Utc>, event: &SignalEvent, symbol: &SymbolInfo) -> Self {
        Self {
            open_time,
            window_size: event.window_size,
            height_pips: symbol.price_to_pips(event.candle.range),
            core_pips: symbol.price_to_pips(event.candle.core_height),
            core_percent: event.candle.core_percent.unwrap_or_default(),
        }
    }
}

impl fmt::Display for SignalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] height = {:.1}, core = {:.1}, percent = {:.1}%",
            format_time_frame(self.open_time, false),
            self.window_size,
            self.height_pips,
            self.core_pips,
            self.core_percent
        )
    }
}

// ============================================================
// INDICATOR
// ============================================================

/// Group pin bar indicator: one scanner, one log handle
#[derive(Debug, Clone)]
pub struct GroupPinBar {
    scanner: PatternScanner,
    log: IndicatorLog,
    symbol: SymbolInfo,
}

impl GroupPinBar {
    /// Set up over the bars currently in `series`.
    ///
    /// Out-of-range parameters are an error. Too little history is not: the
    /// indicator is built but never signals.
    pub fn new<S: BarSeries + ?Sized>(
        series: &S,
        symbol: SymbolInfo,
        config: &GroupPinBarConfig,
    ) -> Result<Self> {
        config.validate()?;
        let scanner = PatternScanner::initialize(series.count(), config.scanner_config(&symbol)?);
        let log = IndicatorLog::new(&symbol, GroupPinBarConfig::indicator_name(), config.log_all_bars);
        log.started(&config.describe());

        Ok(Self {
            scanner,
            log,
            symbol,
        })
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.scanner.is_valid()
    }

    pub fn scanner(&self) -> &PatternScanner {
        &self.scanner
    }

    pub fn log(&self) -> &IndicatorLog {
        &self.log
    }

    /// Evaluate the bar at `index`, drawing and logging a signal if one fires
    pub fn calculate<S, R>(&mut self, series: &S, index: usize, chart: &mut R) -> Option<SignalEvent>
    where
        S: BarSeries + ?Sized,
        R: ChartRenderer,
    {
        let event = self.scanner.offer(series, index)?;

        let record = SignalRecord::new(series.open_time(index), &event, &self.symbol);
        self.log.info(series, index, record);

        let rectangle = Rectangle::for_signal(series, &event);
        self.log.info(
            series,
            index,
            format_args!(
                "{} time1 = [{}], time2 = [{}]",
                rectangle.name,
                format_time_frame(rectangle.time1, false),
                format_time_frame(rectangle.time2, false)
            ),
        );
        chart.draw_rectangle(rectangle);

        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::render::{Color, RecordingChart};
    use crate::series::{Bar, BarBuffer};

    fn t(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap() + Duration::hours(4 * i as i64)
    }

    fn eurusd() -> SymbolInfo {
        SymbolInfo::new("EURUSD", "H4", 0.0001).unwrap()
    }

    /// Full-body bar, 100 pips tall
    fn fat(i: usize) -> Bar {
        Bar::new(1.1000, 1.1100, 1.1000, 1.1100, t(i))
    }

    /// Hammer: body at the top, core about 20% of a 100 pip range
    fn hammer(i: usize) -> Bar {
        Bar::new(1.1080, 1.1100, 1.1000, 1.1090, t(i))
    }

    #[test]
    fn test_default_config() {
        let config = GroupPinBarConfig::default();
        assert_eq!(config.bar_count, 500);
        assert_eq!(config.group_size.get(), 2);
        assert_eq!(config.min_pips, 20);
        assert_eq!(config.percent.get(), 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config: GroupPinBarConfig =
            serde_json::from_str(r#"{"group_size": 3, "percent": 25}"#).unwrap();
        assert_eq!(config.group_size.get(), 3);
        assert_eq!(config.percent.get(), 25);
        assert_eq!(config.min_pips, 20);

        assert!(serde_json::from_str::<GroupPinBarConfig>(r#"{"group_size": 4}"#).is_err());
        assert!(serde_json::from_str::<GroupPinBarConfig>(r#"{"grup_size": 2}"#).is_err());
    }

    #[test]
    fn test_config_rejects_large_min_pips() {
        let config = GroupPinBarConfig {
            min_pips: 101,
            ..Default::default()
        };
        let bars: Vec<Bar> = (0..5).map(fat).collect();
        assert!(GroupPinBar::new(&bars, eurusd(), &config).is_err());
    }

    #[test]
    fn test_with_params() {
        let mut params = HashMap::new();
        params.insert("GroupSize", 1.0);
        params.insert("MinPips", 0.0);
        let config = GroupPinBarConfig::with_params(&params).unwrap();
        assert_eq!(config.group_size.get(), 1);
        assert_eq!(config.min_pips, 0);
        assert_eq!(config.bar_count, 500);

        params.insert("GroupSize", 4.0);
        assert!(GroupPinBarConfig::with_params(&params).is_err());
    }

    #[test]
    fn test_describe_order() {
        let names: Vec<&str> = GroupPinBarConfig::default()
            .describe()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        let meta_names: Vec<&str> = GroupPinBarConfig::param_meta().iter().map(|m| m.name).collect();
        assert_eq!(names, meta_names);
    }

    #[test]
    fn test_scanner_config_converts_pips() {
        let config = GroupPinBarConfig::default().scanner_config(&eurusd()).unwrap();
        assert!((config.thresholds.min_height - 0.002).abs() < 1e-12);
        assert_eq!(config.max_window_size.get(), 2);
    }

    #[test]
    fn test_signal_record_format() {
        let record = SignalRecord {
            open_time: Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
            window_size: 2,
            height_pips: 25.04,
            core_pips: 5.0,
            core_percent: 19.97,
        };
        assert_eq!(
            record.to_string(),
            "[2024-03-04 08:00] [2] height = 25.0, core = 5.0, percent = 20.0%"
        );
    }

    #[test]
    fn test_calculate_draws_rectangle() {
        let mut bars: Vec<Bar> = (0..5).map(fat).collect();
        bars.push(hammer(5));
        // bearish full body: folded with the hammer the core is 80%
        bars.push(Bar::new(1.1100, 1.1100, 1.1000, 1.1000, t(6)));

        let mut indicator = GroupPinBar::new(&bars, eurusd(), &GroupPinBarConfig::default()).unwrap();
        let mut chart = RecordingChart::new();

        let events: Vec<SignalEvent> = (0..bars.len())
            .filter_map(|i| indicator.calculate(&bars, i, &mut chart))
            .collect();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].end_index, 5);
        assert_eq!(events[0].window_size, 1);

        let rect = chart.rectangle("RP[5,1]").unwrap();
        assert_eq!(rect.color, Color::Yellow);
        assert_eq!(rect.price1, 1.1100);
        assert_eq!(rect.price2, 1.1080);
        assert_eq!(rect.time1, t(5) - Duration::hours(2));
        assert_eq!(rect.time2, t(5) + Duration::hours(2));
    }

    #[test]
    fn test_hammer_then_full_body_folds_into_two_bar_signal() {
        let mut bars: Vec<Bar> = (0..5).map(fat).collect();
        bars.push(hammer(5));
        bars.push(fat(6));

        let mut indicator = GroupPinBar::new(&bars, eurusd(), &GroupPinBarConfig::default()).unwrap();
        let mut chart = RecordingChart::new();

        let events: Vec<SignalEvent> = (0..bars.len())
            .filter_map(|i| indicator.calculate(&bars, i, &mut chart))
            .collect();

        let found: Vec<(usize, usize)> = events.iter().map(|e| (e.end_index, e.window_size)).collect();
        assert_eq!(found, vec![(5, 1), (6, 2)]);
        assert!(chart.rectangle("RP[5,1]").is_some());

        let rect = chart.rectangle("RP[6,2]").unwrap();
        assert_eq!(rect.color, Color::Yellow);
        assert_eq!(rect.price1, 1.1100);
        assert_eq!(rect.price2, 1.1080);
        assert_eq!(rect.time1, t(5) - Duration::hours(2));
        assert_eq!(rect.time2, t(6) + Duration::hours(2));
    }

    #[test]
    fn test_min_pips_filters_small_composites() {
        // 10 pip bars throughout: no window of up to two bars reaches 20 pips
        let mut bars: Vec<Bar> = (0..4)
            .map(|i| Bar::new(1.1000, 1.1010, 1.1000, 1.1010, t(i)))
            .collect();
        bars.push(Bar::new(1.1008, 1.1010, 1.1000, 1.1009, t(4)));

        let mut indicator = GroupPinBar::new(&bars, eurusd(), &GroupPinBarConfig::default()).unwrap();
        let mut chart = RecordingChart::new();
        assert!(indicator.calculate(&bars, 4, &mut chart).is_none());
        assert!(chart.is_empty());
    }

    #[test]
    fn test_short_history_is_inert() {
        let bars: Vec<Bar> = (0..2).map(hammer).collect();
        let mut indicator = GroupPinBar::new(&bars, eurusd(), &GroupPinBarConfig::default()).unwrap();
        let mut chart = RecordingChart::new();
        assert!(!indicator.is_valid());
        assert!(indicator.calculate(&bars, 1, &mut chart).is_none());
    }

    #[test]
    fn test_live_tail_signal_drawn_once() {
        let mut buffer = BarBuffer::from_closed((0..4).map(fat).collect()).unwrap();
        buffer.open_bar(hammer(4)).unwrap();

        let mut indicator = GroupPinBar::new(&buffer, eurusd(), &GroupPinBarConfig::default()).unwrap();
        let mut chart = RecordingChart::new();

        assert!(indicator.calculate(&buffer, 4, &mut chart).is_some());
        assert!(indicator.calculate(&buffer, 4, &mut chart).is_none());
        assert_eq!(chart.len(), 1);
        // no bar after the open one: right edge uses the previous gap
        let rect = chart.rectangle("RP[4,1]").unwrap();
        assert_eq!(rect.time2, t(4) + Duration::hours(2));
    }
}
