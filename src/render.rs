//! Chart drawing boundary.
//!
//! Indicators describe shapes; a [`ChartRenderer`] puts them on a chart.
//! [`RecordingChart`] keeps them in memory, keyed by name like a chart host.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::series::BarSeries;
use crate::SignalEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Color {
    Yellow,
    Red,
    OrangeRed,
    LightGreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LineStyle {
    Solid,
    Dots,
}

/// Axis-aligned box between two times and two prices
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Rectangle {
    pub name: String,
    pub time1: DateTime<Utc>,
    pub price1: f64,
    pub time2: DateTime<Utc>,
    pub price2: f64,
    pub color: Color,
}

impl Rectangle {
    /// Box covering a signal's composite: from halfway to the bar before
    /// `start_index` to halfway to the bar after `end_index`.
    ///
    /// Yellow for an upper-anchored composite, red otherwise.
    pub fn for_signal<S: BarSeries + ?Sized>(series: &S, event: &SignalEvent) -> Self {
        let (price1, price2) = event.extent_prices();
        let (time1, time2) = signal_time_span(series, event);
        let color = if event.is_up() { Color::Yellow } else { Color::Red };

        Self {
            name: format!("RP[{},{}]", event.end_index, event.window_size),
            time1,
            price1,
            time2,
            price2,
            color,
        }
    }
}

/// Vertical line at a point in time
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VerticalLine {
    pub name: String,
    pub time: DateTime<Utc>,
    pub color: Color,
    pub thickness: u32,
    pub style: LineStyle,
}

/// Drawing surface supplied by the host
pub trait ChartRenderer {
    fn draw_rectangle(&mut self, rectangle: Rectangle);
    fn draw_vertical_line(&mut self, line: VerticalLine);
}

/// In-memory chart. Drawing a shape under an existing name replaces it.
#[derive(Debug, Clone, Default)]
pub struct RecordingChart {
    rectangles: BTreeMap<String, Rectangle>,
    lines: BTreeMap<String, VerticalLine>,
}

impl RecordingChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rectangle(&self, name: &str) -> Option<&Rectangle> {
        self.rectangles.get(name)
    }

    pub fn rectangles(&self) -> impl Iterator<Item = &Rectangle> {
        self.rectangles.values()
    }

    pub fn line(&self, name: &str) -> Option<&VerticalLine> {
        self.lines.get(name)
    }

    pub fn lines(&self) -> impl Iterator<Item = &VerticalLine> {
        self.lines.values()
    }

    pub fn len(&self) -> usize {
        self.rectangles.len() + self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChartRenderer for RecordingChart {
    fn draw_rectangle(&mut self, rectangle: Rectangle) {
        self.rectangles.insert(rectangle.name.clone(), rectangle);
    }

    fn draw_vertical_line(&mut self, line: VerticalLine) {
        self.lines.insert(line.name.clone(), line);
    }
}

// ============================================================
// TIME EXTENT
// ============================================================

/// Horizontal extent of a signal marker.
///
/// Gaps are measured per signal rather than from a fixed bar period, since
/// the gap across a weekend is far longer than a normal bar.
pub fn signal_time_span<S: BarSeries + ?Sized>(
    series: &S,
    event: &SignalEvent,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = event.start_index;
    let end = event.end_index;
    (
        series.open_time(start) - half_gap_before(series, start),
        series.open_time(end) + half_gap_after(series, end),
    )
}

/// Half the gap to the previous bar, or to the next bar for index 0
fn half_gap_before<S: BarSeries + ?Sized>(series: &S, index: usize) -> TimeDelta {
    if index > 0 {
        (series.open_time(index) - series.open_time(index - 1)) / 2
    } else if series.count() > 1 {
        (series.open_time(1) - series.open_time(0)) / 2
    } else {
        TimeDelta::zero()
    }
}

/// Half the gap to the next bar, or to the previous bar for the last index
fn half_gap_after<S: BarSeries + ?Sized>(series: &S, index: usize) -> TimeDelta {
    if index + 1 < series.count() {
        (series.open_time(index + 1) - series.open_time(index)) / 2
    } else {
        half_gap_before(series, index)
    }
}
