//! Windowing arithmetic shared by the scanner and the indicators.
//!
//! Pure functions: where a scan may safely begin, where a trailing window
//! starts, and a few price/time reductions over a window.

use chrono::{DateTime, Utc};

use crate::series::BarSeries;
use crate::{OHLCExt, OHLC};

/// Fewest bars a series must hold before anything is computed.
/// Two inter-bar gaps are needed to estimate the bar period.
pub const MIN_HISTORY: usize = 3;

/// Default number of leading bars kept out of reach as lookback buffer
pub const DEFAULT_BUFFER_SIZE: usize = 1;

/// First index that can be evaluated with `buffer_size` bars of history behind it.
///
/// `requested_bar_count == 0` (or anything >= `total_bar_count`) means "as much
/// history as possible". Returns `None` when the series is too short or the
/// buffer is zero.
pub fn first_eligible_index(
    total_bar_count: usize,
    requested_bar_count: usize,
    buffer_size: usize,
) -> Option<usize> {
    if buffer_size < 1 || total_bar_count < buffer_size || total_bar_count < MIN_HISTORY {
        return None;
    }

    if requested_bar_count == 0 || requested_bar_count >= total_bar_count {
        return Some(buffer_size);
    }

    Some((total_bar_count - requested_bar_count).max(buffer_size))
}

/// Inclusive start of the `window_size`-bar window ending at `end_index`.
///
/// Panics when the window is empty or reaches below index 0.
#[inline]
pub fn window_start(end_index: usize, window_size: usize) -> usize {
    assert!(window_size >= 1, "window size must be at least 1");
    assert!(
        window_size <= end_index + 1,
        "window of {window_size} bars ending at {end_index} starts before the series"
    );
    end_index + 1 - window_size
}

/// Highest high over `[start, end]`
pub fn highest_high<S: BarSeries + ?Sized>(series: &S, start: usize, end: usize) -> f64 {
    (start..=end)
        .map(|i| series.bar(i).high())
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Lowest low over `[start, end]`
pub fn lowest_low<S: BarSeries + ?Sized>(series: &S, start: usize, end: usize) -> f64 {
    (start..=end)
        .map(|i| series.bar(i).low())
        .fold(f64::INFINITY, f64::min)
}

/// Bar period in seconds: the smaller of the first two gaps.
///
/// Taking the smaller gap skips a weekend or session break that happens to
/// fall between the first bars.
pub fn time_frame_seconds<S: BarSeries + ?Sized>(series: &S) -> Option<i64> {
    if series.count() < MIN_HISTORY {
        return None;
    }
    let gap0 = (series.open_time(1) - series.open_time(0)).num_seconds();
    let gap1 = (series.open_time(2) - series.open_time(1)).num_seconds();
    Some(gap0.min(gap1))
}

/// Offset used to keep chart markers clear of the bars.
///
/// Mean range of the trailing `count + 1` bars (all bars if fewer), in pips
/// when `pip_size > 0` and in price units otherwise, divided by `factor`.
/// Zero for an empty series or `count == 0`.
pub fn draw_distance<S: BarSeries + ?Sized>(series: &S, pip_size: f64, count: usize, factor: f64) -> f64 {
    if series.count() == 0 || count == 0 {
        return 0.0;
    }
    let last = series.count() - 1;
    let (start, count) = match last.checked_sub(count) {
        Some(start) => (start, count),
        None => (0, last + 1),
    };

    // Sums count + 1 ranges but divides by count.
    let sum: f64 = (start..=last).map(|i| series.bar(i).range()).sum();
    let divisor = if pip_size > 0.0 {
        pip_size * count as f64
    } else {
        count as f64
    };

    sum / divisor / factor
}

/// Chart-label time: `MM-dd HH:mm`, or `yyyy-MM-dd HH:mm` when `short` is false
pub fn format_time_frame(time: DateTime<Utc>, short: bool) -> String {
    if short {
        time.format("%m-%d %H:%M").to_string()
    } else {
        time.format("%Y-%m-%d %H:%M").to_string()
    }
}
