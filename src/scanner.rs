//! Incremental scan driver.
//!
//! The host offers bar indices in non-decreasing order. [`ScanCursor`] decides
//! which offers are new work; [`PatternScanner`] tries composite windows of
//! 1..=group size bars ending at the offered index and reports the first,
//! smallest window that qualifies.

use tracing::{debug, warn};

use crate::composite::{CompositeCandle, SignalThresholds};
use crate::series::BarSeries;
use crate::window::{first_eligible_index, window_start};
use crate::{GroupSize, SignalEvent};

// ============================================================
// SCAN CURSOR
// ============================================================

/// Eligibility boundary plus the last index already evaluated.
///
/// Each offered index is evaluated at most once, so a still-open tail bar
/// offered on every tick is only looked at the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor {
    first_eligible_index: Option<usize>,
    last_processed_index: Option<usize>,
}

impl ScanCursor {
    /// Cursor over a series of `total_bar_count` bars that keeps `buffer_size`
    /// bars of history behind every evaluated index. `bar_count_limit == 0`
    /// means no limit.
    pub fn new(total_bar_count: usize, bar_count_limit: usize, buffer_size: usize) -> Self {
        Self {
            first_eligible_index: first_eligible_index(total_bar_count, bar_count_limit, buffer_size),
            last_processed_index: None,
        }
    }

    /// False when there was not enough history; every offer is then ignored
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.first_eligible_index.is_some()
    }

    #[inline]
    pub fn first_eligible_index(&self) -> Option<usize> {
        self.first_eligible_index
    }

    #[inline]
    pub fn last_processed_index(&self) -> Option<usize> {
        self.last_processed_index
    }

    /// Permanently switch the cursor off
    pub fn disable(&mut self) {
        self.first_eligible_index = None;
    }

    /// Whether `index` is new, eligible work
    pub fn accepts(&self, index: usize) -> bool {
        match self.first_eligible_index {
            None => false,
            Some(first) if index < first => false,
            Some(_) => self.last_processed_index.map_or(true, |last| index > last),
        }
    }

    /// Record `index` as evaluated
    pub fn mark_processed(&mut self, index: usize) {
        debug_assert!(
            self.last_processed_index.map_or(true, |last| index >= last),
            "scan cursor moved backwards from {:?} to {index}",
            self.last_processed_index
        );
        self.last_processed_index = Some(index);
    }
}

// ============================================================
// PATTERN SCANNER
// ============================================================

/// Scanner configuration
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ScannerConfig {
    /// Largest composite window tried, also the history buffer kept behind each index
    pub max_window_size: GroupSize,
    /// Only scan the last `bar_count_limit` bars; 0 scans everything
    pub bar_count_limit: usize,
    pub thresholds: SignalThresholds,
}

/// Incremental composite-candle scanner
#[derive(Debug, Clone)]
pub struct PatternScanner {
    cursor: ScanCursor,
    config: ScannerConfig,
}

impl PatternScanner {
    /// Set up a scanner for a series currently holding `total_bar_count` bars.
    ///
    /// When there is not enough history the scanner is built anyway but stays
    /// inert: [`is_valid`](Self::is_valid) is false and every offer is a no-op.
    pub fn initialize(total_bar_count: usize, config: ScannerConfig) -> Self {
        let cursor = ScanCursor::new(
            total_bar_count,
            config.bar_count_limit,
            config.max_window_size.get(),
        );

        if !cursor.is_valid() {
            warn!(
                total_bar_count,
                group_size = config.max_window_size.get(),
                "not enough bars to scan, scanner disabled"
            );
        }

        Self { cursor, config }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.cursor.is_valid()
    }

    #[inline]
    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    #[inline]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Evaluate the bar at `index`.
    ///
    /// Ignored when the scanner is inert, `index` is before the first eligible
    /// index, or `index` was already evaluated. Otherwise windows of 1..=group
    /// size bars ending at `index` are tried in ascending size and the first
    /// one that qualifies is returned; larger windows are not tried.
    pub fn offer<S: BarSeries + ?Sized>(&mut self, series: &S, index: usize) -> Option<SignalEvent> {
        if !self.cursor.accepts(index) {
            return None;
        }

        let event = (1..=self.config.max_window_size.get()).find_map(|window_size| {
            let start = window_start(index, window_size);
            let candle = CompositeCandle::classify(series, start, index, &self.config.thresholds);
            candle.is_signal.then_some(SignalEvent {
                start_index: start,
                end_index: index,
                window_size,
                candle,
            })
        });

        self.cursor.mark_processed(index);

        if let Some(e) = &event {
            debug!(
                start = e.start_index,
                end = e.end_index,
                window_size = e.window_size,
                core_percent = ?e.candle.core_percent,
                "composite signal"
            );
        }

        event
    }

    /// Offer every index of `series` in order and collect the signals
    pub fn scan_all<S: BarSeries + ?Sized>(&mut self, series: &S) -> Vec<SignalEvent> {
        (0..series.count())
            .filter_map(|index| self.offer(series, index))
            .collect()
    }
}
