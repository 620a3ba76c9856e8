//! Bar storage as seen by the scanner.
//!
//! The host owns the bars; the scanner only reads them through [`BarSeries`].
//! Indices run 0..count in arrival order and the last index may be a bar that
//! is still accumulating ticks.

use chrono::{DateTime, Utc};

use crate::{OHLCExt, PatternError, Result, OHLC};

/// Read-only view of a forward-growing bar series
pub trait BarSeries {
    type Bar: OHLC;

    fn count(&self) -> usize;

    /// Bar at `index`. Panics when `index >= count()`.
    fn bar(&self, index: usize) -> &Self::Bar;

    fn open_time(&self, index: usize) -> DateTime<Utc> {
        self.bar(index).open_time()
    }

    /// True when the bar at `count() - 1` has not closed yet
    fn is_last_bar_open(&self) -> bool {
        false
    }

    #[inline]
    fn is_last_index(&self, index: usize) -> bool {
        index + 1 == self.count()
    }
}

impl<T: OHLC> BarSeries for [T] {
    type Bar = T;

    #[inline]
    fn count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn bar(&self, index: usize) -> &T {
        &self[index]
    }
}

impl<T: OHLC> BarSeries for Vec<T> {
    type Bar = T;

    #[inline]
    fn count(&self) -> usize {
        self.len()
    }

    #[inline]
    fn bar(&self, index: usize) -> &T {
        &self[index]
    }
}

// ============================================================
// BAR
// ============================================================

/// Plain OHLC bar with its open timestamp
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub open_time: DateTime<Utc>,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64, open_time: DateTime<Utc>) -> Self {
        Self {
            open,
            high,
            low,
            close,
            open_time,
        }
    }
}

impl OHLC for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn open_time(&self) -> DateTime<Utc> {
        self.open_time
    }
}

// ============================================================
// BAR BUFFER - append-only series with an open tail
// ============================================================

/// Append-only bar series whose last bar may still be open.
///
/// Only the open tail bar can be replaced; closed bars never change.
#[derive(Debug, Clone)]
pub struct BarBuffer<T = Bar> {
    bars: Vec<T>,
    last_open: bool,
}

impl<T: OHLC> Default for BarBuffer<T> {
    fn default() -> Self {
        Self {
            bars: Vec::new(),
            last_open: false,
        }
    }
}

impl<T: OHLC> BarBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from bars that are all closed
    pub fn from_closed(bars: Vec<T>) -> Result<Self> {
        let mut buffer = Self::new();
        for bar in bars {
            buffer.push_closed(bar)?;
        }
        Ok(buffer)
    }

    /// Append a closed bar. Closes the current tail first if it was open.
    pub fn push_closed(&mut self, bar: T) -> Result<()> {
        self.append(bar)?;
        self.last_open = false;
        Ok(())
    }

    /// Append a new bar that is still accumulating
    pub fn open_bar(&mut self, bar: T) -> Result<()> {
        self.append(bar)?;
        self.last_open = true;
        Ok(())
    }

    /// Replace the open tail bar with a fresher snapshot of the same period
    pub fn update_open(&mut self, bar: T) -> Result<()> {
        if !self.last_open {
            return Err(PatternError::InvalidValue("no open bar to update"));
        }
        let index = self.bars.len() - 1;
        if bar.open_time() != self.bars[index].open_time() {
            return Err(PatternError::InvalidOHLC {
                index,
                reason: "open bar update changed open time",
            });
        }
        bar.validate().map_err(|_| PatternError::InvalidOHLC {
            index,
            reason: "invalid prices in open bar update",
        })?;
        self.bars[index] = bar;
        Ok(())
    }

    /// Mark the tail bar as final
    pub fn close_last(&mut self) {
        self.last_open = false;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.bars
    }

    fn append(&mut self, bar: T) -> Result<()> {
        let index = self.bars.len();
        if let Some(last) = self.bars.last() {
            if bar.open_time() <= last.open_time() {
                return Err(PatternError::InvalidOHLC {
                    index,
                    reason: "open time not increasing",
                });
            }
        }
        bar.validate().map_err(|e| match e {
            PatternError::InvalidOHLC { reason, .. } => PatternError::InvalidOHLC { index, reason },
            other => other,
        })?;
        self.bars.push(bar);
        Ok(())
    }
}

impl<T: OHLC> BarSeries for BarBuffer<T> {
    type Bar = T;

    #[inline]
    fn count(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    fn bar(&self, index: usize) -> &T {
        &self.bars[index]
    }

    #[inline]
    fn is_last_bar_open(&self) -> bool {
        self.last_open
    }
}
