//! Chart indicators built on the scanning core
//!
//! Each indicator owns its own cursor (or scanner) and its own log handle;
//! nothing is shared between instances.
//!
//! - **GroupPinBar**: composite pin bars over 1..=3 bar windows, drawn as rectangles
//! - **PriceRange**: per-bar height, body height, cross-star and pin-bar markers
//! - **WeekSeparator**: vertical lines at trading-week boundaries

pub mod group_pin_bar;
pub mod price_range;
pub mod week_separator;

pub use group_pin_bar::*;
pub use price_range::*;
pub use week_separator::*;
