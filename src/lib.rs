//! Region-keyed procurement analytics: dataset loading with sample fallback,
//! accent-insensitive region lookup, per-view selection state and the pure
//! view models (stat cards, charts, tables) drawn on a render surface.

pub mod chart;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod loader;
pub mod overview;
pub mod output;
pub mod resolver;
pub mod sample;
pub mod selector;
pub mod surface;
pub mod types;
pub mod util;
pub mod views;

pub use dashboard::Dashboard;
pub use error::{DashboardError, Result};
pub use selector::RegionDataSelector;
