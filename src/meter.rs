//! Input level metering pipeline
//!
//! This module turns raw decibel power readings into a bounded history of
//! normalized intensities and down-samples that history into a fixed number
//! of display bars.
//!
//! The pipeline is organized into:
//! - `level`: decibel to normalized intensity conversion
//! - `history`: bounded ring of recent intensity values
//! - `bars`: chunked-mean reduction of the ring for rendering

mod bars;
mod history;
mod level;

pub use bars::aggregate;
pub use history::HistoryRing;
pub use level::DB_FLOOR;
pub use level::normalize_db;

/// Maximum number of intensity values retained for visualization.
pub const HISTORY_CAPACITY: usize = 80;
