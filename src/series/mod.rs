//! Demand series construction and training windows.

mod builder;
mod window;

pub use builder::{coerce_quantity, BuildReport, DailySeries, HourlySeries, SeriesBuilder};
pub use window::TrainingWindow;
