pub mod checkpoint;
pub mod config;
pub mod metric;
pub mod sync_state;

pub use metric::{MetricKind, Sample};
