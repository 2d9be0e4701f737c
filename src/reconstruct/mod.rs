//! Log reconstruction engine.
//!
//! Turns raw log lines into a time-ordered [`Dataset`](crate::table::Dataset):
//! clock repair, order lifecycle tracking, and per-table collection.

pub mod clock;
mod collector;
pub mod order_lifecycle;
pub mod reconstructor;

pub use clock::{ClockConfig, ClockReading, ClockStats, Rollover, RolloverKind, TimeOfDayClock};
pub use collector::EventCollector;
pub use order_lifecycle::{LifecycleEvent, LifecycleStats, OrderHandle, OrderLifecycleTracker};
pub use reconstructor::{
    parse_file, parse_file_with_config, parse_str, LineOutcome, LogReconstructor, ParseOutput,
    ParseStats, ReconstructorConfig,
};
