//! # trade-log-reconstructor
//!
//! Rebuilds clean, time-ordered tables from the pipe-delimited event log of
//! a trading bot.
//!
//! The log stamps every line with a bare time of day that can jump backward
//! across half-day and day boundaries, and it reports orders as loosely
//! correlated status records. This crate repairs the timeline and
//! reconstructs each order's lifecycle (open, intermediate states, terminal
//! outcome), producing six tables ready for charting:
//!
//! | Table | Rows |
//! |-------|------|
//! | `spot` / `linear` | [`PriceTick`] (ask, bid) per venue |
//! | `trades` | [`Trade`] executions |
//! | `spreads` | [`SpreadSample`] (s1, s2) |
//! | `borders` | [`BorderSample`] (b1..b4) |
//! | `orders` | completed [`Order`]s with final status |
//!
//! ## Quick Start
//!
//! ```rust
//! use trade_log_reconstructor::{parse_str, OrderStatus, Side};
//!
//! let log = "\
//! 00:00:01.000000|Top|BTCSpot|100.5|100.0
//! 00:00:02.000000|UserOrder|BTCUSDT|100.2|_|_|Buy|5|New
//! 00:00:03.000000|UserOrder|BTCUSDT|100.2|_|_|Buy|5|Filled
//! ";
//!
//! let output = parse_str(log);
//! let order = &output.dataset.orders.rows()[0];
//! assert_eq!(order.side, Side::Buy);
//! assert_eq!(order.final_status, Some(OrderStatus::Filled));
//! ```
//!
//! ### From a file
//!
//! ```ignore
//! use trade_log_reconstructor::{LogReconstructor, ReconstructorConfig, FileSource};
//!
//! let mut recon = LogReconstructor::with_config(ReconstructorConfig::diagnostic());
//! recon.process_source(FileSource::new("bot.log")?)?;
//! let output = recon.finish();
//!
//! output.log_summary();
//! output.dataset.write_json(std::io::stdout().lock(), false)?;
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Records: `PriceTick`, `Trade`, `Order`, `Side`, `OrderStatus` |
//! | [`classifier`] | Line splitting and typed classification |
//! | [`reconstruct`] | `TimeOfDayClock`, `OrderLifecycleTracker`, `LogReconstructor` |
//! | [`table`] | `Table`, `Dataset`, `OrderSegment` |
//! | [`statistics`] | `RunningStats`, `DatasetSummary` |
//! | [`loader`] / [`source`] | File loading and line sources |
//! | [`warnings`] | Warning tracking: `WarningTracker`, `Warning`, `WarningCategory` |

pub mod classifier;
pub mod error;
pub mod loader;
pub mod reconstruct;
pub mod source;
pub mod statistics;
pub mod table;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{ReconError, RecordError, Result};
pub use types::{
    BorderSample, Order, OrderStatus, PriceTick, Side, SpreadSample, Timestamp, Trade, Venue,
};

// Re-exports - Reconstruction
pub use reconstruct::{
    parse_file, parse_file_with_config, parse_str, ClockConfig, LogReconstructor,
    OrderLifecycleTracker, ParseOutput, ParseStats, ReconstructorConfig, TimeOfDayClock,
};

// Re-exports - Tables
pub use table::{Dataset, OrderSegment, Row, Table};

// Re-exports - Statistics
pub use statistics::{DatasetSummary, RunningStats};

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};

// Re-exports - Input
pub use loader::{LoaderStats, LogLoader};
pub use source::{FileSource, LogSource, SourceMetadata, VecSource};
