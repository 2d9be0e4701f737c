//! Warning tracking for dropped records and clock anomalies.
//!
//! Log reconstruction is best-effort: malformed lines are skipped, and order
//! updates that match nothing are dropped. None of that is fatal, but all of
//! it should be traceable back to a line in the input. Warnings are
//! categorized and carry the 1-based line number and the adjusted data
//! timestamp when one was known. They can be exported as JSON.
//!
//! # Example
//!
//! ```
//! use trade_log_reconstructor::warnings::{WarningCategory, WarningTracker};
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record_simple(WarningCategory::UnknownEvent, 17, "Unknown event type: \"Ping\"");
//!
//! let summary = tracker.summary();
//! assert_eq!(summary.total, 1);
//! assert_eq!(summary.by_category.get("UNKNOWN_EVENT"), Some(&1));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ahash::AHashMap;

use crate::error::Result;
use crate::types::Timestamp;

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Record failed to split or coerce (too few fields, bad number, bad side)
    MalformedRecord,

    /// Time-of-day field could not be parsed
    MalformedTimestamp,

    /// Event tag not recognized
    UnknownEvent,

    /// Top record for a symbol that is neither spot nor linear
    UnknownVenue,

    /// Order update or terminal event matched no live order
    OrderUnresolved,

    /// Order event with a status the tracker does not interpret
    UnknownStatus,

    /// Clock jumped backward and a day/half-day offset was applied
    ClockRollover,

    /// Clock jumped backward by an amount no correction applies to
    ClockRegression,

    /// Other/uncategorized warning
    Other,
}

impl WarningCategory {
    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::MalformedRecord => "MALFORMED_RECORD",
            WarningCategory::MalformedTimestamp => "MALFORMED_TIMESTAMP",
            WarningCategory::UnknownEvent => "UNKNOWN_EVENT",
            WarningCategory::UnknownVenue => "UNKNOWN_VENUE",
            WarningCategory::OrderUnresolved => "ORDER_UNRESOLVED",
            WarningCategory::UnknownStatus => "UNKNOWN_STATUS",
            WarningCategory::ClockRollover => "CLOCK_ROLLOVER",
            WarningCategory::ClockRegression => "CLOCK_REGRESSION",
            WarningCategory::Other => "OTHER",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::MalformedRecord => 2,
            WarningCategory::MalformedTimestamp => 2,
            WarningCategory::UnknownEvent => 1,
            WarningCategory::UnknownVenue => 1,
            WarningCategory::OrderUnresolved => 2,
            WarningCategory::UnknownStatus => 1,
            WarningCategory::ClockRollover => 1,
            WarningCategory::ClockRegression => 3,
            WarningCategory::Other => 1,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Unique warning ID (auto-incremented)
    pub id: u64,

    /// Warning category
    pub category: WarningCategory,

    /// 1-based line number in the input
    pub line: usize,

    /// Human-readable message
    pub message: String,

    /// Adjusted data timestamp, if the line's clock field parsed
    pub data_timestamp: Option<Timestamp>,

    /// Related order ID (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(id: u64, category: WarningCategory, line: usize, message: impl Into<String>) -> Self {
        Self {
            id,
            category,
            line,
            message: message.into(),
            data_timestamp: None,
            order_id: None,
        }
    }

    /// Set the data timestamp.
    pub fn with_data_timestamp(mut self, ts: Timestamp) -> Self {
        self.data_timestamp = Some(ts);
        self
    }

    /// Set the order ID.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings (including those past the storage cap)
    pub total: u64,

    /// Count by category name
    pub by_category: BTreeMap<String, u64>,

    /// Count by severity
    pub by_severity: BTreeMap<u8, u64>,

    /// Line of the first stored warning
    pub first_line: Option<usize>,

    /// Line of the last stored warning
    pub last_line: Option<usize>,

    /// Number of unique order IDs involved
    pub unique_orders: u64,

    /// Warnings counted but not stored
    pub truncated: u64,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings to keep in memory
    pub max_warnings: usize,

    /// Whether to emit each recorded warning through `log::debug!`
    pub log_warnings: bool,

    /// Minimum severity to log (1=all, 2=medium+, 3=high only)
    pub min_log_severity: u8,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_warnings: 10_000,
            log_warnings: false,
            min_log_severity: 1,
        }
    }
}

impl WarningTrackerConfig {
    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings;
        self
    }

    pub fn with_logging(mut self, min_severity: u8) -> Self {
        self.log_warnings = true;
        self.min_log_severity = min_severity;
        self
    }
}

/// Collects warnings for a single parse run.
#[derive(Debug, Clone)]
pub struct WarningTracker {
    config: WarningTrackerConfig,

    /// Stored warnings (up to `max_warnings`)
    warnings: Vec<Warning>,

    next_id: u64,

    /// Count by category (keeps counting past the cap)
    category_counts: AHashMap<WarningCategory, u64>,

    /// Unique order IDs seen in warnings
    unique_orders: HashSet<String>,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    /// Create a new warning tracker with custom configuration.
    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: 1,
            category_counts: AHashMap::new(),
            unique_orders: HashSet::new(),
        }
    }

    /// Record a warning. Returns the assigned ID.
    ///
    /// The warning is always counted; it is stored only while below
    /// `max_warnings`.
    pub fn record(&mut self, mut warning: Warning) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        warning.id = id;

        if self.config.log_warnings && warning.category.severity() >= self.config.min_log_severity {
            log::debug!(
                "[{}] line {}: {}",
                warning.category.name(),
                warning.line,
                warning.message
            );
        }

        if let Some(order_id) = &warning.order_id {
            self.unique_orders.insert(order_id.clone());
        }

        *self.category_counts.entry(warning.category).or_insert(0) += 1;

        if self.warnings.len() < self.config.max_warnings {
            self.warnings.push(warning);
        }

        id
    }

    /// Record a warning with just category, line and message.
    pub fn record_simple(
        &mut self,
        category: WarningCategory,
        line: usize,
        message: impl Into<String>,
    ) -> u64 {
        self.record(Warning::new(0, category, line, message))
    }

    /// Record a warning tied to a data timestamp and optionally an order.
    pub fn record_at(
        &mut self,
        category: WarningCategory,
        line: usize,
        message: impl Into<String>,
        timestamp: Option<Timestamp>,
        order_id: Option<&str>,
    ) -> u64 {
        let mut warning = Warning::new(0, category, line, message);
        if let Some(ts) = timestamp {
            warning = warning.with_data_timestamp(ts);
        }
        if let Some(id) = order_id.filter(|id| !id.is_empty()) {
            warning = warning.with_order_id(id);
        }
        self.record(warning)
    }

    /// Get the number of warnings stored.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Check if no warnings have been recorded.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Get total count, including warnings past the storage cap.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    /// Get count for a specific category.
    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Get all stored warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Get stored warnings by category.
    pub fn warnings_by_category(&self, category: WarningCategory) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// Get summary statistics.
    pub fn summary(&self) -> WarningSummary {
        let mut by_category = BTreeMap::new();
        let mut by_severity = BTreeMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        let total = self.total_count();

        WarningSummary {
            total,
            by_category,
            by_severity,
            first_line: self.warnings.first().map(|w| w.line),
            last_line: self.warnings.last().map(|w| w.line),
            unique_orders: self.unique_orders.len() as u64,
            truncated: total.saturating_sub(self.warnings.len() as u64),
        }
    }

    /// Write `{ "summary": ..., "warnings": [...] }` as JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            summary: WarningSummary,
            warnings: &'a [Warning],
        }

        serde_json::to_writer_pretty(
            writer,
            &Export {
                summary: self.summary(),
                warnings: &self.warnings,
            },
        )?;
        Ok(())
    }

    /// Export warnings to a JSON file.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Clear all warnings.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.unique_orders.clear();
        self.next_id = 1;
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}
