//! Line-by-line log reconstruction.
//!
//! Each raw line passes through:
//!
//! 1. split on `|`
//! 2. time-of-day clock (rollover repair)
//! 3. classification into a typed record
//! 4. the order lifecycle tracker (`UserOrder`) or the event collector
//!
//! Any step may reject the line with a [`RecordError`]. Rejections are
//! counted, optionally tracked as warnings, and never stop the run.
//! [`LogReconstructor::finish`] force-closes open orders and materializes the
//! dataset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classifier::{self, LogEvent, OrderEvent, TIME_FIELD};
use crate::error::{RecordError, Result};
use crate::source::{FileSource, LogSource, SourceMetadata, VecSource};
use crate::statistics::DatasetSummary;
use crate::table::Dataset;
use crate::types::{OrderStatus, Timestamp};
use crate::warnings::{WarningCategory, WarningTracker, WarningTrackerConfig};

use super::clock::{ClockConfig, ClockStats, Rollover, RolloverKind, TimeOfDayClock};
use super::collector::EventCollector;
use super::order_lifecycle::{LifecycleEvent, LifecycleStats, OrderLifecycleTracker};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for a reconstruction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructorConfig {
    /// Clock anchoring
    pub clock: ClockConfig,

    /// Whether dropped records and clock anomalies are kept as warnings
    pub track_warnings: bool,

    /// Cap on stored warnings (counts continue past it)
    pub max_warnings: usize,

    /// Emit a `log::debug!` line for every dropped record
    pub log_dropped_records: bool,
}

impl Default for ReconstructorConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            track_warnings: true,
            max_warnings: 10_000,
            log_dropped_records: false,
        }
    }
}

impl ReconstructorConfig {
    /// Counters only: no warnings stored, nothing logged per record.
    pub fn quiet() -> Self {
        Self {
            track_warnings: false,
            log_dropped_records: false,
            ..Default::default()
        }
    }

    /// Keep every warning and log every dropped record.
    pub fn diagnostic() -> Self {
        Self {
            track_warnings: true,
            max_warnings: usize::MAX,
            log_dropped_records: true,
            ..Default::default()
        }
    }

    pub fn with_clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_anchor_date(mut self, anchor_date: NaiveDate) -> Self {
        self.clock = self.clock.with_anchor_date(anchor_date);
        self
    }

    pub fn with_warnings(mut self, track: bool) -> Self {
        self.track_warnings = track;
        self
    }

    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings;
        self
    }

    pub fn with_dropped_record_logging(mut self, enabled: bool) -> Self {
        self.log_dropped_records = enabled;
        self
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Per-line outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Lines seen, including blank ones
    pub lines: u64,

    /// Empty or whitespace-only lines
    pub blank_lines: u64,

    /// Non-blank lines without a `|`
    pub missing_separator: u64,

    /// Lines whose time field failed to parse
    pub timestamps_rejected: u64,

    /// Records stored in a table (ticks, trades, spreads, borders)
    pub records: u64,

    /// `UserOrder` events handed to the lifecycle tracker
    pub order_events: u64,

    /// `Candle` records consumed
    pub candles: u64,

    /// Lines with an unrecognized event tag
    pub unknown_events: u64,

    /// Known events dropped by field count or coercion
    pub dropped: u64,
}

impl ParseStats {
    /// Lines rejected for any reason.
    pub fn rejected(&self) -> u64 {
        self.missing_separator + self.timestamps_rejected + self.unknown_events + self.dropped
    }

    fn count_rejection(&mut self, err: &RecordError) {
        match err {
            RecordError::MissingSeparator => self.missing_separator += 1,
            RecordError::InvalidTimestamp(_) => self.timestamps_rejected += 1,
            RecordError::UnknownEventType(_) => self.unknown_events += 1,
            RecordError::TooFewFields { .. }
            | RecordError::InvalidNumber { .. }
            | RecordError::InvalidSide(_)
            | RecordError::UnknownVenue(_) => self.dropped += 1,
        }
    }
}

/// What a single accepted line did.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Nothing on the line
    Blank,

    /// Stored in one of the record tables
    Stored,

    /// `Candle`, consumed without a record
    Candle,

    /// Handed to the lifecycle tracker; `None` when the tracker dropped it
    Order(Option<LifecycleEvent>),
}

// ============================================================================
// Parse Output
// ============================================================================

/// Everything a finished run produces.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub dataset: Dataset,
    pub parse_stats: ParseStats,
    pub clock_stats: ClockStats,
    pub lifecycle_stats: LifecycleStats,
    pub warnings: WarningTracker,
    /// Sources fed to the run, in order
    pub sources: Vec<SourceMetadata>,
}

impl ParseOutput {
    pub fn summary(&self) -> DatasetSummary {
        self.dataset.summary()
    }

    /// Log the run summary at info level.
    pub fn log_summary(&self) {
        let summary = self.summary();
        log::info!("{}", summary.summary());
        log::info!(
            "Lines: {} ({} rejected, {} blank), clock corrections: {} (uncorrected regressions: {})",
            self.parse_stats.lines,
            self.parse_stats.rejected(),
            self.parse_stats.blank_lines,
            self.clock_stats.corrections(),
            self.clock_stats.uncorrected_regressions,
        );
        log::info!(
            "Orders found: Buy={}, Sell={}; trades found: {}; fill rate: {:.1}%",
            summary.buy_orders,
            summary.sell_orders,
            summary.trades,
            self.lifecycle_stats.fill_rate() * 100.0,
        );
        if self.warnings.total_count() > 0 {
            log::info!("Warnings: {}", self.warnings.total_count());
        }
    }
}

// ============================================================================
// Log Reconstructor
// ============================================================================

/// Owns all state for one parse run.
#[derive(Debug, Clone)]
pub struct LogReconstructor {
    config: ReconstructorConfig,
    clock: TimeOfDayClock,
    tracker: OrderLifecycleTracker,
    collector: EventCollector,
    warnings: WarningTracker,
    stats: ParseStats,
    sources: Vec<SourceMetadata>,
}

impl LogReconstructor {
    /// Create a reconstructor with default configuration.
    ///
    /// # Example
    /// ```
    /// use trade_log_reconstructor::LogReconstructor;
    ///
    /// let mut recon = LogReconstructor::new();
    /// recon.process_text("00:00:01|Top|BTCSpot|100.5|100.0\n");
    /// let output = recon.finish();
    /// assert_eq!(output.dataset.spot.len(), 1);
    /// ```
    pub fn new() -> Self {
        Self::with_config(ReconstructorConfig::default())
    }

    pub fn with_config(config: ReconstructorConfig) -> Self {
        let warnings = WarningTracker::with_config(
            WarningTrackerConfig::default().with_max_warnings(config.max_warnings),
        );

        Self {
            clock: TimeOfDayClock::new(config.clock.clone()),
            tracker: OrderLifecycleTracker::new(),
            collector: EventCollector::new(),
            warnings,
            stats: ParseStats::default(),
            sources: Vec::new(),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &ReconstructorConfig {
        &self.config
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    pub fn clock(&self) -> &TimeOfDayClock {
        &self.clock
    }

    pub fn tracker(&self) -> &OrderLifecycleTracker {
        &self.tracker
    }

    pub fn warnings(&self) -> &WarningTracker {
        &self.warnings
    }

    /// Process one raw line.
    ///
    /// A rejected line is counted and noted before the error is returned;
    /// callers may ignore the result.
    pub fn process_line(&mut self, line: &str) -> std::result::Result<LineOutcome, RecordError> {
        self.stats.lines += 1;
        let line_no = self.stats.lines as usize;

        if line.trim().is_empty() {
            self.stats.blank_lines += 1;
            return Ok(LineOutcome::Blank);
        }

        let mut time = None;
        let result = self.apply_line(line, line_no, &mut time);
        if let Err(err) = &result {
            self.stats.count_rejection(err);
            self.note(line_no, err.category(), err.to_string(), time, None);
        }
        result
    }

    fn apply_line(
        &mut self,
        line: &str,
        line_no: usize,
        time: &mut Option<Timestamp>,
    ) -> std::result::Result<LineOutcome, RecordError> {
        let fields = classifier::split_record(line)?;

        let reading = self.clock.advance(fields[TIME_FIELD])?;
        *time = Some(reading.timestamp);
        if let Some(rollover) = reading.rollover {
            self.note_rollover(line_no, reading.timestamp, &rollover);
        }

        let outcome = match classifier::classify(&fields, reading.timestamp)? {
            LogEvent::UserOrder(event) => {
                self.stats.order_events += 1;
                let result = self.tracker.process(&event);
                if result.is_none() {
                    self.note_dropped_order(line_no, &event);
                }
                LineOutcome::Order(result)
            }
            LogEvent::Candle => {
                self.stats.candles += 1;
                LineOutcome::Candle
            }
            event => {
                self.collector.collect(event);
                self.stats.records += 1;
                LineOutcome::Stored
            }
        };

        Ok(outcome)
    }

    fn note_rollover(&mut self, line_no: usize, at: Timestamp, rollover: &Rollover) {
        match rollover.kind {
            RolloverKind::HalfDay | RolloverKind::FullDay => {
                log::debug!(
                    "Line {}: clock jumped {:.3}s, offset now {}s",
                    line_no,
                    rollover.delta_seconds(),
                    rollover.offset_after.num_seconds()
                );
                self.note(
                    line_no,
                    WarningCategory::ClockRollover,
                    format!(
                        "{:?} rollover after a {:.6}s jump",
                        rollover.kind,
                        rollover.delta_seconds()
                    ),
                    Some(at),
                    None,
                );
            }
            RolloverKind::Uncorrected => {
                log::warn!(
                    "Line {}: clock went back {:.3}s, outside every correction window",
                    line_no,
                    -rollover.delta_seconds()
                );
                self.note(
                    line_no,
                    WarningCategory::ClockRegression,
                    format!("Uncorrected {:.6}s jump", rollover.delta_seconds()),
                    Some(at),
                    None,
                );
            }
        }
    }

    fn note_dropped_order(&mut self, line_no: usize, event: &OrderEvent) {
        let (category, message) = match OrderStatus::parse(&event.status) {
            None => (
                WarningCategory::UnknownStatus,
                format!("Unknown order status {:?}", event.status),
            ),
            Some(OrderStatus::New) => (
                WarningCategory::MalformedRecord,
                format!("New order on {} without a Buy/Sell side", event.symbol),
            ),
            Some(status) => (
                WarningCategory::OrderUnresolved,
                format!(
                    "{} for id {:?} on {} matched no live order",
                    status, event.order_id, event.symbol
                ),
            ),
        };
        self.note(
            line_no,
            category,
            message,
            Some(event.time),
            Some(event.order_id.as_str()),
        );
    }

    fn note(
        &mut self,
        line_no: usize,
        category: WarningCategory,
        message: String,
        time: Option<Timestamp>,
        order_id: Option<&str>,
    ) {
        if self.config.log_dropped_records {
            log::debug!("Line {} [{}]: {}", line_no, category.name(), message);
        }
        if self.config.track_warnings {
            self.warnings
                .record_at(category, line_no, message, time, order_id);
        }
    }

    /// Process every line of `text`.
    pub fn process_text(&mut self, text: &str) {
        for line in text.lines() {
            let _ = self.process_line(line);
        }
    }

    /// Drain a [`LogSource`]. Returns the number of lines processed.
    pub fn process_source<S: LogSource>(&mut self, source: S) -> Result<u64> {
        let metadata = source.metadata().clone();
        log::info!(
            "Reading source {}: {} bytes, {} lines",
            metadata.label.as_deref().unwrap_or("<memory>"),
            metadata.file_size.map_or_else(|| "?".to_string(), |n| n.to_string()),
            metadata.line_count.map_or_else(|| "?".to_string(), |n| n.to_string()),
        );
        self.sources.push(metadata);

        let before = self.stats.lines;
        for line in source.lines()? {
            let _ = self.process_line(&line);
        }
        Ok(self.stats.lines - before)
    }

    /// Close open orders and materialize the dataset.
    ///
    /// Open orders end at the last adjusted timestamp, or at the anchor if
    /// no timestamp was ever parsed.
    pub fn finish(mut self) -> ParseOutput {
        let end_time = self
            .clock
            .last_adjusted()
            .unwrap_or_else(|| self.clock.anchor());
        let flushed = self.tracker.flush(end_time);

        let orders = self.tracker.take_completed();
        let dataset = self.collector.into_dataset(orders);

        log::info!(
            "Reconstructed {} rows from {} lines ({} orders, {} still active at end)",
            dataset.total_rows(),
            self.stats.lines,
            dataset.orders.len(),
            flushed
        );

        ParseOutput {
            dataset,
            parse_stats: self.stats,
            clock_stats: self.clock.stats().clone(),
            lifecycle_stats: self.tracker.stats().clone(),
            warnings: self.warnings,
            sources: self.sources,
        }
    }
}

impl Default for LogReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Convenience
// ============================================================================

/// Parse a log file with default configuration.
///
/// Fails only when the file cannot be read.
pub fn parse_file(path: impl AsRef<std::path::Path>) -> Result<ParseOutput> {
    parse_file_with_config(path, ReconstructorConfig::default())
}

pub fn parse_file_with_config(
    path: impl AsRef<std::path::Path>,
    config: ReconstructorConfig,
) -> Result<ParseOutput> {
    let source = FileSource::new(path)?;
    let mut recon = LogReconstructor::with_config(config);
    recon.process_source(source)?;
    Ok(recon.finish())
}

/// Parse log text already in memory.
pub fn parse_str(text: &str) -> ParseOutput {
    let mut recon = LogReconstructor::new();
    // VecSource never fails
    let _ = recon.process_source(VecSource::from_text(text));
    recon.finish()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, Venue};

    fn t(h: u32, m: u32, s: u32, us: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_micro_opt(h, m, s, us)
            .unwrap()
    }

    const SCENARIO: &str = "\
00:00:01.000000|Top|BTCSpot|100.5|100.0
00:00:02.000000|UserOrder|BTCUSDT|100.2|_|_|Buy|5|New
00:00:03.000000|UserOrder|BTCUSDT|100.2|_|_|Buy|5|Filled
11:59:59.500000|Top|BTCSpot|101.0|100.8
";

    #[test]
    fn test_example_scenario() {
        let output = parse_str(SCENARIO);
        let dataset = &output.dataset;

        assert_eq!(dataset.spot.len(), 2);
        assert_eq!(dataset.spot.rows()[0].time, t(0, 0, 1, 0));
        assert_eq!(dataset.spot.rows()[1].time, t(11, 59, 59, 500_000));
        assert_eq!(output.clock_stats.corrections(), 0);

        assert_eq!(dataset.orders.len(), 1);
        let order = &dataset.orders.rows()[0];
        assert_eq!(order.final_status, Some(OrderStatus::Filled));
        assert_eq!(order.start_time, t(0, 0, 2, 0));
        assert_eq!(order.end_time, Some(t(0, 0, 3, 0)));
        assert_eq!(order.price, 100.2);
        assert_eq!(order.side, Side::Buy);
    }

    #[test]
    fn test_half_day_rollover_applied_to_records() {
        let output = parse_str(
            "23:00:00|Top|BTCSpot|1|1\n\
             11:00:00|Top|BTCSpot|2|2\n",
        );
        let ticks = output.dataset.spot.rows();
        assert_eq!(ticks[1].time, t(23, 0, 0, 0));
        assert_eq!(output.clock_stats.half_day_corrections, 1);
        assert_eq!(output.warnings.count_by_category(WarningCategory::ClockRollover), 1);
    }

    #[test]
    fn test_full_day_rollover_keeps_order_lifetime_positive() {
        let output = parse_str(
            "23:59:59|UserOrder|ETHUSDT|10|_|_|Sell|9|New\n\
             00:00:01|UserOrder|ETHUSDT|10|_|_|Sell|9|Cancelled\n",
        );
        let order = &output.dataset.orders.rows()[0];
        assert_eq!(order.lifetime_seconds(), Some(2.0));
        assert_eq!(order.final_status, Some(OrderStatus::Cancelled));
        assert_eq!(output.clock_stats.full_day_corrections, 1);
    }

    #[test]
    fn test_uncorrected_regression_is_tracked() {
        let output = parse_str(
            "12:00:00|Candle\n\
             01:00:00|Candle\n",
        );
        assert_eq!(output.clock_stats.uncorrected_regressions, 1);
        assert_eq!(output.warnings.count_by_category(WarningCategory::ClockRegression), 1);
        assert_eq!(output.parse_stats.candles, 2);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let mut recon = LogReconstructor::new();

        assert_eq!(
            recon.process_line("garbage"),
            Err(RecordError::MissingSeparator)
        );
        assert!(matches!(
            recon.process_line("25:00:00|Top|BTCSpot|1|1"),
            Err(RecordError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            recon.process_line("00:00:01|Ping|x"),
            Err(RecordError::UnknownEventType(_))
        ));
        assert!(matches!(
            recon.process_line("00:00:02|Top|BTCPerp|1|1"),
            Err(RecordError::UnknownVenue(_))
        ));
        assert!(matches!(
            recon.process_line("00:00:03|UserTrade|BTC|abc|_|Buy"),
            Err(RecordError::InvalidNumber { .. })
        ));
        assert_eq!(recon.process_line(""), Ok(LineOutcome::Blank));
        assert_eq!(
            recon.process_line("00:00:04|Top|BTCLinear|2|1"),
            Ok(LineOutcome::Stored)
        );

        let output = recon.finish();
        let stats = &output.parse_stats;
        assert_eq!(stats.lines, 7);
        assert_eq!(stats.missing_separator, 1);
        assert_eq!(stats.timestamps_rejected, 1);
        assert_eq!(stats.unknown_events, 1);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.records, 1);
        assert_eq!(stats.rejected(), 5);

        assert_eq!(output.dataset.linear.len(), 1);
        assert_eq!(output.dataset.linear.rows()[0].venue, Venue::Linear);
        assert_eq!(output.warnings.total_count(), 5);
        assert_eq!(output.warnings.warnings()[1].line, 2);
    }

    #[test]
    fn test_bad_timestamp_leaves_clock_untouched() {
        let mut recon = LogReconstructor::new();
        let _ = recon.process_line("10:00:00|Candle");
        let _ = recon.process_line("xx:00:00|Candle");
        assert_eq!(recon.clock().last_adjusted(), Some(t(10, 0, 0, 0)));
    }

    #[test]
    fn test_active_at_end_uses_last_timestamp() {
        let output = parse_str(
            "00:00:01|UserOrder|BTCUSDT|100|_|_|buy|1|New\n\
             00:00:05|Spreads|0.5\n",
        );
        let order = &output.dataset.orders.rows()[0];
        assert_eq!(order.final_status, Some(OrderStatus::ActiveAtEnd));
        assert_eq!(order.end_time, Some(t(0, 0, 5, 0)));
        assert_eq!(output.dataset.spreads.rows()[0].s2, 0.5);
    }

    #[test]
    fn test_flush_without_timestamps_uses_anchor() {
        let recon = LogReconstructor::new();
        let output = recon.finish();
        assert!(output.dataset.is_empty());
        assert_eq!(output.dataset.orders.columns().len(), 8);
    }

    #[test]
    fn test_dropped_order_updates_are_noted() {
        let output = parse_str(
            "00:00:01|UserOrder|BTCUSDT|100|_|_|Buy|1|PartiallyFilled\n\
             00:00:02|UserOrder|BTCUSDT|100|_|_|Hold|2|New\n\
             00:00:03|UserOrder|BTCUSDT|100|_|_|Buy|3|Expired\n",
        );
        assert_eq!(output.parse_stats.order_events, 3);
        assert_eq!(output.warnings.count_by_category(WarningCategory::OrderUnresolved), 1);
        assert_eq!(output.warnings.count_by_category(WarningCategory::MalformedRecord), 1);
        assert_eq!(output.warnings.count_by_category(WarningCategory::UnknownStatus), 1);
        assert!(output.dataset.orders.is_empty());
    }

    #[test]
    fn test_quiet_config_stores_no_warnings() {
        let mut recon = LogReconstructor::with_config(ReconstructorConfig::quiet());
        recon.process_text("garbage\n00:00:01|Ping\n");
        let output = recon.finish();
        assert_eq!(output.parse_stats.rejected(), 2);
        assert_eq!(output.warnings.total_count(), 0);
    }

    #[test]
    fn test_anchor_date_config() {
        let date = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();
        let mut recon =
            LogReconstructor::with_config(ReconstructorConfig::default().with_anchor_date(date));
        recon.process_text("00:00:01|Top|BTCSpot|1|1\n");
        let output = recon.finish();
        assert_eq!(output.dataset.spot.rows()[0].time.date(), date);
    }

    #[test]
    fn test_orders_with_equal_start_keep_slot_flush_order() {
        let output = parse_str(
            "00:00:01|UserOrder|BTCUSDT|100|_|_|Buy|1|New\n\
             00:00:02|UserOrder|ETHUSDT|50|_|_|Sell|2|New\n\
             00:00:02|UserOrder|BTCUSDT|101|_|_|Buy|3|New\n",
        );

        let ids: Vec<_> = output.dataset.orders.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
        assert_eq!(output.dataset.orders.rows()[0].final_status, Some(OrderStatus::Replaced));
        assert_eq!(output.lifecycle_stats.active_at_end, 2);
    }

    #[test]
    fn test_source_metadata_is_kept() {
        let mut recon = LogReconstructor::new();
        let source = VecSource::from_text("00:00:01|Candle\n00:00:02|Candle\n")
            .with_metadata(SourceMetadata::new().with_label("inline").with_line_count(2));
        assert_eq!(recon.process_source(source).unwrap(), 2);

        let output = recon.finish();
        assert_eq!(output.sources.len(), 1);
        assert_eq!(output.sources[0].label.as_deref(), Some("inline"));
        assert_eq!(output.sources[0].line_count, Some(2));
    }

    #[test]
    fn test_config_presets() {
        assert!(!ReconstructorConfig::quiet().track_warnings);
        let diagnostic = ReconstructorConfig::diagnostic();
        assert!(diagnostic.log_dropped_records);
        assert_eq!(diagnostic.max_warnings, usize::MAX);
    }
}
