//! Summary statistics over a reconstructed dataset.
//!
//! - **RunningStats**: online mean/std (Welford), no buffering
//! - **DatasetSummary**: table sizes, side counts, order outcomes, lifetimes
//!
//! # Usage
//!
//! ```
//! use trade_log_reconstructor::statistics::RunningStats;
//!
//! let mut stats = RunningStats::new();
//! for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
//!     stats.update(v);
//! }
//! assert!((stats.mean - 5.0).abs() < 1e-10);
//! assert!((stats.std() - 2.0).abs() < 1e-10);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::table::Dataset;
use crate::types::{Side, Timestamp};

// ============================================================================
// Running Statistics (Welford's Algorithm)
// ============================================================================

/// Online mean and standard deviation.
///
/// Uses Welford's algorithm, so values are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    /// Number of observations
    pub count: u64,
    /// Running mean
    pub mean: f64,
    /// Sum of squared differences from the mean
    m2: f64,
    /// Minimum value observed
    pub min: f64,
    /// Maximum value observed
    pub max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Add one observation. Non-finite values are skipped.
    #[inline]
    pub fn update(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);

        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Population variance.
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / self.count as f64
    }

    #[inline]
    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Min, or `None` when empty.
    pub fn min_value(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    /// Max, or `None` when empty.
    pub fn max_value(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        for value in iter {
            stats.update(value);
        }
        stats
    }
}

// ============================================================================
// Dataset Summary
// ============================================================================

/// Headline figures for a reconstructed dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub spot_ticks: usize,
    pub linear_ticks: usize,
    pub trades: usize,
    pub spreads: usize,
    pub borders: usize,
    pub orders: usize,

    pub buy_trades: usize,
    pub sell_trades: usize,
    pub buy_orders: usize,
    pub sell_orders: usize,

    /// Completed orders keyed by final status name
    pub orders_by_status: BTreeMap<String, usize>,

    /// Order lifetime in seconds
    pub order_lifetime: RunningStats,

    /// Spot mid price
    pub spot_mid: RunningStats,

    /// Primary spread metric
    pub spread_s1: RunningStats,

    pub first_timestamp: Option<Timestamp>,
    pub last_timestamp: Option<Timestamp>,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut orders_by_status = BTreeMap::new();
        for order in dataset.orders.iter() {
            if let Some(status) = order.final_status {
                *orders_by_status.entry(status.as_str().to_string()).or_insert(0) += 1;
            }
        }

        let (first_timestamp, last_timestamp) = dataset.time_range().unzip();

        Self {
            spot_ticks: dataset.spot.len(),
            linear_ticks: dataset.linear.len(),
            trades: dataset.trades.len(),
            spreads: dataset.spreads.len(),
            borders: dataset.borders.len(),
            orders: dataset.orders.len(),
            buy_trades: dataset.trades_by_side(Side::Buy).count(),
            sell_trades: dataset.trades_by_side(Side::Sell).count(),
            buy_orders: dataset.orders_by_side(Side::Buy).count(),
            sell_orders: dataset.orders_by_side(Side::Sell).count(),
            orders_by_status,
            order_lifetime: dataset
                .orders
                .iter()
                .filter_map(|o| o.lifetime_seconds())
                .collect(),
            spot_mid: dataset.spot.iter().map(|tick| tick.mid()).collect(),
            spread_s1: dataset.spreads.iter().map(|s| s.s1).collect(),
            first_timestamp,
            last_timestamp,
        }
    }

    /// Duration covered by the dataset in seconds.
    pub fn duration_seconds(&self) -> Option<f64> {
        let (first, last) = (self.first_timestamp?, self.last_timestamp?);
        (last - first).num_microseconds().map(|us| us as f64 / 1e6)
    }

    /// Multi-line summary for logging/display.
    pub fn summary(&self) -> String {
        let statuses = self
            .orders_by_status
            .iter()
            .map(|(status, n)| format!("{status}={n}"))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Dataset:\n  \
            Ticks: spot={} (mid mean={:.4}), linear={}\n  \
            Trades: {} (buy={}, sell={})\n  \
            Orders: {} (buy={}, sell={}) [{}]\n  \
            Order lifetime (s): mean={:.3}, std={:.3}, max={:.3}\n  \
            Spreads: {}, borders: {}",
            self.spot_ticks,
            self.spot_mid.mean,
            self.linear_ticks,
            self.trades,
            self.buy_trades,
            self.sell_trades,
            self.orders,
            self.buy_orders,
            self.sell_orders,
            statuses,
            self.order_lifetime.mean,
            self.order_lifetime.std(),
            self.order_lifetime.max_value().unwrap_or(0.0),
            self.spreads,
            self.borders,
        )
    }
}
