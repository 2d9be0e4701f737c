//! Time-ordered tables of reconstructed records.
//!
//! Every table is stable-sorted ascending by its time column when it is
//! materialized: rows with equal times keep their log order. Orders sort by
//! `start_time`. An empty table still carries its column schema, so a
//! consumer never has to special-case missing data.
//!
//! Each table serializes as `{ "columns": [...], "rows": [...] }`.

use std::io::Write;

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::error::Result;
use crate::statistics::DatasetSummary;
use crate::types::{BorderSample, Order, OrderStatus, PriceTick, Side, SpreadSample, Timestamp, Trade};

// ============================================================================
// Row
// ============================================================================

/// A record that can be placed in a [`Table`].
pub trait Row: Serialize {
    /// Column names, in serialization order.
    const COLUMNS: &'static [&'static str];

    /// Sort key.
    fn time(&self) -> Timestamp;
}

impl Row for PriceTick {
    const COLUMNS: &'static [&'static str] = &["time", "ask", "bid", "venue"];

    #[inline]
    fn time(&self) -> Timestamp {
        self.time
    }
}

impl Row for Trade {
    const COLUMNS: &'static [&'static str] = &["time", "price", "side", "symbol"];

    #[inline]
    fn time(&self) -> Timestamp {
        self.time
    }
}

impl Row for SpreadSample {
    const COLUMNS: &'static [&'static str] = &["time", "s1", "s2"];

    #[inline]
    fn time(&self) -> Timestamp {
        self.time
    }
}

impl Row for BorderSample {
    const COLUMNS: &'static [&'static str] = &["time", "b1", "b2", "b3", "b4"];

    #[inline]
    fn time(&self) -> Timestamp {
        self.time
    }
}

impl Row for Order {
    const COLUMNS: &'static [&'static str] = &[
        "start_time",
        "price",
        "side",
        "symbol",
        "order_id",
        "status",
        "end_time",
        "final_status",
    ];

    #[inline]
    fn time(&self) -> Timestamp {
        self.start_time
    }
}

// ============================================================================
// Table
// ============================================================================

/// Rows sorted ascending by [`Row::time`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    rows: Vec<R>,
}

impl<R: Row> Table<R> {
    /// Stable-sort `rows` by time.
    pub fn from_unsorted(mut rows: Vec<R>) -> Self {
        rows.sort_by_key(|r| r.time());
        Self { rows }
    }

    /// Re-sort in place. A no-op on an already materialized table.
    pub fn sort(&mut self) {
        self.rows.sort_by_key(|r| r.time());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn first(&self) -> Option<&R> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&R> {
        self.rows.last()
    }

    /// Column schema, present even when the table is empty.
    pub fn columns(&self) -> &'static [&'static str] {
        R::COLUMNS
    }

    /// Rows with `start <= time < end`.
    pub fn between(&self, start: Timestamp, end: Timestamp) -> &[R] {
        let lo = self.rows.partition_point(|r| r.time() < start);
        let hi = self.rows.partition_point(|r| r.time() < end);
        if hi <= lo {
            return &[];
        }
        &self.rows[lo..hi]
    }

    /// Check the time ordering.
    pub fn is_sorted(&self) -> bool {
        self.rows.windows(2).all(|w| w[0].time() <= w[1].time())
    }

    /// First and last time, if non-empty.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        Some((self.first()?.time(), self.last()?.time()))
    }
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl<R: Row> Serialize for Table<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Table", 2)?;
        state.serialize_field("columns", R::COLUMNS)?;
        state.serialize_field("rows", &self.rows)?;
        state.end()
    }
}

// ============================================================================
// Order Segments
// ============================================================================

/// Horizontal segment geometry for one completed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSegment {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub price: f64,
    pub side: Side,
    pub final_status: OrderStatus,
}

impl OrderSegment {
    /// Segment for a closed order; `None` while the order is open.
    pub fn from_order(order: &Order) -> Option<Self> {
        Some(Self {
            start_time: order.start_time,
            end_time: order.end_time?,
            price: order.price,
            side: order.side,
            final_status: order.final_status?,
        })
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// The six reconstructed tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub spot: Table<PriceTick>,
    pub linear: Table<PriceTick>,
    pub trades: Table<Trade>,
    pub spreads: Table<SpreadSample>,
    pub borders: Table<BorderSample>,
    pub orders: Table<Order>,
}

impl Dataset {
    /// Materialize tables from records in log order.
    pub fn from_parts(
        spot: Vec<PriceTick>,
        linear: Vec<PriceTick>,
        trades: Vec<Trade>,
        spreads: Vec<SpreadSample>,
        borders: Vec<BorderSample>,
        orders: Vec<Order>,
    ) -> Self {
        Self {
            spot: Table::from_unsorted(spot),
            linear: Table::from_unsorted(linear),
            trades: Table::from_unsorted(trades),
            spreads: Table::from_unsorted(spreads),
            borders: Table::from_unsorted(borders),
            orders: Table::from_unsorted(orders),
        }
    }

    /// Total rows across all tables.
    pub fn total_rows(&self) -> usize {
        self.spot.len()
            + self.linear.len()
            + self.trades.len()
            + self.spreads.len()
            + self.borders.len()
            + self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    /// Segments for every completed order, in `start_time` order.
    pub fn order_segments(&self) -> Vec<OrderSegment> {
        self.orders.iter().filter_map(OrderSegment::from_order).collect()
    }

    pub fn orders_by_side(&self, side: Side) -> impl Iterator<Item = &Order> + '_ {
        self.orders.iter().filter(move |o| o.side == side)
    }

    pub fn trades_by_side(&self, side: Side) -> impl Iterator<Item = &Trade> + '_ {
        self.trades.iter().filter(move |t| t.side == side)
    }

    /// Earliest and latest time across all tables.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        [
            self.spot.time_range(),
            self.linear.time_range(),
            self.trades.time_range(),
            self.spreads.time_range(),
            self.borders.time_range(),
            self.orders.time_range(),
        ]
        .into_iter()
        .flatten()
        .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_dataset(self)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the dataset as JSON.
    pub fn write_json<W: Write>(&self, writer: W, pretty: bool) -> Result<()> {
        if pretty {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_json::to_writer(writer, self)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Venue;
    use chrono::NaiveDate;

    fn t(s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, s)
            .unwrap()
    }

    fn tick(s: u32, ask: f64) -> PriceTick {
        PriceTick {
            time: t(s),
            ask,
            bid: ask - 0.1,
            venue: Venue::Spot,
        }
    }

    fn closed_order(start: u32, end: u32, side: Side, status: OrderStatus) -> Order {
        let mut order = Order::open(t(start), 100.0, side, "BTCUSDT", "1");
        order.close(t(end), status);
        order
    }

    #[test]
    fn test_stable_sort_preserves_ties() {
        let table = Table::from_unsorted(vec![tick(5, 1.0), tick(3, 2.0), tick(5, 3.0), tick(3, 4.0)]);
        let asks: Vec<f64> = table.iter().map(|r| r.ask).collect();
        assert_eq!(asks, vec![2.0, 4.0, 1.0, 3.0]);
        assert!(table.is_sorted());
    }

    #[test]
    fn test_resort_is_idempotent() {
        let mut table = Table::from_unsorted(vec![tick(2, 1.0), tick(1, 2.0), tick(2, 3.0)]);
        let before = table.clone();
        table.sort();
        assert_eq!(table, before);
    }

    #[test]
    fn test_empty_table_keeps_schema() {
        let table: Table<SpreadSample> = Table::default();
        assert!(table.is_empty());
        assert_eq!(table.columns(), &["time", "s1", "s2"]);

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["columns"], serde_json::json!(["time", "s1", "s2"]));
        assert_eq!(json["rows"], serde_json::json!([]));
    }

    #[test]
    fn test_between_is_half_open() {
        let table = Table::from_unsorted((1..=5).map(|s| tick(s, s as f64)).collect());
        let slice = table.between(t(2), t(4));
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].time, t(2));
        assert_eq!(slice[1].time, t(3));
        assert!(table.between(t(4), t(2)).is_empty());
    }

    #[test]
    fn test_orders_sort_by_start_time() {
        let table = Table::from_unsorted(vec![
            closed_order(5, 6, Side::Buy, OrderStatus::Filled),
            closed_order(1, 9, Side::Sell, OrderStatus::Replaced),
        ]);
        assert_eq!(table.first().unwrap().start_time, t(1));
    }

    #[test]
    fn test_order_segments() {
        let dataset = Dataset::from_parts(
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![
                closed_order(2, 3, Side::Buy, OrderStatus::Filled),
                closed_order(1, 4, Side::Sell, OrderStatus::ActiveAtEnd),
            ],
        );

        let segments = dataset.order_segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].side, Side::Sell);
        assert_eq!(segments[1].end_time, t(3));
        assert_eq!(segments[1].final_status, OrderStatus::Filled);
        assert_eq!(dataset.orders_by_side(Side::Buy).count(), 1);
    }

    #[test]
    fn test_dataset_json_layout() {
        let dataset = Dataset::from_parts(vec![tick(1, 10.0)], vec![], vec![], vec![], vec![], vec![]);
        let value: serde_json::Value = serde_json::from_str(&dataset.to_json_string().unwrap()).unwrap();

        assert_eq!(value["spot"]["rows"][0]["venue"], "spot");
        assert_eq!(value["spot"]["rows"][0]["time"], "2024-01-01T00:00:01");
        assert_eq!(value["orders"]["columns"][7], "final_status");
        assert_eq!(value["linear"]["rows"], serde_json::json!([]));
    }

    #[test]
    fn test_time_range() {
        let dataset = Dataset::from_parts(
            vec![tick(4, 1.0)],
            vec![tick(2, 1.0)],
            vec![],
            vec![],
            vec![],
            vec![],
        );
        assert_eq!(dataset.time_range(), Some((t(2), t(4))));
        assert_eq!(Dataset::default().time_range(), None);
    }
}
