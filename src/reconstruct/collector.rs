//! Accumulates non-order records in log order.

use crate::classifier::LogEvent;
use crate::table::Dataset;
use crate::types::{BorderSample, Order, PriceTick, SpreadSample, Trade, Venue};

/// Per-table record buffers, unsorted until [`EventCollector::into_dataset`].
#[derive(Debug, Clone, Default)]
pub struct EventCollector {
    spot: Vec<PriceTick>,
    linear: Vec<PriceTick>,
    trades: Vec<Trade>,
    spreads: Vec<SpreadSample>,
    borders: Vec<BorderSample>,
    candles: u64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to its table.
    ///
    /// Returns `false` for events this collector does not store: `UserOrder`
    /// (owned by the lifecycle tracker) and `Candle` (counted only).
    pub fn collect(&mut self, event: LogEvent) -> bool {
        match event {
            LogEvent::Top(tick) => match tick.venue {
                Venue::Spot => self.spot.push(tick),
                Venue::Linear => self.linear.push(tick),
            },
            LogEvent::UserTrade(trade) => self.trades.push(trade),
            LogEvent::Spreads(sample) => self.spreads.push(sample),
            LogEvent::Border(sample) => self.borders.push(sample),
            LogEvent::Candle => {
                self.candles += 1;
                return false;
            }
            LogEvent::UserOrder(_) => return false,
        }
        true
    }

    pub fn spot_ticks(&self) -> &[PriceTick] {
        &self.spot
    }

    pub fn linear_ticks(&self) -> &[PriceTick] {
        &self.linear
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn candles(&self) -> u64 {
        self.candles
    }

    /// Records stored so far.
    pub fn len(&self) -> usize {
        self.spot.len() + self.linear.len() + self.trades.len() + self.spreads.len() + self.borders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize the six tables, adding the completed orders.
    pub fn into_dataset(self, orders: Vec<Order>) -> Dataset {
        Dataset::from_parts(
            self.spot,
            self.linear,
            self.trades,
            self.spreads,
            self.borders,
            orders,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, Timestamp};
    use chrono::NaiveDate;

    fn t(s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, s)
            .unwrap()
    }

    #[test]
    fn test_ticks_routed_by_venue() {
        let mut collector = EventCollector::new();
        collector.collect(LogEvent::Top(PriceTick {
            time: t(1),
            ask: 1.0,
            bid: 0.9,
            venue: Venue::Linear,
        }));
        collector.collect(LogEvent::Top(PriceTick {
            time: t(2),
            ask: 1.1,
            bid: 1.0,
            venue: Venue::Spot,
        }));

        assert_eq!(collector.spot_ticks().len(), 1);
        assert_eq!(collector.linear_ticks().len(), 1);
        assert_eq!(collector.spot_ticks()[0].time, t(2));
    }

    #[test]
    fn test_candle_counted_not_stored() {
        let mut collector = EventCollector::new();
        assert!(!collector.collect(LogEvent::Candle));
        assert_eq!(collector.candles(), 1);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_into_dataset_sorts() {
        let mut collector = EventCollector::new();
        for s in [3, 1, 2] {
            collector.collect(LogEvent::UserTrade(Trade {
                time: t(s),
                price: 10.0,
                side: Side::Buy,
                symbol: "X".into(),
            }));
        }

        let dataset = collector.into_dataset(Vec::new());
        assert_eq!(dataset.trades.len(), 3);
        assert!(dataset.trades.is_sorted());
        assert_eq!(dataset.trades.first().unwrap().time, t(1));
        assert!(dataset.orders.is_empty());
    }
}
