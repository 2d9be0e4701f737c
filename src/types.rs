//! Core data types for reconstructed trade log records.
//!
//! Every record carries a [`Timestamp`] produced by the clock reconstructor:
//! a naive date-time anchored on a fixed date, since the source log only
//! stores the time of day.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Reconstructed absolute timestamp (anchor date + corrected time of day).
pub type Timestamp = NaiveDateTime;

/// Order / trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse a side by case-folding the trimmed text.
    ///
    /// Anything other than `buy`/`sell` is unresolvable.
    ///
    /// ```
    /// use trade_log_reconstructor::Side;
    ///
    /// assert_eq!(Side::parse(" BUY "), Some(Side::Buy));
    /// assert_eq!(Side::parse("sell"), Some(Side::Sell));
    /// assert_eq!(Side::parse("hold"), None);
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    #[inline(always)]
    pub fn is_buy(self) -> bool {
        matches!(self, Side::Buy)
    }

    #[inline(always)]
    pub fn is_sell(self) -> bool {
        matches!(self, Side::Sell)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market a price tick was quoted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    /// Spot market (symbol contains `Spot`)
    Spot,
    /// Linear futures (symbol contains `Linear`)
    Linear,
}

impl Venue {
    /// Infer the venue from a `Top` symbol. `Spot` wins if both match.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        if symbol.contains("Spot") {
            Some(Venue::Spot)
        } else if symbol.contains("Linear") {
            Some(Venue::Linear)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Venue::Spot => "spot",
            Venue::Linear => "linear",
        }
    }
}

/// Order status as written in `UserOrder` records, plus the two inferred
/// terminal outcomes (`Replaced`, `ActiveAtEnd`).
///
/// `Cancelled` and `Canceled` are both emitted by the bot and are kept
/// distinct so the final status round-trips verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Untriggered,
    Triggered,
    Filled,
    Cancelled,
    Canceled,
    Rejected,
    /// Slot was reused by a later `New` before a logged terminal status
    Replaced,
    /// Still open when the log ended
    ActiveAtEnd,
}

impl OrderStatus {
    /// Parse a logged status. Matching is exact (case-sensitive).
    ///
    /// Inferred statuses are never parsed from the log.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "New" => Some(OrderStatus::New),
            "PartiallyFilled" => Some(OrderStatus::PartiallyFilled),
            "Untriggered" => Some(OrderStatus::Untriggered),
            "Triggered" => Some(OrderStatus::Triggered),
            "Filled" => Some(OrderStatus::Filled),
            "Cancelled" => Some(OrderStatus::Cancelled),
            "Canceled" => Some(OrderStatus::Canceled),
            "Rejected" => Some(OrderStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::PartiallyFilled => "PartiallyFilled",
            OrderStatus::Untriggered => "Untriggered",
            OrderStatus::Triggered => "Triggered",
            OrderStatus::Filled => "Filled",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Replaced => "Replaced",
            OrderStatus::ActiveAtEnd => "ActiveAtEnd",
        }
    }

    /// Overwrites the status in place without changing slot/id occupancy.
    #[inline]
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            OrderStatus::PartiallyFilled | OrderStatus::Untriggered | OrderStatus::Triggered
        )
    }

    /// Terminal status that appears in the log.
    #[inline]
    pub fn is_logged_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
        )
    }

    /// No further transition is possible from this status.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self.is_logged_terminal()
            || matches!(self, OrderStatus::Replaced | OrderStatus::ActiveAtEnd)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-of-book quote for one venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub time: Timestamp,
    pub ask: f64,
    pub bid: f64,
    pub venue: Venue,
}

impl PriceTick {
    /// Mid price, `(ask + bid) / 2`.
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.ask + self.bid) / 2.0
    }
}

/// Executed user trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub time: Timestamp,
    pub price: f64,
    pub side: Side,
    pub symbol: String,
}

/// Spread metric sample (`s2` defaults to `s1` when not logged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadSample {
    pub time: Timestamp,
    pub s1: f64,
    pub s2: f64,
}

/// Border metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderSample {
    pub time: Timestamp,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
    pub b4: f64,
}

/// A user order as reconstructed from its `UserOrder` records.
///
/// Open while `end_time`/`final_status` are `None`; once closed it is
/// moved to the completed sequence and never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub start_time: Timestamp,
    pub price: f64,
    pub side: Side,
    pub symbol: String,
    /// Exchange order id as logged (may be empty or `"0"`)
    pub order_id: String,
    /// Latest observed status
    pub status: OrderStatus,
    pub end_time: Option<Timestamp>,
    pub final_status: Option<OrderStatus>,
}

impl Order {
    /// Open a new order in `New` status.
    pub fn open(
        start_time: Timestamp,
        price: f64,
        side: Side,
        symbol: impl Into<String>,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            start_time,
            price,
            side,
            symbol: symbol.into(),
            order_id: order_id.into(),
            status: OrderStatus::New,
            end_time: None,
            final_status: None,
        }
    }

    /// Close the order with a terminal status.
    pub fn close(&mut self, at: Timestamp, final_status: OrderStatus) {
        self.end_time = Some(at);
        self.final_status = Some(final_status);
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.final_status.is_none()
    }

    /// Whether the id is usable for lookups (non-empty and not `"0"`).
    #[inline]
    pub fn has_trackable_id(&self) -> bool {
        is_trackable_id(&self.order_id)
    }

    /// Time between open and close, if closed.
    pub fn lifetime(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Lifetime in seconds (microsecond precision), if closed.
    pub fn lifetime_seconds(&self) -> Option<f64> {
        self.lifetime()
            .and_then(|d| d.num_microseconds())
            .map(|us| us as f64 / 1e6)
    }
}

/// Order ids are unusable when empty or the literal `"0"`.
#[inline]
pub fn is_trackable_id(order_id: &str) -> bool {
    !order_id.is_empty() && order_id != "0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_side_parse_case_folds() {
        assert_eq!(Side::parse("Buy"), Some(Side::Buy));
        assert_eq!(Side::parse("bUy"), Some(Side::Buy));
        assert_eq!(Side::parse("SELL\n"), Some(Side::Sell));
        assert_eq!(Side::parse(""), None);
        assert_eq!(Side::parse("_"), None);
    }

    #[test]
    fn test_venue_from_symbol() {
        assert_eq!(Venue::from_symbol("BERAUSDTSpot"), Some(Venue::Spot));
        assert_eq!(Venue::from_symbol("BERAUSDTLinear"), Some(Venue::Linear));
        assert_eq!(Venue::from_symbol("SpotLinear"), Some(Venue::Spot));
        assert_eq!(Venue::from_symbol("BERAUSDT"), None);
        // Case-sensitive
        assert_eq!(Venue::from_symbol("btcspot"), None);
    }

    #[test]
    fn test_order_status_parse_is_exact() {
        assert_eq!(OrderStatus::parse("Filled"), Some(OrderStatus::Filled));
        assert_eq!(OrderStatus::parse("Canceled"), Some(OrderStatus::Canceled));
        assert_eq!(OrderStatus::parse("Cancelled"), Some(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse("filled"), None);
        assert_eq!(OrderStatus::parse("Replaced"), None);
        assert_eq!(OrderStatus::parse("ActiveAtEnd"), None);
    }

    #[test]
    fn test_order_status_classes() {
        assert!(OrderStatus::Triggered.is_in_flight());
        assert!(!OrderStatus::New.is_in_flight());
        assert!(OrderStatus::Rejected.is_logged_terminal());
        assert!(!OrderStatus::Replaced.is_logged_terminal());
        assert!(OrderStatus::Replaced.is_terminal());
        assert!(OrderStatus::ActiveAtEnd.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }

    #[test]
    fn test_order_open_close() {
        let mut order = Order::open(ts(0, 0, 2), 100.2, Side::Buy, "BTCUSDT", "5");
        assert!(order.is_open());
        assert!(order.has_trackable_id());
        assert_eq!(order.lifetime_seconds(), None);

        order.close(ts(0, 0, 3), OrderStatus::Filled);
        assert!(!order.is_open());
        assert_eq!(order.final_status, Some(OrderStatus::Filled));
        assert_eq!(order.lifetime_seconds(), Some(1.0));
    }

    #[test]
    fn test_trackable_ids() {
        assert!(is_trackable_id("abc-1"));
        assert!(!is_trackable_id(""));
        assert!(!is_trackable_id("0"));
        assert!(is_trackable_id("00"));
    }

    #[test]
    fn test_status_serializes_verbatim() {
        let json = serde_json::to_string(&OrderStatus::Canceled).unwrap();
        assert_eq!(json, "\"Canceled\"");
        let json = serde_json::to_string(&Venue::Linear).unwrap();
        assert_eq!(json, "\"linear\"");
    }
}
