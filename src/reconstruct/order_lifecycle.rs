//! Order lifecycle tracking for `UserOrder` records.
//!
//! Each order moves through:
//! `New` → [`PartiallyFilled` | `Untriggered` | `Triggered`]* → terminal
//!
//! where terminal is one of `Filled`, `Cancelled`, `Canceled`, `Rejected`
//! (logged) or `Replaced`, `ActiveAtEnd` (inferred).
//!
//! # Key Design Decisions
//!
//! ## Two indices, one arena
//!
//! Order ids in the log are not reliable: they are often empty or `"0"`.
//! An order is therefore reachable two ways:
//!
//! 1. **Slot** `(symbol, side)`: at most one live order per symbol+side.
//!    Always present for a live order.
//! 2. **Id**: only when the id is non-empty and not `"0"`.
//!
//! Live orders are owned by a single arena keyed by [`OrderHandle`]; both
//! indices store handles. An index entry is only removed when it still
//! points at the handle being closed, so an id reused by a later order is
//! never unlinked by accident.
//!
//! ## Inferred outcomes
//!
//! - `Replaced`: a `New` arrived for an occupied slot before its occupant
//!   logged a terminal status.
//! - `ActiveAtEnd`: still open when the stream ended (see [`OrderLifecycleTracker::flush`]).
//!
//! # Example
//!
//! ```
//! use trade_log_reconstructor::classifier::OrderEvent;
//! use trade_log_reconstructor::reconstruct::order_lifecycle::{LifecycleEvent, OrderLifecycleTracker};
//! use trade_log_reconstructor::{OrderStatus, Side};
//! use chrono::NaiveDate;
//!
//! let t = |s| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, s).unwrap();
//! let event = |s, status: &str| OrderEvent {
//!     time: t(s),
//!     symbol: "BTCUSDT".into(),
//!     price: 100.2,
//!     side: Some(Side::Buy),
//!     order_id: "5".into(),
//!     status: status.into(),
//! };
//!
//! let mut tracker = OrderLifecycleTracker::new();
//! assert!(matches!(tracker.process(&event(2, "New")), Some(LifecycleEvent::Opened { .. })));
//! assert!(matches!(
//!     tracker.process(&event(3, "Filled")),
//!     Some(LifecycleEvent::Completed { final_status: OrderStatus::Filled, .. })
//! ));
//!
//! let completed = tracker.take_completed();
//! assert_eq!(completed.len(), 1);
//! assert_eq!(completed[0].end_time, Some(t(3)));
//! ```

use ahash::{AHashMap, RandomState};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::OrderEvent;
use crate::types::{is_trackable_id, Order, OrderStatus, Side, Timestamp};

// ============================================================================
// Handles and Keys
// ============================================================================

/// Stable arena key of a live order.
///
/// Handles are issued in open order and never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderHandle(u64);

impl OrderHandle {
    pub fn index(self) -> u64 {
        self.0
    }
}

/// Symbol + side slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub symbol: String,
    pub side: Side,
}

impl SlotKey {
    pub fn new(symbol: impl Into<String>, side: Side) -> Self {
        Self {
            symbol: symbol.into(),
            side,
        }
    }
}

// ============================================================================
// Lifecycle Event
// ============================================================================

/// Event emitted when an order record changes tracker state.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A new order took its slot; `replaced` is set when a previous occupant
    /// was closed as `Replaced`.
    Opened {
        handle: OrderHandle,
        replaced: Option<OrderHandle>,
    },

    /// An in-flight status was written to a live order.
    StatusChanged {
        handle: OrderHandle,
        status: OrderStatus,
    },

    /// An order reached a logged terminal status.
    Completed {
        handle: OrderHandle,
        final_status: OrderStatus,
    },
}

// ============================================================================
// Lifecycle Statistics
// ============================================================================

/// Statistics about order lifecycle tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleStats {
    /// Orders opened by `New`.
    pub opened: u64,

    /// Orders closed as `Replaced`.
    pub replaced: u64,

    /// In-flight status updates applied.
    pub status_updates: u64,

    /// Orders closed as `Filled`.
    pub filled: u64,

    /// Orders closed as `Cancelled` or `Canceled`.
    pub cancelled: u64,

    /// Orders closed as `Rejected`.
    pub rejected: u64,

    /// Orders closed as `ActiveAtEnd`.
    pub active_at_end: u64,

    /// In-flight updates for an unknown id.
    pub unresolved_updates: u64,

    /// Terminal events that matched neither an id nor a slot.
    pub unresolved_terminals: u64,

    /// `New` events without a Buy/Sell side.
    pub new_without_side: u64,

    /// Events with a status the tracker does not interpret.
    pub unknown_statuses: u64,

    /// Currently live orders.
    pub active_orders: u64,
}

impl LifecycleStats {
    /// Orders that reached any terminal status.
    pub fn completed(&self) -> u64 {
        self.replaced + self.filled + self.cancelled + self.rejected + self.active_at_end
    }

    /// Events dropped without changing state.
    pub fn dropped(&self) -> u64 {
        self.unresolved_updates
            + self.unresolved_terminals
            + self.new_without_side
            + self.unknown_statuses
    }

    /// Filled / (filled + cancelled + rejected).
    pub fn fill_rate(&self) -> f64 {
        let decided = self.filled + self.cancelled + self.rejected;
        if decided == 0 {
            return 0.0;
        }
        self.filled as f64 / decided as f64
    }
}

// ============================================================================
// Order Lifecycle Tracker
// ============================================================================

/// Reconstructs order lifecycles from `UserOrder` events.
#[derive(Debug, Clone)]
pub struct OrderLifecycleTracker {
    /// Live orders: handle -> order
    live: AHashMap<OrderHandle, Order>,

    /// (symbol, side) -> live handle, in first-occupied order
    slots: IndexMap<SlotKey, OrderHandle, RandomState>,

    /// order_id -> live handle (trackable ids only)
    by_id: AHashMap<String, OrderHandle>,

    /// Closed orders, in closing order
    completed: Vec<Order>,

    next_handle: u64,

    stats: LifecycleStats,
}

impl OrderLifecycleTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            live: AHashMap::new(),
            slots: IndexMap::with_hasher(RandomState::new()),
            by_id: AHashMap::new(),
            completed: Vec::new(),
            next_handle: 0,
            stats: LifecycleStats::default(),
        }
    }

    /// Apply one `UserOrder` event.
    ///
    /// Returns `None` when the event was dropped (unknown status, no side on
    /// `New`, or no target order for an update).
    pub fn process(&mut self, event: &OrderEvent) -> Option<LifecycleEvent> {
        let Some(status) = OrderStatus::parse(&event.status) else {
            self.stats.unknown_statuses += 1;
            return None;
        };

        if status == OrderStatus::New {
            self.handle_new(event)
        } else if status.is_in_flight() {
            self.handle_in_flight(event, status)
        } else {
            self.handle_terminal(event, status)
        }
    }

    /// Handle `New`: displace the slot occupant, install the new order.
    fn handle_new(&mut self, event: &OrderEvent) -> Option<LifecycleEvent> {
        let Some(side) = event.side else {
            self.stats.new_without_side += 1;
            return None;
        };

        let key = SlotKey::new(event.symbol.as_str(), side);

        // Overwriting the slot first keeps its position, and `close` then
        // leaves the entry alone since it no longer points at `previous`.
        let handle = self.issue_handle();
        let replaced = self.slots.insert(key, handle);
        if let Some(previous) = replaced {
            self.close(previous, event.time, OrderStatus::Replaced);
        }

        let order = Order::open(
            event.time,
            event.price,
            side,
            event.symbol.as_str(),
            event.order_id.as_str(),
        );

        if order.has_trackable_id() {
            self.by_id.insert(order.order_id.clone(), handle);
        }
        self.live.insert(handle, order);

        self.stats.opened += 1;
        self.stats.active_orders = self.live.len() as u64;

        Some(LifecycleEvent::Opened { handle, replaced })
    }

    /// Handle `PartiallyFilled` / `Untriggered` / `Triggered`: id lookup only.
    fn handle_in_flight(&mut self, event: &OrderEvent, status: OrderStatus) -> Option<LifecycleEvent> {
        let handle = self.lookup_id(&event.order_id);
        let Some(order) = handle.and_then(|h| self.live.get_mut(&h)) else {
            self.stats.unresolved_updates += 1;
            return None;
        };

        order.status = status;
        self.stats.status_updates += 1;

        handle.map(|handle| LifecycleEvent::StatusChanged { handle, status })
    }

    /// Handle a logged terminal status: id first, then slot.
    fn handle_terminal(&mut self, event: &OrderEvent, status: OrderStatus) -> Option<LifecycleEvent> {
        let target = self.lookup_id(&event.order_id).or_else(|| {
            event
                .side
                .and_then(|side| self.slots.get(&SlotKey::new(event.symbol.as_str(), side)))
                .copied()
        });

        let Some(handle) = target else {
            self.stats.unresolved_terminals += 1;
            return None;
        };

        self.close(handle, event.time, status);

        Some(LifecycleEvent::Completed {
            handle,
            final_status: status,
        })
    }

    fn lookup_id(&self, order_id: &str) -> Option<OrderHandle> {
        if !is_trackable_id(order_id) {
            return None;
        }
        self.by_id.get(order_id).copied()
    }

    fn issue_handle(&mut self) -> OrderHandle {
        let handle = OrderHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Close a live order and unlink it from every index still pointing at it.
    fn close(&mut self, handle: OrderHandle, at: Timestamp, final_status: OrderStatus) {
        let Some(mut order) = self.live.remove(&handle) else {
            return;
        };

        if self.by_id.get(&order.order_id) == Some(&handle) {
            self.by_id.remove(&order.order_id);
        }

        let key = SlotKey::new(order.symbol.as_str(), order.side);
        if self.slots.get(&key) == Some(&handle) {
            self.slots.shift_remove(&key);
        }

        order.close(at, final_status);
        self.record_close(final_status);
        self.completed.push(order);
        self.stats.active_orders = self.live.len() as u64;
    }

    fn record_close(&mut self, final_status: OrderStatus) {
        match final_status {
            OrderStatus::Replaced => self.stats.replaced += 1,
            OrderStatus::Filled => self.stats.filled += 1,
            OrderStatus::Cancelled | OrderStatus::Canceled => self.stats.cancelled += 1,
            OrderStatus::Rejected => self.stats.rejected += 1,
            OrderStatus::ActiveAtEnd => self.stats.active_at_end += 1,
            OrderStatus::New
            | OrderStatus::PartiallyFilled
            | OrderStatus::Untriggered
            | OrderStatus::Triggered => {}
        }
    }

    /// Close every slotted order as `ActiveAtEnd` at `end_time`.
    ///
    /// Slots are flushed in the order they were first occupied. Returns the
    /// number of orders closed.
    pub fn flush(&mut self, end_time: Timestamp) -> usize {
        let handles: Vec<OrderHandle> = self.slots.values().copied().collect();
        for &handle in &handles {
            self.close(handle, end_time, OrderStatus::ActiveAtEnd);
        }
        handles.len()
    }

    // ========================================================================
    // Query Methods
    // ========================================================================

    /// Get a live order by handle.
    pub fn get(&self, handle: OrderHandle) -> Option<&Order> {
        self.live.get(&handle)
    }

    /// Get the live order indexed under `order_id`.
    pub fn get_by_id(&self, order_id: &str) -> Option<&Order> {
        self.lookup_id(order_id).and_then(|h| self.live.get(&h))
    }

    /// Get the live order occupying a slot.
    pub fn get_slot(&self, symbol: &str, side: Side) -> Option<&Order> {
        self.slots
            .get(&SlotKey::new(symbol, side))
            .and_then(|h| self.live.get(h))
    }

    /// Live orders in slot order.
    pub fn active_orders(&self) -> impl Iterator<Item = &Order> {
        self.slots.values().filter_map(|h| self.live.get(h))
    }

    /// Closed orders, in closing order.
    pub fn completed_orders(&self) -> &[Order] {
        &self.completed
    }

    /// Drain the closed orders.
    pub fn take_completed(&mut self) -> Vec<Order> {
        std::mem::take(&mut self.completed)
    }

    /// Number of live orders.
    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    /// Get statistics.
    pub fn stats(&self) -> &LifecycleStats {
        &self.stats
    }

    /// Check that both indices point only at live orders and agree with
    /// each order's own symbol/side/id.
    pub fn indices_consistent(&self) -> bool {
        let slots_ok = self.slots.iter().all(|(key, handle)| {
            self.live
                .get(handle)
                .is_some_and(|o| o.symbol == key.symbol && o.side == key.side)
        });
        let ids_ok = self.by_id.iter().all(|(id, handle)| {
            self.live.get(handle).is_some_and(|o| &o.order_id == id)
        });
        slots_ok && ids_ok && self.slots.len() == self.live.len()
    }

    /// Reset the tracker.
    pub fn reset(&mut self) {
        self.live.clear();
        self.slots.clear();
        self.by_id.clear();
        self.completed.clear();
        self.next_handle = 0;
        self.stats = LifecycleStats::default();
    }
}

impl Default for OrderLifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
