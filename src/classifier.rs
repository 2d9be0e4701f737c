//! Record splitting and event classification.
//!
//! A log line is `time|EventType|field|field|...`. [`split_record`] breaks it
//! into trimmed fields; [`classify`] turns the fields of a record into a typed
//! [`LogEvent`] once its timestamp is known.
//!
//! # Layouts
//!
//! | Event | Min fields | Layout |
//! |-------|-----------:|--------|
//! | `Top` | 5 | `time, tag, symbol, ask, bid` |
//! | `UserOrder` | 9 | `time, tag, symbol, price, _, _, side, order_id, status` |
//! | `UserTrade` | 6 | `time, tag, symbol, price, _, side` |
//! | `Border` | 6 | `time, tag, b1, b2, b3, b4` |
//! | `Spreads` | 3 | `time, tag, s1[, s2]` |
//! | `Candle` | 2 | ignored |
//!
//! These minimums and positions match logs already on disk and must not
//! change.

use crate::error::RecordError;
use crate::types::{BorderSample, PriceTick, Side, SpreadSample, Timestamp, Trade, Venue};

/// Field separator.
pub const SEPARATOR: char = '|';

/// Index of the time-of-day field.
pub const TIME_FIELD: usize = 0;

/// Index of the event tag field.
pub const TAG_FIELD: usize = 1;

// ============================================================================
// Event Kind
// ============================================================================

/// Event type tag (field 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Top,
    UserOrder,
    UserTrade,
    Border,
    Spreads,
    Candle,
}

impl EventKind {
    /// Match a tag exactly.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Top" => Some(EventKind::Top),
            "UserOrder" => Some(EventKind::UserOrder),
            "UserTrade" => Some(EventKind::UserTrade),
            "Border" => Some(EventKind::Border),
            "Spreads" => Some(EventKind::Spreads),
            "Candle" => Some(EventKind::Candle),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Top => "Top",
            EventKind::UserOrder => "UserOrder",
            EventKind::UserTrade => "UserTrade",
            EventKind::Border => "Border",
            EventKind::Spreads => "Spreads",
            EventKind::Candle => "Candle",
        }
    }

    /// Minimum number of fields (including time and tag).
    pub fn min_fields(self) -> usize {
        match self {
            EventKind::Top => 5,
            EventKind::UserOrder => 9,
            EventKind::UserTrade => 6,
            EventKind::Border => 6,
            EventKind::Spreads => 3,
            EventKind::Candle => 2,
        }
    }
}

// ============================================================================
// Classified Events
// ============================================================================

/// A `UserOrder` record, before lifecycle interpretation.
///
/// Status is kept raw; the lifecycle tracker decides what it means.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub time: Timestamp,
    pub symbol: String,
    /// Price, 0.0 when the field is not numeric
    pub price: f64,
    /// `None` when the side did not normalize to Buy/Sell
    pub side: Option<Side>,
    pub order_id: String,
    pub status: String,
}

/// A classified log record.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Top(PriceTick),
    UserOrder(OrderEvent),
    UserTrade(Trade),
    Border(BorderSample),
    Spreads(SpreadSample),
    /// Consumed without producing a record
    Candle,
}

impl LogEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LogEvent::Top(_) => EventKind::Top,
            LogEvent::UserOrder(_) => EventKind::UserOrder,
            LogEvent::UserTrade(_) => EventKind::UserTrade,
            LogEvent::Border(_) => EventKind::Border,
            LogEvent::Spreads(_) => EventKind::Spreads,
            LogEvent::Candle => EventKind::Candle,
        }
    }
}

// ============================================================================
// Splitting
// ============================================================================

/// Split a raw line into trimmed fields.
///
/// Fails when the line has no separator (and therefore fewer than 2 fields).
///
/// ```
/// use trade_log_reconstructor::classifier::split_record;
///
/// let fields = split_record("00:00:01.5| Top |BTCSpot|100.5|100.0\n").unwrap();
/// assert_eq!(fields, vec!["00:00:01.5", "Top", "BTCSpot", "100.5", "100.0"]);
/// assert!(split_record("no separator here").is_err());
/// ```
pub fn split_record(line: &str) -> Result<Vec<&str>, RecordError> {
    if !line.contains(SEPARATOR) {
        return Err(RecordError::MissingSeparator);
    }

    let fields: Vec<&str> = line.split(SEPARATOR).map(str::trim).collect();
    if fields.len() < 2 {
        return Err(RecordError::MissingSeparator);
    }

    Ok(fields)
}

// ============================================================================
// Classification
// ============================================================================

/// Classify the fields of one record stamped at `time`.
///
/// `fields` must come from [`split_record`] (at least time and tag present).
pub fn classify(fields: &[&str], time: Timestamp) -> Result<LogEvent, RecordError> {
    let tag = fields.get(TAG_FIELD).copied().unwrap_or_default();
    let kind =
        EventKind::from_tag(tag).ok_or_else(|| RecordError::UnknownEventType(tag.to_string()))?;

    require_fields(kind, fields)?;

    match kind {
        EventKind::Candle => Ok(LogEvent::Candle),
        EventKind::Top => classify_top(fields, time),
        EventKind::UserOrder => Ok(LogEvent::UserOrder(classify_order(fields, time))),
        EventKind::UserTrade => classify_trade(fields, time),
        EventKind::Border => classify_border(fields, time),
        EventKind::Spreads => classify_spreads(fields, time),
    }
}

fn require_fields(kind: EventKind, fields: &[&str]) -> Result<(), RecordError> {
    if fields.len() < kind.min_fields() {
        return Err(RecordError::TooFewFields {
            event: kind.as_str(),
            required: kind.min_fields(),
            found: fields.len(),
        });
    }
    Ok(())
}

/// Parse a float field, naming it in the error.
fn parse_number(fields: &[&str], index: usize, field: &'static str) -> Result<f64, RecordError> {
    let raw = fields.get(index).copied().unwrap_or_default();
    raw.parse::<f64>().map_err(|_| RecordError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

fn classify_top(fields: &[&str], time: Timestamp) -> Result<LogEvent, RecordError> {
    let symbol = fields[2];
    let ask = parse_number(fields, 3, "ask")?;
    let bid = parse_number(fields, 4, "bid")?;
    let venue =
        Venue::from_symbol(symbol).ok_or_else(|| RecordError::UnknownVenue(symbol.to_string()))?;

    Ok(LogEvent::Top(PriceTick {
        time,
        ask,
        bid,
        venue,
    }))
}

fn classify_order(fields: &[&str], time: Timestamp) -> OrderEvent {
    OrderEvent {
        time,
        symbol: fields[2].to_string(),
        price: parse_number(fields, 3, "price").unwrap_or(0.0),
        side: Side::parse(fields[6]),
        order_id: fields[7].to_string(),
        status: fields[8].to_string(),
    }
}

fn classify_trade(fields: &[&str], time: Timestamp) -> Result<LogEvent, RecordError> {
    let symbol = fields[2].to_string();
    let price = parse_number(fields, 3, "price")?;
    let side = Side::parse(fields[5]).ok_or_else(|| RecordError::InvalidSide(fields[5].to_string()))?;

    Ok(LogEvent::UserTrade(Trade {
        time,
        price,
        side,
        symbol,
    }))
}

fn classify_border(fields: &[&str], time: Timestamp) -> Result<LogEvent, RecordError> {
    Ok(LogEvent::Border(BorderSample {
        time,
        b1: parse_number(fields, 2, "b1")?,
        b2: parse_number(fields, 3, "b2")?,
        b3: parse_number(fields, 4, "b3")?,
        b4: parse_number(fields, 5, "b4")?,
    }))
}

fn classify_spreads(fields: &[&str], time: Timestamp) -> Result<LogEvent, RecordError> {
    let s1 = parse_number(fields, 2, "s1")?;
    let s2 = if fields.len() > 3 {
        parse_number(fields, 3, "s2")?
    } else {
        s1
    };

    Ok(LogEvent::Spreads(SpreadSample { time, s1, s2 }))
}

// ============================================================================
// Tests
// ============================================================================
