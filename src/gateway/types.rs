//! Order and position data model for the USDⓈ-M futures account
//!
//! Field names and enum spellings follow the exchange REST payloads so the
//! same types deserialize straight out of `GET /fapi/v1/openOrders` and
//! `GET /fapi/v2/positionRisk`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Hedge-mode direction tag; `Both` in one-way mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
    Both,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
            PositionSide::Both => "BOTH",
        }
    }

    /// Side of the market order that flattens a position held on this side.
    pub fn closing_side(&self) -> Side {
        match self {
            PositionSide::Long => Side::Sell,
            _ => Side::Buy,
        }
    }
}

/// Collateral mode, part of the position identity key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarginType {
    #[serde(rename = "isolated", alias = "ISOLATED")]
    Isolated,
    #[serde(rename = "cross", alias = "crossed", alias = "CROSSED", alias = "CROSS")]
    Cross,
}

impl MarginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginType::Isolated => "isolated",
            MarginType::Cross => "cross",
        }
    }
}

/// Order status as reported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    ExpiredInMatch,
}

impl OrderStatus {
    /// Terminal statuses are dropped from the live order set. The exchange
    /// keeps sending EXPIRED/REJECTED rows in some flows, so only the two
    /// statuses that end an order's life on the books count as terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Canceled | OrderStatus::Filled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::ExpiredInMatch => "EXPIRED_IN_MATCH",
        }
    }
}

/// One open order, keyed by `order_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: u64,
    pub symbol: String,
    pub status: OrderStatus,
    pub client_order_id: String,
    pub price: Decimal,
    #[serde(default)]
    pub avg_price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub time_in_force: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub reduce_only: bool,
    #[serde(default)]
    pub close_position: bool,
    pub side: Side,
    pub position_side: PositionSide,
    #[serde(default)]
    pub stop_price: Decimal,
    #[serde(default)]
    pub working_type: String,
    #[serde(default)]
    pub price_protect: bool,
    #[serde(default)]
    pub orig_type: String,
    /// Order creation time (ms since epoch)
    pub time: i64,
    /// Last update time (ms since epoch)
    pub update_time: i64,
}

/// Composite identity of a position. Hedge mode allows simultaneous LONG and
/// SHORT entries per symbol, and isolated vs cross margin are distinct
/// entries, so symbol alone is not a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey {
    pub symbol: String,
    pub position_side: PositionSide,
    pub margin_type: MarginType,
}

/// One held position
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    /// Signed quantity; the sign encodes direction in one-way mode
    pub position_amt: Decimal,
    pub entry_price: Decimal,
    pub un_realized_profit: Decimal,
    pub margin_type: MarginType,
    #[serde(default)]
    pub isolated_wallet: Decimal,
    pub position_side: PositionSide,
}

impl Position {
    pub fn key(&self) -> PositionKey {
        PositionKey {
            symbol: self.symbol.clone(),
            position_side: self.position_side,
            margin_type: self.margin_type,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position_amt.is_zero()
    }

    /// Quantity as shown to the user and submitted on close: LONG amounts
    /// are already unsigned, everything else has the sign stripped.
    pub fn unsigned_qty(&self) -> Decimal {
        match self.position_side {
            PositionSide::Long => self.position_amt,
            _ => self.position_amt.abs(),
        }
    }

    pub fn notional(&self) -> Decimal {
        self.position_amt.abs() * self.entry_price
    }
}
