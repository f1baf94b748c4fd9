//! User-data-stream event models
//!
//! The futures user stream delivers JSON frames tagged by an `"e"` event-type
//! field, with single-letter field names. Only `ORDER_TRADE_UPDATE` and
//! `ACCOUNT_UPDATE` carry state the dashboard cares about; everything else
//! (margin calls, leverage changes, listen-key expiry notices) decodes to
//! `Other` and is ignored by the dispatcher.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use super::types::{MarginType, Order, OrderStatus, Position, PositionSide, Side};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed user event: {0}")]
    Json(#[from] serde_json::Error),
}

/// One decoded user-stream frame
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "e")]
pub enum UserEvent {
    #[serde(rename = "ORDER_TRADE_UPDATE")]
    OrderTradeUpdate(OrderTradeUpdate),
    #[serde(rename = "ACCOUNT_UPDATE")]
    AccountUpdate(AccountUpdate),
    #[serde(other)]
    Other,
}

/// Decode a raw text frame into a typed event.
pub fn decode_user_event(raw: &str) -> Result<UserEvent, DecodeError> {
    Ok(serde_json::from_str(raw)?)
}

/// `ORDER_TRADE_UPDATE` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct OrderTradeUpdate {
    /// Transaction time (ms); becomes the order's update time
    #[serde(rename = "T")]
    pub transaction_time: i64,
    #[serde(rename = "o")]
    pub order: OrderUpdate,
}

/// The nested `o` object of an order update
#[derive(Debug, Clone, Deserialize)]
pub struct OrderUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub client_order_id: String,
    #[serde(rename = "S")]
    pub side: Side,
    #[serde(rename = "o")]
    pub order_type: String,
    #[serde(rename = "f")]
    pub time_in_force: String,
    #[serde(rename = "q")]
    pub orig_qty: Decimal,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "ap")]
    pub avg_price: Decimal,
    #[serde(rename = "sp", default)]
    pub stop_price: Decimal,
    #[serde(rename = "X")]
    pub status: OrderStatus,
    #[serde(rename = "i")]
    pub order_id: u64,
    #[serde(rename = "z")]
    pub executed_qty: Decimal,
    /// Order trade time (ms); becomes the order's creation time column
    #[serde(rename = "T")]
    pub trade_time: i64,
    #[serde(rename = "R", default)]
    pub reduce_only: bool,
    #[serde(rename = "wt", default)]
    pub working_type: String,
    #[serde(rename = "ot", default)]
    pub orig_type: String,
    #[serde(rename = "ps")]
    pub position_side: PositionSide,
    #[serde(rename = "cp", default)]
    pub close_position: bool,
    #[serde(rename = "pP", default)]
    pub price_protect: bool,
}

impl OrderTradeUpdate {
    /// Flatten the event into the REST-shaped order record the store keeps.
    pub fn into_order(self) -> Order {
        let o = self.order;
        Order {
            order_id: o.order_id,
            symbol: o.symbol,
            status: o.status,
            client_order_id: o.client_order_id,
            price: o.price,
            avg_price: o.avg_price,
            orig_qty: o.orig_qty,
            executed_qty: o.executed_qty,
            time_in_force: o.time_in_force,
            order_type: o.order_type,
            reduce_only: o.reduce_only,
            close_position: o.close_position,
            side: o.side,
            position_side: o.position_side,
            stop_price: o.stop_price,
            working_type: o.working_type,
            price_protect: o.price_protect,
            orig_type: o.orig_type,
            time: o.trade_time,
            update_time: self.transaction_time,
        }
    }
}

/// `ACCOUNT_UPDATE` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct AccountUpdate {
    #[serde(rename = "T")]
    pub transaction_time: i64,
    #[serde(rename = "a")]
    pub data: AccountData,
}

/// The `a` object: balance rows are ignored, only position deltas matter
#[derive(Debug, Clone, Deserialize)]
pub struct AccountData {
    /// Event reason, e.g. "ORDER" or "FUNDING_FEE"
    #[serde(rename = "m", default)]
    pub reason: String,
    #[serde(rename = "P", default)]
    pub positions: Vec<PositionDelta>,
}

/// One position row inside an account update
#[derive(Debug, Clone, Deserialize)]
pub struct PositionDelta {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "pa")]
    pub position_amt: Decimal,
    #[serde(rename = "ep")]
    pub entry_price: Decimal,
    #[serde(rename = "up")]
    pub unrealized_profit: Decimal,
    #[serde(rename = "mt")]
    pub margin_type: MarginType,
    #[serde(rename = "iw", default)]
    pub isolated_wallet: Decimal,
    #[serde(rename = "ps")]
    pub position_side: PositionSide,
}

impl PositionDelta {
    pub fn into_position(self) -> Position {
        Position {
            symbol: self.symbol,
            position_amt: self.position_amt,
            entry_price: self.entry_price,
            un_realized_profit: self.unrealized_profit,
            margin_type: self.margin_type,
            isolated_wallet: self.isolated_wallet,
            position_side: self.position_side,
        }
    }
}
