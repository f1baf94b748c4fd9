//! Manual command handlers: cancel order, market-close position, bulk forms
//!
//! Every action is fire-and-forget: the gateway call runs on its own task,
//! never blocks the render tick and never mutates the store directly — the
//! resulting order/position change arrives later over the event stream.
//! Failures are logged and reported; there is no retry, the user re-triggers
//! manually.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::gateway::{ExchangeGateway, GatewayError, Order, Position, PositionSide};

/// What the user asked for, with the row values captured at dispatch time.
#[derive(Debug, Clone)]
pub enum Action {
    CancelOrder { symbol: String, order_id: u64 },
    CancelAllOrders { symbol: String },
    ClosePosition {
        symbol: String,
        position_side: PositionSide,
        quantity: Decimal,
    },
}

/// Structured outcome delivered back to the presentation layer.
#[derive(Debug)]
pub struct ActionReport {
    pub action: Action,
    pub outcome: Result<(), GatewayError>,
}

impl ActionReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub struct ActionDispatcher {
    gateway: Arc<dyn ExchangeGateway>,
    reports: mpsc::Sender<ActionReport>,
}

impl ActionDispatcher {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, reports: mpsc::Sender<ActionReport>) -> Self {
        Self { gateway, reports }
    }

    pub fn cancel_order(&self, symbol: String, order_id: u64) {
        self.dispatch(Action::CancelOrder { symbol, order_id });
    }

    /// Market order opposite to the held direction, full unsigned quantity,
    /// positionSide pinned to the position being closed.
    pub fn close_position(&self, position: &Position) {
        self.dispatch(Action::ClosePosition {
            symbol: position.symbol.clone(),
            position_side: position.position_side,
            quantity: position.unsigned_qty(),
        });
    }

    /// One bulk cancel per distinct symbol among the displayed orders.
    /// Returns the number of actions dispatched.
    pub fn cancel_displayed_orders(&self, orders: &[Order]) -> usize {
        let symbols: BTreeSet<&str> = orders.iter().map(|o| o.symbol.as_str()).collect();
        let count = symbols.len();
        for symbol in symbols {
            self.dispatch(Action::CancelAllOrders {
                symbol: symbol.to_string(),
            });
        }
        count
    }

    /// Close every displayed position. Returns the number of actions
    /// dispatched; each failure is independent of the rest of the batch.
    pub fn close_displayed_positions(&self, positions: &[Position]) -> usize {
        for position in positions {
            self.close_position(position);
        }
        positions.len()
    }

    fn dispatch(&self, action: Action) {
        let gateway = self.gateway.clone();
        let reports = self.reports.clone();
        tokio::spawn(async move {
            let outcome = match &action {
                Action::CancelOrder { symbol, order_id } => {
                    gateway.cancel_order(symbol, *order_id).await
                }
                Action::CancelAllOrders { symbol } => gateway.cancel_all_orders(symbol).await,
                Action::ClosePosition {
                    symbol,
                    position_side,
                    quantity,
                } => {
                    gateway
                        .submit_market_order(
                            symbol,
                            position_side.closing_side(),
                            *position_side,
                            *quantity,
                        )
                        .await
                }
            };

            match &outcome {
                Ok(()) => info!(?action, "manual action accepted"),
                Err(e) => error!(?action, "manual action failed: {}", e),
            }
            // the receiver may be gone (one-shot CLI already exited)
            let _ = reports.send(ActionReport { action, outcome }).await;
        });
    }
}
