//! In-process gateway double for session and action tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot, watch};

use super::events::{OrderTradeUpdate, OrderUpdate, UserEvent};
use super::types::{Order, OrderStatus, Position, PositionSide, Side};
use super::{ExchangeGateway, GatewayError, SubscriptionHandle};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MarketOrderCall {
    pub symbol: String,
    pub side: Side,
    pub position_side: PositionSide,
    pub quantity: Decimal,
}

#[derive(Default)]
pub(crate) struct MockGateway {
    orders: Mutex<Vec<Order>>,
    positions: Mutex<Vec<Position>>,
    fail_next_fetch: AtomicBool,
    /// When set, the next order fetch parks until the sender fires
    hold_next_fetch: Mutex<Option<oneshot::Receiver<()>>>,
    /// Symbols whose mutating calls are rejected
    failing_symbols: Mutex<HashSet<String>>,
    pub cancels: Mutex<Vec<(String, u64)>>,
    pub bulk_cancels: Mutex<Vec<String>>,
    pub market_orders: Mutex<Vec<MarketOrderCall>>,
    /// One injection sender per subscription, newest last
    taps: Mutex<Vec<mpsc::Sender<UserEvent>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_orders(&self, orders: Vec<Order>) {
        *self.orders.lock().unwrap() = orders;
    }

    pub fn set_positions(&self, positions: Vec<Position>) {
        *self.positions.lock().unwrap() = positions;
    }

    pub fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    /// Park the next order fetch until the returned sender fires.
    pub fn hold_next_fetch(&self) -> oneshot::Sender<()> {
        let (release_tx, release_rx) = oneshot::channel();
        *self.hold_next_fetch.lock().unwrap() = Some(release_rx);
        release_tx
    }

    pub fn fail_symbol(&self, symbol: &str) {
        self.failing_symbols.lock().unwrap().insert(symbol.to_string());
    }

    /// Injection sender for the most recent subscription.
    pub fn latest_tap(&self) -> mpsc::Sender<UserEvent> {
        self.taps.lock().unwrap().last().cloned().expect("no subscription started")
    }

    fn rejection(&self, symbol: &str) -> Result<(), GatewayError> {
        if self.failing_symbols.lock().unwrap().contains(symbol) {
            Err(GatewayError::Exchange {
                code: -2011,
                message: format!("rejected for {symbol}"),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn fetch_open_orders(&self) -> Result<Vec<Order>, GatewayError> {
        let gate = self.hold_next_fetch.lock().unwrap().take();
        if let Some(release) = gate {
            let _ = release.await;
        }
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Exchange {
                code: -1001,
                message: "internal error".into(),
            });
        }
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn fetch_open_positions(&self) -> Result<Vec<Position>, GatewayError> {
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), GatewayError> {
        self.rejection(symbol)?;
        self.cancels.lock().unwrap().push((symbol.to_string(), order_id));
        Ok(())
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), GatewayError> {
        self.rejection(symbol)?;
        self.bulk_cancels.lock().unwrap().push(symbol.to_string());
        Ok(())
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        position_side: PositionSide,
        quantity: Decimal,
    ) -> Result<(), GatewayError> {
        self.rejection(symbol)?;
        self.market_orders.lock().unwrap().push(MarketOrderCall {
            symbol: symbol.to_string(),
            side,
            position_side,
            quantity,
        });
        Ok(())
    }

    async fn subscribe_user_events(
        &self,
        events: mpsc::Sender<UserEvent>,
    ) -> Result<SubscriptionHandle, GatewayError> {
        let (tap_tx, mut tap_rx) = mpsc::channel::<UserEvent>(64);
        self.taps.lock().unwrap().push(tap_tx);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    injected = tap_rx.recv() => match injected {
                        Some(event) => {
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        Ok(SubscriptionHandle::new(shutdown_tx, task))
    }
}

/// Minimal order-update event for driving the dispatcher in tests.
pub(crate) fn order_event(order_id: u64, symbol: &str, status: OrderStatus) -> UserEvent {
    UserEvent::OrderTradeUpdate(OrderTradeUpdate {
        transaction_time: 2,
        order: OrderUpdate {
            symbol: symbol.to_string(),
            client_order_id: format!("c-{order_id}"),
            side: Side::Buy,
            order_type: "LIMIT".into(),
            time_in_force: "GTC".into(),
            orig_qty: Decimal::ONE,
            price: Decimal::new(100, 0),
            avg_price: Decimal::ZERO,
            stop_price: Decimal::ZERO,
            status,
            order_id,
            executed_qty: Decimal::ZERO,
            trade_time: 1,
            reduce_only: false,
            working_type: "CONTRACT_PRICE".into(),
            orig_type: "LIMIT".into(),
            position_side: PositionSide::Long,
            close_position: false,
            price_protect: false,
        },
    })
}
