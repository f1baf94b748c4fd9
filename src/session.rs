//! Session controller: lifecycle of one connected gateway session
//!
//! A session is the REST snapshot plus the user-data subscription that keeps
//! the store current. Exactly one session is active at a time: `start()` on
//! an active controller stops and joins the previous subscription before it
//! fetches the new snapshot, so a stale stream can never mutate the store of
//! the new session. Concurrent `start()` attempts are rejected synchronously
//! as busy rather than queued.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::gateway::{ExchangeGateway, GatewayError, SubscriptionHandle, UserEvent};
use crate::store::ReconciliationStore;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Stopping,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Idle,
            1 => SessionState::Connecting,
            2 => SessionState::Active,
            _ => SessionState::Stopping,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    /// A start/stop is already in flight; retry once it settles.
    #[error("session is busy ({0:?})")]
    Busy(SessionState),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// The running subscription plus the dispatcher that routes its events.
struct ActiveSession {
    subscription: SubscriptionHandle,
    dispatcher: JoinHandle<()>,
}

impl ActiveSession {
    async fn shutdown(self) {
        // Joining the subscription first guarantees its sender is gone, so
        // the dispatcher drains whatever was in flight and exits.
        self.subscription.shutdown().await;
        if let Err(e) = self.dispatcher.await {
            warn!("event dispatcher did not exit cleanly: {}", e);
        }
    }
}

pub struct SessionController {
    gateway: Arc<dyn ExchangeGateway>,
    store: Arc<ReconciliationStore>,
    phase: AtomicU8,
    /// Serializes start/stop; `try_lock` failure means another lifecycle
    /// operation is in flight.
    lifecycle: Mutex<Option<ActiveSession>>,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, store: Arc<ReconciliationStore>) -> Self {
        Self {
            gateway,
            store,
            phase: AtomicU8::new(SessionState::Idle as u8),
            lifecycle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn set_phase(&self, state: SessionState) {
        self.phase.store(state as u8, Ordering::SeqCst);
    }

    /// Connect (or refresh) the session: stop and join any previous
    /// subscription, fetch the account snapshot, seed the store, then start
    /// the event subscription.
    ///
    /// On a fetch failure the store keeps its last-known contents and the
    /// controller returns to `Idle`.
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut slot = self
            .lifecycle
            .try_lock()
            .map_err(|_| SessionError::Busy(self.state()))?;

        if let Some(previous) = slot.take() {
            self.set_phase(SessionState::Stopping);
            info!("stopping previous session before refresh");
            previous.shutdown().await;
        }
        self.set_phase(SessionState::Connecting);

        match self.connect().await {
            Ok(active) => {
                *slot = Some(active);
                self.set_phase(SessionState::Active);
                info!("session active");
                Ok(())
            }
            Err(e) => {
                self.set_phase(SessionState::Idle);
                error!("session start failed: {}", e);
                Err(SessionError::Gateway(e))
            }
        }
    }

    async fn connect(&self) -> Result<ActiveSession, GatewayError> {
        let orders = self.gateway.fetch_open_orders().await?;
        let positions = self.gateway.fetch_open_positions().await?;
        info!(
            orders = orders.len(),
            positions = positions.len(),
            "account snapshot fetched"
        );
        self.store.load_snapshot(orders, positions).await;

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let subscription = self.gateway.subscribe_user_events(events_tx).await?;
        let dispatcher = tokio::spawn(dispatch_events(events_rx, self.store.clone()));

        Ok(ActiveSession {
            subscription,
            dispatcher,
        })
    }

    /// Tear the session down. Idempotent; a no-op when nothing is running.
    /// No event is delivered to the store after this returns.
    pub async fn stop(&self) {
        let mut slot = self.lifecycle.lock().await;
        if let Some(active) = slot.take() {
            self.set_phase(SessionState::Stopping);
            active.shutdown().await;
            info!("session stopped");
        }
        self.set_phase(SessionState::Idle);
    }
}

/// Route decoded user events into the store by event type.
async fn dispatch_events(mut events: mpsc::Receiver<UserEvent>, store: Arc<ReconciliationStore>) {
    while let Some(event) = events.recv().await {
        match event {
            UserEvent::OrderTradeUpdate(update) => {
                debug!(
                    order_id = update.order.order_id,
                    status = ?update.order.status,
                    "order update"
                );
                store.apply_order_update(update.into_order()).await;
            }
            UserEvent::AccountUpdate(update) => {
                debug!(
                    deltas = update.data.positions.len(),
                    reason = %update.data.reason,
                    "account update"
                );
                store.apply_account_update(update.data.positions).await;
            }
            UserEvent::Other => {}
        }
    }
    debug!("event dispatcher exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{order_event, MockGateway};
    use crate::gateway::types::{MarginType, Order, OrderStatus, Position, PositionSide, Side};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn open_order(order_id: u64, symbol: &str) -> Order {
        Order {
            order_id,
            symbol: symbol.to_string(),
            status: OrderStatus::New,
            client_order_id: format!("c-{order_id}"),
            price: dec!(100),
            avg_price: Decimal::ZERO,
            orig_qty: dec!(1),
            executed_qty: Decimal::ZERO,
            time_in_force: "GTC".into(),
            order_type: "LIMIT".into(),
            reduce_only: false,
            close_position: false,
            side: Side::Buy,
            position_side: PositionSide::Long,
            stop_price: Decimal::ZERO,
            working_type: "CONTRACT_PRICE".into(),
            price_protect: false,
            orig_type: "LIMIT".into(),
            time: 1,
            update_time: 1,
        }
    }

    fn held_position(symbol: &str) -> Position {
        Position {
            symbol: symbol.to_string(),
            position_amt: dec!(1),
            entry_price: dec!(100),
            un_realized_profit: Decimal::ZERO,
            margin_type: MarginType::Isolated,
            isolated_wallet: Decimal::ZERO,
            position_side: PositionSide::Long,
        }
    }

    async fn wait_until<F, Fut>(mut condition: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within timeout");
    }

    #[tokio::test]
    async fn start_seeds_store_and_routes_events() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_orders(vec![open_order(1, "BTCUSDT")]);
        gateway.set_positions(vec![held_position("BTCUSDT")]);

        let store = Arc::new(ReconciliationStore::new());
        let controller = SessionController::new(gateway.clone(), store.clone());

        controller.start().await.unwrap();
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(store.read_orders().await.len(), 1);
        assert_eq!(store.read_positions().await.len(), 1);

        // a terminal event delivered over the stream removes the order
        let tap = gateway.latest_tap();
        tap.send(order_event(1, "BTCUSDT", OrderStatus::Filled))
            .await
            .unwrap();
        wait_until(|| async { store.read_orders().await.is_empty() }).await;

        controller.stop().await;
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn refresh_joins_previous_subscription_before_reseeding() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_orders(vec![open_order(1, "BTCUSDT")]);

        let store = Arc::new(ReconciliationStore::new());
        let controller = SessionController::new(gateway.clone(), store.clone());

        controller.start().await.unwrap();
        let first_tap = gateway.latest_tap();

        gateway.set_orders(vec![open_order(2, "ETHUSDT")]);
        controller.start().await.unwrap();

        // the first subscription's task is gone; stale events cannot land
        assert!(first_tap
            .send(order_event(99, "BTCUSDT", OrderStatus::New))
            .await
            .is_err());

        let ids: Vec<u64> = store.read_orders().await.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![2]);

        controller.stop().await;
    }

    #[tokio::test]
    async fn start_is_rejected_as_busy_while_another_start_is_in_flight() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_orders(vec![open_order(1, "BTCUSDT")]);
        let release = gateway.hold_next_fetch();

        let store = Arc::new(ReconciliationStore::new());
        let controller = Arc::new(SessionController::new(gateway.clone(), store.clone()));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start().await })
        };
        wait_until(|| async { controller.state() == SessionState::Connecting }).await;

        // the first start still holds the lifecycle lock
        let second = controller.start().await;
        assert!(matches!(
            second,
            Err(SessionError::Busy(SessionState::Connecting))
        ));

        release.send(()).unwrap();
        first.await.unwrap().unwrap();
        assert_eq!(controller.state(), SessionState::Active);
        assert_eq!(store.read_orders().await.len(), 1);

        controller.stop().await;
    }

    #[tokio::test]
    async fn fetch_failure_keeps_last_known_state() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_orders(vec![open_order(1, "BTCUSDT")]);

        let store = Arc::new(ReconciliationStore::new());
        let controller = SessionController::new(gateway.clone(), store.clone());
        controller.start().await.unwrap();

        gateway.fail_next_fetch();
        let result = controller.start().await;
        assert!(matches!(result, Err(SessionError::Gateway(_))));
        assert_eq!(controller.state(), SessionState::Idle);

        // the store still shows the last good snapshot
        assert_eq!(store.read_orders().await.len(), 1);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(ReconciliationStore::new());
        let controller = SessionController::new(gateway.clone(), store.clone());

        controller.stop().await;
        assert_eq!(controller.state(), SessionState::Idle);

        controller.start().await.unwrap();
        controller.stop().await;
        controller.stop().await;
        assert_eq!(controller.state(), SessionState::Idle);
    }
}
