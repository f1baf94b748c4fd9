//! Reconciliation store: the authoritative in-memory view of the account
//!
//! Two writers feed it — the one-shot REST snapshot at session start and the
//! user-data event stream afterwards — and the render loop reads it. All
//! mutation goes through a single write lock, so readers never observe a
//! half-applied event batch. Dirty flags tell the renderer when a collection
//! changed since it last looked.
//!
//! Events carry complete replacement records, so merging is a structural
//! remove-then-maybe-insert keyed by order id / position key, not a
//! field-level patch.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::gateway::events::PositionDelta;
use crate::gateway::types::{Order, Position, PositionKey};

#[derive(Default)]
struct StoreState {
    orders: BTreeMap<u64, Order>,
    positions: BTreeMap<PositionKey, Position>,
}

pub struct ReconciliationStore {
    state: RwLock<StoreState>,
    orders_dirty: AtomicBool,
    positions_dirty: AtomicBool,
}

impl ReconciliationStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            orders_dirty: AtomicBool::new(false),
            positions_dirty: AtomicBool::new(false),
        }
    }

    /// Replace both collections wholesale from a REST snapshot.
    ///
    /// Position rows with a zero entry price are placeholder rows for
    /// symbols never traded and are excluded.
    pub async fn load_snapshot(&self, orders: Vec<Order>, positions: Vec<Position>) {
        let mut state = self.state.write().await;
        state.orders = orders.into_iter().map(|o| (o.order_id, o)).collect();
        state.positions = positions
            .into_iter()
            .filter(|p| !p.entry_price.is_zero())
            .map(|p| (p.key(), p))
            .collect();
        debug!(
            orders = state.orders.len(),
            positions = state.positions.len(),
            "snapshot loaded"
        );
        drop(state);

        self.orders_dirty.store(true, Ordering::Release);
        self.positions_dirty.store(true, Ordering::Release);
    }

    /// Upsert-by-orderId: any existing record for the id is dropped, and the
    /// new record is kept only while its status is non-terminal. A terminal
    /// event for a known order therefore deletes it.
    pub async fn apply_order_update(&self, order: Order) {
        let mut state = self.state.write().await;
        state.orders.remove(&order.order_id);
        if !order.status.is_terminal() {
            state.orders.insert(order.order_id, order);
        }
        drop(state);

        self.orders_dirty.store(true, Ordering::Release);
    }

    /// Apply every position delta of one account-update event under a single
    /// lock acquisition; the dirty flag is set once per event.
    pub async fn apply_account_update(&self, deltas: Vec<PositionDelta>) {
        let mut state = self.state.write().await;
        for delta in deltas {
            let position = delta.into_position();
            let key = position.key();
            if state.positions.is_empty() {
                // An empty book takes the first delta verbatim, flat or not.
                state.positions.insert(key, position);
            } else if position.is_flat() {
                state.positions.remove(&key);
            } else {
                state.positions.insert(key, position);
            }
        }
        drop(state);

        self.positions_dirty.store(true, Ordering::Release);
    }

    /// Snapshot copy of the live orders, in stable order-id order.
    pub async fn read_orders(&self) -> Vec<Order> {
        self.state.read().await.orders.values().cloned().collect()
    }

    /// Snapshot copy of the live positions, in stable key order.
    pub async fn read_positions(&self) -> Vec<Position> {
        self.state.read().await.positions.values().cloned().collect()
    }

    /// Atomically read-and-clear the orders dirty flag.
    pub fn consume_orders_dirty(&self) -> bool {
        self.orders_dirty.swap(false, Ordering::AcqRel)
    }

    /// Atomically read-and-clear the positions dirty flag.
    pub fn consume_positions_dirty(&self) -> bool {
        self.positions_dirty.swap(false, Ordering::AcqRel)
    }
}

impl Default for ReconciliationStore {
    fn default() -> Self {
        Self::new()
    }
}
