//! Exchange gateway: the seam between the reconciliation core and the venue
//!
//! The core consumes the [`ExchangeGateway`] trait only; `BinanceGateway` is
//! the production implementation and tests substitute `mock::MockGateway`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

pub mod binance;
pub mod events;
pub mod types;
pub mod user_stream;

#[cfg(test)]
pub(crate) mod mock;

pub use binance::BinanceGateway;
pub use events::UserEvent;
pub use types::{MarginType, Order, Position, PositionKey, PositionSide, Side};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("exchange rejected request: code {code}: {message}")]
    Exchange { code: i64, message: String },
    #[error("malformed gateway response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("bad endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

/// Gateway operations the core depends on.
///
/// Mutating calls are synchronous request/response; their effects come back
/// through the event subscription, never through the return value.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn fetch_open_orders(&self) -> Result<Vec<Order>, GatewayError>;

    /// Raw position rows; the caller filters placeholder rows
    /// (entry price zero) before seeding the store.
    async fn fetch_open_positions(&self) -> Result<Vec<Position>, GatewayError>;

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), GatewayError>;

    /// Per-symbol bulk cancel.
    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), GatewayError>;

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        position_side: PositionSide,
        quantity: Decimal,
    ) -> Result<(), GatewayError>;

    /// Start the account-event subscription. Decoded events are delivered
    /// into `events` until the returned handle is shut down or the
    /// connection dies.
    async fn subscribe_user_events(
        &self,
        events: mpsc::Sender<UserEvent>,
    ) -> Result<SubscriptionHandle, GatewayError>;
}

/// Handle to a running event subscription.
///
/// Dropping the handle leaves the task running; [`SubscriptionHandle::shutdown`]
/// signals the task and joins it, guaranteeing no event is delivered after it
/// returns.
pub struct SubscriptionHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn new(shutdown_tx: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { shutdown_tx, task }
    }

    /// Stop the subscription task and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("subscription task did not exit cleanly: {}", e);
        }
    }
}
