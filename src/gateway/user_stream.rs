//! User data stream task: reads push frames, decodes them, keeps the
//! listen key alive. The task owns the socket; there is no automatic
//! reconnect, a dropped stream is recovered by a manual session refresh.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::events::{decode_user_event, UserEvent};
use super::SubscriptionHandle;

/// The exchange expires listen keys after 60 minutes without a keepalive.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30 * 60);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Extends the listen key lifetime. Keepalive failures are logged only;
/// the stream stays up until the exchange actually drops it.
pub(super) struct ListenKeyKeepalive {
    pub http: reqwest::Client,
    pub rest_url: String,
    pub api_key: String,
}

impl ListenKeyKeepalive {
    async fn refresh(&self) {
        let url = format!("{}/fapi/v1/listenKey", self.rest_url);
        let result = self
            .http
            .put(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!("listen key refreshed");
            }
            Ok(response) => {
                warn!(status = %response.status(), "listen key refresh rejected");
            }
            Err(e) => {
                warn!("listen key refresh failed: {}", e);
            }
        }
    }
}

pub(super) fn spawn(
    stream: WsStream,
    keepalive: ListenKeyKeepalive,
    events: mpsc::Sender<UserEvent>,
) -> SubscriptionHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(stream, keepalive, events, shutdown_rx));
    SubscriptionHandle::new(shutdown_tx, task)
}

async fn run(
    stream: WsStream,
    keepalive: ListenKeyKeepalive,
    events: mpsc::Sender<UserEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (mut write, mut read) = stream.split();

    let mut refresh_timer = tokio::time::interval(KEEPALIVE_INTERVAL);
    refresh_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick fires immediately; the key was just created
    refresh_timer.tick().await;

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(raw))) => match decode_user_event(&raw) {
                    Ok(UserEvent::Other) => {
                        debug!("unhandled stream event");
                    }
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            debug!("event receiver dropped, closing stream");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("dropping undecodable frame: {}", e);
                    }
                },
                Some(Ok(Message::Ping(payload))) => {
                    if write.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("user data stream closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("user data stream error: {}", e);
                    break;
                }
            },
            _ = refresh_timer.tick() => {
                keepalive.refresh().await;
            }
            _ = shutdown.changed() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }
    debug!("user data stream task exited");
}
