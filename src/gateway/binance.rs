//! Binance USDⓈ-M futures gateway: signed REST calls + user data stream

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tracing::{debug, info};
use url::Url;

use crate::config::Settings;

use super::types::{Order, Position, PositionSide, Side};
use super::user_stream::{self, ListenKeyKeepalive};
use super::{ExchangeGateway, GatewayError, SubscriptionHandle, UserEvent};

type HmacSha256 = Hmac<Sha256>;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Exchange rejection body, e.g. `{"code":-2011,"msg":"Unknown order sent."}`
#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListenKeyResponse {
    listen_key: String,
}

pub struct BinanceGateway {
    http: reqwest::Client,
    rest_url: String,
    ws_url: String,
    api_key: String,
    api_secret: String,
    recv_window: u64,
}

impl BinanceGateway {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            rest_url: settings.rest_url.clone(),
            ws_url: settings.ws_url.clone(),
            api_key: settings.credentials.api_key.clone(),
            api_secret: settings.credentials.api_secret.clone(),
            recv_window: settings.recv_window,
        }
    }

    /// HMAC-SHA256 signature over the query string, hex-encoded.
    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let mut query: String = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!(
            "recvWindow={}&timestamp={}",
            self.recv_window,
            Utc::now().timestamp_millis()
        ));
        let signature = self.sign(&query);
        let url = format!("{}{}?{}&signature={}", self.rest_url, path, query, signature);

        debug!(%path, "signed request");
        let response = self
            .http
            .request(method, &url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Self::decode_response(response).await
    }

    async fn decode_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            match serde_json::from_str::<ApiError>(&body) {
                Ok(api) => Err(GatewayError::Exchange {
                    code: api.code,
                    message: api.msg,
                }),
                Err(_) => Err(GatewayError::Exchange {
                    code: i64::from(status.as_u16()),
                    message: body,
                }),
            }
        }
    }

    /// Listen keys are created unsigned, API key header only.
    async fn create_listen_key(&self) -> Result<String, GatewayError> {
        let url = format!("{}/fapi/v1/listenKey", self.rest_url);
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let decoded: ListenKeyResponse = Self::decode_response(response).await?;
        Ok(decoded.listen_key)
    }
}

#[async_trait]
impl ExchangeGateway for BinanceGateway {
    async fn fetch_open_orders(&self) -> Result<Vec<Order>, GatewayError> {
        self.signed_request(Method::GET, "/fapi/v1/openOrders", &[])
            .await
    }

    async fn fetch_open_positions(&self) -> Result<Vec<Position>, GatewayError> {
        self.signed_request(Method::GET, "/fapi/v2/positionRisk", &[])
            .await
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), GatewayError> {
        let _: serde_json::Value = self
            .signed_request(
                Method::DELETE,
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<(), GatewayError> {
        let _: serde_json::Value = self
            .signed_request(
                Method::DELETE,
                "/fapi/v1/allOpenOrders",
                &[("symbol", symbol.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        position_side: PositionSide,
        quantity: Decimal,
    ) -> Result<(), GatewayError> {
        let _: serde_json::Value = self
            .signed_request(
                Method::POST,
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("side", side.as_str().to_string()),
                    ("positionSide", position_side.as_str().to_string()),
                    ("type", "MARKET".to_string()),
                    ("quantity", quantity.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn subscribe_user_events(
        &self,
        events: mpsc::Sender<UserEvent>,
    ) -> Result<SubscriptionHandle, GatewayError> {
        let listen_key = self.create_listen_key().await?;
        let url = Url::parse(&format!("{}/ws/{}", self.ws_url, listen_key))?;
        info!("connecting user data stream");
        let (stream, _) = connect_async(url.as_str()).await?;

        let keepalive = ListenKeyKeepalive {
            http: self.http.clone(),
            rest_url: self.rest_url.clone(),
            api_key: self.api_key.clone(),
        };
        Ok(user_stream::spawn(stream, keepalive, events))
    }
}
