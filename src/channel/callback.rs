//! HTTP callback endpoint through which job workers publish notifications.
//!
//! A worker posts the same `[channel, message]` pair it would put on the
//! server bus; the endpoint decodes it and publishes it into a
//! [`NotificationBus`], where the waiting monitor's subscription picks it up.
//!
//! ## Endpoints
//!
//! | Method | Path      | Body                   | Response                      |
//! |--------|-----------|------------------------|-------------------------------|
//! | GET    | `/health` | —                      | `200 ok`                      |
//! | POST   | `/notify` | `[channel, message]`   | `200 {"delivered": n}`        |
//!
//! A body that is not JSON, not a pair, or whose message is not an object,
//! gets `422`.
//!
//! ## Usage
//!
//! ```no_run
//! use jobwatch::channel::{CallbackServer, NotificationBus};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let bus = NotificationBus::new();
//! let mut server = CallbackServer::new(bus.clone());
//! let url = server.start(0).await?;
//! // Workers POST to {url}/notify ...
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

use super::NotificationBus;
use crate::errors::ChannelError;
use crate::notification::Notification;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, oneshot};

/// State shared between the request handlers.
#[derive(Debug)]
pub(crate) struct ServerState {
    bus: NotificationBus,
    pub(crate) running: bool,
}

impl ServerState {
    fn new(bus: NotificationBus) -> Self {
        Self {
            bus,
            running: false,
        }
    }
}

/// HTTP endpoint publishing worker notifications into a bus.
pub struct CallbackServer {
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    addr: Option<SocketAddr>,
}

impl CallbackServer {
    pub fn new(bus: NotificationBus) -> Self {
        Self {
            state: Arc::new(RwLock::new(ServerState::new(bus))),
            shutdown_tx: None,
            addr: None,
        }
    }

    /// Bind `127.0.0.1:<port>` (0 picks a free port) and start serving.
    ///
    /// Returns the base URL workers should post to.
    pub async fn start(&mut self, port: u16) -> Result<String, ChannelError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|source| ChannelError::BindFailed { port, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| ChannelError::BindFailed { port, source })?;
        self.addr = Some(addr);

        self.state.write().await.running = true;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let app = build_router(self.state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                tracing::error!("Callback endpoint error: {}", e);
            }
        });

        let url = format!("http://{}", addr);
        tracing::info!(%url, "Callback endpoint listening");
        Ok(url)
    }

    /// Stop serving. Safe to call more than once.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.state.write().await.running = false;
        self.addr = None;
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }
}

fn build_router(state: Arc<RwLock<ServerState>>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/notify", post(notify_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn notify_handler(
    State(state): State<Arc<RwLock<ServerState>>>,
    body: Bytes,
) -> impl IntoResponse {
    match Notification::from_body(&body) {
        Ok((channel, notification)) => {
            let delivered = state.read().await.bus.publish(&channel, notification);
            tracing::debug!(%channel, delivered, "Notification accepted");
            (StatusCode::OK, Json(json!({ "delivered": delivered })))
        }
        Err(e) => {
            tracing::warn!("Rejected notification payload: {}", e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

/// Post one notification to a running callback endpoint.
///
/// Returns how many subscriptions the endpoint delivered it to.
pub async fn report_notification(
    base_url: &str,
    channel: &str,
    notification: &Notification,
) -> Result<usize, ChannelError> {
    let url = format!("{}/notify", base_url.trim_end_matches('/'));
    let delivery_failed = |message: String| ChannelError::DeliveryFailed {
        url: url.clone(),
        message,
    };

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!([channel, notification.to_message()]))
        .send()
        .await
        .map_err(|e| delivery_failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(delivery_failed(format!("endpoint answered {}", status)));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| delivery_failed(e.to_string()))?;
    Ok(body["delivered"].as_u64().unwrap_or(0) as usize)
}
