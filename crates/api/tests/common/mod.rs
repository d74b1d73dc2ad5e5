#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pedidos_core::locking::LockConfig;
use pedidos_core::protocol::ServerMessage;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use pedidos_api::config::{LogFormat, ServerConfig};
use pedidos_api::locks::{Broadcaster, LockCoordinator};
use pedidos_api::router::build_app_router;
use pedidos_api::state::AppState;
use pedidos_api::ws::WsManager;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        ws_ping_interval_secs: 30,
        lock: LockConfig::default(),
        log_format: LogFormat::Pretty,
    }
}

/// A registry plus a running coordinator over it.
pub struct Harness {
    pub ws_manager: Arc<WsManager>,
    pub coordinator: LockCoordinator,
    pub broadcaster: Broadcaster,
}

impl Harness {
    pub fn start() -> Self {
        let ws_manager = Arc::new(WsManager::new());
        let (coordinator, _handle) =
            LockCoordinator::start(Arc::clone(&ws_manager), test_config().lock);
        Self {
            broadcaster: Broadcaster::new(Arc::clone(&ws_manager)),
            ws_manager,
            coordinator,
        }
    }

    /// Register `conn_id` and authenticate it as `user_id`.
    pub async fn connect(
        &self,
        conn_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> UnboundedReceiver<Message> {
        let rx = self.ws_manager.add(conn_id.to_string()).await;
        self.ws_manager
            .authenticate(conn_id, user_id.to_string(), display_name.to_string())
            .await;
        rx
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::new(test_config()),
            ws_manager: Arc::clone(&self.ws_manager),
            coordinator: self.coordinator.clone(),
        }
    }

    pub fn app(&self) -> Router {
        build_app_router(self.state(), &test_config())
    }
}

/// Drain every frame already queued on `rx`, decoded.
pub fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<ServerMessage> {
    let mut frames = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            frames.push(ServerMessage::parse(text.as_str()).expect("server frame parses"));
        }
    }
    frames
}

/// Issue a GET against the router and return status plus JSON body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response.into_body()).await)
}

pub async fn body_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
