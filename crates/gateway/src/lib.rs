//! HTTP API gateway for stepwise.
//!
//! Exposes the agent over streaming HTTP: raw SSE for plain chat and agent
//! runs, the Vercel AI data stream protocol for chat UIs, and direct access
//! to the file tools.
//!
//! Built on Axum.

pub mod agent_api;
pub mod data_stream;
pub mod files_api;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use stepwise_agent::{DirectChat, ReactAgent};
use stepwise_config::AppConfig;
use stepwise_core::provider::Provider;
use stepwise_core::tool::{ToolRegistry, ToolView};
use stepwise_tools::FileService;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub registry: ToolRegistry,
    pub files: FileService,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Tools for one run. `None` falls back to `[agent].enabled_tools`,
    /// and an empty configured list means every registered tool.
    pub fn tool_view(&self, enabled: Option<&[String]>) -> ToolView {
        match enabled {
            Some(names) => self.registry.filtered(names),
            None if self.config.agent.enabled_tools.is_empty() => self.registry.view(),
            None => self
                .registry
                .filtered(self.config.agent.enabled_tools.as_slice()),
        }
    }

    /// A fresh agent bounded by the gateway's run timeout.
    pub fn agent(&self, enabled: Option<&[String]>) -> ReactAgent {
        ReactAgent::new(
            Arc::clone(&self.provider),
            self.config.default_model.clone(),
            self.tool_view(enabled),
        )
        .with_config(&self.config.agent)
        .with_temperature(self.config.default_temperature)
        .with_timeout(Duration::from_secs(self.config.gateway.run_timeout_secs))
    }

    pub fn chat(&self) -> DirectChat {
        DirectChat::new(Arc::clone(&self.provider), self.config.default_model.clone())
            .with_temperature(self.config.default_temperature)
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.gateway.max_body_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(agent_api::chat_handler))
        .route("/v1/agent/stream", post(agent_api::agent_stream_handler))
        .route("/v2/assistant", post(agent_api::assistant_handler))
        .nest("/api/file-tools", files_api::files_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = stepwise_providers::build_from_config(&config)?;
    let registry = stepwise_tools::default_registry(&config.tools)?;
    let files = stepwise_tools::file_service(&config.tools)?;
    info!(
        provider = provider.name(),
        model = %config.default_model,
        tools = ?registry.names(),
        "Gateway subsystems ready"
    );

    let state = Arc::new(GatewayState {
        config,
        provider,
        registry,
        files,
    });
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
