//! Chat API server — Axum-based HTTP server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tracing::info;

use parlay_core::{ChatError, ChatOrchestrator, ChatRequest, ChatResponse};

/// Shared state for all request handlers
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub system_name: String,
}

/// The API server
pub struct ApiServer {
    state: ApiState,
    bind: SocketAddr,
}

impl ApiServer {
    /// Create a new server over an already-built orchestrator.
    pub fn new(
        bind: SocketAddr,
        orchestrator: Arc<ChatOrchestrator>,
        system_name: impl Into<String>,
    ) -> Self {
        let state = ApiState {
            orchestrator,
            system_name: system_name.into(),
        };
        Self { state, bind }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/chat", post(chat_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Parlay gateway listening on {}", self.bind);

        self.state.orchestrator.record_system_event("gateway started");

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

// ── HTTP Handlers ──

/// Liveness only; no dependency is checked.
async fn root_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "online",
        "system": state.system_name,
    }))
}

async fn chat_handler(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state.orchestrator.handle(request).await?;
    Ok(Json(response))
}

/// Maps the error taxonomy onto HTTP statuses: validation and unknown
/// provider to 400, provider call failures to 500.
#[derive(Debug)]
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use parlay_core::{OrchestratorConfig, Provider, ProviderGateway, ProviderKind, Reply};
    use parlay_store::{AuditEvent, AuditLog, InteractionRecord, InteractionStore};
    use uuid::Uuid;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }
        async fn generate(&self, prompt: &str) -> Result<Reply> {
            Ok(Reply::text(format!("echo: {prompt}")))
        }
    }

    struct FailProvider;

    #[async_trait]
    impl Provider for FailProvider {
        fn name(&self) -> &str {
            "fail"
        }
        async fn generate(&self, _prompt: &str) -> Result<Reply> {
            Err(anyhow::anyhow!("backend unavailable"))
        }
    }

    /// Sink that accepts everything and remembers nothing.
    struct NullSink;

    #[async_trait]
    impl InteractionStore for NullSink {
        async fn append(&self, _record: InteractionRecord) -> Result<()> {
            Ok(())
        }
        async fn interactions_for_session(&self, _session_id: Uuid) -> Result<Vec<InteractionRecord>> {
            Ok(vec![])
        }
    }

    #[async_trait]
    impl AuditLog for NullSink {
        async fn append(&self, _event: AuditEvent) -> Result<()> {
            Ok(())
        }
        async fn recent_events(&self, _limit: usize) -> Result<Vec<AuditEvent>> {
            Ok(vec![])
        }
    }

    fn test_state(provider: Arc<dyn Provider>) -> ApiState {
        let mut providers = ProviderGateway::new();
        providers.register(ProviderKind::Google, provider);
        let sink = Arc::new(NullSink);
        let orchestrator = Arc::new(ChatOrchestrator::new(
            providers,
            sink.clone(),
            sink,
            OrchestratorConfig::default(),
        ));
        ApiState {
            orchestrator,
            system_name: "parlay".to_string(),
        }
    }

    #[tokio::test]
    async fn test_root_reports_online() {
        let state = test_state(Arc::new(EchoProvider));
        let response = root_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "online");
        assert_eq!(json["system"], "parlay");
    }

    #[tokio::test]
    async fn test_chat_success_returns_response_with_session_id() {
        let state = test_state(Arc::new(EchoProvider));
        let request = ChatRequest::new("2+2?");

        let Json(response) = chat_handler(State(state), Json(request)).await.unwrap();
        assert_eq!(response.response, "echo: 2+2?");
        assert_eq!(response.provider, "google");
        // session_id is a real v4 UUID
        assert_eq!(response.session_id.get_version_num(), 4);
    }

    #[tokio::test]
    async fn test_chat_unknown_provider_maps_to_400() {
        let state = test_state(Arc::new(EchoProvider));
        let request = ChatRequest::new("hi").with_provider("bogus");

        let err = chat_handler(State(state), Json(request)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["error"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn test_chat_empty_prompt_maps_to_400() {
        let state = test_state(Arc::new(EchoProvider));
        let request = ChatRequest::new("");

        let err = chat_handler(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_provider_failure_maps_to_500_with_cause() {
        let state = test_state(Arc::new(FailProvider));
        let request = ChatRequest::new("hi");

        let err = chat_handler(State(state), Json(request)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["error"].as_str().unwrap().contains("backend unavailable"));
    }

    #[test]
    fn test_router_builds() {
        let state = test_state(Arc::new(EchoProvider));
        let server = ApiServer {
            state,
            bind: "127.0.0.1:0".parse().unwrap(),
        };
        let _router = server.router();
    }
}
