//! Mock TFE API server.
//!
//! Provides an axum-based HTTP server that simulates the organization and
//! workspace endpoints of the TFE API.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::{DefaultScenario, Fixtures};
use super::handlers;
use super::state::MockState;

/// A mock TFE API server for testing.
///
/// The server runs in the background and serves JSON:API documents under
/// `/api/v2/`, so a [`crate::TfeClient`] can be pointed at [`MockServer::url`]
/// with the default base path.
pub struct MockServer {
    /// The URL where the server is listening.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's base URL.
    pub async fn start() -> Self {
        Self::with_state(Self::default_state()).await
    }

    /// Start a mock server with empty state.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            url: format!("http://{}", addr),
            handle,
            state: shared_state,
        }
    }

    /// Get the base URL of the mock server.
    ///
    /// Use this as [`crate::Config::address`].
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get access to the server's shared state.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    fn default_state() -> MockState {
        Self::state_from_scenario(Fixtures::default_scenario())
    }

    fn state_from_scenario(scenario: DefaultScenario) -> MockState {
        let mut state = MockState::new();

        for org in scenario.organizations {
            state = state.with_organization(org);
        }

        for ws in scenario.workspaces {
            state = state.with_workspace(ws);
        }

        state
    }

    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        Router::new()
            .route("/api/v2/ping", get(ping))
            // Organization routes
            .route(
                "/api/v2/organizations",
                get(handlers::list_organizations).post(handlers::create_organization),
            )
            .route(
                "/api/v2/organizations/:org",
                get(handlers::get_organization).delete(handlers::delete_organization),
            )
            // Workspace routes
            .route(
                "/api/v2/organizations/:org/workspaces",
                get(handlers::list_workspaces).post(handlers::create_workspace),
            )
            .route(
                "/api/v2/organizations/:org/workspaces/:name",
                get(handlers::get_workspace).delete(handlers::delete_workspace),
            )
            .route("/api/v2/workspaces/:id", get(handlers::get_workspace_by_id))
            .route(
                "/api/v2/workspaces/:id/actions/lock",
                post(handlers::lock_workspace),
            )
            .route(
                "/api/v2/workspaces/:id/actions/unlock",
                post(handlers::unlock_workspace),
            )
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// GET /api/v2/ping
///
/// Advertises the API version and, when configured, the rate limit.
async fn ping(State(state): State<Arc<RwLock<MockState>>>) -> Response {
    let state = state.read().await;
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();

    if let Ok(version) = state.api_version.parse() {
        headers.insert("tfp-api-version", version);
    }
    if let Some(limit) = state.rate_limit {
        headers.insert("x-ratelimit-limit", limit.into());
    }

    response
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, ListOptions, TfeClient, TfeError, WorkspaceListOptions};

    fn client_for(server: &MockServer, token: &str) -> TfeClient {
        TfeClient::new(Config {
            address: server.url().to_string(),
            token: token.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_server_starts_and_responds() {
        let server = MockServer::start().await;

        let response = reqwest::Client::new()
            .get(format!("{}/health", server.url()))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "ok");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_reads_ping_metadata() {
        let server = MockServer::with_state(MockState::new().with_rate_limit(30)).await;
        let client = TfeClient::connect(Config {
            address: server.url().to_string(),
            token: "test-token".to_string(),
            ..Default::default()
        })
        .await
        .expect("Failed to connect");

        assert_eq!(client.remote_api_version().as_deref(), Some("2.6"));
        assert_eq!(client.rate_limiter().settings(), Some((20.0, 10.0)));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_read_organization_with_client() {
        let server = MockServer::start().await;
        let client = client_for(&server, "test-token");

        let org = client.organizations().read("acme").await.unwrap();

        assert_eq!(org.id, "acme");
        assert_eq!(org.attributes.email.as_deref(), Some("admin@acme.test"));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_workspaces_paginates() {
        let server = MockServer::start().await;
        let client = client_for(&server, "test-token");

        let options = WorkspaceListOptions {
            list: ListOptions::for_page(1, 1),
            ..Default::default()
        };
        let page = client.workspaces().list("acme", &options).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].attributes.name, "prod-network");
        assert_eq!(page.pagination.total_count, 2);
        assert_eq!(page.pagination.next_page, Some(2));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_required_token_is_enforced() {
        let state = MockState::new()
            .with_organization(Fixtures::organization("acme"))
            .with_required_token("secret");
        let server = MockServer::with_state(state).await;

        let denied = client_for(&server, "wrong").organizations().read("acme").await;
        assert!(matches!(denied, Err(TfeError::Unauthorized)));

        let allowed = client_for(&server, "secret").organizations().read("acme").await;
        assert!(allowed.is_ok());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_server() {
        let server = MockServer::start_empty().await;
        let client = client_for(&server, "test-token");

        let result = client.organizations().read("nonexistent").await;

        assert!(matches!(result, Err(TfeError::ResourceNotFound)));

        server.shutdown().await;
    }
}
