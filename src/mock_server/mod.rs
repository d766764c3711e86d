//! Mock TFE API server for E2E testing.
//!
//! This module provides an in-memory mock server that serves organizations
//! and workspaces as JSON:API documents. Unlike wiremock which mocks at the
//! HTTP level per-test, this server maintains state across requests, so a
//! create followed by a read sees the created resource.
//!
//! # Example
//!
//! ```ignore
//! use tfeapi::mock_server::MockServer;
//! use tfeapi::{Config, TfeClient};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let client = TfeClient::new(Config {
//!         address: server.url().to_string(),
//!         token: "test-token".to_string(),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//!     // Server comes with default fixtures
//!     let ws = client.workspaces().read("acme", "prod-network").await.unwrap();
//!     assert!(!ws.attributes.locked);
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{DefaultScenario, Fixtures};
pub use server::MockServer;
pub use state::MockState;
