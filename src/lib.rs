//! Terraform Cloud / Enterprise API client library.
//!
//! A Rust library for the TFE JSON:API. A single [`TfeClient`] owns the
//! connection pool, rate limiter and retry policy; each resource family is
//! reached through a lightweight service accessor on the client.
//!
//! # Quick Start
//!
//! ```no_run
//! use tfeapi::{Config, TfeClient, WorkspaceListOptions};
//!
//! #[tokio::main]
//! async fn main() -> tfeapi::Result<()> {
//!     // Reads TFE_TOKEN (and optionally TFE_ADDRESS) and pings the API
//!     let client = TfeClient::connect(Config::from_env()?).await?;
//!
//!     let org = client.organizations().read("my-org").await?;
//!     println!("Organization: {}", org.attributes.name);
//!
//!     // One page of workspaces
//!     let page = client
//!         .workspaces()
//!         .list("my-org", &WorkspaceListOptions::default())
//!         .await?;
//!     for ws in &page {
//!         println!("{} locked={}", ws.attributes.name, ws.attributes.locked);
//!     }
//!
//!     // Every workspace, walking all pages
//!     let all = tfeapi::collect_all(WorkspaceListOptions::default(), |opts| {
//!         let client = &client;
//!         async move { client.workspaces().list("my-org", &opts).await }
//!     })
//!     .await?;
//!     println!("Found {} workspaces", all.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`query`] encodes options structs into sorted query strings.
//! - [`jsonapi`] writes request bodies and decodes single and list documents.
//! - [`client`] builds requests and runs the retry loop.
//! - [`retry`] and [`rate_limit`] decide when to retry and how fast to send.
//! - [`error`] translates error responses into [`TfeError`].
//!
//! Models are [`ResourceObject`]s over a per-resource attributes struct, so
//! ids and relationship linkage are handled the same way everywhere.
//!
//! # Configuration
//!
//! [`Config::from_env`] reads:
//!
//! - `TFE_TOKEN` (required) - API token
//! - `TFE_ADDRESS` (optional) - defaults to `https://app.terraform.io`
//! - `TFE_BASE_PATH` (optional) - defaults to `/api/v2/`

pub mod cancel;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod jsonapi;
pub mod logs;
mod models;
pub mod output;
pub mod pagination;
pub mod query;
pub mod rate_limit;
pub mod retry;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use cancel::CancellationToken;
pub use client::{ApiRequest, TfeClient};
pub use config::Config;
pub use error::{Result, TfeError};
pub use jsonapi::{Document, RequestBody, Resource, ResourceObject, ResourceType};
pub use logs::LogReader;
pub use pagination::{collect_all, ListOptions, Page, Pagination, PaginationNextPrev};
pub use query::QueryParams;
pub use retry::{RetryEvent, RetryLogHook};

// Re-export models and services
pub use models::*;
