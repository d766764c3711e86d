//! Apply model and service.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{ResourceObject, ResourceType};
use crate::logs::LogReader;

use super::plan::log_url;
use super::{segment, valid_string_id};

/// State of an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Pending,
    ManagedQueued,
    Queued,
    Running,
    Errored,
    Canceled,
    Finished,
    Unreachable,
    #[serde(other)]
    Unknown,
}

impl ApplyStatus {
    pub fn is_final(self) -> bool {
        matches!(
            self,
            ApplyStatus::Errored
                | ApplyStatus::Canceled
                | ApplyStatus::Finished
                | ApplyStatus::Unreachable
        )
    }
}

/// Attributes of an apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApplyAttributes {
    pub status: ApplyStatus,

    #[serde(default)]
    pub resource_additions: u32,

    #[serde(default)]
    pub resource_changes: u32,

    #[serde(default)]
    pub resource_destructions: u32,

    #[serde(default)]
    pub log_read_url: Option<String>,
}

impl ResourceType for ApplyAttributes {
    const TYPE: &'static str = "applies";
}

/// The apply phase of a run.
pub type Apply = ResourceObject<ApplyAttributes>;

/// Apply endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Applies<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn applies(&self) -> Applies<'_> {
        Applies { client: self }
    }
}

impl Applies<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn read(&self, apply_id: &str) -> Result<Apply> {
        if !valid_string_id(apply_id) {
            return Err(TfeError::InvalidApplyId);
        }

        let path = format!("applies/{}", segment(apply_id));
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    /// Stream the apply's log output.
    #[tracing::instrument(skip(self))]
    pub async fn logs(&self, apply_id: &str) -> Result<LogReader> {
        let apply = self.read(apply_id).await?;
        let url = log_url(apply.attributes.log_read_url.as_deref())?;

        let client = self.client.clone();
        let id = apply_id.to_string();
        Ok(LogReader::new(self.client.clone(), url, move || {
            let client = client.clone();
            let id = id.clone();
            async move {
                let apply = client.applies().read(&id).await?;
                Ok(apply.attributes.status.is_final())
            }
        }))
    }
}
