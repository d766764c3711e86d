//! Plan model and service.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{ResourceObject, ResourceType};
use crate::logs::LogReader;

use super::{segment, valid_string_id};

/// State of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
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

impl PlanStatus {
    /// Whether the plan has stopped producing output.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            PlanStatus::Errored | PlanStatus::Canceled | PlanStatus::Finished | PlanStatus::Unreachable
        )
    }
}

/// Attributes of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlanAttributes {
    pub status: PlanStatus,

    #[serde(default)]
    pub has_changes: bool,

    #[serde(default)]
    pub resource_additions: u32,

    #[serde(default)]
    pub resource_changes: u32,

    #[serde(default)]
    pub resource_destructions: u32,

    /// Pre-signed URL the log archive is served from.
    #[serde(default)]
    pub log_read_url: Option<String>,
}

impl ResourceType for PlanAttributes {
    const TYPE: &'static str = "plans";
}

/// The plan phase of a run.
pub type Plan = ResourceObject<PlanAttributes>;

/// Plan endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Plans<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn plans(&self) -> Plans<'_> {
        Plans { client: self }
    }
}

impl Plans<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn read(&self, plan_id: &str) -> Result<Plan> {
        if !valid_string_id(plan_id) {
            return Err(TfeError::InvalidPlanId);
        }

        let path = format!("plans/{}", segment(plan_id));
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    /// Stream the plan's log output.
    ///
    /// The reader finishes once the log's end marker arrives or the plan
    /// reaches a final status.
    #[tracing::instrument(skip(self))]
    pub async fn logs(&self, plan_id: &str) -> Result<LogReader> {
        let plan = self.read(plan_id).await?;
        let url = log_url(plan.attributes.log_read_url.as_deref())?;

        let client = self.client.clone();
        let id = plan_id.to_string();
        Ok(LogReader::new(self.client.clone(), url, move || {
            let client = client.clone();
            let id = id.clone();
            async move {
                let plan = client.plans().read(&id).await?;
                Ok(plan.attributes.status.is_final())
            }
        }))
    }
}

pub(crate) fn log_url(raw: Option<&str>) -> Result<Url> {
    match raw {
        Some(raw) if !raw.is_empty() => Ok(Url::parse(raw)?),
        _ => Err(TfeError::LogUrlUnavailable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_deserialize() {
        let json = r#"{
            "data": {
                "id": "plan-8F5JFydVYAmtTjET",
                "type": "plans",
                "attributes": {
                    "status": "finished",
                    "has-changes": true,
                    "resource-additions": 3,
                    "resource-changes": 1,
                    "resource-destructions": 0,
                    "log-read-url": "https://archivist.example/v1/object/abc"
                }
            }
        }"#;

        let plan: Plan = crate::jsonapi::decode_one(json.as_bytes()).unwrap();
        assert_eq!(plan.attributes.status, PlanStatus::Finished);
        assert!(plan.attributes.status.is_final());
        assert_eq!(plan.attributes.resource_additions, 3);
        assert!(log_url(plan.attributes.log_read_url.as_deref()).is_ok());
    }

    #[test]
    fn test_missing_log_url() {
        assert!(matches!(log_url(None), Err(TfeError::LogUrlUnavailable)));
        assert!(matches!(log_url(Some("")), Err(TfeError::LogUrlUnavailable)));
    }

    #[tokio::test]
    async fn test_invalid_plan_id() {
        let client = TfeClient::new(Default::default()).unwrap();
        assert!(matches!(client.plans().read("").await, Err(TfeError::InvalidPlanId)));
        assert!(matches!(client.plans().logs("a b").await, Err(TfeError::InvalidPlanId)));
    }
}
