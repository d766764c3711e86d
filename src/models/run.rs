//! Run model and service.

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{
    Relationship, Relationships, RequestBody, Resource, ResourceObject, ResourceType,
};
use crate::pagination::{ListOptions, Page, Paginated};

use super::{segment, valid_string, valid_string_id};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    FetchingCompleted,
    Queuing,
    PlanQueued,
    Planning,
    Planned,
    CostEstimating,
    CostEstimated,
    PolicyChecking,
    PolicyOverride,
    PolicySoftFailed,
    PolicyChecked,
    Confirmed,
    PlannedAndFinished,
    ApplyQueued,
    Applying,
    Applied,
    Discarded,
    Errored,
    Canceled,
    ForceCanceled,
    /// A status this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run can make no further progress.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            RunStatus::Applied
                | RunStatus::PlannedAndFinished
                | RunStatus::Discarded
                | RunStatus::Errored
                | RunStatus::Canceled
                | RunStatus::ForceCanceled
                | RunStatus::PolicySoftFailed
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        f.write_str(&s)
    }
}

/// Which actions the current user may take on a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunActions {
    #[serde(default)]
    pub is_cancelable: bool,
    #[serde(default)]
    pub is_confirmable: bool,
    #[serde(default)]
    pub is_discardable: bool,
    #[serde(default)]
    pub is_force_cancelable: bool,
}

/// Attributes of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunAttributes {
    pub status: RunStatus,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub trigger_reason: Option<String>,

    #[serde(default)]
    pub is_destroy: bool,

    #[serde(default)]
    pub has_changes: bool,

    #[serde(default)]
    pub auto_apply: bool,

    #[serde(default)]
    pub plan_only: bool,

    #[serde(default)]
    pub actions: RunActions,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ResourceType for RunAttributes {
    const TYPE: &'static str = "runs";
}

/// A TFE run.
///
/// Related ids: `workspace`, `plan`, `apply`, `configuration-version`.
pub type Run = ResourceObject<RunAttributes>;

/// Query parameters for listing the runs of a workspace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunListOptions {
    #[serde(flatten)]
    pub list: ListOptions,

    #[serde(rename = "filter[status]", skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,

    #[serde(rename = "filter[source]", skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<String>,

    #[serde(rename = "search[user]", skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

impl Paginated for RunListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Query parameters for reading a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReadOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

/// Parameters for queuing a run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunCreateOptions {
    /// Workspace to run in. Required.
    #[serde(skip)]
    pub workspace_id: Option<String>,

    /// Configuration version to use; the latest when unset.
    #[serde(skip)]
    pub configuration_version_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_destroy: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_apply: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_only: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_only: Option<bool>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_addrs: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replace_addrs: Vec<String>,
}

impl Resource for RunCreateOptions {
    const TYPE: &'static str = RunAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }

    fn relationships(&self) -> Relationships {
        let mut rels = Relationships::new();
        if let Some(id) = &self.workspace_id {
            rels.insert("workspace".to_string(), Relationship::one("workspaces", id));
        }
        if let Some(id) = &self.configuration_version_id {
            rels.insert(
                "configuration-version".to_string(),
                Relationship::one("configuration-versions", id),
            );
        }
        rels
    }
}

/// Body of the apply, cancel, force-cancel and discard actions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunActionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl RunActionOptions {
    pub fn with_comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
        }
    }
}

/// Run endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Runs<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn runs(&self) -> Runs<'_> {
        Runs { client: self }
    }
}

fn run_path(run_id: &str) -> Result<String> {
    if !valid_string_id(run_id) {
        return Err(TfeError::InvalidRunId);
    }
    Ok(format!("runs/{}", segment(run_id)))
}

impl Runs<'_> {
    /// List the runs of a workspace, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, workspace_id: &str, options: &RunListOptions) -> Result<Page<Run>> {
        if !valid_string_id(workspace_id) {
            return Err(TfeError::InvalidWorkspaceId);
        }

        let path = format!("workspaces/{}/runs", segment(workspace_id));
        self.client
            .request(Method::GET, &path)?
            .query(options)?
            .fetch_list()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, options: &RunCreateOptions) -> Result<Run> {
        if !valid_string(options.workspace_id.as_deref()) {
            return Err(TfeError::RequiredWorkspace);
        }

        self.client
            .request(Method::POST, "runs")?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    pub async fn read(&self, run_id: &str) -> Result<Run> {
        self.read_with_options(run_id, &RunReadOptions::default())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read_with_options(&self, run_id: &str, options: &RunReadOptions) -> Result<Run> {
        let path = run_path(run_id)?;
        self.client
            .request(Method::GET, &path)?
            .query(options)?
            .fetch_one()
            .await
    }

    /// Confirm a planned run so it proceeds to apply.
    #[tracing::instrument(skip(self))]
    pub async fn apply(&self, run_id: &str, options: &RunActionOptions) -> Result<()> {
        self.action(run_id, "apply", options).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, run_id: &str, options: &RunActionOptions) -> Result<()> {
        self.action(run_id, "cancel", options).await
    }

    /// Stop a run immediately. Only allowed after a regular cancel.
    #[tracing::instrument(skip(self))]
    pub async fn force_cancel(&self, run_id: &str, options: &RunActionOptions) -> Result<()> {
        self.action(run_id, "force-cancel", options).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn discard(&self, run_id: &str, options: &RunActionOptions) -> Result<()> {
        self.action(run_id, "discard", options).await
    }

    async fn action(&self, run_id: &str, action: &str, options: &RunActionOptions) -> Result<()> {
        let path = format!("{}/actions/{action}", run_path(run_id)?);
        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::json(options)?)
            .execute()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_deserialize() {
        let json = r#"{
            "data": {
                "id": "run-CZcmD7eagjhyX0vN",
                "type": "runs",
                "attributes": {
                    "status": "planned",
                    "message": "Queued manually",
                    "has-changes": true,
                    "is-destroy": false,
                    "actions": { "is-confirmable": true, "is-discardable": true },
                    "created-at": "2024-05-01T12:30:00Z"
                },
                "relationships": {
                    "workspace": { "data": { "id": "ws-1", "type": "workspaces" } },
                    "plan": { "data": { "id": "plan-1", "type": "plans" } }
                }
            }
        }"#;

        let run: Run = crate::jsonapi::decode_one(json.as_bytes()).unwrap();
        assert_eq!(run.attributes.status, RunStatus::Planned);
        assert!(run.attributes.has_changes);
        assert!(run.attributes.actions.is_confirmable);
        assert!(!run.attributes.actions.is_cancelable);
        assert_eq!(run.related_id("plan"), Some("plan-1"));
    }

    #[test]
    fn test_unknown_status() {
        let status: RunStatus = serde_json::from_str(r#""post_plan_awaiting_decision""#).unwrap();
        assert_eq!(status, RunStatus::Unknown);
        assert!(!status.is_final());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RunStatus::PlannedAndFinished.to_string(), "planned_and_finished");
        assert_eq!(RunStatus::ForceCanceled.to_string(), "force_canceled");
        assert!(RunStatus::Applied.is_final());
    }

    #[test]
    fn test_create_body_links_workspace() {
        let opts = RunCreateOptions {
            workspace_id: Some("ws-1".to_string()),
            message: Some("deploy".to_string()),
            ..Default::default()
        };
        let body = RequestBody::resource(&opts).unwrap();
        assert_eq!(
            body.payload(),
            &serde_json::json!({
                "data": {
                    "type": "runs",
                    "attributes": { "message": "deploy" },
                    "relationships": {
                        "workspace": { "data": { "type": "workspaces", "id": "ws-1" } }
                    }
                }
            })
        );
    }

    #[test]
    fn test_action_body() {
        let body = RequestBody::json(&RunActionOptions::with_comment("lgtm")).unwrap();
        assert_eq!(body.payload(), &serde_json::json!({ "comment": "lgtm" }));

        let empty = RequestBody::json(&RunActionOptions::default()).unwrap();
        assert_eq!(empty.payload(), &serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_validation_sentinels() {
        let client = TfeClient::new(Default::default()).unwrap();
        let runs = client.runs();

        assert!(matches!(runs.read("").await, Err(TfeError::InvalidRunId)));
        assert!(matches!(
            runs.apply("run 1", &RunActionOptions::default()).await,
            Err(TfeError::InvalidRunId)
        ));
        assert!(matches!(
            runs.create(&RunCreateOptions::default()).await,
            Err(TfeError::RequiredWorkspace)
        ));
        assert!(matches!(
            runs.list("", &RunListOptions::default()).await,
            Err(TfeError::InvalidWorkspaceId)
        ));
    }
}
