//! Workspace model and service.

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

/// Attributes of a workspace.
///
/// A workspace holds the state, variables and run history of one
/// Terraform configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceAttributes {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub auto_apply: bool,

    #[serde(default)]
    pub allow_destroy_plan: bool,

    #[serde(default)]
    pub locked: bool,

    /// `remote`, `local` or `agent`.
    #[serde(default)]
    pub execution_mode: Option<String>,

    #[serde(default)]
    pub terraform_version: Option<String>,

    #[serde(default)]
    pub working_directory: Option<String>,

    #[serde(default)]
    pub queue_all_runs: bool,

    #[serde(default)]
    pub speculative_enabled: bool,

    #[serde(default)]
    pub resource_count: u64,

    #[serde(default)]
    pub tag_names: Vec<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceType for WorkspaceAttributes {
    const TYPE: &'static str = "workspaces";
}

/// A TFE workspace.
///
/// Linked resources are available through [`ResourceObject::related_id`]
/// with the names `organization`, `project`, `current-run` and `locked-by`.
pub type Workspace = ResourceObject<WorkspaceAttributes>;

/// Query parameters for listing workspaces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceListOptions {
    #[serde(flatten)]
    pub list: ListOptions,

    /// Partial workspace name match.
    #[serde(rename = "search[name]", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Comma-separated list of tags every workspace must carry.
    #[serde(rename = "search[tags]", skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(rename = "filter[project][id]", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Related resources to side-load, e.g. `organization`, `current_run`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

impl Paginated for WorkspaceListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Query parameters for reading a workspace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceReadOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

/// Parameters for creating a workspace.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceCreateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_apply: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_names: Option<Vec<String>>,

    /// Project to create the workspace in; the default project when unset.
    #[serde(skip)]
    pub project_id: Option<String>,
}

impl WorkspaceCreateOptions {
    fn valid(&self) -> Result<()> {
        let name = self.name.as_deref();
        if !valid_string(name) {
            return Err(TfeError::RequiredName);
        }
        if !name.is_some_and(valid_string_id) {
            return Err(TfeError::InvalidName);
        }
        Ok(())
    }
}

impl Resource for WorkspaceCreateOptions {
    const TYPE: &'static str = WorkspaceAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }

    fn relationships(&self) -> Relationships {
        project_relationship(self.project_id.as_deref())
    }
}

/// Parameters for updating a workspace. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceUpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_apply: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Move the workspace into another project.
    #[serde(skip)]
    pub project_id: Option<String>,
}

impl WorkspaceUpdateOptions {
    fn valid(&self) -> Result<()> {
        if let Some(name) = self.name.as_deref() {
            if !valid_string_id(name) {
                return Err(TfeError::InvalidName);
            }
        }
        Ok(())
    }
}

impl Resource for WorkspaceUpdateOptions {
    const TYPE: &'static str = WorkspaceAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }

    fn relationships(&self) -> Relationships {
        project_relationship(self.project_id.as_deref())
    }
}

fn project_relationship(project_id: Option<&str>) -> Relationships {
    let mut rels = Relationships::new();
    if let Some(id) = project_id {
        rels.insert("project".to_string(), Relationship::one("projects", id));
    }
    rels
}

/// Body of a lock request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceLockOptions {
    /// Why the workspace is being locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Workspace endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Workspaces<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn workspaces(&self) -> Workspaces<'_> {
        Workspaces { client: self }
    }
}

fn check_org_and_name(organization: &str, workspace: &str) -> Result<()> {
    if !valid_string_id(organization) {
        return Err(TfeError::InvalidOrg);
    }
    if !valid_string_id(workspace) {
        return Err(TfeError::InvalidWorkspaceValue);
    }
    Ok(())
}

fn check_id(workspace_id: &str) -> Result<()> {
    if !valid_string_id(workspace_id) {
        return Err(TfeError::InvalidWorkspaceId);
    }
    Ok(())
}

fn named_path(organization: &str, workspace: &str) -> String {
    format!(
        "organizations/{}/workspaces/{}",
        segment(organization),
        segment(workspace)
    )
}

fn id_path(workspace_id: &str) -> String {
    format!("workspaces/{}", segment(workspace_id))
}

impl Workspaces<'_> {
    /// List the workspaces of an organization.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        organization: &str,
        options: &WorkspaceListOptions,
    ) -> Result<Page<Workspace>> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }

        let path = format!("organizations/{}/workspaces", segment(organization));
        self.client
            .request(Method::GET, &path)?
            .query(options)?
            .fetch_list()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        organization: &str,
        options: &WorkspaceCreateOptions,
    ) -> Result<Workspace> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }
        options.valid()?;

        let path = format!("organizations/{}/workspaces", segment(organization));
        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    /// Read a workspace by organization and name.
    pub async fn read(&self, organization: &str, workspace: &str) -> Result<Workspace> {
        self.read_with_options(organization, workspace, &WorkspaceReadOptions::default())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read_with_options(
        &self,
        organization: &str,
        workspace: &str,
        options: &WorkspaceReadOptions,
    ) -> Result<Workspace> {
        check_org_and_name(organization, workspace)?;

        self.client
            .request(Method::GET, &named_path(organization, workspace))?
            .query(options)?
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read_by_id(&self, workspace_id: &str) -> Result<Workspace> {
        check_id(workspace_id)?;

        self.client
            .request(Method::GET, &id_path(workspace_id))?
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        organization: &str,
        workspace: &str,
        options: &WorkspaceUpdateOptions,
    ) -> Result<Workspace> {
        check_org_and_name(organization, workspace)?;
        options.valid()?;

        self.client
            .request(Method::PATCH, &named_path(organization, workspace))?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_by_id(
        &self,
        workspace_id: &str,
        options: &WorkspaceUpdateOptions,
    ) -> Result<Workspace> {
        check_id(workspace_id)?;
        options.valid()?;

        self.client
            .request(Method::PATCH, &id_path(workspace_id))?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, organization: &str, workspace: &str) -> Result<()> {
        check_org_and_name(organization, workspace)?;

        self.client
            .request(Method::DELETE, &named_path(organization, workspace))?
            .execute()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_by_id(&self, workspace_id: &str) -> Result<()> {
        check_id(workspace_id)?;

        self.client
            .request(Method::DELETE, &id_path(workspace_id))?
            .execute()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn lock(
        &self,
        workspace_id: &str,
        options: &WorkspaceLockOptions,
    ) -> Result<Workspace> {
        check_id(workspace_id)?;

        let path = format!("{}/actions/lock", id_path(workspace_id));
        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::json(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unlock(&self, workspace_id: &str) -> Result<Workspace> {
        check_id(workspace_id)?;

        let path = format!("{}/actions/unlock", id_path(workspace_id));
        self.client.request(Method::POST, &path)?.fetch_one().await
    }

    /// Unlock a workspace locked by another user or team.
    #[tracing::instrument(skip(self))]
    pub async fn force_unlock(&self, workspace_id: &str) -> Result<Workspace> {
        check_id(workspace_id)?;

        let path = format!("{}/actions/force-unlock", id_path(workspace_id));
        self.client.request(Method::POST, &path)?.fetch_one().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryParams;

    #[test]
    fn test_workspace_deserialize() {
        let json = r#"{
            "data": {
                "id": "ws-SihZTyXKfNXUWuUa",
                "type": "workspaces",
                "attributes": {
                    "name": "prod-network",
                    "auto-apply": true,
                    "locked": false,
                    "execution-mode": "remote",
                    "terraform-version": "1.7.5",
                    "resource-count": 12,
                    "tag-names": ["prod", "network"]
                },
                "relationships": {
                    "organization": { "data": { "id": "acme", "type": "organizations" } },
                    "current-run": { "data": null },
                    "project": { "data": { "id": "prj-1", "type": "projects" } }
                }
            }
        }"#;

        let ws: Workspace = crate::jsonapi::decode_one(json.as_bytes()).unwrap();
        assert_eq!(ws.id, "ws-SihZTyXKfNXUWuUa");
        assert_eq!(ws.attributes.name, "prod-network");
        assert!(ws.attributes.auto_apply);
        assert_eq!(ws.attributes.resource_count, 12);
        assert_eq!(ws.related_id("organization"), Some("acme"));
        assert_eq!(ws.related_id("project"), Some("prj-1"));
        assert_eq!(ws.related_id("current-run"), None);
    }

    #[test]
    fn test_create_body_carries_project() {
        let opts = WorkspaceCreateOptions {
            name: Some("app".to_string()),
            auto_apply: Some(true),
            project_id: Some("prj-1".to_string()),
            ..Default::default()
        };
        let body = RequestBody::resource(&opts).unwrap();
        assert_eq!(
            body.payload(),
            &serde_json::json!({
                "data": {
                    "type": "workspaces",
                    "attributes": { "name": "app", "auto-apply": true },
                    "relationships": {
                        "project": { "data": { "type": "projects", "id": "prj-1" } }
                    }
                }
            })
        );
    }

    #[test]
    fn test_list_options_query() {
        let opts = WorkspaceListOptions {
            search: Some("prod".to_string()),
            include: vec!["organization".to_string(), "current_run".to_string()],
            ..Default::default()
        };
        let encoded = QueryParams::from_options(&opts).unwrap().encode();
        assert_eq!(encoded, "include=organization%2Ccurrent_run&search%5Bname%5D=prod");
    }

    #[test]
    fn test_lock_body_is_plain_json() {
        let body = RequestBody::json(&WorkspaceLockOptions {
            reason: Some("maintenance".to_string()),
        })
        .unwrap();
        assert_eq!(body.payload(), &serde_json::json!({ "reason": "maintenance" }));
    }

    #[tokio::test]
    async fn test_validation_sentinels() {
        let client = TfeClient::new(Default::default()).unwrap();
        let ws = client.workspaces();

        assert!(matches!(ws.read("", "app").await, Err(TfeError::InvalidOrg)));
        assert!(matches!(
            ws.read("acme", "bad name").await,
            Err(TfeError::InvalidWorkspaceValue)
        ));
        assert!(matches!(ws.read_by_id("").await, Err(TfeError::InvalidWorkspaceId)));
        assert!(matches!(
            ws.create("acme", &WorkspaceCreateOptions::default()).await,
            Err(TfeError::RequiredName)
        ));
        assert!(matches!(ws.unlock("ws/1").await, Err(TfeError::InvalidWorkspaceId)));
    }
}
