//! Variable set model and service.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{RequestBody, Resource, ResourceObject, ResourceType};
use crate::pagination::{ListOptions, Page, Paginated};

use super::workspace::WorkspaceAttributes;
use super::{segment, valid_string, valid_string_id};

/// Attributes of a variable set.
///
/// A variable set is a group of variables shared by several workspaces,
/// or by every workspace of the organization when `global`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VariableSetAttributes {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub global: bool,

    #[serde(default)]
    pub priority: bool,

    #[serde(default)]
    pub var_count: u32,

    #[serde(default)]
    pub workspace_count: u32,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceType for VariableSetAttributes {
    const TYPE: &'static str = "varsets";
}

/// A variable set. Related ids: `organization`, `workspaces`, `vars`.
pub type VariableSet = ResourceObject<VariableSetAttributes>;

/// Query parameters for listing variable sets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableSetListOptions {
    #[serde(flatten)]
    pub list: ListOptions,

    #[serde(rename = "q", skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

impl Paginated for VariableSetListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Query parameters for reading a variable set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableSetReadOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

/// Parameters for creating a variable set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableSetCreateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<bool>,
}

impl Resource for VariableSetCreateOptions {
    const TYPE: &'static str = VariableSetAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Parameters for updating a variable set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableSetUpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub global: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<bool>,
}

impl Resource for VariableSetUpdateOptions {
    const TYPE: &'static str = VariableSetAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Workspaces to attach to or detach from a variable set.
#[derive(Debug, Clone, Default)]
pub struct VariableSetWorkspacesOptions {
    pub workspace_ids: Vec<String>,
}

impl VariableSetWorkspacesOptions {
    fn valid(&self) -> Result<()> {
        if self.workspace_ids.is_empty() {
            return Err(TfeError::RequiredWorkspacesList);
        }
        if !self.workspace_ids.iter().all(|id| valid_string_id(id)) {
            return Err(TfeError::InvalidWorkspaceId);
        }
        Ok(())
    }

    fn body(&self) -> Result<RequestBody> {
        let refs: Vec<WorkspaceRef<'_>> = self
            .workspace_ids
            .iter()
            .map(|id| WorkspaceRef(id))
            .collect();
        RequestBody::resources(&refs)
    }
}

/// A bare workspace identifier in a relationship document.
struct WorkspaceRef<'a>(&'a str);

impl Resource for WorkspaceRef<'_> {
    const TYPE: &'static str = WorkspaceAttributes::TYPE;
    type Attributes = ();

    fn attributes(&self) -> &() {
        &()
    }

    fn id(&self) -> Option<&str> {
        Some(self.0)
    }
}

/// Variable set endpoints.
#[derive(Debug, Clone, Copy)]
pub struct VariableSets<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn variable_sets(&self) -> VariableSets<'_> {
        VariableSets { client: self }
    }
}

fn varset_path(variable_set_id: &str) -> Result<String> {
    if !valid_string_id(variable_set_id) {
        return Err(TfeError::InvalidVariableSetId);
    }
    Ok(format!("varsets/{}", segment(variable_set_id)))
}

impl VariableSets<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        organization: &str,
        options: &VariableSetListOptions,
    ) -> Result<Page<VariableSet>> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }

        let path = format!("organizations/{}/varsets", segment(organization));
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
        options: &VariableSetCreateOptions,
    ) -> Result<VariableSet> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }
        if !valid_string(options.name.as_deref()) {
            return Err(TfeError::RequiredName);
        }

        let path = format!("organizations/{}/varsets", segment(organization));
        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    pub async fn read(&self, variable_set_id: &str) -> Result<VariableSet> {
        self.read_with_options(variable_set_id, &VariableSetReadOptions::default())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read_with_options(
        &self,
        variable_set_id: &str,
        options: &VariableSetReadOptions,
    ) -> Result<VariableSet> {
        let path = varset_path(variable_set_id)?;
        self.client
            .request(Method::GET, &path)?
            .query(options)?
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        variable_set_id: &str,
        options: &VariableSetUpdateOptions,
    ) -> Result<VariableSet> {
        let path = varset_path(variable_set_id)?;
        self.client
            .request(Method::PATCH, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, variable_set_id: &str) -> Result<()> {
        let path = varset_path(variable_set_id)?;
        self.client.request(Method::DELETE, &path)?.execute().await
    }

    /// Attach the variable set to each of the given workspaces.
    #[tracing::instrument(skip(self))]
    pub async fn apply_to_workspaces(
        &self,
        variable_set_id: &str,
        options: &VariableSetWorkspacesOptions,
    ) -> Result<()> {
        self.workspace_relationship(Method::POST, variable_set_id, options)
            .await
    }

    /// Detach the variable set from each of the given workspaces.
    #[tracing::instrument(skip(self))]
    pub async fn remove_from_workspaces(
        &self,
        variable_set_id: &str,
        options: &VariableSetWorkspacesOptions,
    ) -> Result<()> {
        self.workspace_relationship(Method::DELETE, variable_set_id, options)
            .await
    }

    async fn workspace_relationship(
        &self,
        method: Method,
        variable_set_id: &str,
        options: &VariableSetWorkspacesOptions,
    ) -> Result<()> {
        let path = format!("{}/relationships/workspaces", varset_path(variable_set_id)?);
        options.valid()?;

        self.client
            .request(method, &path)?
            .body(options.body()?)
            .execute()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspaces_body_is_identifier_list() {
        let opts = VariableSetWorkspacesOptions {
            workspace_ids: vec!["ws-1".to_string(), "ws-2".to_string()],
        };
        let body = opts.body().unwrap();
        assert_eq!(
            body.payload(),
            &serde_json::json!({
                "data": [
                    { "type": "workspaces", "id": "ws-1" },
                    { "type": "workspaces", "id": "ws-2" }
                ]
            })
        );
    }

    #[test]
    fn test_workspaces_validation() {
        let empty = VariableSetWorkspacesOptions::default();
        assert!(matches!(empty.valid(), Err(TfeError::RequiredWorkspacesList)));

        let bad = VariableSetWorkspacesOptions {
            workspace_ids: vec!["ws-1".to_string(), String::new()],
        };
        assert!(matches!(bad.valid(), Err(TfeError::InvalidWorkspaceId)));
    }

    #[test]
    fn test_variable_set_deserialize() {
        let json = r#"{
            "data": {
                "id": "varset-kjkN545LH2Sfercv",
                "type": "varsets",
                "attributes": { "name": "aws-creds", "global": false, "var-count": 3, "workspace-count": 2 },
                "relationships": {
                    "workspaces": { "data": [ { "id": "ws-1", "type": "workspaces" }, { "id": "ws-2", "type": "workspaces" } ] }
                }
            }
        }"#;

        let set: VariableSet = crate::jsonapi::decode_one(json.as_bytes()).unwrap();
        assert_eq!(set.attributes.var_count, 3);
        assert_eq!(set.related_ids("workspaces"), vec!["ws-1", "ws-2"]);
    }

    #[tokio::test]
    async fn test_validation_sentinels() {
        let client = TfeClient::new(Default::default()).unwrap();
        let sets = client.variable_sets();
        assert!(matches!(sets.read("").await, Err(TfeError::InvalidVariableSetId)));
        assert!(matches!(
            sets.create("acme", &VariableSetCreateOptions::default()).await,
            Err(TfeError::RequiredName)
        ));
        assert!(matches!(
            sets.apply_to_workspaces("varset-1", &VariableSetWorkspacesOptions::default())
                .await,
            Err(TfeError::RequiredWorkspacesList)
        ));
    }
}
