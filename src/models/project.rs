//! Project model and service.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{RequestBody, Resource, ResourceObject, ResourceType};
use crate::pagination::{ListOptions, Page, Paginated};

use super::{segment, valid_string, valid_string_id};

/// Attributes of a project.
///
/// Projects group workspaces inside an organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectAttributes {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ResourceType for ProjectAttributes {
    const TYPE: &'static str = "projects";
}

/// A TFE project.
pub type Project = ResourceObject<ProjectAttributes>;

/// Query parameters for listing projects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectListOptions {
    #[serde(flatten)]
    pub list: ListOptions,

    /// Exact project names to match.
    #[serde(rename = "filter[names]", skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,

    /// Partial name match.
    #[serde(rename = "q", skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Paginated for ProjectListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Parameters for creating a project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectCreateOptions {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource for ProjectCreateOptions {
    const TYPE: &'static str = ProjectAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Parameters for updating a project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectUpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource for ProjectUpdateOptions {
    const TYPE: &'static str = ProjectAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Project endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Projects<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn projects(&self) -> Projects<'_> {
        Projects { client: self }
    }
}

fn project_path(project_id: &str) -> Result<String> {
    if !valid_string_id(project_id) {
        return Err(TfeError::InvalidProjectId);
    }
    Ok(format!("projects/{}", segment(project_id)))
}

impl Projects<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        organization: &str,
        options: &ProjectListOptions,
    ) -> Result<Page<Project>> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }

        let path = format!("organizations/{}/projects", segment(organization));
        self.client
            .request(Method::GET, &path)?
            .query(options)?
            .fetch_list()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, organization: &str, options: &ProjectCreateOptions) -> Result<Project> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }
        if !valid_string(Some(&options.name)) {
            return Err(TfeError::RequiredName);
        }

        let path = format!("organizations/{}/projects", segment(organization));
        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read(&self, project_id: &str) -> Result<Project> {
        let path = project_path(project_id)?;
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(&self, project_id: &str, options: &ProjectUpdateOptions) -> Result<Project> {
        let path = project_path(project_id)?;
        if options.name.as_deref() == Some("") {
            return Err(TfeError::InvalidName);
        }

        self.client
            .request(Method::PATCH, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, project_id: &str) -> Result<()> {
        let path = project_path(project_id)?;
        self.client.request(Method::DELETE, &path)?.execute().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryParams;

    #[test]
    fn test_project_deserialize() {
        let json = r#"{
            "data": {
                "id": "prj-AwfuCJTkdai4xj9w",
                "type": "projects",
                "attributes": { "name": "Networking", "description": "Shared VPCs" },
                "relationships": {
                    "organization": { "data": { "id": "acme", "type": "organizations" } }
                }
            }
        }"#;

        let project: Project = crate::jsonapi::decode_one(json.as_bytes()).unwrap();
        assert_eq!(project.id, "prj-AwfuCJTkdai4xj9w");
        assert_eq!(project.attributes.name, "Networking");
        assert_eq!(project.related_id("organization"), Some("acme"));
    }

    #[test]
    fn test_list_filter_names_joined() {
        let opts = ProjectListOptions {
            names: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let encoded = QueryParams::from_options(&opts).unwrap().encode();
        assert_eq!(encoded, "filter%5Bnames%5D=a%2Cb");
    }

    #[tokio::test]
    async fn test_validation_sentinels() {
        let client = TfeClient::new(Default::default()).unwrap();
        let projects = client.projects();

        assert!(matches!(projects.read("").await, Err(TfeError::InvalidProjectId)));
        assert!(matches!(
            projects.create("acme", &ProjectCreateOptions::default()).await,
            Err(TfeError::RequiredName)
        ));
        assert!(matches!(
            projects
                .update(
                    "prj-1",
                    &ProjectUpdateOptions {
                        name: Some(String::new()),
                        ..Default::default()
                    }
                )
                .await,
            Err(TfeError::InvalidName)
        ));
    }
}
