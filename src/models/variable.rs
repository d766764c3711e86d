//! Workspace variable model and service.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{RequestBody, Resource, ResourceObject, ResourceType};
use crate::pagination::{ListOptions, Page, Paginated};

use super::{segment, valid_string, valid_string_id};

/// Whether a variable is passed to Terraform or set in the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Terraform,
    Env,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CategoryType::Terraform => "terraform",
            CategoryType::Env => "env",
            CategoryType::Unknown => "unknown",
        })
    }
}

/// Attributes of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VariableAttributes {
    pub key: String,

    /// Empty for sensitive variables.
    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    pub category: CategoryType,

    #[serde(default)]
    pub hcl: bool,

    #[serde(default)]
    pub sensitive: bool,
}

impl ResourceType for VariableAttributes {
    const TYPE: &'static str = "vars";
}

/// A workspace variable.
pub type Variable = ResourceObject<VariableAttributes>;

/// Query parameters for listing variables.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableListOptions {
    #[serde(flatten)]
    pub list: ListOptions,
}

impl Paginated for VariableListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Parameters for creating a variable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableCreateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hcl: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
}

impl VariableCreateOptions {
    fn valid(&self) -> Result<()> {
        if !valid_string(self.key.as_deref()) {
            return Err(TfeError::RequiredKey);
        }
        if self.category.is_none() {
            return Err(TfeError::RequiredCategory);
        }
        Ok(())
    }
}

impl Resource for VariableCreateOptions {
    const TYPE: &'static str = VariableAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Parameters for updating a variable. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableUpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hcl: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
}

impl Resource for VariableUpdateOptions {
    const TYPE: &'static str = VariableAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Workspace variable endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Variables<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn variables(&self) -> Variables<'_> {
        Variables { client: self }
    }
}

fn vars_path(workspace_id: &str) -> Result<String> {
    if !valid_string_id(workspace_id) {
        return Err(TfeError::InvalidWorkspaceId);
    }
    Ok(format!("workspaces/{}/vars", segment(workspace_id)))
}

fn var_path(workspace_id: &str, variable_id: &str) -> Result<String> {
    let base = vars_path(workspace_id)?;
    if !valid_string_id(variable_id) {
        return Err(TfeError::InvalidVariableId);
    }
    Ok(format!("{base}/{}", segment(variable_id)))
}

impl Variables<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        workspace_id: &str,
        options: &VariableListOptions,
    ) -> Result<Page<Variable>> {
        let path = vars_path(workspace_id)?;
        self.client
            .request(Method::GET, &path)?
            .query(options)?
            .fetch_list()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        workspace_id: &str,
        options: &VariableCreateOptions,
    ) -> Result<Variable> {
        let path = vars_path(workspace_id)?;
        options.valid()?;

        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read(&self, workspace_id: &str, variable_id: &str) -> Result<Variable> {
        let path = var_path(workspace_id, variable_id)?;
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        workspace_id: &str,
        variable_id: &str,
        options: &VariableUpdateOptions,
    ) -> Result<Variable> {
        let path = var_path(workspace_id, variable_id)?;
        self.client
            .request(Method::PATCH, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, workspace_id: &str, variable_id: &str) -> Result<()> {
        let path = var_path(workspace_id, variable_id)?;
        self.client.request(Method::DELETE, &path)?.execute().await
    }
}
