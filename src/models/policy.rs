//! Policy model and service.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{RequestBody, Resource, ResourceObject, ResourceType};
use crate::pagination::{ListOptions, Page, Paginated};

use super::{segment, valid_string, valid_string_id};

/// Policy language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Sentinel,
    Opa,
    #[serde(other)]
    Unknown,
}

/// How a failing policy affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnforcementLevel {
    Advisory,
    SoftMandatory,
    HardMandatory,
    Mandatory,
    #[serde(other)]
    Unknown,
}

/// Attributes of a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyAttributes {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_kind")]
    pub kind: PolicyKind,

    /// OPA query, unused for Sentinel policies.
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub enforcement_level: Option<EnforcementLevel>,

    #[serde(default)]
    pub policy_set_count: u32,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_kind() -> PolicyKind {
    PolicyKind::Sentinel
}

impl ResourceType for PolicyAttributes {
    const TYPE: &'static str = "policies";
}

/// An organization policy.
pub type Policy = ResourceObject<PolicyAttributes>;

/// Query parameters for listing policies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PolicyListOptions {
    #[serde(flatten)]
    pub list: ListOptions,

    #[serde(rename = "search[name]", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(rename = "filter[kind]", skip_serializing_if = "Option::is_none")]
    pub kind: Option<PolicyKind>,
}

impl Paginated for PolicyListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Parameters for creating a policy.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyCreateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<PolicyKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement_level: Option<EnforcementLevel>,
}

impl PolicyCreateOptions {
    fn valid(&self) -> Result<()> {
        let name = self.name.as_deref();
        if !valid_string(name) {
            return Err(TfeError::RequiredName);
        }
        if !name.is_some_and(valid_string_id) {
            return Err(TfeError::InvalidName);
        }
        if self.enforcement_level.is_none() {
            return Err(TfeError::RequiredEnforce);
        }
        Ok(())
    }
}

impl Resource for PolicyCreateOptions {
    const TYPE: &'static str = PolicyAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Parameters for updating a policy.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyUpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement_level: Option<EnforcementLevel>,
}

impl Resource for PolicyUpdateOptions {
    const TYPE: &'static str = PolicyAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Policy endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Policies<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn policies(&self) -> Policies<'_> {
        Policies { client: self }
    }
}

fn policy_path(policy_id: &str) -> Result<String> {
    if !valid_string_id(policy_id) {
        return Err(TfeError::InvalidPolicyId);
    }
    Ok(format!("policies/{}", segment(policy_id)))
}

impl Policies<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, organization: &str, options: &PolicyListOptions) -> Result<Page<Policy>> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }

        let path = format!("organizations/{}/policies", segment(organization));
        self.client
            .request(Method::GET, &path)?
            .query(options)?
            .fetch_list()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, organization: &str, options: &PolicyCreateOptions) -> Result<Policy> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }
        options.valid()?;

        let path = format!("organizations/{}/policies", segment(organization));
        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read(&self, policy_id: &str) -> Result<Policy> {
        let path = policy_path(policy_id)?;
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(&self, policy_id: &str, options: &PolicyUpdateOptions) -> Result<Policy> {
        let path = policy_path(policy_id)?;
        self.client
            .request(Method::PATCH, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, policy_id: &str) -> Result<()> {
        let path = policy_path(policy_id)?;
        self.client.request(Method::DELETE, &path)?.execute().await
    }
}
