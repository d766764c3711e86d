//! Private registry providers and modules.
//!
//! Provider and module records are JSON:API resources under the organization.
//! Module version listings come from the registry protocol endpoints, which
//! speak plain JSON and live below the registry base path.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{RequestBody, Resource, ResourceObject, ResourceType, MEDIA_TYPE_JSON};
use crate::pagination::{ListOptions, Page, Paginated};

use super::{segment, valid_string, valid_string_id};

/// Which registry a provider or module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryName {
    Private,
    Public,
}

impl RegistryName {
    fn as_str(self) -> &'static str {
        match self {
            RegistryName::Private => "private",
            RegistryName::Public => "public",
        }
    }
}

// =============================================================================
// Providers
// =============================================================================

/// Attributes of a registry provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryProviderAttributes {
    pub name: String,
    pub namespace: String,
    pub registry_name: RegistryName,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceType for RegistryProviderAttributes {
    const TYPE: &'static str = "registry-providers";
}

/// A provider published in an organization's registry.
pub type RegistryProvider = ResourceObject<RegistryProviderAttributes>;

/// Identifies a registry provider without knowing its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryProviderId {
    pub organization: String,
    pub registry_name: RegistryName,
    pub namespace: String,
    pub name: String,
}

impl RegistryProviderId {
    fn path(&self) -> Result<String> {
        if !valid_string_id(&self.organization) {
            return Err(TfeError::InvalidOrg);
        }
        if !valid_string_id(&self.namespace) {
            return Err(TfeError::InvalidNamespace);
        }
        if !valid_string_id(&self.name) {
            return Err(TfeError::InvalidProviderName);
        }
        Ok(format!(
            "organizations/{}/registry-providers/{}/{}/{}",
            segment(&self.organization),
            self.registry_name.as_str(),
            segment(&self.namespace),
            segment(&self.name)
        ))
    }
}

/// Query parameters for listing registry providers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryProviderListOptions {
    #[serde(flatten)]
    pub list: ListOptions,

    #[serde(rename = "filter[registry_name]", skip_serializing_if = "Option::is_none")]
    pub registry_name: Option<RegistryName>,

    #[serde(rename = "q", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Paginated for RegistryProviderListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Parameters for creating a registry provider.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryProviderCreateOptions {
    pub name: String,
    pub namespace: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_name: Option<RegistryName>,
}

impl RegistryProviderCreateOptions {
    fn valid(&self) -> Result<()> {
        if !valid_string(Some(&self.name)) {
            return Err(TfeError::RequiredName);
        }
        if !valid_string_id(&self.name) {
            return Err(TfeError::InvalidName);
        }
        if !valid_string_id(&self.namespace) {
            return Err(TfeError::InvalidNamespace);
        }
        if self.registry_name.is_none() {
            return Err(TfeError::RequiredRegistryName);
        }
        Ok(())
    }
}

impl Resource for RegistryProviderCreateOptions {
    const TYPE: &'static str = RegistryProviderAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Registry provider endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RegistryProviders<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn registry_providers(&self) -> RegistryProviders<'_> {
        RegistryProviders { client: self }
    }
}

impl RegistryProviders<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        organization: &str,
        options: &RegistryProviderListOptions,
    ) -> Result<Page<RegistryProvider>> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }

        let path = format!("organizations/{}/registry-providers", segment(organization));
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
        options: &RegistryProviderCreateOptions,
    ) -> Result<RegistryProvider> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }
        options.valid()?;

        let path = format!("organizations/{}/registry-providers", segment(organization));
        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read(&self, id: &RegistryProviderId) -> Result<RegistryProvider> {
        let path = id.path()?;
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &RegistryProviderId) -> Result<()> {
        let path = id.path()?;
        self.client.request(Method::DELETE, &path)?.execute().await
    }
}

// =============================================================================
// Modules
// =============================================================================

/// Publication state of one module version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryModuleVersionStatus {
    pub version: String,
    pub status: String,
}

/// Attributes of a registry module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistryModuleAttributes {
    pub name: String,
    pub namespace: String,
    pub provider: String,
    pub registry_name: RegistryName,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub version_statuses: Vec<RegistryModuleVersionStatus>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceType for RegistryModuleAttributes {
    const TYPE: &'static str = "registry-modules";
}

/// A module published in an organization's registry.
pub type RegistryModule = ResourceObject<RegistryModuleAttributes>;

/// Identifies a registry module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryModuleId {
    pub organization: String,
    pub registry_name: RegistryName,
    pub namespace: String,
    pub name: String,
    pub provider: String,
}

impl RegistryModuleId {
    fn valid(&self) -> Result<()> {
        if !valid_string_id(&self.organization) {
            return Err(TfeError::InvalidOrg);
        }
        if !valid_string_id(&self.namespace) {
            return Err(TfeError::InvalidNamespace);
        }
        if !valid_string_id(&self.name) {
            return Err(TfeError::InvalidModuleName);
        }
        if !valid_string_id(&self.provider) {
            return Err(TfeError::InvalidProviderName);
        }
        Ok(())
    }
}

/// Versions of one module as reported by the registry protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleVersionList {
    #[serde(default)]
    pub modules: Vec<ModuleVersions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleVersions {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub versions: Vec<ModuleVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub version: String,
}

impl ModuleVersionList {
    /// Every version string, in the order the registry returned them.
    pub fn versions(&self) -> Vec<&str> {
        self.modules
            .iter()
            .flat_map(|m| m.versions.iter().map(|v| v.version.as_str()))
            .collect()
    }
}

/// Registry module endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RegistryModules<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn registry_modules(&self) -> RegistryModules<'_> {
        RegistryModules { client: self }
    }
}

impl RegistryModules<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn read(&self, id: &RegistryModuleId) -> Result<RegistryModule> {
        id.valid()?;

        let path = format!(
            "organizations/{}/registry-modules/{}/{}/{}/{}",
            segment(&id.organization),
            id.registry_name.as_str(),
            segment(&id.namespace),
            segment(&id.name),
            segment(&id.provider)
        );
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    /// List the published versions of a private module.
    ///
    /// Served by the registry protocol, so `namespace` is the organization
    /// name for private modules.
    #[tracing::instrument(skip(self))]
    pub async fn list_versions(&self, id: &RegistryModuleId) -> Result<ModuleVersionList> {
        id.valid()?;

        let path = format!(
            "v1/modules/{}/{}/{}/versions",
            segment(&id.namespace),
            segment(&id.name),
            segment(&id.provider)
        );
        self.client
            .registry_request(Method::GET, &path)?
            .accept(MEDIA_TYPE_JSON)
            .fetch_json()
            .await
    }
}
