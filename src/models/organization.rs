//! Organization model and service.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{RequestBody, Resource, ResourceObject, ResourceType};
use crate::pagination::{ListOptions, Page, Paginated};

use super::{segment, valid_string, valid_string_id};

/// Attributes of an organization.
///
/// Organizations own workspaces, projects, policies and the private
/// registry. They are addressed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrganizationAttributes {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Session timeout in minutes.
    #[serde(default)]
    pub session_timeout: Option<u32>,

    /// Session expiration in minutes.
    #[serde(default)]
    pub session_remember: Option<u32>,

    #[serde(default)]
    pub collaborator_auth_policy: Option<String>,

    #[serde(default)]
    pub cost_estimation_enabled: Option<bool>,

    #[serde(default)]
    pub assessments_enforced: Option<bool>,

    #[serde(default)]
    pub default_execution_mode: Option<String>,
}

impl ResourceType for OrganizationAttributes {
    const TYPE: &'static str = "organizations";
}

/// A TFE organization.
pub type Organization = ResourceObject<OrganizationAttributes>;

/// Query parameters for listing organizations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganizationListOptions {
    #[serde(flatten)]
    pub list: ListOptions,

    /// Search by name or email.
    #[serde(rename = "q", skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(rename = "filter[email]", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Paginated for OrganizationListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Parameters for creating an organization.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrganizationCreateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_remember: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaborator_auth_policy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimation_enabled: Option<bool>,
}

impl OrganizationCreateOptions {
    fn valid(&self) -> Result<()> {
        let name = self.name.as_deref();
        if !valid_string(name) {
            return Err(TfeError::RequiredName);
        }
        if !name.is_some_and(valid_string_id) {
            return Err(TfeError::InvalidName);
        }
        if !valid_string(self.email.as_deref()) {
            return Err(TfeError::RequiredEmail);
        }
        Ok(())
    }
}

impl Resource for OrganizationCreateOptions {
    const TYPE: &'static str = OrganizationAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Parameters for updating an organization. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OrganizationUpdateOptions {
    /// New name. Renaming changes the organization's URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_remember: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaborator_auth_policy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimation_enabled: Option<bool>,
}

impl Resource for OrganizationUpdateOptions {
    const TYPE: &'static str = OrganizationAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Organization endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Organizations<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn organizations(&self) -> Organizations<'_> {
        Organizations { client: self }
    }
}

impl Organizations<'_> {
    /// List the organizations visible to the token.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, options: &OrganizationListOptions) -> Result<Page<Organization>> {
        self.client
            .request(Method::GET, "organizations")?
            .query(options)?
            .fetch_list()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create(&self, options: &OrganizationCreateOptions) -> Result<Organization> {
        options.valid()?;

        self.client
            .request(Method::POST, "organizations")?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read(&self, organization: &str) -> Result<Organization> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }

        let path = format!("organizations/{}", segment(organization));
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        organization: &str,
        options: &OrganizationUpdateOptions,
    ) -> Result<Organization> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }

        let path = format!("organizations/{}", segment(organization));
        self.client
            .request(Method::PATCH, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, organization: &str) -> Result<()> {
        if !valid_string_id(organization) {
            return Err(TfeError::InvalidOrg);
        }

        let path = format!("organizations/{}", segment(organization));
        self.client.request(Method::DELETE, &path)?.execute().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryParams;

    #[test]
    fn test_organization_deserialize() {
        let json = r#"{
            "data": {
                "id": "acme",
                "type": "organizations",
                "attributes": {
                    "name": "acme",
                    "email": "ops@acme.test",
                    "created-at": "2024-03-01T10:00:00.000Z",
                    "session-timeout": 20160,
                    "cost-estimation-enabled": true
                }
            }
        }"#;

        let org: Organization = crate::jsonapi::decode_one(json.as_bytes()).unwrap();
        assert_eq!(org.id, "acme");
        assert_eq!(org.attributes.email.as_deref(), Some("ops@acme.test"));
        assert_eq!(org.attributes.session_timeout, Some(20160));
        assert_eq!(org.attributes.cost_estimation_enabled, Some(true));
        assert!(org.attributes.created_at.is_some());
    }

    #[test]
    fn test_create_options_validation() {
        let missing_name = OrganizationCreateOptions {
            email: Some("a@b.c".to_string()),
            ..Default::default()
        };
        assert!(matches!(missing_name.valid(), Err(TfeError::RequiredName)));

        let bad_name = OrganizationCreateOptions {
            name: Some("not valid".to_string()),
            email: Some("a@b.c".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_name.valid(), Err(TfeError::InvalidName)));

        let missing_email = OrganizationCreateOptions {
            name: Some("acme".to_string()),
            ..Default::default()
        };
        assert!(matches!(missing_email.valid(), Err(TfeError::RequiredEmail)));
    }

    #[test]
    fn test_create_body() {
        let opts = OrganizationCreateOptions {
            name: Some("acme".to_string()),
            email: Some("ops@acme.test".to_string()),
            ..Default::default()
        };
        let body = RequestBody::resource(&opts).unwrap();
        assert_eq!(
            body.payload(),
            &serde_json::json!({
                "data": {
                    "type": "organizations",
                    "attributes": { "name": "acme", "email": "ops@acme.test" }
                }
            })
        );
    }

    #[test]
    fn test_list_options_query() {
        let opts = OrganizationListOptions {
            list: ListOptions::for_page(2, 10),
            query: Some("acme".to_string()),
            ..Default::default()
        };
        let encoded = QueryParams::from_options(&opts).unwrap().encode();
        assert_eq!(encoded, "page%5Bnumber%5D=2&page%5Bsize%5D=10&q=acme");
    }

    #[tokio::test]
    async fn test_invalid_org_short_circuits() {
        let client = TfeClient::new(Default::default()).unwrap();
        let err = client.organizations().read("bad org").await.unwrap_err();
        assert!(matches!(err, TfeError::InvalidOrg));
        let err = client.organizations().delete("").await.unwrap_err();
        assert!(matches!(err, TfeError::InvalidOrg));
    }
}
