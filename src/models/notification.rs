//! Notification configuration model and service.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::TfeClient;
use crate::error::{Result, TfeError};
use crate::jsonapi::{RequestBody, Resource, ResourceObject, ResourceType};
use crate::pagination::{ListOptions, Page, Paginated};

use super::{segment, valid_string, valid_string_id};

/// Where notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestinationType {
    Generic,
    Email,
    Slack,
    MicrosoftTeams,
    #[serde(other)]
    Unknown,
}

impl DestinationType {
    /// Whether deliveries go to a webhook URL.
    pub fn requires_url(self) -> bool {
        matches!(
            self,
            DestinationType::Generic | DestinationType::Slack | DestinationType::MicrosoftTeams
        )
    }
}

/// Result of the most recent delivery attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeliveryResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub successful: Option<String>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Attributes of a notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotificationConfigurationAttributes {
    pub name: String,

    pub destination_type: DestinationType,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub url: Option<String>,

    /// Run events that trigger a delivery, e.g. `run:completed`.
    #[serde(default)]
    pub triggers: Vec<String>,

    #[serde(default)]
    pub delivery_responses: Vec<DeliveryResponse>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceType for NotificationConfigurationAttributes {
    const TYPE: &'static str = "notification-configurations";
}

/// A workspace notification configuration.
pub type NotificationConfiguration = ResourceObject<NotificationConfigurationAttributes>;

/// Query parameters for listing notification configurations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationConfigurationListOptions {
    #[serde(flatten)]
    pub list: ListOptions,
}

impl Paginated for NotificationConfigurationListOptions {
    fn list_options_mut(&mut self) -> &mut ListOptions {
        &mut self.list
    }
}

/// Parameters for creating a notification configuration.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotificationConfigurationCreateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_type: Option<DestinationType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Secret used to sign generic webhook payloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
}

impl NotificationConfigurationCreateOptions {
    fn valid(&self) -> Result<()> {
        if !valid_string(self.name.as_deref()) {
            return Err(TfeError::RequiredName);
        }
        let Some(destination) = self.destination_type else {
            return Err(TfeError::RequiredDestinationType);
        };
        if self.enabled.is_none() {
            return Err(TfeError::RequiredEnabled);
        }
        if destination.requires_url() && !valid_string(self.url.as_deref()) {
            return Err(TfeError::RequiredUrl);
        }
        Ok(())
    }
}

impl Resource for NotificationConfigurationCreateOptions {
    const TYPE: &'static str = NotificationConfigurationAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Parameters for updating a notification configuration.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotificationConfigurationUpdateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<String>>,
}

impl Resource for NotificationConfigurationUpdateOptions {
    const TYPE: &'static str = NotificationConfigurationAttributes::TYPE;
    type Attributes = Self;

    fn attributes(&self) -> &Self {
        self
    }
}

/// Notification configuration endpoints.
#[derive(Debug, Clone, Copy)]
pub struct NotificationConfigurations<'a> {
    client: &'a TfeClient,
}

impl TfeClient {
    pub fn notification_configurations(&self) -> NotificationConfigurations<'_> {
        NotificationConfigurations { client: self }
    }
}

fn config_path(config_id: &str) -> Result<String> {
    if !valid_string_id(config_id) {
        return Err(TfeError::InvalidNotificationConfigId);
    }
    Ok(format!("notification-configurations/{}", segment(config_id)))
}

fn workspace_path(workspace_id: &str) -> Result<String> {
    if !valid_string_id(workspace_id) {
        return Err(TfeError::InvalidWorkspaceId);
    }
    Ok(format!(
        "workspaces/{}/notification-configurations",
        segment(workspace_id)
    ))
}

impl NotificationConfigurations<'_> {
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        workspace_id: &str,
        options: &NotificationConfigurationListOptions,
    ) -> Result<Page<NotificationConfiguration>> {
        let path = workspace_path(workspace_id)?;
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
        options: &NotificationConfigurationCreateOptions,
    ) -> Result<NotificationConfiguration> {
        let path = workspace_path(workspace_id)?;
        options.valid()?;

        self.client
            .request(Method::POST, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn read(&self, config_id: &str) -> Result<NotificationConfiguration> {
        let path = config_path(config_id)?;
        self.client.request(Method::GET, &path)?.fetch_one().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        config_id: &str,
        options: &NotificationConfigurationUpdateOptions,
    ) -> Result<NotificationConfiguration> {
        let path = config_path(config_id)?;
        self.client
            .request(Method::PATCH, &path)?
            .body(RequestBody::resource(options)?)
            .fetch_one()
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, config_id: &str) -> Result<()> {
        let path = config_path(config_id)?;
        self.client.request(Method::DELETE, &path)?.execute().await
    }

    /// Send a test delivery and return the configuration with its
    /// delivery responses updated.
    #[tracing::instrument(skip(self))]
    pub async fn verify(&self, config_id: &str) -> Result<NotificationConfiguration> {
        let path = format!("{}/actions/verify", config_path(config_id)?);
        self.client.request(Method::POST, &path)?.fetch_one().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_options() -> NotificationConfigurationCreateOptions {
        NotificationConfigurationCreateOptions {
            name: Some("deploys".to_string()),
            destination_type: Some(DestinationType::Slack),
            enabled: Some(true),
            url: Some("https://hooks.slack.test/abc".to_string()),
            triggers: vec!["run:completed".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_create_validation() {
        assert!(valid_options().valid().is_ok());

        let mut opts = valid_options();
        opts.name = None;
        assert!(matches!(opts.valid(), Err(TfeError::RequiredName)));

        let mut opts = valid_options();
        opts.destination_type = None;
        assert!(matches!(opts.valid(), Err(TfeError::RequiredDestinationType)));

        let mut opts = valid_options();
        opts.enabled = None;
        assert!(matches!(opts.valid(), Err(TfeError::RequiredEnabled)));

        let mut opts = valid_options();
        opts.url = None;
        assert!(matches!(opts.valid(), Err(TfeError::RequiredUrl)));

        let mut opts = valid_options();
        opts.destination_type = Some(DestinationType::Email);
        opts.url = None;
        assert!(opts.valid().is_ok());
    }

    #[test]
    fn test_create_body_kebab_case() {
        let body = RequestBody::resource(&valid_options()).unwrap();
        let attrs = &body.payload()["data"]["attributes"];
        assert_eq!(attrs["destination-type"], "slack");
        assert_eq!(attrs["triggers"], serde_json::json!(["run:completed"]));
        assert_eq!(body.payload()["data"]["type"], "notification-configurations");
    }

    #[test]
    fn test_destination_type_wire_names() {
        let teams: DestinationType = serde_json::from_str(r#""microsoft-teams""#).unwrap();
        assert_eq!(teams, DestinationType::MicrosoftTeams);
        assert!(teams.requires_url());
    }

    #[tokio::test]
    async fn test_invalid_ids() {
        let client = TfeClient::new(Default::default()).unwrap();
        let nc = client.notification_configurations();
        assert!(matches!(nc.verify("").await, Err(TfeError::InvalidNotificationConfigId)));
        assert!(matches!(
            nc.list("", &Default::default()).await,
            Err(TfeError::InvalidWorkspaceId)
        ));
    }
}
