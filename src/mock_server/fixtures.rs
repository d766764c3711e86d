//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic test data.

use chrono::{TimeZone, Utc};

use crate::jsonapi::{Relationship, Relationships};
use crate::{Organization, OrganizationAttributes, Workspace, WorkspaceAttributes};

/// Collection of fixture factories for test data.
pub struct Fixtures;

/// The data loaded by [`crate::mock_server::MockServer::start`].
pub struct DefaultScenario {
    pub organizations: Vec<Organization>,
    pub workspaces: Vec<Workspace>,
}

impl Fixtures {
    // =========================================================================
    // Organization Fixtures
    // =========================================================================

    /// Create an organization with a derived contact email.
    pub fn organization(name: &str) -> Organization {
        Organization {
            id: name.to_string(),
            attributes: OrganizationAttributes {
                name: name.to_string(),
                email: Some(format!("admin@{name}.test")),
                created_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).single(),
                session_timeout: Some(20160),
                session_remember: Some(20160),
                collaborator_auth_policy: Some("password".to_string()),
                cost_estimation_enabled: Some(true),
                default_execution_mode: Some("remote".to_string()),
                ..Default::default()
            },
            relationships: Relationships::new(),
        }
    }

    // =========================================================================
    // Workspace Fixtures
    // =========================================================================

    /// Create an unlocked workspace belonging to `organization`.
    pub fn workspace(id: &str, organization: &str, name: &str) -> Workspace {
        let mut relationships = Relationships::new();
        relationships.insert(
            "organization".to_string(),
            Relationship::one("organizations", organization),
        );

        Workspace {
            id: id.to_string(),
            attributes: WorkspaceAttributes {
                name: name.to_string(),
                execution_mode: Some("remote".to_string()),
                terraform_version: Some("1.7.5".to_string()),
                queue_all_runs: false,
                speculative_enabled: true,
                created_at: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).single(),
                ..Default::default()
            },
            relationships,
        }
    }

    /// Create a locked workspace.
    pub fn locked_workspace(id: &str, organization: &str, name: &str) -> Workspace {
        let mut ws = Self::workspace(id, organization, name);
        ws.attributes.locked = true;
        ws
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// Two organizations, the first with a pair of workspaces.
    pub fn default_scenario() -> DefaultScenario {
        DefaultScenario {
            organizations: vec![Self::organization("acme"), Self::organization("globex")],
            workspaces: vec![
                Self::workspace("ws-prodnet000000001", "acme", "prod-network"),
                Self::locked_workspace("ws-stageapp0000001", "acme", "staging-app"),
            ],
        }
    }
}
