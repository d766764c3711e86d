//! Mock server state management.
//!
//! Provides the in-memory data store for the mock TFE API server.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{Organization, Workspace};

/// Shared state for the mock server.
///
/// This struct holds all the mock data that the server will serve.
/// It's wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug)]
pub struct MockState {
    /// Organizations indexed by name.
    pub organizations: BTreeMap<String, Organization>,

    /// Workspaces indexed by ID (e.g., "ws-abc123").
    pub workspaces: BTreeMap<String, Workspace>,

    /// Optional authentication token. If set, requests must include this token.
    pub required_token: Option<String>,

    /// Value advertised in `X-RateLimit-Limit` by the ping endpoint.
    pub rate_limit: Option<u32>,

    /// Value advertised in `TFP-API-Version` by the ping endpoint.
    pub api_version: String,

    next_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            organizations: BTreeMap::new(),
            workspaces: BTreeMap::new(),
            required_token: None,
            rate_limit: None,
            api_version: "2.6".to_string(),
            next_id: 1,
        }
    }
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    /// Add an organization to the state.
    pub fn with_organization(mut self, org: Organization) -> Self {
        self.organizations.insert(org.id.clone(), org);
        self
    }

    /// Add a workspace to the state.
    pub fn with_workspace(mut self, ws: Workspace) -> Self {
        self.workspaces.insert(ws.id.clone(), ws);
        self
    }

    /// Set the required authentication token.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    /// Advertise a rate limit from the ping endpoint.
    pub fn with_rate_limit(mut self, limit: u32) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    /// Allocate a new resource ID with the given prefix.
    pub fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{:016}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Get an organization by name.
    pub fn get_organization(&self, name: &str) -> Option<&Organization> {
        self.organizations.get(name)
    }

    /// List all organizations, ordered by name.
    pub fn list_organizations(&self) -> Vec<&Organization> {
        self.organizations.values().collect()
    }

    /// Get a workspace by ID.
    pub fn get_workspace(&self, id: &str) -> Option<&Workspace> {
        self.workspaces.get(id)
    }

    /// List the workspaces of an organization, ordered by name.
    pub fn list_workspaces(&self, organization: &str) -> Vec<&Workspace> {
        let mut found: Vec<&Workspace> = self
            .workspaces
            .values()
            .filter(|w| w.related_id("organization") == Some(organization))
            .collect();
        found.sort_by(|a, b| a.attributes.name.cmp(&b.attributes.name));
        found
    }

    /// Find a workspace by organization and name.
    pub fn find_workspace(&self, organization: &str, name: &str) -> Option<&Workspace> {
        self.list_workspaces(organization)
            .into_iter()
            .find(|w| w.attributes.name == name)
    }

    /// Find a workspace by organization and name for modification.
    pub fn find_workspace_mut(&mut self, organization: &str, name: &str) -> Option<&mut Workspace> {
        self.workspaces.values_mut().find(|w| {
            w.related_id("organization") == Some(organization) && w.attributes.name == name
        })
    }

    /// Remove a workspace by organization and name.
    pub fn remove_workspace(&mut self, organization: &str, name: &str) -> Option<Workspace> {
        let id = self.find_workspace(organization, name)?.id.clone();
        self.workspaces.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::Fixtures;

    #[test]
    fn test_state_add_and_get_organization() {
        let state = MockState::new().with_organization(Fixtures::organization("acme"));

        let org = state.get_organization("acme");
        assert!(org.is_some());
        assert_eq!(org.unwrap().attributes.name, "acme");
    }

    #[test]
    fn test_list_workspaces_is_scoped_and_sorted() {
        let state = MockState::new()
            .with_workspace(Fixtures::workspace("ws-3", "acme", "zeta"))
            .with_workspace(Fixtures::workspace("ws-1", "acme", "alpha"))
            .with_workspace(Fixtures::workspace("ws-2", "globex", "beta"));

        let names: Vec<&str> = state
            .list_workspaces("acme")
            .iter()
            .map(|w| w.attributes.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(state.find_workspace("globex", "beta").is_some());
        assert!(state.find_workspace("acme", "beta").is_none());
    }

    #[test]
    fn test_next_id_is_unique() {
        let mut state = MockState::new();
        let a = state.next_id("ws");
        let b = state.next_id("ws");
        assert_ne!(a, b);
        assert!(a.starts_with("ws-"));
    }

    #[test]
    fn test_remove_workspace() {
        let mut state = MockState::new().with_workspace(Fixtures::workspace("ws-1", "acme", "app"));
        assert!(state.remove_workspace("acme", "app").is_some());
        assert!(state.get_workspace("ws-1").is_none());
    }
}
