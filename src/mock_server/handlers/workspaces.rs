//! Workspace endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{authorize, decode_segment, document, error_response, list_document, not_found};
use super::{Incoming, PageQuery};
use crate::jsonapi::{Relationship, Relationships};
use crate::mock_server::state::MockState;
use crate::{Workspace, WorkspaceAttributes};

/// Query parameters for listing workspaces.
#[derive(Debug, Default, Deserialize)]
pub struct ListWorkspacesQuery {
    #[serde(rename = "page[number]")]
    pub page_number: Option<u32>,
    #[serde(rename = "page[size]")]
    pub page_size: Option<u32>,
    #[serde(rename = "search[name]")]
    pub search: Option<String>,
}

/// Attributes accepted when creating a workspace.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewWorkspace {
    pub name: Option<String>,
    pub description: Option<String>,
    pub auto_apply: Option<bool>,
    pub execution_mode: Option<String>,
    pub terraform_version: Option<String>,
    #[serde(default)]
    pub tag_names: Vec<String>,
}

/// GET /api/v2/organizations/{org}/workspaces
pub async fn list_workspaces(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(org): Path<String>,
    Query(query): Query<ListWorkspacesQuery>,
) -> Response {
    let org = decode_segment(org);
    let state = state.read().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if state.get_organization(&org).is_none() {
        return not_found();
    }

    let matching: Vec<&Workspace> = state
        .list_workspaces(&org)
        .into_iter()
        .filter(|ws| {
            query
                .search
                .as_deref()
                .map_or(true, |s| ws.attributes.name.contains(s))
        })
        .collect();

    let page = PageQuery {
        number: query.page_number,
        size: query.page_size,
    };
    list_document(&matching, &page)
}

/// POST /api/v2/organizations/{org}/workspaces
pub async fn create_workspace(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(org): Path<String>,
    Json(body): Json<Incoming<NewWorkspace>>,
) -> Response {
    let org = decode_segment(org);
    let mut state = state.write().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if state.get_organization(&org).is_none() {
        return not_found();
    }

    let attrs = body.data.attributes;
    let Some(name) = attrs.name.filter(|n| !n.is_empty()) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid attribute",
            "Name can't be blank",
        );
    };
    if state.find_workspace(&org, &name).is_some() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid attribute",
            "Name has already been taken",
        );
    }

    let mut relationships = Relationships::new();
    relationships.insert(
        "organization".to_string(),
        Relationship::one("organizations", org.as_str()),
    );

    let ws = Workspace {
        id: state.next_id("ws"),
        attributes: WorkspaceAttributes {
            name,
            description: attrs.description,
            auto_apply: attrs.auto_apply.unwrap_or(false),
            execution_mode: attrs.execution_mode.or_else(|| Some("remote".to_string())),
            terraform_version: attrs.terraform_version,
            tag_names: attrs.tag_names,
            speculative_enabled: true,
            created_at: Some(chrono::Utc::now()),
            ..Default::default()
        },
        relationships,
    };
    state.workspaces.insert(ws.id.clone(), ws.clone());

    document(StatusCode::CREATED, &ws)
}

/// GET /api/v2/organizations/{org}/workspaces/{name}
pub async fn get_workspace(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path((org, name)): Path<(String, String)>,
) -> Response {
    let (org, name) = (decode_segment(org), decode_segment(name));
    let state = state.read().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }

    match state.find_workspace(&org, &name) {
        Some(ws) => document(StatusCode::OK, ws),
        None => not_found(),
    }
}

/// DELETE /api/v2/organizations/{org}/workspaces/{name}
pub async fn delete_workspace(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path((org, name)): Path<(String, String)>,
) -> Response {
    let (org, name) = (decode_segment(org), decode_segment(name));
    let mut state = state.write().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }

    match state.remove_workspace(&org, &name) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}

/// GET /api/v2/workspaces/{id}
pub async fn get_workspace_by_id(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let state = state.read().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }

    match state.get_workspace(&id) {
        Some(ws) => document(StatusCode::OK, ws),
        None => not_found(),
    }
}

/// POST /api/v2/workspaces/{id}/actions/lock
pub async fn lock_workspace(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    set_lock(state, headers, id, true).await
}

/// POST /api/v2/workspaces/{id}/actions/unlock
pub async fn unlock_workspace(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    set_lock(state, headers, id, false).await
}

async fn set_lock(
    state: Arc<RwLock<MockState>>,
    headers: HeaderMap,
    id: String,
    locked: bool,
) -> Response {
    let mut state = state.write().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }

    let Some(ws) = state.workspaces.get_mut(&id) else {
        return not_found();
    };
    if ws.attributes.locked == locked {
        let detail = if locked {
            "Workspace is already locked"
        } else {
            "Workspace is already unlocked"
        };
        return error_response(StatusCode::CONFLICT, "conflict", detail);
    }

    ws.attributes.locked = locked;
    document(StatusCode::OK, ws)
}
