//! Organization endpoint handlers.

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
use crate::jsonapi::Relationships;
use crate::mock_server::state::MockState;
use crate::{Organization, OrganizationAttributes};

/// Attributes accepted when creating an organization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewOrganization {
    pub name: Option<String>,
    pub email: Option<String>,
    pub session_timeout: Option<u32>,
    pub session_remember: Option<u32>,
}

/// GET /api/v2/organizations
pub async fn list_organizations(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    let state = state.read().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }

    list_document(&state.list_organizations(), &query)
}

/// POST /api/v2/organizations
pub async fn create_organization(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Json(body): Json<Incoming<NewOrganization>>,
) -> Response {
    let mut state = state.write().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }

    let attrs = body.data.attributes;
    let Some(name) = attrs.name.filter(|n| !n.is_empty()) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid attribute",
            "Name can't be blank",
        );
    };
    if state.get_organization(&name).is_some() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid attribute",
            "Name has already been taken",
        );
    }

    let org = Organization {
        id: name.clone(),
        attributes: OrganizationAttributes {
            name,
            email: attrs.email,
            created_at: Some(chrono::Utc::now()),
            session_timeout: attrs.session_timeout,
            session_remember: attrs.session_remember,
            ..Default::default()
        },
        relationships: Relationships::new(),
    };
    state.organizations.insert(org.id.clone(), org.clone());

    document(StatusCode::CREATED, &org)
}

/// GET /api/v2/organizations/{name}
pub async fn get_organization(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let name = decode_segment(name);
    let state = state.read().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }

    match state.get_organization(&name) {
        Some(org) => document(StatusCode::OK, org),
        None => not_found(),
    }
}

/// DELETE /api/v2/organizations/{name}
pub async fn delete_organization(
    State(state): State<Arc<RwLock<MockState>>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let name = decode_segment(name);
    let mut state = state.write().await;
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }

    if state.organizations.remove(&name).is_none() {
        return not_found();
    }
    state
        .workspaces
        .retain(|_, ws| ws.related_id("organization") != Some(name.as_str()));

    StatusCode::NO_CONTENT.into_response()
}
