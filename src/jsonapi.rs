//! JSON:API document encoding and decoding.
//!
//! Request bodies pick their wire format at the call site: resource payloads
//! go through [`RequestBody::resource`] / [`RequestBody::resources`] and are
//! written as JSON:API documents, everything else through
//! [`RequestBody::json`]. Responses are decoded with [`decode_one`] for a
//! single primary resource or [`decode_list`] for a paginated collection.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TfeError};
use crate::pagination::Page;

/// Media type for JSON:API documents.
pub const MEDIA_TYPE_JSONAPI: &str = "application/vnd.api+json";

/// Media type for plain JSON documents.
pub const MEDIA_TYPE_JSON: &str = "application/json";

// =============================================================================
// Resource objects
// =============================================================================

/// Identifies a resource by type and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Linkage held by a relationship: nothing, one resource, or many.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<ResourceIdentifier>),
    One(ResourceIdentifier),
    #[default]
    Empty,
}

/// A single named relationship of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: RelationshipData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

impl Relationship {
    /// A to-one relationship pointing at `kind`/`id`.
    pub fn one(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            data: RelationshipData::One(ResourceIdentifier::new(kind, id)),
            links: None,
        }
    }

    /// A to-many relationship pointing at every id in `ids`.
    pub fn many<I, S>(kind: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data: RelationshipData::Many(
                ids.into_iter()
                    .map(|id| ResourceIdentifier::new(kind, id))
                    .collect(),
            ),
            links: None,
        }
    }

    /// The id of a to-one relationship.
    pub fn id(&self) -> Option<&str> {
        match &self.data {
            RelationshipData::One(ident) => Some(ident.id.as_str()),
            _ => None,
        }
    }

    /// The ids of the relationship, whichever its cardinality.
    pub fn ids(&self) -> Vec<&str> {
        match &self.data {
            RelationshipData::Many(idents) => idents.iter().map(|i| i.id.as_str()).collect(),
            RelationshipData::One(ident) => vec![ident.id.as_str()],
            RelationshipData::Empty => Vec::new(),
        }
    }
}

/// Relationships of a resource keyed by relationship name.
pub type Relationships = BTreeMap<String, Relationship>;

/// Ties an attributes struct to its JSON:API resource type.
pub trait ResourceType {
    /// The JSON:API `type` member, e.g. `"workspaces"`.
    const TYPE: &'static str;
}

/// A decoded resource: id, typed attributes, and relationship linkage.
///
/// Every model in this crate is a `ResourceObject` over its attributes
/// struct, e.g. [`crate::Workspace`] is `ResourceObject<WorkspaceAttributes>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject<A> {
    pub id: String,
    pub attributes: A,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: Relationships,
}

impl<A> ResourceObject<A> {
    /// The id of the to-one relationship `name`, if linked.
    pub fn related_id(&self, name: &str) -> Option<&str> {
        self.relationships.get(name).and_then(Relationship::id)
    }

    /// The ids of the relationship `name`.
    pub fn related_ids(&self, name: &str) -> Vec<&str> {
        self.relationships
            .get(name)
            .map(Relationship::ids)
            .unwrap_or_default()
    }
}

/// A payload written to the API as a JSON:API primary resource.
///
/// The attributes are serialized into the `attributes` member. Options
/// structs usually are their own attributes (`type Attributes = Self`) and
/// mark relationship fields `#[serde(skip)]`, reporting them through
/// [`Resource::relationships`] instead.
pub trait Resource {
    /// The JSON:API `type` member.
    const TYPE: &'static str;

    type Attributes: Serialize;

    fn attributes(&self) -> &Self::Attributes;

    fn id(&self) -> Option<&str> {
        None
    }

    fn relationships(&self) -> Relationships {
        Relationships::new()
    }
}

impl<A: ResourceType + Serialize> Resource for ResourceObject<A> {
    const TYPE: &'static str = A::TYPE;
    type Attributes = A;

    fn attributes(&self) -> &A {
        &self.attributes
    }

    fn id(&self) -> Option<&str> {
        if self.id.is_empty() {
            None
        } else {
            Some(&self.id)
        }
    }

    fn relationships(&self) -> Relationships {
        self.relationships.clone()
    }
}

// =============================================================================
// Request bodies
// =============================================================================

/// Wire format of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    JsonApi,
    Json,
}

impl BodyFormat {
    /// The `Content-Type` / `Accept` value for this format.
    pub fn media_type(self) -> &'static str {
        match self {
            BodyFormat::JsonApi => MEDIA_TYPE_JSONAPI,
            BodyFormat::Json => MEDIA_TYPE_JSON,
        }
    }
}

/// An encoded request body together with its wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    format: BodyFormat,
    payload: Value,
}

#[derive(Serialize)]
struct WireResource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attributes: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    relationships: Relationships,
}

impl RequestBody {
    /// Encode `resource` as a single-resource JSON:API document.
    pub fn resource<R: Resource + ?Sized>(resource: &R) -> Result<Self> {
        let data = encode_resource(resource)?;
        Ok(Self {
            format: BodyFormat::JsonApi,
            payload: serde_json::json!({ "data": data }),
        })
    }

    /// Encode `resources` as a JSON:API document whose `data` is an array.
    pub fn resources<R: Resource>(resources: &[R]) -> Result<Self> {
        let data = resources
            .iter()
            .map(encode_resource)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            format: BodyFormat::JsonApi,
            payload: serde_json::json!({ "data": data }),
        })
    }

    /// Encode `value` as plain JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self {
            format: BodyFormat::Json,
            payload: serde_json::to_value(value)?,
        })
    }

    pub fn format(&self) -> BodyFormat {
        self.format
    }

    /// The document that will be sent.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.payload)?)
    }
}

fn encode_resource<R: Resource + ?Sized>(resource: &R) -> Result<Value> {
    let attributes = match serde_json::to_value(resource.attributes())? {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        obj @ Value::Object(_) => Some(obj),
        _ => return Err(TfeError::InvalidRequestBody),
    };

    let wire = WireResource {
        kind: R::TYPE,
        id: resource.id(),
        attributes,
        relationships: resource.relationships(),
    };

    Ok(serde_json::to_value(wire)?)
}

// =============================================================================
// Response decoding
// =============================================================================

/// A single-resource document with any side-loaded resources.
#[derive(Debug, Clone, Deserialize)]
pub struct Document<T> {
    pub data: T,
    #[serde(default)]
    pub included: Vec<ResourceObjectValue>,
}

/// An included resource whose attributes have not been decoded yet.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceObjectValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub relationships: Relationships,
}

impl<T> Document<T> {
    /// Decode the included resource `kind`/`id`, if it was side-loaded.
    pub fn included<A: DeserializeOwned>(
        &self,
        kind: &str,
        id: &str,
    ) -> Option<Result<ResourceObject<A>>> {
        self.included
            .iter()
            .find(|r| r.kind == kind && r.id == id)
            .map(|r| {
                Ok(ResourceObject {
                    id: r.id.clone(),
                    attributes: serde_json::from_value(r.attributes.clone())?,
                    relationships: r.relationships.clone(),
                })
            })
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "P: DeserializeOwned"))]
struct ListMeta<P> {
    #[serde(default)]
    pagination: Option<P>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "P: DeserializeOwned"))]
struct RawListDocument<P> {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    meta: Option<ListMeta<P>>,
}

/// Decode a single-resource document into its primary resource.
pub fn decode_one<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(decode_document::<T>(bytes)?.data)
}

/// Decode a single-resource document, keeping the `included` section.
pub fn decode_document<T: DeserializeOwned>(bytes: &[u8]) -> Result<Document<T>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode a collection document into a page of items.
///
/// The pagination block under `meta.pagination` is decoded into `P`; when
/// absent, `P::default()` is used.
pub fn decode_list<T, P>(bytes: &[u8]) -> Result<Page<T, P>>
where
    T: DeserializeOwned,
    P: DeserializeOwned + Default,
{
    let raw: RawListDocument<P> = serde_json::from_slice(bytes)?;

    if !raw.data.is_array() {
        return Err(TfeError::InvalidListDocument);
    }
    let items = serde_json::from_value(raw.data)?;

    let pagination = raw
        .meta
        .and_then(|m| m.pagination)
        .unwrap_or_default();

    Ok(Page::new(items, pagination))
}
