//! Request parameter types for the Miro REST API.
//!
//! Responses are passed through as [`serde_json::Value`]; only what the
//! client sends is typed. Every type also deserializes so tool arguments can
//! be decoded straight into it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pick the payload out of a response body.
///
/// Priority: a non-null `value` field, then a non-null `widgets` field, then
/// the whole body.
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) => {
            for key in ["value", "widgets"] {
                if let Some(inner) = map.remove(key)
                    && !inner.is_null()
                {
                    return inner;
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// Reference to another item by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Boards
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListBoardsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBoardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "teamId",
        alias = "team_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub team_id: Option<String>,
    /// Sharing and permissions policy, passed through as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Value>,
}

pub type UpdateBoardRequest = CreateBoardRequest;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyBoardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "teamId",
        alias = "team_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub team_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Items and widgets
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListItemsQuery {
    /// Restrict to one item type, e.g. `sticky_note`.
    #[serde(
        default,
        rename = "type",
        skip_serializing_if = "Option::is_none"
    )]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemRef>,
}

/// Body for creating or updating a sticky note, shape, text, card or frame.
///
/// `data` and `style` differ per kind and are passed through unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemRef>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Connectors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffsetQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorRequest {
    #[serde(
        default,
        rename = "startItem",
        alias = "start_item",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_item: Option<ItemRef>,
    #[serde(
        default,
        rename = "endItem",
        alias = "end_item",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_item: Option<ItemRef>,
    /// `straight`, `elbowed` or `curved`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captions: Option<Vec<Value>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tags and members
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagRequest {
    pub title: String,
    #[serde(
        default,
        rename = "fillColor",
        alias = "fill_color",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareBoardRequest {
    pub emails: Vec<String>,
    /// `viewer`, `commenter`, `editor` or `coowner`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
