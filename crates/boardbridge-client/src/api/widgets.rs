//! Typed widget APIs sharing one shape: sticky notes, shapes, texts, cards
//! and frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{board_path, seg};
use crate::client::BoardClient;
use crate::error::Result;
use crate::types::{WidgetRequest, unwrap_envelope};

/// Widget kinds with a dedicated endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    StickyNote,
    Shape,
    Text,
    Card,
    Frame,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 5] = [
        WidgetKind::StickyNote,
        WidgetKind::Shape,
        WidgetKind::Text,
        WidgetKind::Card,
        WidgetKind::Frame,
    ];

    /// Path segment of the collection, e.g. `sticky_notes`.
    pub fn collection(&self) -> &'static str {
        match self {
            WidgetKind::StickyNote => "sticky_notes",
            WidgetKind::Shape => "shapes",
            WidgetKind::Text => "texts",
            WidgetKind::Card => "cards",
            WidgetKind::Frame => "frames",
        }
    }

    /// Singular name, e.g. `sticky_note`.
    pub fn singular(&self) -> &'static str {
        match self {
            WidgetKind::StickyNote => "sticky_note",
            WidgetKind::Shape => "shape",
            WidgetKind::Text => "text",
            WidgetKind::Card => "card",
            WidgetKind::Frame => "frame",
        }
    }
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.singular())
    }
}

/// API client for one widget kind.
pub struct WidgetsApi {
    client: BoardClient,
    kind: WidgetKind,
}

impl WidgetsApi {
    pub(crate) fn new(client: BoardClient, kind: WidgetKind) -> Self {
        Self { client, kind }
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    fn path(&self, board_id: &str, widget_id: Option<&str>) -> String {
        match widget_id {
            Some(id) => board_path(board_id, &format!("{}/{}", self.kind.collection(), seg(id))),
            None => board_path(board_id, self.kind.collection()),
        }
    }

    pub async fn create(&self, board_id: &str, request: &WidgetRequest) -> Result<Value> {
        let body = self.client.post(&self.path(board_id, None), request).await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn get(&self, board_id: &str, widget_id: &str) -> Result<Value> {
        let body = self.client.get(&self.path(board_id, Some(widget_id))).await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn update(
        &self,
        board_id: &str,
        widget_id: &str,
        request: &WidgetRequest,
    ) -> Result<Value> {
        let body = self
            .client
            .patch(&self.path(board_id, Some(widget_id)), request)
            .await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn delete(&self, board_id: &str, widget_id: &str) -> Result<()> {
        self.client
            .delete(&self.path(board_id, Some(widget_id)))
            .await
    }
}
