//! Tags API.

use serde_json::Value;

use super::{board_path, seg};
use crate::client::BoardClient;
use crate::error::Result;
use crate::types::{CreateTagRequest, unwrap_envelope};

/// Tags API client.
pub struct TagsApi {
    client: BoardClient,
}

impl TagsApi {
    pub(crate) fn new(client: BoardClient) -> Self {
        Self { client }
    }

    /// List tags defined on a board.
    pub async fn list(&self, board_id: &str) -> Result<Value> {
        let body = self.client.get(&board_path(board_id, "tags")).await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn create(&self, board_id: &str, request: &CreateTagRequest) -> Result<Value> {
        let body = self.client.post(&board_path(board_id, "tags"), request).await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn delete(&self, board_id: &str, tag_id: &str) -> Result<()> {
        self.client
            .delete(&board_path(board_id, &format!("tags/{}", seg(tag_id))))
            .await
    }

    /// Attach a tag to a sticky note or card.
    pub async fn attach(&self, board_id: &str, item_id: &str, tag_id: &str) -> Result<()> {
        let path = board_path(
            board_id,
            &format!("items/{}?tag_id={}", seg(item_id), seg(tag_id)),
        );
        let _: Value = self.client.post(&path, &serde_json::json!({})).await?;
        Ok(())
    }

    /// Remove a tag from an item.
    pub async fn detach(&self, board_id: &str, item_id: &str, tag_id: &str) -> Result<()> {
        let path = board_path(
            board_id,
            &format!("items/{}?tag_id={}", seg(item_id), seg(tag_id)),
        );
        self.client.delete(&path).await
    }

    /// List tags attached to an item.
    pub async fn item_tags(&self, board_id: &str, item_id: &str) -> Result<Value> {
        let path = board_path(board_id, &format!("items/{}/tags", seg(item_id)));
        Ok(unwrap_envelope(self.client.get(&path).await?))
    }
}
