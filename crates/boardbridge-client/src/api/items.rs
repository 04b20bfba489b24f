//! Generic board items API.

use serde_json::Value;

use super::{board_path, seg};
use crate::client::BoardClient;
use crate::error::Result;
use crate::types::{ListItemsQuery, UpdateItemRequest, unwrap_envelope};

/// Items API client.
pub struct ItemsApi {
    client: BoardClient,
}

impl ItemsApi {
    pub(crate) fn new(client: BoardClient) -> Self {
        Self { client }
    }

    /// List items on a board, optionally of one type.
    pub async fn list(&self, board_id: &str, query: &ListItemsQuery) -> Result<Value> {
        let body = self
            .client
            .get_with_query(&board_path(board_id, "items"), query)
            .await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn get(&self, board_id: &str, item_id: &str) -> Result<Value> {
        let path = board_path(board_id, &format!("items/{}", seg(item_id)));
        Ok(unwrap_envelope(self.client.get(&path).await?))
    }

    /// Move an item or change its parent frame.
    pub async fn update(
        &self,
        board_id: &str,
        item_id: &str,
        request: &UpdateItemRequest,
    ) -> Result<Value> {
        let path = board_path(board_id, &format!("items/{}", seg(item_id)));
        Ok(unwrap_envelope(self.client.patch(&path, request).await?))
    }

    pub async fn delete(&self, board_id: &str, item_id: &str) -> Result<()> {
        let path = board_path(board_id, &format!("items/{}", seg(item_id)));
        self.client.delete(&path).await
    }
}
