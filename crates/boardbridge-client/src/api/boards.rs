//! Boards API.

use serde_json::Value;

use super::{board_path, seg};
use crate::client::BoardClient;
use crate::error::Result;
use crate::types::{
    CopyBoardRequest, CreateBoardRequest, ListBoardsQuery, UpdateBoardRequest, unwrap_envelope,
};

/// Boards API client.
pub struct BoardsApi {
    client: BoardClient,
}

impl BoardsApi {
    pub(crate) fn new(client: BoardClient) -> Self {
        Self { client }
    }

    /// List boards visible to the authorized user.
    pub async fn list(&self, query: &ListBoardsQuery) -> Result<Value> {
        let body = self.client.get_with_query("v2/boards", query).await?;
        Ok(unwrap_envelope(body))
    }

    /// Get a board by ID.
    pub async fn get(&self, board_id: &str) -> Result<Value> {
        let body = self.client.get(&board_path(board_id, "")).await?;
        Ok(unwrap_envelope(body))
    }

    /// Create a board.
    pub async fn create(&self, request: &CreateBoardRequest) -> Result<Value> {
        let body = self.client.post("v2/boards", request).await?;
        Ok(unwrap_envelope(body))
    }

    /// Update a board's name, description or policy.
    pub async fn update(&self, board_id: &str, request: &UpdateBoardRequest) -> Result<Value> {
        let body = self.client.patch(&board_path(board_id, ""), request).await?;
        Ok(unwrap_envelope(body))
    }

    /// Delete a board.
    pub async fn delete(&self, board_id: &str) -> Result<()> {
        self.client.delete(&board_path(board_id, "")).await
    }

    /// Copy a board, returning the new board.
    pub async fn copy(&self, board_id: &str, request: &CopyBoardRequest) -> Result<Value> {
        let path = format!("v2/boards?copy_from={}", seg(board_id));
        let body = self.client.put(&path, request).await?;
        Ok(unwrap_envelope(body))
    }
}
