//! Board members API.

use serde_json::Value;

use super::board_path;
use crate::client::BoardClient;
use crate::error::Result;
use crate::types::{OffsetQuery, ShareBoardRequest, unwrap_envelope};

/// Board members API client.
pub struct MembersApi {
    client: BoardClient,
}

impl MembersApi {
    pub(crate) fn new(client: BoardClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, board_id: &str, query: &OffsetQuery) -> Result<Value> {
        let body = self
            .client
            .get_with_query(&board_path(board_id, "members"), query)
            .await?;
        Ok(unwrap_envelope(body))
    }

    /// Invite users to a board by email.
    pub async fn share(&self, board_id: &str, request: &ShareBoardRequest) -> Result<Value> {
        let body = self
            .client
            .post(&board_path(board_id, "members"), request)
            .await?;
        Ok(unwrap_envelope(body))
    }
}
