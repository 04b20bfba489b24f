//! Connectors API.

use serde_json::Value;

use super::{board_path, seg};
use crate::client::BoardClient;
use crate::error::Result;
use crate::types::{ConnectorRequest, PageQuery, unwrap_envelope};

/// Connectors API client.
pub struct ConnectorsApi {
    client: BoardClient,
}

impl ConnectorsApi {
    pub(crate) fn new(client: BoardClient) -> Self {
        Self { client }
    }

    fn path(board_id: &str, connector_id: &str) -> String {
        board_path(board_id, &format!("connectors/{}", seg(connector_id)))
    }

    pub async fn list(&self, board_id: &str, query: &PageQuery) -> Result<Value> {
        let body = self
            .client
            .get_with_query(&board_path(board_id, "connectors"), query)
            .await?;
        Ok(unwrap_envelope(body))
    }

    /// Connect two items.
    pub async fn create(&self, board_id: &str, request: &ConnectorRequest) -> Result<Value> {
        let body = self
            .client
            .post(&board_path(board_id, "connectors"), request)
            .await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn get(&self, board_id: &str, connector_id: &str) -> Result<Value> {
        let body = self.client.get(&Self::path(board_id, connector_id)).await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn update(
        &self,
        board_id: &str,
        connector_id: &str,
        request: &ConnectorRequest,
    ) -> Result<Value> {
        let body = self
            .client
            .patch(&Self::path(board_id, connector_id), request)
            .await?;
        Ok(unwrap_envelope(body))
    }

    pub async fn delete(&self, board_id: &str, connector_id: &str) -> Result<()> {
        self.client.delete(&Self::path(board_id, connector_id)).await
    }
}
