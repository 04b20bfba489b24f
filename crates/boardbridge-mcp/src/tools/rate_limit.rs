use boardbridge_client::BoardClient;
use serde_json::{Value, json};

use super::{object_schema, tool};
use crate::tool::{ToolRegistry, ToolResult};

pub(super) fn register(registry: &mut ToolRegistry, client: &BoardClient) {
    registry.register(tool(
        client,
        "get_rate_limit_status",
        "Show remaining local rate-limit capacity for the per-user and per-app buckets",
        object_schema(json!({}), &[]),
        get_rate_limit_status,
    ));
}

async fn get_rate_limit_status(client: BoardClient, _args: Value) -> ToolResult<Value> {
    let status = client.rate_limiter().get_rate_limit_status().await;
    Ok(serde_json::to_value(status)?)
}
