use boardbridge_client::{BoardClient, ConnectorRequest, PageQuery};
use serde_json::{Value, json};

use super::{board_id_prop, done, object_schema, page_props, string_prop, tool, with_properties};
use crate::tool::{ParamExt, ToolRegistry, ToolResult, decode};

fn connector_props() -> Value {
    json!({
        "start_item": {
            "type": "object",
            "description": "Item the connector starts at {id}",
            "properties": {"id": {"type": "string"}}
        },
        "end_item": {
            "type": "object",
            "description": "Item the connector ends at {id}",
            "properties": {"id": {"type": "string"}}
        },
        "shape": {
            "type": "string",
            "description": "Line shape",
            "enum": ["straight", "elbowed", "curved"]
        },
        "style": {"type": "object", "description": "Line style, e.g. strokeColor"},
        "captions": {"type": "array", "description": "Captions [{content}]"}
    })
}

fn connector_ref() -> Value {
    json!({
        "board_id": board_id_prop(),
        "connector_id": string_prop("Connector ID")
    })
}

pub(super) fn register(registry: &mut ToolRegistry, client: &BoardClient) {
    registry.register(tool(
        client,
        "list_connectors",
        "List connectors on a board",
        object_schema(
            with_properties(json!({"board_id": board_id_prop()}), page_props()),
            &["board_id"],
        ),
        list_connectors,
    ));

    registry.register(tool(
        client,
        "create_connector",
        "Connect two items with a line",
        object_schema(
            with_properties(json!({"board_id": board_id_prop()}), connector_props()),
            &["board_id", "start_item", "end_item"],
        ),
        create_connector,
    ));

    registry.register(tool(
        client,
        "get_connector",
        "Get a connector by ID",
        object_schema(connector_ref(), &["board_id", "connector_id"]),
        get_connector,
    ));

    registry.register(tool(
        client,
        "update_connector",
        "Update a connector's endpoints, shape, style or captions",
        object_schema(
            with_properties(connector_ref(), connector_props()),
            &["board_id", "connector_id"],
        ),
        update_connector,
    ));

    registry.register(tool(
        client,
        "delete_connector",
        "Delete a connector",
        object_schema(connector_ref(), &["board_id", "connector_id"]),
        delete_connector,
    ));
}

async fn list_connectors(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let query: PageQuery = decode(&args)?;
    Ok(client.connectors().list(board_id, &query).await?)
}

async fn create_connector(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let request: ConnectorRequest = decode(&args)?;
    Ok(client.connectors().create(board_id, &request).await?)
}

async fn get_connector(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let connector_id = args.required_str("connector_id")?;
    Ok(client.connectors().get(board_id, connector_id).await?)
}

async fn update_connector(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let connector_id = args.required_str("connector_id")?;
    let request: ConnectorRequest = decode(&args)?;
    Ok(client
        .connectors()
        .update(board_id, connector_id, &request)
        .await?)
}

async fn delete_connector(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let connector_id = args.required_str("connector_id")?;
    client.connectors().delete(board_id, connector_id).await?;
    Ok(done("deleted", "connector", connector_id))
}
