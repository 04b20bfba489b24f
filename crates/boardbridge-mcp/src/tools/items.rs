use boardbridge_client::{BoardClient, ListItemsQuery, UpdateItemRequest};
use serde_json::{Value, json};

use super::{board_id_prop, done, object_schema, page_props, string_prop, tool, with_properties};
use crate::tool::{ParamExt, ToolRegistry, ToolResult, decode};

fn item_ref() -> Value {
    json!({
        "board_id": board_id_prop(),
        "item_id": string_prop("Item ID")
    })
}

pub(super) fn register(registry: &mut ToolRegistry, client: &BoardClient) {
    registry.register(tool(
        client,
        "list_items",
        "List items on a board, optionally restricted to one item type",
        object_schema(
            with_properties(
                json!({
                    "board_id": board_id_prop(),
                    "type": {
                        "type": "string",
                        "description": "Item type filter",
                        "enum": [
                            "app_card", "card", "document", "embed", "frame", "image",
                            "shape", "sticky_note", "text"
                        ]
                    }
                }),
                page_props(),
            ),
            &["board_id"],
        ),
        list_items,
    ));

    registry.register(tool(
        client,
        "get_item",
        "Get any item on a board by ID",
        object_schema(item_ref(), &["board_id", "item_id"]),
        get_item,
    ));

    registry.register(tool(
        client,
        "update_item_position",
        "Move an item or change its parent frame",
        object_schema(
            with_properties(
                item_ref(),
                json!({
                    "position": {
                        "type": "object",
                        "description": "New position {x, y}",
                        "properties": {"x": {"type": "number"}, "y": {"type": "number"}}
                    },
                    "parent": {
                        "type": "object",
                        "description": "New parent frame {id}",
                        "properties": {"id": {"type": "string"}}
                    }
                }),
            ),
            &["board_id", "item_id"],
        ),
        update_item_position,
    ));

    registry.register(tool(
        client,
        "delete_item",
        "Delete any item on a board",
        object_schema(item_ref(), &["board_id", "item_id"]),
        delete_item,
    ));
}

async fn list_items(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let query: ListItemsQuery = decode(&args)?;
    Ok(client.items().list(board_id, &query).await?)
}

async fn get_item(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    Ok(client.items().get(board_id, item_id).await?)
}

async fn update_item_position(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    let request: UpdateItemRequest = decode(&args)?;
    Ok(client.items().update(board_id, item_id, &request).await?)
}

async fn delete_item(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    client.items().delete(board_id, item_id).await?;
    Ok(done("deleted", "item", item_id))
}
