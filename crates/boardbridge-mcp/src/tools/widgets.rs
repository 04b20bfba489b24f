//! Create/get/update/delete tools for each widget kind.

use boardbridge_client::{BoardClient, WidgetKind, WidgetRequest};
use serde_json::{Value, json};

use super::{board_id_prop, done, object_schema, string_prop, tool, with_properties};
use crate::tool::{ParamExt, ToolRegistry, ToolResult, decode};

/// Human-readable kind name for descriptions.
fn label(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::StickyNote => "sticky note",
        WidgetKind::Shape => "shape",
        WidgetKind::Text => "text item",
        WidgetKind::Card => "card",
        WidgetKind::Frame => "frame",
    }
}

/// What goes in `data` for each kind.
fn data_hint(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::StickyNote => "Content, e.g. {\"content\": \"...\", \"shape\": \"square\"}",
        WidgetKind::Shape => "Shape and content, e.g. {\"shape\": \"rectangle\", \"content\": \"...\"}",
        WidgetKind::Text => "Text content, e.g. {\"content\": \"...\"}",
        WidgetKind::Card => "Card fields, e.g. {\"title\": \"...\", \"description\": \"...\"}",
        WidgetKind::Frame => "Frame fields, e.g. {\"title\": \"...\", \"format\": \"custom\"}",
    }
}

fn body_props(kind: WidgetKind) -> Value {
    json!({
        "data": {"type": "object", "description": data_hint(kind)},
        "style": {"type": "object", "description": "Style properties, e.g. fillColor"},
        "position": {
            "type": "object",
            "description": "Position on the board {x, y}",
            "properties": {"x": {"type": "number"}, "y": {"type": "number"}}
        },
        "geometry": {
            "type": "object",
            "description": "Size {width, height, rotation}",
            "properties": {
                "width": {"type": "number"},
                "height": {"type": "number"},
                "rotation": {"type": "number"}
            }
        },
        "parent": {
            "type": "object",
            "description": "Parent frame {id}",
            "properties": {"id": {"type": "string"}}
        }
    })
}

fn widget_ref(kind: WidgetKind) -> Value {
    json!({
        "board_id": board_id_prop(),
        "item_id": string_prop(&format!("ID of the {}", label(kind)))
    })
}

pub(super) fn register(registry: &mut ToolRegistry, client: &BoardClient) {
    for kind in WidgetKind::ALL {
        let name = kind.singular();
        let label = label(kind);

        registry.register(tool(
            client,
            format!("create_{name}"),
            format!("Create a {label} on a board"),
            object_schema(
                with_properties(json!({"board_id": board_id_prop()}), body_props(kind)),
                &["board_id"],
            ),
            move |client, args| create(client, kind, args),
        ));

        registry.register(tool(
            client,
            format!("get_{name}"),
            format!("Get a {label} by ID"),
            object_schema(widget_ref(kind), &["board_id", "item_id"]),
            move |client, args| get(client, kind, args),
        ));

        registry.register(tool(
            client,
            format!("update_{name}"),
            format!("Update a {label}'s content, style, position or size"),
            object_schema(
                with_properties(widget_ref(kind), body_props(kind)),
                &["board_id", "item_id"],
            ),
            move |client, args| update(client, kind, args),
        ));

        registry.register(tool(
            client,
            format!("delete_{name}"),
            format!("Delete a {label}"),
            object_schema(widget_ref(kind), &["board_id", "item_id"]),
            move |client, args| delete(client, kind, args),
        ));
    }
}

async fn create(client: BoardClient, kind: WidgetKind, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let request: WidgetRequest = decode(&args)?;
    Ok(client.widgets(kind).create(board_id, &request).await?)
}

async fn get(client: BoardClient, kind: WidgetKind, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    Ok(client.widgets(kind).get(board_id, item_id).await?)
}

async fn update(client: BoardClient, kind: WidgetKind, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    let request: WidgetRequest = decode(&args)?;
    Ok(client.widgets(kind).update(board_id, item_id, &request).await?)
}

async fn delete(client: BoardClient, kind: WidgetKind, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    client.widgets(kind).delete(board_id, item_id).await?;
    Ok(done("deleted", kind.singular(), item_id))
}
