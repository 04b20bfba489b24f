use boardbridge_client::{BoardClient, CreateTagRequest};
use serde_json::{Value, json};

use super::{board_id_prop, done, object_schema, string_prop, tool};
use crate::tool::{ParamExt, ToolRegistry, ToolResult, decode};

const TAG_COLORS: [&str; 12] = [
    "red",
    "light_green",
    "cyan",
    "yellow",
    "magenta",
    "green",
    "blue",
    "gray",
    "violet",
    "dark_green",
    "dark_blue",
    "black",
];

fn item_tag_props() -> Value {
    json!({
        "board_id": board_id_prop(),
        "item_id": string_prop("Item ID"),
        "tag_id": string_prop("Tag ID")
    })
}

pub(super) fn register(registry: &mut ToolRegistry, client: &BoardClient) {
    registry.register(tool(
        client,
        "list_tags",
        "List the tags defined on a board",
        object_schema(json!({"board_id": board_id_prop()}), &["board_id"]),
        list_tags,
    ));

    registry.register(tool(
        client,
        "create_tag",
        "Create a tag on a board",
        object_schema(
            json!({
                "board_id": board_id_prop(),
                "title": string_prop("Tag text"),
                "fill_color": {"type": "string", "enum": TAG_COLORS}
            }),
            &["board_id", "title"],
        ),
        create_tag,
    ));

    registry.register(tool(
        client,
        "delete_tag",
        "Delete a tag from a board and every item carrying it",
        object_schema(
            json!({"board_id": board_id_prop(), "tag_id": string_prop("Tag ID")}),
            &["board_id", "tag_id"],
        ),
        delete_tag,
    ));

    registry.register(tool(
        client,
        "attach_tag",
        "Attach an existing tag to an item",
        object_schema(item_tag_props(), &["board_id", "item_id", "tag_id"]),
        attach_tag,
    ));

    registry.register(tool(
        client,
        "detach_tag",
        "Remove a tag from an item",
        object_schema(item_tag_props(), &["board_id", "item_id", "tag_id"]),
        detach_tag,
    ));

    registry.register(tool(
        client,
        "get_item_tags",
        "List the tags attached to an item",
        object_schema(
            json!({"board_id": board_id_prop(), "item_id": string_prop("Item ID")}),
            &["board_id", "item_id"],
        ),
        get_item_tags,
    ));
}

async fn list_tags(client: BoardClient, args: Value) -> ToolResult<Value> {
    Ok(client.tags().list(args.required_str("board_id")?).await?)
}

async fn create_tag(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let request: CreateTagRequest = decode(&args)?;
    Ok(client.tags().create(board_id, &request).await?)
}

async fn delete_tag(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let tag_id = args.required_str("tag_id")?;
    client.tags().delete(board_id, tag_id).await?;
    Ok(done("deleted", "tag", tag_id))
}

async fn attach_tag(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    let tag_id = args.required_str("tag_id")?;
    client.tags().attach(board_id, item_id, tag_id).await?;
    Ok(done("attached", "tag", tag_id))
}

async fn detach_tag(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    let tag_id = args.required_str("tag_id")?;
    client.tags().detach(board_id, item_id, tag_id).await?;
    Ok(done("detached", "tag", tag_id))
}

async fn get_item_tags(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let item_id = args.required_str("item_id")?;
    Ok(client.tags().item_tags(board_id, item_id).await?)
}
