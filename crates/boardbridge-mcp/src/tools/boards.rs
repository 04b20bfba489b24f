use boardbridge_client::{BoardClient, CopyBoardRequest, CreateBoardRequest, ListBoardsQuery};
use serde_json::{Value, json};

use super::{board_id_prop, done, object_schema, string_prop, tool, with_properties};
use crate::tool::{ParamExt, ToolRegistry, ToolResult, decode};

fn board_fields() -> Value {
    json!({
        "name": {"type": "string", "description": "Board name"},
        "description": {"type": "string", "description": "Board description"},
        "team_id": {"type": "string", "description": "Team that owns the board"},
        "policy": {"type": "object", "description": "Sharing and permissions policy"}
    })
}

pub(super) fn register(registry: &mut ToolRegistry, client: &BoardClient) {
    registry.register(tool(
        client,
        "list_boards",
        "List boards the user can access, optionally filtered by a search query or team",
        object_schema(
            json!({
                "query": string_prop("Search text matched against board names"),
                "team_id": string_prop("Only boards of this team"),
                "limit": {"type": "integer", "description": "Maximum number of boards"},
                "offset": {"type": "integer", "description": "Number of boards to skip"},
                "sort": {
                    "type": "string",
                    "enum": ["default", "last_modified", "last_opened", "last_created", "alphabetically"]
                }
            }),
            &[],
        ),
        list_boards,
    ));

    registry.register(tool(
        client,
        "get_board",
        "Get a board by ID",
        object_schema(json!({"board_id": board_id_prop()}), &["board_id"]),
        get_board,
    ));

    registry.register(tool(
        client,
        "create_board",
        "Create a new board",
        object_schema(board_fields(), &[]),
        create_board,
    ));

    registry.register(tool(
        client,
        "update_board",
        "Update a board's name, description or policy",
        object_schema(
            with_properties(json!({"board_id": board_id_prop()}), board_fields()),
            &["board_id"],
        ),
        update_board,
    ));

    registry.register(tool(
        client,
        "delete_board",
        "Delete a board",
        object_schema(json!({"board_id": board_id_prop()}), &["board_id"]),
        delete_board,
    ));

    registry.register(tool(
        client,
        "copy_board",
        "Copy a board, optionally into another team under a new name",
        object_schema(
            json!({
                "board_id": string_prop("ID of the board to copy"),
                "name": string_prop("Name of the copy"),
                "description": string_prop("Description of the copy"),
                "team_id": string_prop("Team to copy into")
            }),
            &["board_id"],
        ),
        copy_board,
    ));
}

async fn list_boards(client: BoardClient, args: Value) -> ToolResult<Value> {
    let query: ListBoardsQuery = decode(&args)?;
    Ok(client.boards().list(&query).await?)
}

async fn get_board(client: BoardClient, args: Value) -> ToolResult<Value> {
    Ok(client.boards().get(args.required_str("board_id")?).await?)
}

async fn create_board(client: BoardClient, args: Value) -> ToolResult<Value> {
    let request: CreateBoardRequest = decode(&args)?;
    Ok(client.boards().create(&request).await?)
}

async fn update_board(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let request: CreateBoardRequest = decode(&args)?;
    Ok(client.boards().update(board_id, &request).await?)
}

async fn delete_board(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    client.boards().delete(board_id).await?;
    Ok(done("deleted", "board", board_id))
}

async fn copy_board(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let request: CopyBoardRequest = decode(&args)?;
    Ok(client.boards().copy(board_id, &request).await?)
}
