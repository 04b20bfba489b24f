use boardbridge_client::{BoardClient, OffsetQuery, ShareBoardRequest};
use serde_json::{Value, json};

use super::{board_id_prop, object_schema, tool};
use crate::tool::{ParamExt, ToolRegistry, ToolResult, decode};

pub(super) fn register(registry: &mut ToolRegistry, client: &BoardClient) {
    registry.register(tool(
        client,
        "list_board_members",
        "List the members of a board and their roles",
        object_schema(
            json!({
                "board_id": board_id_prop(),
                "limit": {"type": "integer", "description": "Maximum number of members"},
                "offset": {"type": "integer", "description": "Number of members to skip"}
            }),
            &["board_id"],
        ),
        list_board_members,
    ));

    registry.register(tool(
        client,
        "share_board",
        "Invite people to a board by email",
        object_schema(
            json!({
                "board_id": board_id_prop(),
                "emails": {
                    "type": "array",
                    "description": "Email addresses to invite",
                    "items": {"type": "string"}
                },
                "role": {
                    "type": "string",
                    "enum": ["viewer", "commenter", "editor", "coowner"]
                },
                "message": {"type": "string", "description": "Invitation message"}
            }),
            &["board_id", "emails"],
        ),
        share_board,
    ));
}

async fn list_board_members(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let query: OffsetQuery = decode(&args)?;
    Ok(client.members().list(board_id, &query).await?)
}

async fn share_board(client: BoardClient, args: Value) -> ToolResult<Value> {
    let board_id = args.required_str("board_id")?;
    let request: ShareBoardRequest = decode(&args)?;
    Ok(client.members().share(board_id, &request).await?)
}
