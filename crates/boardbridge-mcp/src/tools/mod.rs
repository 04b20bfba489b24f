//! The Miro tool catalogue: one tool per resource method.

mod boards;
mod connectors;
mod items;
mod members;
mod rate_limit;
mod tags;
mod widgets;

use std::future::Future;

use boardbridge_client::BoardClient;
use serde_json::{Value, json};

use crate::tool::{Tool, ToolRegistry, ToolResult};

/// Build a registry with every Miro tool bound to `client`.
pub fn catalogue(client: &BoardClient) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    boards::register(&mut registry, client);
    items::register(&mut registry, client);
    widgets::register(&mut registry, client);
    connectors::register(&mut registry, client);
    tags::register(&mut registry, client);
    members::register(&mut registry, client);
    rate_limit::register(&mut registry, client);
    tracing::debug!(tools = registry.len(), "Tool catalogue built");
    registry
}

/// A tool whose handler receives its own handle to the client.
fn tool<F, Fut>(
    client: &BoardClient,
    name: impl Into<String>,
    description: impl Into<String>,
    input_schema: Value,
    handler: F,
) -> Tool
where
    F: Fn(BoardClient, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolResult<Value>> + Send + 'static,
{
    let client = client.clone();
    Tool::new(name, description, input_schema, move |args| {
        handler(client.clone(), args)
    })
}

/// `{"type": "object", ...}` with the given properties and required names.
fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Merge extra properties into a properties object.
fn with_properties(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

fn string_prop(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn board_id_prop() -> Value {
    string_prop("Board ID")
}

fn page_props() -> Value {
    json!({
        "limit": {"type": "integer", "description": "Maximum number of results"},
        "cursor": {"type": "string", "description": "Cursor from a previous page"}
    })
}

/// Result payload for delete-style calls with no response body.
fn done(action: &str, kind: &str, id: &str) -> Value {
    json!({"success": true, "action": action, "type": kind, "id": id})
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardbridge_client::StaticToken;
    use std::sync::Arc;

    fn client() -> BoardClient {
        BoardClient::builder()
            .base_url("http://127.0.0.1:9")
            .auth(Arc::new(StaticToken("t".to_string())))
            .build()
            .unwrap()
    }

    #[test]
    fn test_catalogue_covers_resource_methods() {
        let registry = catalogue(&client());
        for name in [
            "list_boards",
            "get_board",
            "create_board",
            "update_board",
            "delete_board",
            "copy_board",
            "list_items",
            "get_item",
            "update_item_position",
            "delete_item",
            "create_sticky_note",
            "get_shape",
            "update_text",
            "delete_card",
            "create_frame",
            "list_connectors",
            "create_connector",
            "get_connector",
            "update_connector",
            "delete_connector",
            "list_tags",
            "create_tag",
            "delete_tag",
            "attach_tag",
            "detach_tag",
            "get_item_tags",
            "list_board_members",
            "share_board",
            "get_rate_limit_status",
        ] {
            assert!(registry.contains(name), "missing tool {name}");
        }
        // 6 board + 4 item + 20 widget + 5 connector + 6 tag + 2 member + 1 status
        assert_eq!(registry.len(), 44);
    }

    #[test]
    fn test_schemas_are_objects_with_descriptions() {
        for info in catalogue(&client()).list() {
            assert_eq!(info.input_schema["type"], "object", "{}", info.name);
            assert!(info.input_schema["required"].is_array(), "{}", info.name);
            assert!(!info.description.is_empty(), "{}", info.name);
        }
    }

    #[test]
    fn test_with_properties_merges() {
        let merged = with_properties(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }
}
