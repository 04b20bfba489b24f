//! Per-resource API clients.
//!
//! Each method maps to one Miro REST v2 endpoint and unwraps the response
//! envelope with [`unwrap_envelope`](crate::types::unwrap_envelope).

mod boards;
mod connectors;
mod items;
mod members;
mod tags;
mod widgets;

pub use boards::BoardsApi;
pub use connectors::ConnectorsApi;
pub use items::ItemsApi;
pub use members::MembersApi;
pub use tags::TagsApi;
pub use widgets::{WidgetKind, WidgetsApi};

/// Percent-encode an id for use as a path segment.
pub(crate) fn seg(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

/// Path of a board's sub-resource.
pub(crate) fn board_path(board_id: &str, rest: &str) -> String {
    if rest.is_empty() {
        format!("v2/boards/{}", seg(board_id))
    } else {
        format!("v2/boards/{}/{}", seg(board_id), rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_path_encodes_ids() {
        assert_eq!(board_path("uXjVOD6LSME=", ""), "v2/boards/uXjVOD6LSME%3D");
        assert_eq!(
            board_path("uXjVOD6LSME=", "items/3458764"),
            "v2/boards/uXjVOD6LSME%3D/items/3458764"
        );
    }
}
