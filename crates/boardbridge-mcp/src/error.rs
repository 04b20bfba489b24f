//! Error types for the tool server.

use thiserror::Error;

use crate::tool::ParameterValidationError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for the stdio server loop.
#[derive(Debug, Error)]
pub enum McpError {
    /// Reading or writing the message stream failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A message violated the framing rules.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

/// Why a tool call failed.
///
/// Never crosses the wire as a JSON-RPC error; the registry turns it into a
/// `{error, message, tool}` payload.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments failed schema validation or decoding.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] ParameterValidationError),

    /// The remote call failed.
    #[error(transparent)]
    Client(#[from] boardbridge_client::Error),

    /// A result could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
