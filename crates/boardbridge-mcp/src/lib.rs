//! MCP (Model Context Protocol) tool server for boardbridge.
//!
//! Exposes the Miro REST API as MCP tools over stdio.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpServer                                                  │
//! │  - initialize, ping, tools/list, tools/call                 │
//! │  - one task per tool call, one writer task                  │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ToolRegistry                                               │
//! │  - schema validation, {error, message, tool} payloads       │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  BoardClient (boardbridge-client)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use boardbridge_mcp::{McpServer, catalogue};
//!
//! let server = McpServer::new(catalogue(&client));
//! server.serve_stdio().await?;
//! ```

pub mod error;
pub mod protocol;
pub mod server;
pub mod tool;
pub mod tools;
pub mod transport;

pub use error::{McpError, Result, ToolError};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, ServerInfo, ToolContent, ToolInfo,
};
pub use server::McpServer;
pub use tool::{ParamExt, ParameterValidationError, Tool, ToolRegistry, validate_arguments};
pub use tools::catalogue;
pub use transport::MessageReader;
