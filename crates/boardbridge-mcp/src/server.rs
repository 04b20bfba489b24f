//! The stdio JSON-RPC server loop.
//!
//! Requests are read one at a time. `tools/call` runs in its own task so a
//! slow remote call never blocks the next request; every response goes
//! through a single writer task so lines never interleave.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, MCP_PROTOCOL_VERSION, RequestId, ServerCapabilities,
    ServerInfo, ToolsCapability,
};
use crate::tool::ToolRegistry;
use crate::transport::{MessageReader, write_message};

/// MCP server exposing a [`ToolRegistry`].
#[derive(Debug, Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            info: ServerInfo::default(),
        }
    }

    pub fn with_server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.info = ServerInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve on the process's stdin and stdout until stdin closes.
    pub async fn serve_stdio(self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches end of stream.
    ///
    /// In-flight tool calls are allowed to finish and their responses are
    /// written before this returns.
    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                write_message(&mut writer, &line).await?;
            }
            writer.shutdown().await?;
            Ok::<(), McpError>(())
        });

        let mut reader = MessageReader::new(reader);
        let mut calls = JoinSet::new();
        tracing::info!(tools = self.registry.len(), "MCP server listening on stdio");

        let read_result = loop {
            // Reap finished calls so the set does not grow without bound.
            while calls.try_join_next().is_some() {}

            let message = match reader.next_message().await {
                Ok(Some(message)) => message,
                Ok(None) => break Ok(()),
                Err(McpError::Protocol(detail)) => {
                    send(&tx, JsonRpcResponse::failure(None, JsonRpcError::parse_error(&detail)));
                    tracing::warn!(%detail, "Dropping malformed frame");
                    continue;
                }
                Err(err) => break Err(err),
            };

            let request = match parse_request(&message) {
                Ok(request) => request,
                Err(response) => {
                    send(&tx, *response);
                    continue;
                }
            };

            let Some(id) = request.id.clone() else {
                self.handle_notification(&request);
                continue;
            };

            if request.method == "tools/call" {
                let registry = self.registry.clone();
                let tx = tx.clone();
                calls.spawn(async move {
                    let response = call_tool(&registry, id, request.params).await;
                    send(&tx, response);
                });
                continue;
            }

            send(&tx, self.handle_request(id, &request));
        };

        while calls.join_next().await.is_some() {}
        drop(tx);

        match writer_task.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "Writer stopped early"),
            Err(err) => tracing::error!(error = %err, "Writer task panicked"),
        }
        tracing::info!("MCP server stopped");
        read_result
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => tracing::info!("Client initialized"),
            "notifications/cancelled" => tracing::debug!("Ignoring cancellation notice"),
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    fn handle_request(&self, id: RequestId, request: &JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!(%id, method = %request.method, "Handling request");
        match request.method.as_str() {
            "initialize" => {
                let params: InitializeParams = request
                    .params
                    .clone()
                    .and_then(|p| serde_json::from_value(p).ok())
                    .unwrap_or_default();
                if let Some(client) = &params.client_info {
                    tracing::info!(client = %client.name, version = %client.version, "Client connected");
                }
                let result = InitializeResult {
                    protocol_version: params
                        .protocol_version
                        .unwrap_or_else(|| MCP_PROTOCOL_VERSION.to_string()),
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability {
                            list_changed: Some(false),
                        }),
                    },
                    server_info: self.info.clone(),
                };
                respond(id, &result)
            }
            "ping" => JsonRpcResponse::success(Some(id), json!({})),
            "tools/list" => respond(
                id,
                &ListToolsResult {
                    tools: self.registry.list(),
                },
            ),
            method => {
                JsonRpcResponse::failure(Some(id), JsonRpcError::method_not_found(method))
            }
        }
    }
}

/// Decode a message, or produce the error response for it.
fn parse_request(message: &str) -> std::result::Result<JsonRpcRequest, Box<JsonRpcResponse>> {
    let value: Value = serde_json::from_str(message).map_err(|e| {
        Box::new(JsonRpcResponse::failure(
            None,
            JsonRpcError::parse_error(e),
        ))
    })?;

    // Keep the id when it is readable so the client can correlate the error.
    let id = value
        .get("id")
        .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());

    serde_json::from_value(value).map_err(|e| {
        Box::new(JsonRpcResponse::failure(
            id,
            JsonRpcError::invalid_request(e),
        ))
    })
}

async fn call_tool(registry: &ToolRegistry, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
    let params: CallToolParams = match params.map(serde_json::from_value) {
        Some(Ok(params)) => params,
        Some(Err(e)) => {
            return JsonRpcResponse::failure(Some(id), JsonRpcError::invalid_params(e));
        }
        None => {
            return JsonRpcResponse::failure(
                Some(id),
                JsonRpcError::invalid_params("tools/call requires a tool name"),
            );
        }
    };

    tracing::info!(%id, tool = %params.name, "Calling tool");
    let result = registry
        .call(&params.name, params.arguments.unwrap_or(Value::Null))
        .await;
    respond(id, &result)
}

fn respond<T: serde::Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(Some(id), value),
        Err(e) => JsonRpcResponse::failure(
            Some(id),
            JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

fn send(tx: &mpsc::UnboundedSender<String>, response: JsonRpcResponse) {
    match serde_json::to_string(&response) {
        Ok(line) => {
            if tx.send(line).is_err() {
                tracing::warn!("Response dropped: writer has stopped");
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize response"),
    }
}
