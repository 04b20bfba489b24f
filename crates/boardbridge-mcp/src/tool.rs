//! Tool framework: definitions, argument validation and dispatch.
//!
//! A [`Tool`] pairs a name, description and JSON input schema with an async
//! handler. The [`ToolRegistry`] validates arguments against the schema
//! before the handler runs and turns every failure into a structured
//! `{error: true, message, tool}` payload.
//!
//! # Example
//!
//! ```rust
//! use boardbridge_mcp::{Tool, ToolRegistry};
//! use serde_json::json;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Tool::new(
//!     "echo",
//!     "Echo back the input",
//!     json!({
//!         "type": "object",
//!         "properties": {"message": {"type": "string"}},
//!         "required": ["message"]
//!     }),
//!     |args| async move { Ok::<_, boardbridge_mcp::ToolError>(args) },
//! ));
//! assert!(registry.contains("echo"));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::ToolError;
use crate::protocol::{CallToolResult, ToolInfo};

// ─────────────────────────────────────────────────────────────────────────────
// Parameter Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for tool argument validation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterValidationError {
    /// Arguments were not a JSON object.
    #[error("arguments must be an object, got {actual}")]
    NotAnObject {
        /// JSON type found instead.
        actual: &'static str,
    },

    /// A required parameter is missing.
    #[error("missing required parameter '{name}'")]
    MissingRequired {
        /// The parameter name.
        name: String,
    },

    /// A parameter has an invalid type.
    #[error("invalid type for '{name}': expected {expected}, got {actual}")]
    InvalidType {
        /// The parameter name.
        name: String,
        /// The expected type(s).
        expected: String,
        /// The actual type found.
        actual: &'static str,
    },

    /// A parameter value is not one of the allowed values.
    #[error("'{name}' has invalid value {value}: expected one of {allowed}")]
    InvalidValue {
        /// The parameter name.
        name: String,
        /// The invalid value.
        value: String,
        /// The allowed values.
        allowed: String,
    },

    /// Arguments passed the schema but could not be decoded.
    #[error("{0}")]
    Malformed(String),

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ParameterValidationError>),
}

impl ParameterValidationError {
    /// Create a missing required parameter error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingRequired { name: name.into() }
    }
}

/// Result type for parameter validation.
pub type ParamResult<T> = std::result::Result<T, ParameterValidationError>;

/// Helper trait for extracting parameters from JSON arguments.
pub trait ParamExt {
    /// Get a required string parameter.
    fn required_str(&self, name: &str) -> ParamResult<&str>;

    /// Get an optional string parameter.
    fn optional_str(&self, name: &str) -> Option<&str>;
}

impl ParamExt for Value {
    fn required_str(&self, name: &str) -> ParamResult<&str> {
        self.get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParameterValidationError::missing(name))
    }

    fn optional_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }
}

/// Decode tool arguments into a typed request.
pub fn decode<T: DeserializeOwned>(args: &Value) -> ParamResult<T> {
    T::deserialize(args).map_err(|e| ParameterValidationError::Malformed(e.to_string()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        other => json_type(value) == other,
    }
}

/// Validate arguments against a tool's input schema.
///
/// Checks the top-level object type, required properties, declared
/// primitive types of present properties and `enum` constraints. Unknown
/// properties are allowed. `null` arguments are treated as `{}`.
pub fn validate_arguments(schema: &Value, args: &Value) -> ParamResult<()> {
    let empty = Map::new();
    let object = match args {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ParameterValidationError::NotAnObject {
                actual: json_type(other),
            });
        }
    };

    let mut errors = Vec::new();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if object.get(name).is_none_or(Value::is_null) {
                errors.push(ParameterValidationError::missing(name));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, property) in properties {
            let Some(value) = object.get(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let expected: Vec<&str> = match property.get("type") {
                Some(Value::String(t)) => vec![t.as_str()],
                Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            if !expected.is_empty() && !expected.iter().any(|t| type_matches(t, value)) {
                errors.push(ParameterValidationError::InvalidType {
                    name: name.clone(),
                    expected: expected.join(" or "),
                    actual: json_type(value),
                });
                continue;
            }

            if let Some(allowed) = property.get("enum").and_then(Value::as_array)
                && !allowed.contains(value)
            {
                errors.push(ParameterValidationError::InvalidValue {
                    name: name.clone(),
                    value: value.to_string(),
                    allowed: allowed
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ParameterValidationError::Multiple(errors)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────────────────────────────────────

/// Result type for tool handlers.
pub type ToolResult<T> = std::result::Result<T, ToolError>;

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, ToolResult<Value>> + Send + Sync>;

/// A callable tool.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    handler: Handler,
}

impl Tool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |args| handler(args).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Validate `args` and run the handler.
    pub async fn call(&self, args: Value) -> ToolResult<Value> {
        validate_arguments(&self.input_schema, &args)?;
        let args = if args.is_null() { json!({}) } else { args };
        (self.handler)(args).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry and dispatcher for tools.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions sorted by name.
    pub fn list(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<ToolInfo> = self.tools.values().map(Tool::info).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Run a tool and shape the outcome for `tools/call`.
    ///
    /// Success becomes pretty-printed JSON text. Any failure, including an
    /// unknown tool name, becomes an `isError` result whose text is the
    /// `{error, message, tool}` payload.
    pub async fn call(&self, name: &str, args: Value) -> CallToolResult {
        let outcome = match self.get(name) {
            Some(tool) => tool.call(args).await,
            None => Err(ToolError::UnknownTool(name.to_string())),
        };

        match outcome {
            Ok(value) => {
                tracing::debug!(tool = name, "Tool call succeeded");
                let text =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                CallToolResult::text(text)
            }
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "Tool call failed");
                let payload = json!({
                    "error": true,
                    "message": err.to_string(),
                    "tool": name,
                });
                let text =
                    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
                CallToolResult::error_text(text)
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
