//! Line-delimited JSON-RPC 2.0 tool server.
//!
//! Reads one request per line, writes one response per line. Requests
//! without an `id` are notifications and get no response.

use std::io;

use hk_api::{Client, HttpTransport, Transport};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::tools::{self, ToolError};

/// Protocol version answered when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "hakuna";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn success(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn failure(id: Value, error: &RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": error.code, "message": error.message},
    })
}

fn text_content(text: String, is_error: bool) -> Value {
    let mut result = json!({"content": [{"type": "text", "text": text}]});
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

/// Serves the tool catalog for one API client.
#[derive(Debug)]
pub struct ToolServer<T = HttpTransport> {
    client: Client<T>,
}

impl<T: Transport> ToolServer<T> {
    pub const fn new(client: Client<T>) -> Self {
        Self { client }
    }

    pub const fn client(&self) -> &Client<T> {
        &self.client
    }

    /// Handles one raw message and returns the response to write, if any.
    pub async fn handle_message(&self, line: &str) -> Option<Value> {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "unparseable message");
                return Some(failure(
                    Value::Null,
                    &RpcError::new(PARSE_ERROR, format!("Parse error: {err}")),
                ));
            }
        };

        let Value::Object(mut request) = message else {
            return Some(failure(
                Value::Null,
                &RpcError::new(INVALID_REQUEST, "Invalid request: expected an object"),
            ));
        };

        let id = request.remove("id");
        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return Some(failure(
                id.unwrap_or(Value::Null),
                &RpcError::new(INVALID_REQUEST, "Invalid request: missing method"),
            ));
        };
        let params = request.get("params").cloned().unwrap_or(Value::Null);

        let Some(id) = id else {
            tracing::debug!(method, "notification");
            return None;
        };

        tracing::debug!(method, "request");
        Some(match self.dispatch(method, params).await {
            Ok(result) => success(id, result),
            Err(error) => {
                tracing::debug!(method, code = error.code, message = %error.message, "request failed");
                failure(id, &error)
            }
        })
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools::catalog()),
            "tools/call" => self.call_tool(params).await,
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    async fn call_tool(&self, params: Value) -> Result<Value, RpcError> {
        let mut params = match params {
            Value::Object(params) => params,
            Value::Null => Map::new(),
            _ => {
                return Err(RpcError::new(
                    INVALID_PARAMS,
                    "Invalid params: expected an object",
                ));
            }
        };
        let Some(Value::String(name)) = params.remove("name") else {
            return Err(RpcError::new(
                INVALID_PARAMS,
                "Invalid params: missing tool name",
            ));
        };
        let arguments = params.remove("arguments").unwrap_or(Value::Null);

        match tools::call(&self.client, &name, arguments).await {
            Ok(text) => Ok(text_content(text, false)),
            Err(err @ (ToolError::UnknownTool(_) | ToolError::InvalidArguments { .. })) => {
                Err(RpcError::new(INVALID_PARAMS, err.to_string()))
            }
            Err(err) => {
                tracing::warn!(tool = %name, error = %err, "tool failed");
                Ok(text_content(err.to_string(), true))
            }
        }
    }

    /// Serves requests from `reader` until end of input. Blank lines are
    /// skipped; a line that is not UTF-8 gets a parse error like any other
    /// unparseable line.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_message(line.trim_end_matches(['\r', '\n'])).await,
                Err(err) => {
                    tracing::warn!(error = %err, "message is not valid UTF-8");
                    Some(failure(
                        Value::Null,
                        &RpcError::new(PARSE_ERROR, format!("Parse error: {err}")),
                    ))
                }
            };

            if let Some(response) = response {
                let mut out = response.to_string();
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        tracing::debug!("input closed");
        Ok(())
    }

    /// Serves requests on stdin, writing responses to stdout.
    pub async fn serve_stdio(&self) -> io::Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}

fn initialize(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    json!({
        "protocolVersion": protocol_version,
        "capabilities": {"tools": {}},
        "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
    })
}
