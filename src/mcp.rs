//! Stdio JSON-RPC tool server exposing the ask-human tool.
//!
//! Newline-delimited JSON-RPC 2.0. stdout carries protocol frames only.
//! Each tool call runs in its own task so a long wait never blocks other
//! requests; every response goes through a single writer task.

use crate::ask::{AskError, AskHuman, AskRequest};
use beacon_core::message::ToolResponse;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const ASK_TOOL_NAME: &str = "ask_human_via_slack";
const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// What to do with one inbound frame.
#[derive(Debug)]
enum Dispatch {
    Respond(Value),
    /// Notification; nothing goes back.
    Silent,
    /// A validated ask-human call.
    Ask { id: Value, request: AskRequest },
}

pub struct ToolServer {
    ask: Arc<AskHuman>,
}

impl ToolServer {
    pub fn new(ask: AskHuman) -> Self {
        Self { ask: Arc::new(ask) }
    }

    /// Serve until `reader` hits EOF, then let in-flight calls finish.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Value>(64);
        let writer_task = tokio::spawn(write_frames(rx, writer));

        let mut reader = reader;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let frame = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => dispatch(line),
                Err(e) => {
                    warn!("mcp: frame is not valid UTF-8: {e}");
                    Dispatch::Respond(failure(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {e}"),
                    ))
                }
            };
            match frame {
                Dispatch::Respond(frame) => {
                    if tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Dispatch::Silent => {}
                Dispatch::Ask { id, request } => {
                    let ask = self.ask.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let result = tool_result(ask.ask(request).await);
                        let _ = tx.send(success(id, result)).await;
                    });
                }
            }
        }

        info!("mcp: stdin closed, waiting for in-flight calls");
        drop(tx);
        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        }
    }
}

async fn write_frames<W>(mut rx: mpsc::Receiver<Value>, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        let mut line = frame.to_string();
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

fn dispatch(line: &str) -> Dispatch {
    let request: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            warn!("mcp: unparseable frame: {e}");
            return Dispatch::Respond(failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}")));
        }
    };

    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return Dispatch::Respond(failure(
            id_of(&request),
            INVALID_REQUEST,
            "Missing method".to_string(),
        ));
    };
    let Some(id) = request.get("id").cloned() else {
        debug!("mcp: notification {method}");
        return Dispatch::Silent;
    };

    match method {
        "initialize" => Dispatch::Respond(success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        )),
        "ping" => Dispatch::Respond(success(id, json!({}))),
        "tools/list" => Dispatch::Respond(success(id, json!({ "tools": [tool_definition()] }))),
        "tools/call" => match parse_call(request.get("params")) {
            Ok(request) => Dispatch::Ask { id, request },
            Err(message) => Dispatch::Respond(failure(id, INVALID_PARAMS, message)),
        },
        other => Dispatch::Respond(failure(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    }
}

fn parse_call(params: Option<&Value>) -> Result<AskRequest, String> {
    let name = params
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if name != ASK_TOOL_NAME {
        return Err(format!("Unknown tool: {name}"));
    }
    let arguments = params
        .and_then(|p| p.get("arguments"))
        .cloned()
        .unwrap_or_else(|| json!({}));
    let request: AskRequest = serde_json::from_value(arguments)
        .map_err(|e| format!("Invalid arguments for {ASK_TOOL_NAME}: {e}"))?;
    if request.question.trim().is_empty() {
        return Err("question must not be empty".to_string());
    }
    Ok(request)
}

fn tool_result(outcome: Result<ToolResponse, AskError>) -> Value {
    let (text, is_error) = match outcome {
        Ok(response) => match serde_json::to_string(&response) {
            Ok(text) => (text, false),
            Err(e) => (json!({ "error": e.to_string() }).to_string(), true),
        },
        Err(e) => (e.to_json().to_string(), true),
    };
    let mut result = json!({ "content": [{ "type": "text", "text": text }] });
    if is_error {
        result["isError"] = json!(true);
    }
    result
}

fn tool_definition() -> Value {
    json!({
        "name": ASK_TOOL_NAME,
        "description": "Send a question to a human via Slack and wait for their reply. \
            Use this whenever you need human input, approval, or a decision and the \
            human may not be watching the terminal.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The question to ask the human"
                },
                "context": {
                    "type": "string",
                    "description": "File path, error message, or code snippet for context"
                },
                "options": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Numbered options for the human to choose from"
                },
                "urgency": {
                    "type": "string",
                    "enum": ["high", "normal", "low"],
                    "default": "normal"
                },
                "session_id": {
                    "type": "string",
                    "description": "Session identifier for thread continuity"
                }
            },
            "required": ["question"]
        }
    })
}

fn id_of(request: &Value) -> Value {
    request.get("id").cloned().unwrap_or(Value::Null)
}

fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn failure(id: Value, code: i64, message: String) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingChat, ScriptedWaiter};
    use beacon_core::{
        config::Config,
        message::{HumanReply, PollResult},
    };
    use tokio::io::AsyncReadExt;

    fn respond(line: &str) -> Value {
        match dispatch(line) {
            Dispatch::Respond(v) => v,
            other => panic!("expected a response, got {other:?}"),
        }
    }

    fn server(waiter: Arc<ScriptedWaiter>) -> (ToolServer, Arc<RecordingChat>) {
        let chat = Arc::new(RecordingChat::new());
        let mut config = Config::default();
        config.slack.bot_token = "xoxb-test".into();
        config.slack.channel_id = "C0MCP".into();
        config.timing.poll_timeout_ms = 1_000;
        let ask = AskHuman::new(chat.clone(), waiter, Arc::new(config));
        (ToolServer::new(ask), chat)
    }

    async fn serve(server: &ToolServer, input: &str) -> Vec<Value> {
        serve_bytes(server, input.as_bytes()).await
    }

    async fn serve_bytes(server: &ToolServer, input: &[u8]) -> Vec<Value> {
        let (mut client, out) = tokio::io::duplex(64 * 1024);
        server.run(input, out).await.unwrap();
        let mut raw = String::new();
        client.read_to_string(&mut raw).await.unwrap();
        raw.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    #[test]
    fn test_initialize_advertises_tools() {
        let resp = respond(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#);
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(resp["result"]["capabilities"]["tools"].is_object());
        assert_eq!(resp["result"]["serverInfo"]["name"], "beacon");
    }

    #[test]
    fn test_tools_list_schema() {
        let resp = respond(r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#);
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], ASK_TOOL_NAME);
        let schema = &tools[0]["inputSchema"];
        assert_eq!(schema["required"], json!(["question"]));
        assert_eq!(
            schema["properties"]["urgency"]["enum"],
            json!(["high", "normal", "low"])
        );
    }

    #[test]
    fn test_notifications_get_no_reply() {
        assert!(matches!(
            dispatch(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#),
            Dispatch::Silent
        ));
    }

    #[test]
    fn test_protocol_errors() {
        let resp = respond("{not json");
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert!(resp["id"].is_null());

        let resp = respond(r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#);
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(resp["id"], 7);
    }

    #[test]
    fn test_invalid_tool_calls() {
        let cases = [
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"other","arguments":{}}}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"ask_human_via_slack","arguments":{}}}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"ask_human_via_slack","arguments":{"question":"  "}}}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"ask_human_via_slack","arguments":{"question":"Q","urgency":"urgent"}}}"#,
        ];
        for case in cases {
            assert_eq!(respond(case)["error"]["code"], INVALID_PARAMS, "{case}");
        }
    }

    #[test]
    fn test_valid_call_is_dispatched() {
        let line = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"ask_human_via_slack","arguments":{"question":"Ship?","options":["yes","no"],"urgency":"high"}}}"#;
        match dispatch(line) {
            Dispatch::Ask { id, request } => {
                assert_eq!(id, 3);
                assert_eq!(request.question, "Ship?");
                assert_eq!(request.options.as_deref().map(<[String]>::len), Some(2));
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let waiter = ScriptedWaiter::new(vec![PollResult {
            reply: Some(HumanReply {
                text: "use option two".into(),
                user: Some("U5".into()),
                message_id: "1700000000.000001".into(),
            }),
            elapsed_ms: 5,
        }]);
        let (server, chat) = server(waiter);
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"ask_human_via_slack","arguments":{"question":"Which?"}}}"#,
            "\n",
        );
        let frames = serve(&server, input).await;

        assert_eq!(frames.len(), 2);
        let call = frames.iter().find(|f| f["id"] == 2).unwrap();
        assert!(call["result"]["isError"].is_null());
        let payload: Value =
            serde_json::from_str(call["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(payload["reply"], "use option two");
        assert_eq!(payload["replied_by"], "U5");
        assert!(payload["selected_option"].is_null());
        assert_eq!(chat.texts()[0], "Which?");
    }

    #[tokio::test]
    async fn test_tool_call_timeout_is_tool_error() {
        let (server, chat) = server(ScriptedWaiter::new(vec![]));
        let input = r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"ask_human_via_slack","arguments":{"question":"Hello?"}}}
"#;
        let frames = serve(&server, input).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["result"]["isError"], true);
        let payload: Value =
            serde_json::from_str(frames[0]["result"]["content"][0]["text"].as_str().unwrap())
                .unwrap();
        assert_eq!(payload["error"], "Timeout: No human response received");
        assert_eq!(chat.post_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_gets_parse_error_and_serving_continues() {
        let (server, _chat) = server(ScriptedWaiter::new(vec![]));
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.push(b'\n');
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"p\xFFing\"}\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#);
        input.push(b'\n');

        let frames = serve_bytes(&server, &input).await;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["id"], 1);
        assert!(frames[0]["result"].is_object());
        assert_eq!(frames[1]["error"]["code"], PARSE_ERROR);
        assert!(frames[1]["id"].is_null());
        assert_eq!(frames[2]["id"], 3);
        assert!(frames[2]["result"].is_object());
    }
}
