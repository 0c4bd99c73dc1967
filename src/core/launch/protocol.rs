// ─── Launcher Protocol ───
// The game can call back into the launcher by printing
// `launcherProtocol.<function>(<args>)`; replies go to its stdin as one JSON
// object per line.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const PROTOCOL_PREFIX: &str = "launcherProtocol.";

/// Reply written back to the game.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProtocolReply {
    /// `false` while more replies for the same call will follow.
    #[serde(rename = "final")]
    pub is_final: bool,
    pub status: String,
    pub message: serde_json::Value,
}

impl ProtocolReply {
    pub fn success(message: impl Into<serde_json::Value>) -> Self {
        Self {
            is_final: true,
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_final: true,
            status: "error".to_string(),
            message: serde_json::Value::String(message.into()),
        }
    }

    /// Wire form: compact JSON terminated by CRLF.
    pub fn to_line(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("{}\r\n", json)
    }
}

/// Handle given to a protocol function for answering the game.
#[derive(Debug, Clone)]
pub struct ProtocolReplier {
    tx: mpsc::UnboundedSender<ProtocolReply>,
}

impl ProtocolReplier {
    pub fn new(tx: mpsc::UnboundedSender<ProtocolReply>) -> Self {
        Self { tx }
    }

    pub fn reply(&self, reply: ProtocolReply) {
        if self.tx.send(reply).is_err() {
            debug!("Game stdin closed, dropping protocol reply");
        }
    }
}

/// A launcher-side function the game may invoke.
#[async_trait]
pub trait ProtocolFunction: Send + Sync {
    async fn call(&self, args: Vec<String>, replier: ProtocolReplier);
}

/// A parsed `launcherProtocol.<function>(<args>)` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolCall {
    pub function: String,
    pub args: Vec<String>,
}

impl ProtocolCall {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let rest = line.strip_prefix(PROTOCOL_PREFIX)?;
        let open = rest.find('(')?;
        let body = rest[open + 1..].strip_suffix(')')?;
        let function = &rest[..open];
        if function.is_empty() {
            return None;
        }
        Some(Self {
            function: function.to_string(),
            args: split_arguments(body),
        })
    }
}

/// Split protocol arguments: `"double quoted"`, `'single quoted'` or bare
/// whitespace-separated tokens.
fn split_arguments(body: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' || c == '\'' {
            chars.next();
            let content_start = start + c.len_utf8();
            match body[content_start..].find(c) {
                Some(len) if len > 0 => {
                    args.push(body[content_start..content_start + len].trim().to_string());
                    let end = content_start + len;
                    while chars.peek().is_some_and(|&(i, _)| i <= end) {
                        chars.next();
                    }
                    continue;
                }
                _ => {}
            }
        }

        let mut end = body.len();
        while let Some(&(i, ch)) = chars.peek() {
            if ch.is_whitespace() {
                end = i;
                break;
            }
            chars.next();
        }
        args.push(body[start..end].to_string());
    }

    args
}

/// Dispatches protocol lines to registered functions.
#[derive(Default, Clone)]
pub struct ProtocolHandler {
    functions: HashMap<String, Arc<dyn ProtocolFunction>>,
}

impl ProtocolHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, function: Arc<dyn ProtocolFunction>) {
        self.functions.insert(name.into(), function);
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Claim `line` if it calls a registered function. The call runs on its
    /// own task so a slow function never blocks the output readers.
    pub fn handle(&self, line: &str, replier: &ProtocolReplier) -> bool {
        let Some(call) = ProtocolCall::parse(line) else {
            return false;
        };
        let Some(function) = self.functions.get(&call.function).cloned() else {
            warn!("Game called unknown launcher function {}", call.function);
            return false;
        };

        debug!("Protocol call {}({:?})", call.function, call.args);
        let replier = replier.clone();
        tokio::spawn(async move {
            function.call(call.args, replier).await;
        });
        true
    }
}
