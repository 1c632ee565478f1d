use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single captured request, alive only for the duration of its handler.
#[derive(Debug)]
pub struct InboundEvent {
    pub id: String,
    pub received_at: DateTime<Local>,
    pub method: String,
    pub path: String,
    pub headers: Map<String, Value>,
    pub payload: Payload,
}

/// Best-effort interpretation of a request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Form(BTreeMap<String, String>),
    Text(String),
}

impl Payload {
    /// Human-readable rendering used in the printed record.
    pub fn pretty(&self) -> String {
        match self {
            Payload::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Payload::Form(fields) => {
                serde_json::to_string_pretty(fields).unwrap_or_else(|_| format!("{fields:?}"))
            }
            Payload::Text(text) => text.clone(),
        }
    }

    /// Verbatim serialization handed to the relay template.
    pub fn raw(&self) -> String {
        match self {
            Payload::Json(value) => value.to_string(),
            Payload::Form(fields) => {
                serde_json::to_string(fields).unwrap_or_else(|_| format!("{fields:?}"))
            }
            Payload::Text(text) => text.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Json(_) => "json",
            Payload::Form(_) => "form",
            Payload::Text(_) => "text",
        }
    }
}

/// Body of the outbound conversation-creation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayRequest {
    pub initial_user_msg: String,
    pub repository: String,
    pub selected_branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub conversation_id: String,
    pub status: String,
}
