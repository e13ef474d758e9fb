//! Wire shapes for the agent's request/response envelope. The real
//! transport (QUIC-framed RPC per spec §4.E) is out of scope here; this
//! is the length-prefixed JSON-over-Unix-socket stand-in described in
//! the supplemented-features section, carrying the same method/params
//! shape a production transport would dispatch into `ServiceFacade`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub bearer_token: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { result: Value },
    Error { code: String, message: String },
}

impl Response {
    pub fn ok(result: Value) -> Self {
        Response::Ok { result }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchParams {
    pub branch_name: String,
    pub template_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBranchParams {
    pub branch_name: String,
    pub template_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListBranchesParams {
    #[serde(default)]
    pub template_name: Option<String>,
}
