// src/protocol.rs

//! Wire types exchanged between the orchestrator and the `httpcmd` worker.
//!
//! The worker is launched with a single argument: a serialized
//! [`RequestSpec`]. From then on the conversation is newline-delimited JSON:
//!
//! - worker stdout → orchestrator: [`WorkerMessage`] lines
//!   (`request` / `response` cookie messages, and exactly one `result` at
//!   the end of a successful run)
//! - orchestrator → worker stdin: at most one [`CookieReply`] line, as the
//!   best-effort answer to a `request` message
//! - worker stderr: human-readable trace lines, never machine-parsed
//!
//! The asymmetry is deliberate: `request` expects a time-bounded optional
//! reply, `response` is fire-and-forget. They are not a unified RPC.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cookies grouped by path: `path -> name -> value`.
pub type CookieMap = BTreeMap<String, BTreeMap<String, String>>;

/// Body encoding for the request parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    #[serde(rename = "form-urlencoded")]
    FormUrlencoded,
    #[serde(rename = "json")]
    Json,
}

impl ContentType {
    /// MIME type sent in the `Content-Type` header.
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::FormUrlencoded => "application/x-www-form-urlencoded",
            ContentType::Json => "application/json",
        }
    }
}

/// The one-shot request handed to a worker at launch.
///
/// `url` is the only field that changes during the worker's lifetime: each
/// followed redirect replaces it. `params` are encoded into a body exactly
/// once and resent on every hop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub url: String,

    /// HTTP method; normalized to upper-case before use.
    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub content_type: ContentType,

    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Control messages sent by the worker over its stdout channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkerMessage {
    /// Ask the orchestrator for cookies scoped to `domain`/`path`.
    ///
    /// The orchestrator may answer with a [`CookieReply`]; no answer within
    /// the worker's fixed wait means "no cookies known".
    Request { domain: String, path: String },

    /// Report cookies learned from `Set-Cookie` headers. Fire-and-forget.
    Response { domain: String, cookie: CookieMap },

    /// The terminal result payload: raw body text, or the decoded JSON value
    /// when the final response was `application/json`. Sent at most once.
    Result { payload: serde_json::Value },
}

/// Optional orchestrator reply to a [`WorkerMessage::Request`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieReply {
    /// Extra headers to merge into the outgoing request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// A ready-to-send `Cookie` header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}
