// src/worker/mod.rs

//! The HTTP command worker: a short-lived child process owning one logical
//! HTTP request, including redirect following and cookie bookkeeping.
//!
//! Lifecycle:
//!
//! 1. Emit `URL:` / `METHOD:` / `DATA:` trace lines on stderr.
//! 2. Cookie rendezvous (first hop only): send a `request` control message
//!    and wait up to [`COOKIE_REPLY_WAIT`] for an optional [`CookieReply`]
//!    on stdin. No reply means "no cookies known".
//! 3. Send the request. `301`/`302` with a `Location` header replaces the
//!    URL, clears the merged cookie header and loops; without `Location`
//!    the worker logs and exits with no result. Any other status is the
//!    terminal response.
//! 4. `Set-Cookie` headers on *every* hop are grouped by path and reported
//!    with a fire-and-forget `response` message.
//! 5. The terminal body is streamed into one buffer, traced (`STATUS:` /
//!    `HEADERS:` / `BODY:`), decoded as JSON iff the content type starts
//!    with `application/json`, and sent as the single `result` message.
//!
//! Transport errors are logged and terminate the worker without a result;
//! the orchestrator sees only "process exited with no result".

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Method, Url};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;

use crate::cookies::group_set_cookies;
use crate::protocol::{ContentType, CookieReply, RequestSpec, WorkerMessage};

/// How long the worker waits for the orchestrator's cookie reply.
///
/// A tunable constant, not an acknowledgement: proceeding without a reply
/// after this delay is an accepted race.
pub const COOKIE_REPLY_WAIT: Duration = Duration::from_millis(250);

/// Entry point for the `httpcmd` binary: run the request described by
/// `spec`, talking to the orchestrator over the process's stdin/stdout.
pub async fn run(spec: RequestSpec) -> Result<()> {
    let stdout = tokio::io::stdout();
    let stdin = BufReader::new(tokio::io::stdin());
    Worker::new(spec)?.run(stdout, stdin).await
}

/// State owned exclusively by one worker. Never shared.
struct Worker {
    url: Url,
    method: Method,
    content_type: ContentType,
    /// Encoded once per logical request; resent on every hop.
    body: Option<String>,
    /// Base headers (origin/referer plus any orchestrator-provided extras).
    headers: BTreeMap<String, String>,
    /// Cookie header merged for the current hop; cleared on redirect since
    /// it may not apply to the new origin.
    cookie: Option<String>,
}

impl Worker {
    fn new(spec: RequestSpec) -> Result<Self> {
        let url = Url::parse(&spec.url).with_context(|| format!("parsing URL '{}'", spec.url))?;
        let method = Method::from_bytes(spec.method.to_uppercase().as_bytes())
            .with_context(|| format!("invalid HTTP method '{}'", spec.method))?;
        let body = encode_body(spec.content_type, &spec.params)?;

        let mut headers = BTreeMap::new();
        headers.insert("origin".to_string(), url.origin().ascii_serialization());
        headers.insert("referer".to_string(), url.as_str().to_string());

        Ok(Self {
            url,
            method,
            content_type: spec.content_type,
            body,
            headers,
            cookie: None,
        })
    }

    async fn run<W, R>(mut self, mut control_out: W, mut control_in: R) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        R: AsyncBufRead + Unpin,
    {
        eprintln!("URL: {}", self.url);
        eprintln!("METHOD: {}", self.method);
        eprintln!("DATA: {}", self.body.as_deref().unwrap_or(""));

        self.cookie_rendezvous(&mut control_out, &mut control_in)
            .await?;

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("building HTTP client")?;

        loop {
            let request = self.build_request(&client);
            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    eprintln!("Error: {err}");
                    return Ok(());
                }
            };

            self.report_cookies(&mut control_out, response.headers())
                .await?;

            let status = response.status().as_u16();
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            match hop_decision(status, location.as_deref()) {
                HopDecision::Follow(location) => {
                    self.url = self
                        .url
                        .join(&location)
                        .with_context(|| format!("following redirect to '{location}'"))?;
                    self.cookie = None;
                    // Redirect bodies are discarded unread.
                }
                HopDecision::MissingLocation => {
                    eprintln!("Error: {status} response without a location header");
                    return Ok(());
                }
                HopDecision::Done => {
                    return self.finish(&mut control_out, response).await;
                }
            }
        }
    }

    /// First-hop rendezvous: name our domain/path to the orchestrator and
    /// give it a bounded window to inject jar cookies and extra headers.
    async fn cookie_rendezvous<W, R>(&mut self, control_out: &mut W, control_in: &mut R) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        R: AsyncBufRead + Unpin,
    {
        let message = WorkerMessage::Request {
            domain: self.domain(),
            path: self.url.path().to_string(),
        };
        send_message(control_out, &message).await?;

        let mut line = String::new();
        match timeout(COOKIE_REPLY_WAIT, control_in.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => match serde_json::from_str::<CookieReply>(line.trim()) {
                Ok(reply) => {
                    self.headers.extend(reply.headers);
                    self.cookie = reply.cookie;
                }
                Err(err) => eprintln!("Error: invalid cookie reply: {err}"),
            },
            // Channel closed, read error, or timeout: proceed cookieless.
            _ => {}
        }
        Ok(())
    }

    fn build_request(&self, client: &Client) -> reqwest::RequestBuilder {
        let mut request = client.request(self.method.clone(), self.url.clone());
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie.as_str());
        }
        if let Some(body) = &self.body {
            request = request
                .header(header::CONTENT_TYPE, self.content_type.mime())
                .header(header::CONTENT_LENGTH, body.len())
                .body(body.clone());
        }
        request
    }

    /// Report any `Set-Cookie` headers outward. Runs on every hop
    /// regardless of status; expects no reply.
    async fn report_cookies<W>(&self, control_out: &mut W, headers: &HeaderMap) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let values = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok());
        let grouped = group_set_cookies(values);
        if grouped.is_empty() {
            return Ok(());
        }
        let message = WorkerMessage::Response {
            domain: self.domain(),
            cookie: grouped,
        };
        send_message(control_out, &message).await
    }

    /// Terminal hop: stream the body, trace it, decode JSON when the
    /// content type says so, and deliver the single result message.
    async fn finish<W>(&self, control_out: &mut W, mut response: reqwest::Response) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let mut body: Vec<u8> = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    return Ok(());
                }
            }
        }

        eprintln!("STATUS: {status}");
        eprintln!("HEADERS: {}", serde_json::to_string(&headers_as_map(&headers))?);
        let text = String::from_utf8_lossy(&body);
        eprintln!("BODY: {text}");

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let payload = if is_json(content_type) {
            match serde_json::from_slice(&body) {
                Ok(value) => value,
                Err(err) => {
                    eprintln!("Error: invalid JSON body: {err}");
                    return Ok(());
                }
            }
        } else {
            Value::String(text.into_owned())
        };

        send_message(control_out, &WorkerMessage::Result { payload }).await
    }

    fn domain(&self) -> String {
        self.url.host_str().unwrap_or_default().to_string()
    }
}

/// What to do after one hop's response headers are in.
#[derive(Debug, PartialEq, Eq)]
enum HopDecision {
    Follow(String),
    MissingLocation,
    Done,
}

/// Only `301` and `302` trigger redirect handling; no other 3xx code is
/// followed.
fn hop_decision(status: u16, location: Option<&str>) -> HopDecision {
    if status == 301 || status == 302 {
        match location {
            Some(location) => HopDecision::Follow(location.to_string()),
            None => HopDecision::MissingLocation,
        }
    } else {
        HopDecision::Done
    }
}

/// Encode the request parameters into a body, once per logical request.
fn encode_body(content_type: ContentType, params: &BTreeMap<String, String>) -> Result<Option<String>> {
    if params.is_empty() {
        return Ok(None);
    }
    let body = match content_type {
        ContentType::FormUrlencoded => {
            serde_urlencoded::to_string(params).context("form-encoding request params")?
        }
        ContentType::Json => serde_json::to_string(params)?,
    };
    Ok(Some(body))
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("application/json"))
}

/// Flatten response headers for the `HEADERS:` trace line. Repeated header
/// names are comma-joined.
fn headers_as_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

async fn send_message<W>(out: &mut W, message: &WorkerMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    out.write_all(line.as_bytes())
        .await
        .context("writing control message")?;
    out.flush().await.context("flushing control channel")?;
    Ok(())
}
