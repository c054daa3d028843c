// src/command/http.rs

//! Orchestrator side of the HTTP command path.
//!
//! `exec` launches one `httpcmd` worker process per call and wires three
//! independent channels:
//!
//! - worker stderr: human trace lines, relayed to `tracing` (and optionally
//!   a rotating file log), never machine-parsed;
//! - worker stdout: control messages — cookie `request`/`response` and the
//!   single terminal `result`;
//! - worker stdin: best-effort cookie replies back to the worker.
//!
//! Each worker's conversation is independent; the shared jar is the only
//! state that crosses workers, and only this side mutates it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::{ExecutorOptions, HttpDescriptor, SharedCookieJar};
use crate::errors::CommandError;
use crate::logger::SharedFileLogger;
use crate::protocol::{ContentType, CookieReply, RequestSpec, WorkerMessage};
use crate::util;

/// Worker binary name; expected next to the current executable unless
/// overridden via options or the `CMDRELAY_HTTPCMD` environment variable.
const WORKER_BIN: &str = if cfg!(windows) { "httpcmd.exe" } else { "httpcmd" };

pub struct HttpExecutor {
    url: String,
    method: String,
    content_type: ContentType,
    defaults: BTreeMap<String, String>,
    jar: SharedCookieJar,
    worker_binary: PathBuf,
    trace_log: Option<SharedFileLogger>,
}

impl HttpExecutor {
    pub fn new(descriptor: HttpDescriptor, options: &ExecutorOptions, jar: SharedCookieJar) -> Self {
        let worker_binary = options
            .worker_binary
            .clone()
            .unwrap_or_else(default_worker_binary);
        Self {
            url: descriptor.url,
            method: descriptor.method,
            content_type: descriptor.content_type,
            defaults: descriptor.data,
            jar,
            worker_binary,
            trace_log: options.trace_log.clone(),
        }
    }

    /// Launch a worker for one logical request.
    ///
    /// Returns the handle immediately; the result (raw body, or decoded JSON
    /// for `application/json` responses) arrives through the handle exactly
    /// once. Worker exit without a result means the execution failed — no
    /// retry is attempted here.
    pub fn exec(&self, parameters: &BTreeMap<String, String>) -> Result<HttpHandle, CommandError> {
        let mut params = self.defaults.clone();
        for (key, value) in parameters {
            params.insert(key.clone(), value.clone());
        }

        let spec = RequestSpec {
            url: self.url.clone(),
            method: self.method.to_uppercase(),
            content_type: self.content_type,
            params,
        };
        let payload = serde_json::to_string(&spec)?;

        info!(url = %spec.url, method = %spec.method, "launching HTTP command worker");

        let mut child = Command::new(&self.worker_binary)
            .arg(payload)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::SpawnFailure {
                id: self.url.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Bounded to 1: the worker sends at most one result message.
        let (result_tx, result_rx) = mpsc::channel::<Value>(1);

        if let Some(stdout) = stdout {
            tokio::spawn(relay_control_messages(
                stdout,
                stdin,
                self.jar.clone(),
                result_tx,
            ));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(relay_trace_lines(stderr, self.trace_log.clone()));
        }

        let url = self.url.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(url = %url, %status, "HTTP command worker exited"),
                Err(err) => warn!(url = %url, error = %err, "waiting for HTTP command worker"),
            }
        });

        Ok(HttpHandle { result_rx })
    }

    pub fn id(&self) -> &str {
        &self.url
    }
}

/// Caller-side handle for one in-flight HTTP command.
#[derive(Debug)]
pub struct HttpHandle {
    result_rx: mpsc::Receiver<Value>,
}

impl HttpHandle {
    /// Wait for the worker's single result message.
    ///
    /// `None` means the worker exited without delivering a result — the
    /// sole failure signal for transport errors and dead-end redirects.
    /// Timeout/retry policy is the caller's to apply on top.
    pub async fn result(mut self) -> Option<Value> {
        self.result_rx.recv().await
    }
}

/// Locate the worker binary: explicit env override, then a sibling of the
/// current executable, then a bare name resolved through `PATH`.
fn default_worker_binary() -> PathBuf {
    if let Ok(path) = std::env::var("CMDRELAY_HTTPCMD") {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(WORKER_BIN)))
        .unwrap_or_else(|| PathBuf::from(WORKER_BIN))
}

/// Consume one worker's control channel until it closes.
///
/// Jar reads and writes happen here, serialized per message; across workers
/// the jar lock is the only coordination point.
async fn relay_control_messages(
    stdout: ChildStdout,
    mut stdin: Option<ChildStdin>,
    jar: SharedCookieJar,
    result_tx: mpsc::Sender<Value>,
) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let message: WorkerMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, line = %line, "unparseable control message from worker");
                continue;
            }
        };

        match message {
            WorkerMessage::Request { domain, path } => {
                let cookie = jar.lock().await.cookie_for(&domain, &path);
                debug!(domain = %domain, path = %path, found = cookie.is_some(), "worker cookie request");
                // Only reply when the jar has something; silence within the
                // worker's fixed wait means "no cookies known".
                if let (Some(cookie), Some(writer)) = (cookie, stdin.as_mut()) {
                    let reply = CookieReply {
                        headers: BTreeMap::new(),
                        cookie: Some(cookie),
                    };
                    if let Err(err) = send_reply(writer, &reply).await {
                        warn!(error = %err, "failed to send cookie reply to worker");
                    }
                }
                // The worker asks once, on the first hop. Closing stdin
                // here unblocks its reply read so it can exit on its own.
                stdin = None;
            }
            WorkerMessage::Response { domain, cookie } => {
                debug!(domain = %domain, paths = cookie.len(), "merging worker cookies into jar");
                jar.lock().await.merge(&domain, cookie);
            }
            WorkerMessage::Result { payload } => {
                if result_tx.send(payload).await.is_err() {
                    debug!("result receiver dropped before worker finished");
                }
            }
        }
    }
    // Channel closed: worker exited. If no result was sent, the handle's
    // receiver closes empty and the caller sees the failure.
}

async fn send_reply(writer: &mut ChildStdin, reply: &CookieReply) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(reply)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Relay the worker's human trace lines to tracing and, when configured,
/// to the rotating file log.
async fn relay_trace_lines(stderr: ChildStderr, trace_log: Option<SharedFileLogger>) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = util::clean_eol(&line);
        info!(target: "httpcmd", "{line}");
        if let Some(log) = &trace_log {
            if let Err(err) = log.lock().await.log(line) {
                warn!(error = %err, "failed to write worker trace line to log file");
            }
        }
    }
}
