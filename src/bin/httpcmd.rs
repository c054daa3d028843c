// src/bin/httpcmd.rs

//! HTTP command worker binary.
//!
//! Launched by the orchestrator with a single argument: a serialized
//! request spec JSON object (`{url, method, contentType, params}`). Trace
//! lines go to stderr, control messages to stdout, cookie replies arrive
//! on stdin. See `cmdrelay::worker` for the request/redirect loop.

use anyhow::{Context, Result};

use cmdrelay::protocol::RequestSpec;
use cmdrelay::worker;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
    // A timed-out cookie reply leaves a blocked stdin read behind, and
    // runtime teardown would wait on it for as long as the parent keeps
    // the pipe open. Exit directly instead.
    std::process::exit(0);
}

async fn run() -> Result<()> {
    let arg = std::env::args()
        .nth(1)
        .context("missing request spec argument")?;
    let spec: RequestSpec =
        serde_json::from_str(&arg).context("parsing request spec argument")?;
    worker::run(spec).await
}
