// src/lib.rs

//! `cmdrelay` — invoke named commands (local executables or remote HTTP
//! endpoints) through one uniform interface.
//!
//! HTTP commands run in a dedicated worker process (`httpcmd`) that follows
//! `301`/`302` redirects and synchronizes cookies with the parent over a
//! line-based control channel; see [`worker`] and [`command::http`].

pub mod cli;
pub mod command;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod logger;
pub mod logging;
pub mod protocol;
pub mod text;
pub mod util;
pub mod worker;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::cli::CliArgs;
use crate::command::{CommandHandle, Commands, ExecutorOptions};
use crate::config::load_and_validate;
use crate::logger::FileLogger;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, builds the command set, executes the
/// requested command and reports its outcome: HTTP results are printed as
/// JSON, CLI output is streamed through.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    let trace_log = match &args.log_file {
        Some(path) => Some(Arc::new(tokio::sync::Mutex::new(
            FileLogger::open(path)?.with_tag("httpcmd"),
        ))),
        None => None,
    };

    let options = ExecutorOptions {
        paths: cfg.default.paths.iter().map(PathBuf::from).collect(),
        default_args: cfg.default.args.clone(),
        worker_binary: None,
        trace_log,
    };
    let commands = Commands::from_config(&cfg, options)?;

    let command = commands
        .get(&args.command)
        .ok_or_else(|| anyhow!("unknown command '{}'", args.command))?;
    let parameters = parse_parameters(&args.parameters)?;

    info!(command = %args.command, id = %command.id(), "executing command");

    match command.exec(&parameters)? {
        CommandHandle::Http(handle) => match handle.result().await {
            Some(payload) => {
                println!("{}", serde_json::to_string_pretty(&payload)?);
                Ok(())
            }
            None => Err(anyhow!(
                "command '{}' finished without a result",
                args.command
            )),
        },
        CommandHandle::Process(mut child) => {
            // Drained in parallel with stdout; a full stderr pipe would
            // stall the child.
            let stderr_task = child.stderr.take().map(|stderr| {
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stderr).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        eprintln!("{line}");
                    }
                })
            });
            if let Some(stdout) = child.stdout.take() {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    println!("{line}");
                }
            }
            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for command '{}'", args.command))?;
            if let Some(task) = stderr_task {
                let _ = task.await;
            }
            if status.success() {
                Ok(())
            } else {
                Err(anyhow!(
                    "command '{}' exited with {status}",
                    args.command
                ))
            }
        }
    }
}

/// Parse `key=value` pairs from the command line.
fn parse_parameters(raw: &[String]) -> Result<BTreeMap<String, String>> {
    let mut parameters = BTreeMap::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid parameter '{pair}' (expected key=value)"))?;
        parameters.insert(key.to_string(), value.to_string());
    }
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_parse_key_value_pairs() {
        let parsed =
            parse_parameters(&["a=1".to_string(), "msg=hello=world".to_string()]).unwrap();
        assert_eq!(parsed["a"], "1");
        // Only the first '=' splits.
        assert_eq!(parsed["msg"], "hello=world");
    }

    #[test]
    fn parameters_without_equals_are_rejected() {
        assert!(parse_parameters(&["oops".to_string()]).is_err());
    }
}
