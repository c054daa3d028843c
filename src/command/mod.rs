// src/command/mod.rs

//! Command execution layer.
//!
//! A command is either a local executable ([`cli::CliExecutor`]) or a remote
//! HTTP endpoint ([`http::HttpExecutor`]), invoked through one uniform
//! interface. The variant is resolved once from the descriptor at
//! construction time and never re-inspected.
//!
//! [`Commands`] is the factory over a whole config file; it owns the shared
//! [`CookieJar`] and injects it into every HTTP executor so that all workers
//! launched from this process exchange cookies through one store.

pub mod cli;
pub mod http;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::config::model::ConfigFile;
use crate::cookies::CookieJar;
use crate::errors::CommandError;
use crate::logger::SharedFileLogger;
use crate::protocol::ContentType;

pub use cli::CliExecutor;
pub use http::{HttpExecutor, HttpHandle};

/// The orchestrator-owned cookie store, shared across HTTP executors.
pub type SharedCookieJar = Arc<Mutex<CookieJar>>;

/// Resolved command descriptor: a tagged variant, fixed at construction.
#[derive(Debug, Clone)]
pub enum CommandDescriptor {
    Cli(CliDescriptor),
    Http(HttpDescriptor),
}

/// Configuration for a local executable command.
#[derive(Debug, Clone, Default)]
pub struct CliDescriptor {
    pub bin: Option<String>,
    /// Script/tool resolved against the configured search paths and exposed
    /// to arg templates as `%CLI%`.
    pub cli: Option<String>,
    /// Argument templates; when `None`, the defaults from
    /// [`ExecutorOptions::default_args`] apply.
    pub args: Option<Vec<String>>,
    pub values: BTreeMap<String, String>,
}

/// Configuration for an HTTP endpoint command.
#[derive(Debug, Clone)]
pub struct HttpDescriptor {
    pub url: String,
    pub method: String,
    pub content_type: ContentType,
    /// Default data, merged under call-time parameters (call-time wins).
    pub data: BTreeMap<String, String>,
}

/// Options applied when instantiating executors.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Search paths for resolving `cli` entries.
    pub paths: Vec<PathBuf>,
    /// Fallback argument templates for CLI commands without their own.
    pub default_args: Vec<String>,
    /// Override for the `httpcmd` worker binary location.
    pub worker_binary: Option<PathBuf>,
    /// Optional rotating file log that receives worker trace lines.
    pub trace_log: Option<SharedFileLogger>,
}

/// A single executable command, ready for repeated `exec` calls.
pub enum Command {
    Cli(CliExecutor),
    Http(HttpExecutor),
}

impl Command {
    pub fn from_descriptor(
        descriptor: CommandDescriptor,
        options: &ExecutorOptions,
        jar: SharedCookieJar,
    ) -> Self {
        match descriptor {
            CommandDescriptor::Cli(desc) => Command::Cli(CliExecutor::new(desc, options)),
            CommandDescriptor::Http(desc) => Command::Http(HttpExecutor::new(desc, options, jar)),
        }
    }

    /// Execute with call-time parameters. Returns immediately with a handle;
    /// completion is observed through the handle, never awaited here.
    pub fn exec(
        &self,
        parameters: &BTreeMap<String, String>,
    ) -> Result<CommandHandle, CommandError> {
        match self {
            Command::Cli(executor) => executor.exec(parameters).map(CommandHandle::Process),
            Command::Http(executor) => executor.exec(parameters).map(CommandHandle::Http),
        }
    }

    /// Human-readable identity for logs and error messages.
    pub fn id(&self) -> String {
        match self {
            Command::Cli(executor) => executor.id().to_string(),
            Command::Http(executor) => executor.id().to_string(),
        }
    }
}

/// What `exec` hands back: a raw child process for CLI commands, or an
/// [`HttpHandle`] that delivers the worker's result message.
pub enum CommandHandle {
    Process(tokio::process::Child),
    Http(HttpHandle),
}

/// Factory over a validated config file.
pub struct Commands {
    commands: BTreeMap<String, Command>,
    jar: SharedCookieJar,
}

impl Commands {
    /// Build one executor per `[command.<name>]` section. The jar starts
    /// empty and lives as long as this value.
    pub fn from_config(cfg: &ConfigFile, options: ExecutorOptions) -> Result<Self> {
        let jar: SharedCookieJar = Arc::new(Mutex::new(CookieJar::new()));
        let mut commands = BTreeMap::new();
        for (name, config) in &cfg.command {
            let descriptor = config.resolve(name)?;
            commands.insert(
                name.clone(),
                Command::from_descriptor(descriptor, &options, jar.clone()),
            );
        }
        Ok(Self { commands, jar })
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Handle to the shared jar, mainly for inspection.
    pub fn jar(&self) -> SharedCookieJar {
        self.jar.clone()
    }
}
