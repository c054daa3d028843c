// src/config/validate.rs

use anyhow::{anyhow, Context, Result};

use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one command
/// - every command resolves to exactly one shape (CLI or HTTP)
/// - HTTP URLs parse and use an http(s) scheme
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_commands(cfg)?;
    for (name, command) in cfg.command.iter() {
        let _ = command.resolve(name)?;
        if let Some(url) = &command.url {
            validate_url(name, url)?;
        }
    }
    Ok(())
}

fn ensure_has_commands(cfg: &ConfigFile) -> Result<()> {
    if cfg.command.is_empty() {
        return Err(anyhow!(
            "config must contain at least one [command.<name>] section"
        ));
    }
    Ok(())
}

fn validate_url(name: &str, url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .with_context(|| format!("command '{name}' has an invalid url '{url}'"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!(
            "command '{name}' has unsupported URL scheme '{other}' (expected http or https)"
        )),
    }
}
