// src/config/model.rs

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::command::{CliDescriptor, CommandDescriptor, HttpDescriptor};
use crate::protocol::ContentType;

/// Top-level configuration as read from a TOML file:
///
/// ```toml
/// [default]
/// paths = ["/usr/local/bin"]
/// args = ["--quiet"]
///
/// [command.notify]
/// bin = "notify-send"
/// args = ["%TITLE%", "%MESSAGE%"]
///
/// [command.submit]
/// url = "http://localhost:8080/api/submit"
/// method = "post"
/// content-type = "json"
/// data = { origin = "gateway" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Shared defaults from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All commands from `[command.<name>]`, keyed by command name.
    #[serde(default)]
    pub command: BTreeMap<String, CommandConfig>,
}

/// `[default]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultSection {
    /// Search paths used to resolve `cli` entries.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Fallback argument templates for CLI commands without `args`.
    #[serde(default)]
    pub args: Vec<String>,
}

/// `[command.<name>]` section.
///
/// A command is either CLI-shaped (`bin` and/or `cli`) or HTTP-shaped
/// (`url`); [`CommandConfig::resolve`] turns it into a tagged descriptor
/// exactly once and rejects ambiguous sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandConfig {
    /// HTTP endpoint URL.
    pub url: Option<String>,

    /// HTTP method; defaults to `GET`, normalized to upper-case later.
    pub method: Option<String>,

    /// Body encoding for the HTTP path.
    #[serde(default, rename = "content-type")]
    pub content_type: Option<ContentType>,

    /// Default data for the HTTP path, merged under call-time parameters.
    #[serde(default)]
    pub data: BTreeMap<String, String>,

    /// Binary to spawn for the CLI path.
    pub bin: Option<String>,

    /// Script/tool resolved against `default.paths`, exposed as `%CLI%`.
    pub cli: Option<String>,

    /// Argument templates for the CLI path.
    #[serde(default)]
    pub args: Option<Vec<String>>,

    /// Predefined template values for the CLI path.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl CommandConfig {
    pub fn is_http(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_cli(&self) -> bool {
        self.bin.is_some() || self.cli.is_some()
    }

    /// Resolve into a [`CommandDescriptor`].
    pub fn resolve(&self, name: &str) -> Result<CommandDescriptor> {
        match (self.is_http(), self.is_cli()) {
            (true, false) => Ok(CommandDescriptor::Http(HttpDescriptor {
                url: self.url.clone().unwrap_or_default(),
                method: self.method.clone().unwrap_or_else(|| "GET".to_string()),
                content_type: self.content_type.unwrap_or_default(),
                data: self.data.clone(),
            })),
            (false, true) => Ok(CommandDescriptor::Cli(CliDescriptor {
                bin: self.bin.clone(),
                cli: self.cli.clone(),
                args: self.args.clone(),
                values: self.values.clone(),
            })),
            (true, true) => Err(anyhow!(
                "command '{name}' mixes HTTP (`url`) and CLI (`bin`/`cli`) settings"
            )),
            (false, false) => Err(anyhow!(
                "command '{name}' must define either `url` or `bin`/`cli`"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_command_resolves_with_defaults() {
        let cfg: CommandConfig =
            toml::from_str(r#"url = "http://localhost:8080/api""#).unwrap();
        match cfg.resolve("submit").unwrap() {
            CommandDescriptor::Http(http) => {
                assert_eq!(http.url, "http://localhost:8080/api");
                assert_eq!(http.method, "GET");
                assert_eq!(http.content_type, ContentType::FormUrlencoded);
            }
            other => panic!("expected HTTP descriptor, got {other:?}"),
        }
    }

    #[test]
    fn cli_command_resolves_with_args() {
        let cfg: CommandConfig = toml::from_str(
            r#"
            bin = "notify-send"
            args = ["%TITLE%", "%MESSAGE%"]
            "#,
        )
        .unwrap();
        match cfg.resolve("notify").unwrap() {
            CommandDescriptor::Cli(cli) => {
                assert_eq!(cli.bin.as_deref(), Some("notify-send"));
                assert_eq!(cli.args.as_deref(), Some(&["%TITLE%".to_string(), "%MESSAGE%".to_string()][..]));
            }
            other => panic!("expected CLI descriptor, got {other:?}"),
        }
    }

    #[test]
    fn mixed_command_is_rejected() {
        let cfg: CommandConfig = toml::from_str(
            r#"
            url = "http://localhost/api"
            bin = "curl"
            "#,
        )
        .unwrap();
        assert!(cfg.resolve("mixed").is_err());
    }

    #[test]
    fn empty_command_is_rejected() {
        let cfg = CommandConfig::default();
        assert!(cfg.resolve("empty").is_err());
    }

    #[test]
    fn content_type_parses_from_kebab_case() {
        let cfg: CommandConfig = toml::from_str(
            r#"
            url = "http://localhost/api"
            content-type = "json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.content_type, Some(ContentType::Json));
    }
}
