// src/command/cli.rs

//! Local executable commands: argument templating plus a direct process
//! spawn. No protocol state, in contrast to the HTTP path.

use std::collections::BTreeMap;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::command::{CliDescriptor, ExecutorOptions};
use crate::errors::CommandError;
use crate::util;

pub struct CliExecutor {
    bin: Option<String>,
    args: Option<Vec<String>>,
    default_args: Vec<String>,
    values: BTreeMap<String, String>,
}

impl CliExecutor {
    pub fn new(descriptor: CliDescriptor, options: &ExecutorOptions) -> Self {
        let mut values = descriptor.values;
        if let Some(cli) = &descriptor.cli {
            let resolved = util::find_cli(cli, &options.paths);
            values.insert("CLI".to_string(), resolved.to_string_lossy().into_owned());
        }
        Self {
            bin: descriptor.bin,
            args: descriptor.args,
            default_args: options.default_args.clone(),
            values,
        }
    }

    /// Merge descriptor values with call-time parameters (call-time wins),
    /// substitute them into the argument templates and spawn the binary
    /// with piped stdout/stderr.
    pub fn exec(&self, parameters: &BTreeMap<String, String>) -> Result<Child, CommandError> {
        let bin = self
            .bin
            .as_ref()
            .ok_or_else(|| CommandError::MissingBinary(self.id().to_string()))?;

        let mut values = self.values.clone();
        for (key, value) in parameters {
            values.insert(key.clone(), value.clone());
        }

        let templates = self.args.as_ref().unwrap_or(&self.default_args);
        let args: Vec<String> = templates
            .iter()
            .map(|template| util::trans(template, &values))
            .collect();

        debug!(bin = %bin, ?args, "spawning CLI command");

        Command::new(bin)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::SpawnFailure {
                id: self.id().to_string(),
                source,
            })
    }

    pub fn id(&self) -> &str {
        self.values
            .get("CLI")
            .map(String::as_str)
            .or(self.bin.as_deref())
            .unwrap_or("<cli>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(bin: Option<&str>, args: Option<Vec<&str>>) -> CliDescriptor {
        CliDescriptor {
            bin: bin.map(str::to_string),
            cli: None,
            args: args.map(|a| a.into_iter().map(str::to_string).collect()),
            values: BTreeMap::new(),
        }
    }

    #[test]
    fn exec_without_binary_fails() {
        let executor = CliExecutor::new(descriptor(None, None), &ExecutorOptions::default());
        let err = executor.exec(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, CommandError::MissingBinary(_)));
    }

    #[test]
    fn id_prefers_resolved_cli_over_bin() {
        let desc = CliDescriptor {
            bin: Some("php".into()),
            cli: Some("tool.php".into()),
            args: None,
            values: BTreeMap::new(),
        };
        let executor = CliExecutor::new(desc, &ExecutorOptions::default());
        assert_eq!(executor.id(), "tool.php");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exec_templates_args_with_call_time_parameters() {
        use tokio::io::AsyncReadExt;

        let executor = CliExecutor::new(
            descriptor(Some("sh"), Some(vec!["-c", "echo %MSG%"])),
            &ExecutorOptions::default(),
        );

        let mut params = BTreeMap::new();
        params.insert("MSG".to_string(), "hello".to_string());

        let mut child = executor.exec(&params).unwrap();
        let mut stdout = child.stdout.take().unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());

        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }
}
