//! Build tool invocation.
//!
//! [`BazelDriver`] runs one `build` per target/platform pair, asks bazel to
//! write its binary event stream to a fresh temporary file, and decodes that
//! file once the process has exited. The temporary file is removed when the
//! invocation returns, whatever the outcome.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, instrument};

use crate::bes::{read_event_file, Event};
use crate::config::BazelSettings;
use crate::error::{Result, ShipError};

/// Flag asking bazel to write its event stream to a file.
pub const EVENT_FILE_FLAG: &str = "--build_event_binary_file";

/// Result of one build invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Arguments passed to the build tool, minus the event file flag.
    pub args: Vec<String>,
    /// Decoded event stream, in stream order.
    pub events: Vec<Event>,
}

/// Something that can build a target for one platform.
#[async_trait]
pub trait BuildInvoker: Send + Sync {
    /// Build `target` for `platform` and return the decoded events.
    async fn invoke(&self, target: &str, platform: &str) -> Result<Invocation>;
}

/// Drives the `bazel` executable.
#[derive(Debug, Clone)]
pub struct BazelDriver {
    program: PathBuf,
    startup_args: Vec<String>,
    platform_prefix: String,
    event_dir: PathBuf,
    extra_args: Vec<String>,
}

impl BazelDriver {
    pub fn new(settings: &BazelSettings) -> Self {
        Self {
            program: settings.program.clone(),
            startup_args: settings.startup_args.clone(),
            platform_prefix: settings.platform_prefix.clone(),
            event_dir: settings.event_dir.clone(),
            extra_args: settings.extra_args.clone(),
        }
    }

    /// Command-line arguments for building `target` on `platform`.
    pub fn build_args(&self, target: &str, platform: &str) -> Vec<String> {
        let mut args = self.startup_args.clone();
        args.push("build".to_string());
        args.push("--platforms".to_string());
        args.push(format!("{}{}", self.platform_prefix, platform));
        args.extend(self.extra_args.iter().cloned());
        args.push(target.to_string());
        args
    }
}

#[async_trait]
impl BuildInvoker for BazelDriver {
    #[instrument(skip(self))]
    async fn invoke(&self, target: &str, platform: &str) -> Result<Invocation> {
        let args = self.build_args(target, platform);

        tokio::fs::create_dir_all(&self.event_dir).await?;
        let event_file = tempfile::Builder::new()
            .prefix("bes-")
            .tempfile_in(&self.event_dir)?
            .into_temp_path();

        info!(
            program = %self.program.display(),
            args = %args.join(" "),
            "invoking build"
        );

        let status = Command::new(&self.program)
            .args(&args)
            .arg(EVENT_FILE_FLAG)
            .arg(&*event_file)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| ShipError::SpawnFailed {
                program: self.program.display().to_string(),
                source,
            })?;

        if !status.success() {
            return Err(ShipError::BuildFailed {
                args,
                exit_code: status.code(),
            });
        }

        let events = read_event_file(&event_file).await?;
        Ok(Invocation { args, events })
    }
}
