//! Pipeline configuration.
//!
//! Loaded from a TOML file; every field has a default so a partial file
//! (or none at all) is valid. Command-line flags are layered on top by the
//! binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, ShipError};
use crate::publish::{ReleaseSettings, DEFAULT_MAX_UPLOADS};
use crate::stage::PlatformNames;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ship.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShipConfig {
    pub bazel: BazelSettings,
    /// Platform ids to build, in order.
    pub platforms: Vec<String>,
    /// `PLATFORM=NAME` display-name overrides.
    pub platform_names: Vec<String>,
    /// Where staged assets are assembled.
    pub asset_dir: PathBuf,
    pub release: ReleaseConfig,
    pub github: GithubEndpoints,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            bazel: BazelSettings::default(),
            platforms: vec![
                "linux_amd64".to_string(),
                "windows_amd64".to_string(),
                "darwin_amd64".to_string(),
            ],
            platform_names: vec![
                "linux_amd64=linux-x86_64".to_string(),
                "windows_amd64=windows-x86_64".to_string(),
                "darwin_amd64=darwin-x86_64".to_string(),
            ],
            asset_dir: PathBuf::from(".assets"),
            release: ReleaseConfig::default(),
            github: GithubEndpoints::default(),
        }
    }
}

impl ShipConfig {
    /// Load `path`, or return the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|source| ShipError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn platform_names(&self) -> PlatformNames {
        PlatformNames::parse(&self.platform_names)
    }

    /// Tag to qualify staged names with, if any.
    pub fn tag(&self) -> Option<String> {
        Some(self.release.tag.clone()).filter(|t| !t.is_empty())
    }

    pub fn release_settings(&self) -> ReleaseSettings {
        ReleaseSettings {
            owner: self.release.owner.clone(),
            repo: self.release.repo.clone(),
            tag: self.release.tag.clone(),
            commit: self.release.commit.clone(),
            notes_path: self.release.notes.clone(),
            dry_run: self.release.dry_run,
            max_uploads: self.release.max_uploads,
        }
    }
}

/// How the build tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BazelSettings {
    /// Build tool executable.
    pub program: PathBuf,
    /// Startup options placed before the `build` command.
    pub startup_args: Vec<String>,
    /// Prefix the platform id is appended to for `--platforms`.
    pub platform_prefix: String,
    /// Directory for temporary event files.
    pub event_dir: PathBuf,
    /// Extra flags for every `build`.
    pub extra_args: Vec<String>,
}

impl Default for BazelSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("bazel"),
            startup_args: Vec::new(),
            platform_prefix: "@io_bazel_rules_go//go/toolchain:".to_string(),
            event_dir: std::env::temp_dir(),
            extra_args: Vec::new(),
        }
    }
}

/// Release fields as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub owner: String,
    pub repo: String,
    /// Release tag; publishing only happens when set.
    pub tag: String,
    pub commit: String,
    /// Release notes markdown file.
    pub notes: PathBuf,
    pub dry_run: bool,
    pub max_uploads: usize,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            tag: String::new(),
            commit: String::new(),
            notes: PathBuf::from("RELEASE.md"),
            dry_run: false,
            max_uploads: DEFAULT_MAX_UPLOADS,
        }
    }
}

/// GitHub API base URLs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GithubEndpoints {
    pub api_url: String,
    pub upload_url: String,
}

impl Default for GithubEndpoints {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            upload_url: "https://uploads.github.com".to_string(),
        }
    }
}
