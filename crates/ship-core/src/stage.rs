//! Staging build outputs into the distribution directory.
//!
//! Each artifact is copied to `<dist>/<basename>[-<tag>]-<platform name>`.
//! The copy is streamed through a SHA-256 hasher so the staged asset records
//! the digest of exactly the bytes written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, instrument, warn};

use crate::bes::ArtifactRef;
use crate::error::{Result, ShipError};

/// Directory used when no distribution directory is configured.
pub const DEFAULT_DIST_DIR: &str = "dist";

const FILE_SCHEME: &str = "file://";
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Preferred display names for platform ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformNames {
    names: HashMap<String, String>,
}

impl PlatformNames {
    /// Parse `PLATFORM=NAME` entries. Malformed entries are skipped.
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = HashMap::new();
        for entry in entries {
            let entry = entry.as_ref();
            match entry.split_once('=') {
                Some((platform, name))
                    if !platform.is_empty() && !name.is_empty() && !name.contains('=') =>
                {
                    names.insert(platform.to_string(), name.to_string());
                }
                _ => warn!(entry = %entry, "malformed platform name mapping"),
            }
        }
        Self { names }
    }

    /// Display name for `platform`, or the id itself when unmapped.
    pub fn display_name<'a>(&'a self, platform: &'a str) -> &'a str {
        self.names.get(platform).map(String::as_str).unwrap_or(platform)
    }
}

/// An artifact copied into the distribution directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    pub path: PathBuf,
    /// Platform id the artifact was built for.
    pub platform: String,
    /// Hex SHA-256 of the staged bytes.
    pub sha256: String,
}

impl StagedAsset {
    /// Base file name, used as the remote asset name.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Copies build outputs into a tag-qualified, platform-named layout.
#[derive(Debug, Clone)]
pub struct AssetStager {
    dist_dir: PathBuf,
    tag: Option<String>,
    names: PlatformNames,
}

impl AssetStager {
    /// An empty `dist_dir` falls back to [`DEFAULT_DIST_DIR`]; an empty tag
    /// is treated as no tag.
    pub fn new(dist_dir: impl Into<PathBuf>, tag: Option<String>, names: PlatformNames) -> Self {
        let dist_dir = dist_dir.into();
        let dist_dir = if dist_dir.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_DIST_DIR)
        } else {
            dist_dir
        };
        Self {
            dist_dir,
            tag: tag.filter(|t| !t.is_empty()),
            names,
        }
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Staged file name for an artifact basename on `platform`.
    pub fn staged_name(&self, basename: &str, platform: &str) -> String {
        let mut name = basename.to_string();
        if let Some(tag) = &self.tag {
            name.push('-');
            name.push_str(tag);
        }
        name.push('-');
        name.push_str(self.names.display_name(platform));
        name
    }

    /// Stage every artifact of one platform, in order.
    ///
    /// Stops at the first failure. Files staged before the failure are left
    /// in place.
    #[instrument(skip(self, artifacts), fields(count = artifacts.len()))]
    pub async fn stage(&self, platform: &str, artifacts: &[ArtifactRef]) -> Result<Vec<StagedAsset>> {
        let mut staged = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            staged.push(self.stage_one(platform, artifact).await?);
        }
        Ok(staged)
    }

    async fn stage_one(&self, platform: &str, artifact: &ArtifactRef) -> Result<StagedAsset> {
        let source = local_path(&artifact.uri)?;
        let stage_err = |destination: PathBuf| {
            let artifact = artifact.name.clone();
            move |source: std::io::Error| ShipError::StageFailed {
                artifact,
                destination,
                source,
            }
        };

        let basename = source.file_name().ok_or_else(|| {
            stage_err(self.dist_dir.clone())(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("artifact URI {} names no file", artifact.uri),
            ))
        })?;
        let destination = self
            .dist_dir
            .join(self.staged_name(&basename.to_string_lossy(), platform));

        tokio::fs::create_dir_all(&self.dist_dir)
            .await
            .map_err(stage_err(self.dist_dir.clone()))?;
        let sha256 = copy_with_digest(&source, &destination)
            .await
            .map_err(stage_err(destination.clone()))?;

        info!(
            artifact = %artifact.name,
            platform = %platform,
            destination = %destination.display(),
            sha256 = %sha256,
            "staged artifact"
        );

        Ok(StagedAsset {
            path: destination,
            platform: platform.to_string(),
            sha256,
        })
    }
}

/// Local path named by a `file://` URI.
pub fn local_path(uri: &str) -> Result<PathBuf> {
    uri.strip_prefix(FILE_SCHEME)
        .map(PathBuf::from)
        .ok_or_else(|| ShipError::UnsupportedArtifactScheme {
            uri: uri.to_string(),
        })
}

/// Copy `source` to `destination` and return the hex SHA-256 of the bytes.
///
/// Both handles are dropped on every return path.
async fn copy_with_digest(source: &Path, destination: &Path) -> std::io::Result<String> {
    let mut reader = File::open(source).await?;
    let mut writer = File::create(destination).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n]).await?;
    }
    writer.flush().await?;

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> PlatformNames {
        PlatformNames::parse(["linux_amd64=linux-x86_64", "windows_amd64=windows-x86_64"])
    }

    #[test]
    fn test_platform_names_fall_back_to_id() {
        let names = names();
        assert_eq!(names.display_name("linux_amd64"), "linux-x86_64");
        assert_eq!(names.display_name("freebsd_amd64"), "freebsd_amd64");
    }

    #[test]
    fn test_malformed_mappings_are_skipped() {
        let names = PlatformNames::parse(["no-equals", "a=b=c", "=x", "y=", "ok=fine"]);
        assert_eq!(names.display_name("a"), "a");
        assert_eq!(names.display_name("y"), "y");
        assert_eq!(names.display_name("ok"), "fine");
    }

    #[test]
    fn test_staged_name_with_and_without_tag() {
        let tagged = AssetStager::new("dist", Some("1.2.0".to_string()), names());
        assert_eq!(tagged.staged_name("tool", "linux_amd64"), "tool-1.2.0-linux-x86_64");

        let untagged = AssetStager::new("dist", None, names());
        assert_eq!(untagged.staged_name("tool", "linux_amd64"), "tool-linux-x86_64");

        let empty_tag = AssetStager::new("dist", Some(String::new()), names());
        assert_eq!(empty_tag.staged_name("tool", "linux_amd64"), "tool-linux-x86_64");
    }

    #[test]
    fn test_empty_dist_dir_defaults() {
        let stager = AssetStager::new("", None, PlatformNames::default());
        assert_eq!(stager.dist_dir(), Path::new(DEFAULT_DIST_DIR));
    }

    #[test]
    fn test_local_path_requires_file_scheme() {
        assert_eq!(local_path("file:///out/tool").unwrap(), PathBuf::from("/out/tool"));
        assert!(matches!(
            local_path("http://example/x"),
            Err(ShipError::UnsupportedArtifactScheme { .. })
        ));
    }

    #[tokio::test]
    async fn test_stage_copies_bytes_and_digest() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("tool");
        let contents: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&source, &contents).unwrap();

        let dist = out_dir.path().join("nested").join("dist");
        let stager = AssetStager::new(&dist, Some("1.2.0".to_string()), names());
        let artifact = ArtifactRef::new(format!("file://{}", source.display()), "tool");

        let staged = stager.stage("linux_amd64", &[artifact]).await.unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].path, dist.join("tool-1.2.0-linux-x86_64"));
        assert_eq!(staged[0].file_name(), "tool-1.2.0-linux-x86_64");
        assert_eq!(staged[0].platform, "linux_amd64");
        assert_eq!(std::fs::read(&staged[0].path).unwrap(), contents);
        assert_eq!(staged[0].sha256, hex::encode(Sha256::digest(&contents)));
    }

    #[tokio::test]
    async fn test_unsupported_scheme_writes_nothing() {
        let out_dir = tempfile::tempdir().unwrap();
        let dist = out_dir.path().join("dist");
        let stager = AssetStager::new(&dist, None, names());

        let err = stager
            .stage("linux_amd64", &[ArtifactRef::new("http://example/x", "x")])
            .await
            .unwrap_err();

        assert!(matches!(err, ShipError::UnsupportedArtifactScheme { .. }));
        assert!(!dist.exists(), "no directory should be created");
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_copies() {
        let src_dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let good = src_dir.path().join("good");
        std::fs::write(&good, b"ok").unwrap();
        let missing = src_dir.path().join("missing");

        let dist = out_dir.path().join("dist");
        let stager = AssetStager::new(&dist, None, PlatformNames::default());
        let artifacts = vec![
            ArtifactRef::new(format!("file://{}", good.display()), "good"),
            ArtifactRef::new(format!("file://{}", missing.display()), "missing"),
        ];

        let err = stager.stage("linux_amd64", &artifacts).await.unwrap_err();
        match err {
            ShipError::StageFailed { artifact, .. } => assert_eq!(artifact, "missing"),
            other => panic!("expected StageFailed, got {other:?}"),
        }
        assert!(dist.join("good-linux_amd64").exists());
    }
}
