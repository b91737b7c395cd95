//! Error types for the release pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building, staging or publishing a release.
#[derive(Error, Debug)]
pub enum ShipError {
    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed.
    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Failure while processing one platform.
    #[error("platform {platform}: {source}")]
    Platform {
        platform: String,
        #[source]
        source: Box<ShipError>,
    },

    /// The build tool could not be started at all.
    #[error("failed to start {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The build tool ran and exited non-zero.
    #[error("build exited with {} for {}", exit_label(.exit_code), .args.join(" "))]
    BuildFailed {
        args: Vec<String>,
        exit_code: Option<i32>,
    },

    /// Malformed length-delimited event frame.
    #[error("corrupt build event stream at record {record} (offset {offset}): {reason}")]
    CorruptStream {
        record: usize,
        offset: usize,
        reason: String,
    },

    /// The event stream held no target-completed event.
    #[error("no completion event in build event stream for {}", .args.join(" "))]
    NoCompletionEvent { args: Vec<String> },

    /// The target completed but reported failure.
    #[error("the invocation failed to complete successfully: {}", .args.join(" "))]
    BuildNotSuccessful { args: Vec<String> },

    /// Artifact reference with a scheme other than `file://`.
    #[error("copying non-file URIs is not supported: {uri:?}")]
    UnsupportedArtifactScheme { uri: String },

    /// Filesystem failure while staging an artifact.
    #[error("failed to stage {artifact} to {}: {source}", .destination.display())]
    StageFailed {
        artifact: String,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A release field required for publishing is empty.
    #[error("--{field} is required when publishing a release")]
    MissingReleaseField { field: &'static str },

    /// Release notes file could not be read.
    #[error("failed to read release notes {}: {source}", .path.display())]
    NotesUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote answered 404 on release creation.
    #[error(
        "release creation for {owner}/{repo} returned 404; this may be an authentication \
         error (missing push access) or a nonexistent repository: {body}"
    )]
    AuthOrNotFound {
        owner: String,
        repo: String,
        body: String,
    },

    /// Remote answered 422 on release creation.
    #[error(
        "release creation for tag {tag} failed validation (422); does the release already \
         exist, or is the commit missing at the remote? {body}"
    )]
    ValidationFailed { tag: String, body: String },

    /// Any other unsuccessful release creation.
    #[error("release creation failed (status {status}): {body}")]
    CreateFailed { status: u16, body: String },

    /// The remote assigned an id that is not positive.
    #[error("release creation returned an invalid id {id}")]
    InvalidReleaseId { id: i64 },

    /// Asset name already present on the release.
    #[error("upload of asset {asset} returned 422 (the asset was probably already uploaded)")]
    DuplicateAsset { asset: String },

    /// Any other unsuccessful upload.
    #[error("upload of asset {asset} failed (status {status}): {body}")]
    UploadFailed {
        asset: String,
        status: u16,
        body: String,
    },

    /// Local asset could not be read for upload.
    #[error("failed to read asset {}: {source}", .path.display())]
    AssetUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An upload task panicked or was aborted.
    #[error("upload task for asset {asset} did not finish: {detail}")]
    UploadTask { asset: String, detail: String },

    /// One or more uploads failed; carries the first failure seen.
    #[error("{failed} of {total} asset uploads failed; first error: {first}")]
    UploadsFailed {
        failed: usize,
        total: usize,
        #[source]
        first: Box<ShipError>,
    },

    /// Transport failure talking to the release host.
    #[error("{context}: {source}")]
    Host {
        context: String,
        #[source]
        source: HostError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

impl ShipError {
    /// Attach the platform that was being processed.
    pub fn for_platform(self, platform: &str) -> Self {
        ShipError::Platform {
            platform: platform.to_string(),
            source: Box::new(self),
        }
    }
}

/// Transport-level errors raised by a [`crate::host::ReleaseHost`].
#[derive(Error, Debug)]
pub enum HostError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Transport(String),

    /// A response arrived but its body could not be read.
    #[error("unreadable response body: {0}")]
    Body(String),
}

/// Result type for release pipeline operations
pub type Result<T> = std::result::Result<T, ShipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_wrapper_names_platform() {
        let err = ShipError::BuildNotSuccessful {
            args: vec!["build".to_string(), "//cmd:tool".to_string()],
        }
        .for_platform("linux_amd64");

        let msg = err.to_string();
        assert!(msg.starts_with("platform linux_amd64:"), "{msg}");
        assert!(msg.contains("//cmd:tool"));
    }

    #[test]
    fn test_build_failed_reports_signal() {
        let err = ShipError::BuildFailed {
            args: vec!["build".to_string()],
            exit_code: None,
        };
        assert!(err.to_string().contains("a signal"));
    }

    #[test]
    fn test_uploads_failed_surfaces_first_error() {
        let err = ShipError::UploadsFailed {
            failed: 1,
            total: 3,
            first: Box::new(ShipError::DuplicateAsset {
                asset: "tool-linux".to_string(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("1 of 3"));
        assert!(msg.contains("tool-linux"));
    }
}
