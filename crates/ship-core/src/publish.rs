//! Release publishing.
//!
//! Publishing runs in a fixed order:
//! 1. validate the release fields and read the notes file,
//! 2. stop early on dry runs,
//! 3. create the remote release (any failure here stops publishing),
//! 4. upload every staged asset concurrently, bounded by an
//!    [`AdmissionGate`], and wait for all uploads before reporting.
//!
//! Failed uploads neither cancel their siblings nor get retried; the first
//! failure observed is surfaced once every task has finished.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::admission::AdmissionGate;
use crate::error::{Result, ShipError};
use crate::host::{
    CreateReleaseResponse, ReleaseHost, UploadAssetResponse, STATUS_CREATED, STATUS_NOT_FOUND,
    STATUS_UNPROCESSABLE,
};
use crate::stage::StagedAsset;

/// Default number of uploads allowed in flight at once.
pub const DEFAULT_MAX_UPLOADS: usize = 5;

/// Release fields as configured, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSettings {
    pub owner: String,
    pub repo: String,
    pub tag: String,
    pub commit: String,
    /// Path of a markdown file used as the release body.
    pub notes_path: PathBuf,
    pub dry_run: bool,
    pub max_uploads: usize,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            tag: String::new(),
            commit: String::new(),
            notes_path: PathBuf::from("RELEASE.md"),
            dry_run: false,
            max_uploads: DEFAULT_MAX_UPLOADS,
        }
    }
}

impl ReleaseSettings {
    /// Check required fields and read the release notes.
    pub async fn prepare(&self) -> Result<ReleaseRequest> {
        for (field, value) in [
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("tag", &self.tag),
            ("commit", &self.commit),
        ] {
            if value.trim().is_empty() {
                return Err(ShipError::MissingReleaseField { field });
            }
        }
        if self.max_uploads == 0 {
            return Err(ShipError::Config(
                "max_uploads must be at least 1".to_string(),
            ));
        }

        let notes = tokio::fs::read_to_string(&self.notes_path)
            .await
            .map_err(|source| ShipError::NotesUnreadable {
                path: self.notes_path.clone(),
                source,
            })?;

        Ok(ReleaseRequest {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            tag: self.tag.clone(),
            commit: self.commit.clone(),
            notes,
            dry_run: self.dry_run,
        })
    }
}

/// A validated request to create a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub owner: String,
    pub repo: String,
    pub tag: String,
    pub commit: String,
    /// Release notes text.
    pub notes: String,
    pub dry_run: bool,
}

/// A release that exists on the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    /// Remote-assigned id, always positive.
    pub id: i64,
    pub request: ReleaseRequest,
}

impl ReleaseRecord {
    pub fn tag(&self) -> &str {
        &self.request.tag
    }
}

/// An asset that reached the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub name: String,
    pub asset_id: Option<i64>,
}

/// Result of one upload task.
#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded(UploadedAsset),
    Failed { asset: String, error: ShipError },
}

/// Summary of a successful upload phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Uploaded assets, in completion order.
    pub uploaded: Vec<UploadedAsset>,
    /// Wall time of the whole upload phase.
    pub elapsed: Duration,
    /// Most uploads observed in flight at once.
    pub peak_in_flight: usize,
}

/// How a publish call ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Release created and every asset uploaded.
    Published {
        release: ReleaseRecord,
        report: UploadReport,
    },
    /// Dry run: validation passed and nothing was sent.
    DryRunStop { request: ReleaseRequest },
}

/// Creates releases and uploads their assets through a [`ReleaseHost`].
#[derive(Clone)]
pub struct ReleasePublisher {
    host: Arc<dyn ReleaseHost>,
}

impl ReleasePublisher {
    pub fn new(host: Arc<dyn ReleaseHost>) -> Self {
        Self { host }
    }

    /// Publish `assets` as the release described by `settings`.
    #[instrument(skip_all, fields(tag = %settings.tag, assets = assets.len()))]
    pub async fn publish(
        &self,
        settings: &ReleaseSettings,
        assets: &[StagedAsset],
    ) -> Result<PublishOutcome> {
        let request = settings.prepare().await?;

        if request.dry_run {
            info!("dry run: release creation skipped");
            return Ok(PublishOutcome::DryRunStop { request });
        }

        info!(owner = %request.owner, repo = %request.repo, "creating release");
        let release = self.create_release(request).await?;
        let report = self
            .upload_assets(&release, assets, settings.max_uploads)
            .await?;

        Ok(PublishOutcome::Published { release, report })
    }

    /// Create the remote release and classify the response.
    pub async fn create_release(&self, request: ReleaseRequest) -> Result<ReleaseRecord> {
        let response = self
            .host
            .create_release(&request)
            .await
            .map_err(|source| ShipError::Host {
                context: format!("creating release {}", request.tag),
                source,
            })?;
        classify_create(request, response)
    }

    /// Upload every asset with at most `max_in_flight` uploads at once.
    pub async fn upload_assets(
        &self,
        release: &ReleaseRecord,
        assets: &[StagedAsset],
        max_in_flight: usize,
    ) -> Result<UploadReport> {
        if max_in_flight == 0 {
            return Err(ShipError::Config(
                "max_uploads must be at least 1".to_string(),
            ));
        }

        let start = Instant::now();
        let gate = AdmissionGate::new(max_in_flight);
        let release = Arc::new(release.clone());
        let outcomes: Arc<Mutex<Vec<UploadOutcome>>> =
            Arc::new(Mutex::new(Vec::with_capacity(assets.len())));

        let tasks = assets.iter().cloned().map(|asset| {
            let host = Arc::clone(&self.host);
            let gate = gate.clone();
            let release = Arc::clone(&release);
            let outcomes = Arc::clone(&outcomes);
            let name = asset.file_name();

            let handle = tokio::spawn(async move {
                let outcome = upload_one(host.as_ref(), &gate, &release, &asset).await;
                outcomes.lock().await.push(outcome);
            });
            async move { (name, handle.await) }
        });

        for (asset, joined) in join_all(tasks).await {
            if let Err(e) = joined {
                outcomes.lock().await.push(UploadOutcome::Failed {
                    asset: asset.clone(),
                    error: ShipError::UploadTask {
                        asset,
                        detail: e.to_string(),
                    },
                });
            }
        }

        let elapsed = start.elapsed();
        let peak_in_flight = gate.peak();
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            peak_in_flight,
            total = assets.len(),
            "upload phase finished"
        );

        let outcomes = std::mem::take(&mut *outcomes.lock().await);
        let total = outcomes.len();
        let mut uploaded = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                UploadOutcome::Uploaded(asset) => uploaded.push(asset),
                UploadOutcome::Failed { asset, error } => {
                    warn!(asset = %asset, error = %error, "asset upload failed");
                    failures.push(error);
                }
            }
        }

        let failed = failures.len();
        if let Some(first) = failures.into_iter().next() {
            return Err(ShipError::UploadsFailed {
                failed,
                total,
                first: Box::new(first),
            });
        }

        Ok(UploadReport {
            uploaded,
            elapsed,
            peak_in_flight,
        })
    }
}

async fn upload_one(
    host: &dyn ReleaseHost,
    gate: &AdmissionGate,
    release: &ReleaseRecord,
    asset: &StagedAsset,
) -> UploadOutcome {
    let name = asset.file_name();
    match try_upload(host, gate, release, asset, &name).await {
        Ok(asset_id) => {
            info!(asset = %name, "uploaded asset");
            UploadOutcome::Uploaded(UploadedAsset { name, asset_id })
        }
        Err(error) => UploadOutcome::Failed { asset: name, error },
    }
}

async fn try_upload(
    host: &dyn ReleaseHost,
    gate: &AdmissionGate,
    release: &ReleaseRecord,
    asset: &StagedAsset,
    name: &str,
) -> Result<Option<i64>> {
    let _permit = gate.acquire().await.map_err(|e| ShipError::UploadTask {
        asset: name.to_string(),
        detail: e.to_string(),
    })?;

    info!(asset = %name, "uploading asset");
    let contents = tokio::fs::read(&asset.path)
        .await
        .map_err(|source| ShipError::AssetUnreadable {
            path: asset.path.clone(),
            source,
        })?;

    let response = host
        .upload_asset(release, name, contents)
        .await
        .map_err(|source| ShipError::Host {
            context: format!("uploading asset {name}"),
            source,
        })?;
    classify_upload(name, response)
}

/// Map a creation response to a release record or a classified error.
pub fn classify_create(
    request: ReleaseRequest,
    response: CreateReleaseResponse,
) -> Result<ReleaseRecord> {
    match response.status {
        STATUS_CREATED => match response.id {
            Some(id) if id > 0 => Ok(ReleaseRecord { id, request }),
            Some(id) => Err(ShipError::InvalidReleaseId { id }),
            None => Err(ShipError::CreateFailed {
                status: response.status,
                body: format!("response carried no release id: {}", response.body),
            }),
        },
        STATUS_NOT_FOUND => Err(ShipError::AuthOrNotFound {
            owner: request.owner,
            repo: request.repo,
            body: response.body,
        }),
        STATUS_UNPROCESSABLE => Err(ShipError::ValidationFailed {
            tag: request.tag,
            body: response.body,
        }),
        status => Err(ShipError::CreateFailed {
            status,
            body: response.body,
        }),
    }
}

/// Map an upload response to the remote asset id or a classified error.
pub fn classify_upload(name: &str, response: UploadAssetResponse) -> Result<Option<i64>> {
    match response.status {
        STATUS_CREATED => Ok(response.asset_id),
        STATUS_UNPROCESSABLE => Err(ShipError::DuplicateAsset {
            asset: name.to_string(),
        }),
        status => Err(ShipError::UploadFailed {
            asset: name.to_string(),
            status,
            body: response.body,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReleaseRequest {
        ReleaseRequest {
            owner: "acme".to_string(),
            repo: "tool".to_string(),
            tag: "1.2.0".to_string(),
            commit: "abc123".to_string(),
            notes: "notes".to_string(),
            dry_run: false,
        }
    }

    fn created(status: u16, id: Option<i64>) -> CreateReleaseResponse {
        CreateReleaseResponse {
            status,
            id,
            body: "{}".to_string(),
        }
    }

    #[test]
    fn test_classify_create() {
        let record = classify_create(request(), created(201, Some(7))).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.tag(), "1.2.0");

        assert!(matches!(
            classify_create(request(), created(404, None)),
            Err(ShipError::AuthOrNotFound { .. })
        ));
        assert!(matches!(
            classify_create(request(), created(422, None)),
            Err(ShipError::ValidationFailed { .. })
        ));
        assert!(matches!(
            classify_create(request(), created(500, None)),
            Err(ShipError::CreateFailed { status: 500, .. })
        ));
        assert!(matches!(
            classify_create(request(), created(200, Some(7))),
            Err(ShipError::CreateFailed { status: 200, .. })
        ));
    }

    #[test]
    fn test_non_positive_release_id_is_rejected() {
        for id in [0, -3] {
            assert!(matches!(
                classify_create(request(), created(201, Some(id))),
                Err(ShipError::InvalidReleaseId { .. })
            ));
        }
        assert!(matches!(
            classify_create(request(), created(201, None)),
            Err(ShipError::CreateFailed { status: 201, .. })
        ));
    }

    #[test]
    fn test_classify_upload() {
        let response = |status| UploadAssetResponse {
            status,
            asset_id: Some(11),
            body: "body".to_string(),
        };
        assert_eq!(classify_upload("a", response(201)).unwrap(), Some(11));
        assert!(matches!(
            classify_upload("a", response(422)),
            Err(ShipError::DuplicateAsset { .. })
        ));
        assert!(matches!(
            classify_upload("a", response(502)),
            Err(ShipError::UploadFailed { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_prepare_names_first_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("RELEASE.md");
        std::fs::write(&notes, "# 1.2.0").unwrap();

        let mut settings = ReleaseSettings {
            owner: "acme".to_string(),
            repo: "tool".to_string(),
            tag: "1.2.0".to_string(),
            commit: String::new(),
            notes_path: notes,
            ..ReleaseSettings::default()
        };
        match settings.prepare().await.unwrap_err() {
            ShipError::MissingReleaseField { field } => assert_eq!(field, "commit"),
            other => panic!("expected MissingReleaseField, got {other:?}"),
        }

        settings.commit = "abc123".to_string();
        let request = settings.prepare().await.unwrap();
        assert_eq!(request.notes, "# 1.2.0");
    }

    #[tokio::test]
    async fn test_prepare_rejects_unreadable_notes() {
        let settings = ReleaseSettings {
            owner: "acme".to_string(),
            repo: "tool".to_string(),
            tag: "1.2.0".to_string(),
            commit: "abc123".to_string(),
            notes_path: PathBuf::from("/nonexistent/RELEASE.md"),
            ..ReleaseSettings::default()
        };
        assert!(matches!(
            settings.prepare().await,
            Err(ShipError::NotesUnreadable { .. })
        ));
    }
}
