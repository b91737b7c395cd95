//! Remote release hosting seam.
//!
//! A [`ReleaseHost`] performs the two remote calls the publisher needs and
//! reports the raw outcome: HTTP status, response body and any id the
//! remote assigned. Classifying that outcome is the publisher's job, so
//! implementations only return `Err` when no response was obtained.
//! Implementations arrive already authenticated.

use async_trait::async_trait;

use crate::error::HostError;
use crate::publish::{ReleaseRecord, ReleaseRequest};

/// HTTP `201 Created`.
pub const STATUS_CREATED: u16 = 201;
/// HTTP `404 Not Found`.
pub const STATUS_NOT_FOUND: u16 = 404;
/// HTTP `422 Unprocessable Entity`.
pub const STATUS_UNPROCESSABLE: u16 = 422;

/// Raw response to a release creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReleaseResponse {
    pub status: u16,
    /// Release id, when the body carried one.
    pub id: Option<i64>,
    pub body: String,
}

/// Raw response to an asset upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAssetResponse {
    pub status: u16,
    /// Remote asset id, when the body carried one.
    pub asset_id: Option<i64>,
    pub body: String,
}

/// A service that stores releases and their assets.
#[async_trait]
pub trait ReleaseHost: Send + Sync {
    /// Create a release for `request.tag` at `request.commit`.
    async fn create_release(
        &self,
        request: &ReleaseRequest,
    ) -> Result<CreateReleaseResponse, HostError>;

    /// Upload `contents` to `release` under `name`.
    async fn upload_asset(
        &self,
        release: &ReleaseRecord,
        name: &str,
        contents: Vec<u8>,
    ) -> Result<UploadAssetResponse, HostError>;
}
