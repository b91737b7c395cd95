//! In-memory fakes for the pipeline seams (testing only)
//!
//! Provides `MemoryReleaseHost`, a scriptable [`ReleaseHost`] that records
//! every call, and `StaticInvoker`, a [`BuildInvoker`] that replays canned
//! event streams per platform.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::bes::Event;
use crate::driver::{BuildInvoker, Invocation};
use crate::error::{HostError, Result, ShipError};
use crate::host::{CreateReleaseResponse, ReleaseHost, UploadAssetResponse, STATUS_CREATED};
use crate::publish::{ReleaseRecord, ReleaseRequest};

// ---------------------------------------------------------------------------
// MemoryReleaseHost
// ---------------------------------------------------------------------------

/// A call received by [`MemoryReleaseHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    CreateRelease { tag: String, commit: String },
    UploadAsset { release_id: i64, name: String, size: usize },
}

/// In-memory release host with scripted responses.
///
/// Release creation answers `201` with the configured id unless a status is
/// scripted. Uploads answer `201` unless the asset name has a scripted
/// status or transport failure. Every upload sleeps for the configured
/// delay while counted as in flight.
#[derive(Debug)]
pub struct MemoryReleaseHost {
    create_status: u16,
    release_id: i64,
    upload_statuses: HashMap<String, u16>,
    upload_transport_errors: Vec<String>,
    upload_delay: Duration,
    calls: Mutex<Vec<HostCall>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    next_asset_id: AtomicI64,
}

impl Default for MemoryReleaseHost {
    fn default() -> Self {
        Self {
            create_status: STATUS_CREATED,
            release_id: 1,
            upload_statuses: HashMap::new(),
            upload_transport_errors: Vec::new(),
            upload_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            next_asset_id: AtomicI64::new(100),
        }
    }
}

impl MemoryReleaseHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_status(mut self, status: u16) -> Self {
        self.create_status = status;
        self
    }

    pub fn with_release_id(mut self, id: i64) -> Self {
        self.release_id = id;
        self
    }

    pub fn with_upload_status(mut self, name: &str, status: u16) -> Self {
        self.upload_statuses.insert(name.to_string(), status);
        self
    }

    pub fn with_upload_transport_error(mut self, name: &str) -> Self {
        self.upload_transport_errors.push(name.to_string());
        self
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, HostCall::CreateRelease { .. }))
            .count()
    }

    /// Names of attempted uploads, in arrival order.
    pub fn upload_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::UploadAsset { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Most uploads observed inside `upload_asset` at once.
    pub fn peak_uploads(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    fn record(&self, call: HostCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl ReleaseHost for MemoryReleaseHost {
    async fn create_release(
        &self,
        request: &ReleaseRequest,
    ) -> std::result::Result<CreateReleaseResponse, HostError> {
        self.record(HostCall::CreateRelease {
            tag: request.tag.clone(),
            commit: request.commit.clone(),
        });
        let created = self.create_status == STATUS_CREATED;
        Ok(CreateReleaseResponse {
            status: self.create_status,
            id: created.then_some(self.release_id),
            body: if created {
                format!("{{\"id\":{}}}", self.release_id)
            } else {
                "{\"message\":\"scripted failure\"}".to_string()
            },
        })
    }

    async fn upload_asset(
        &self,
        release: &ReleaseRecord,
        name: &str,
        contents: Vec<u8>,
    ) -> std::result::Result<UploadAssetResponse, HostError> {
        self.record(HostCall::UploadAsset {
            release_id: release.id,
            name: name.to_string(),
            size: contents.len(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::AcqRel);

        if self.upload_transport_errors.iter().any(|n| n == name) {
            return Err(HostError::Transport("connection reset".to_string()));
        }

        let status = self
            .upload_statuses
            .get(name)
            .copied()
            .unwrap_or(STATUS_CREATED);
        let asset_id =
            (status == STATUS_CREATED).then(|| self.next_asset_id.fetch_add(1, Ordering::AcqRel));
        Ok(UploadAssetResponse {
            status,
            asset_id,
            body: String::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// StaticInvoker
// ---------------------------------------------------------------------------

/// Build invoker that replays scripted event streams per platform.
///
/// Platforms without a script fail as if the build tool exited with 1.
#[derive(Debug, Default)]
pub struct StaticInvoker {
    streams: HashMap<String, Vec<Event>>,
    invoked: Mutex<Vec<String>>,
}

impl StaticInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, platform: &str, events: Vec<Event>) -> Self {
        self.streams.insert(platform.to_string(), events);
        self
    }

    /// Platforms invoked so far, in order.
    pub fn invoked(&self) -> Vec<String> {
        self.invoked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl BuildInvoker for StaticInvoker {
    async fn invoke(&self, target: &str, platform: &str) -> Result<Invocation> {
        self.invoked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(platform.to_string());

        let args = vec![
            "build".to_string(),
            "--platforms".to_string(),
            platform.to_string(),
            target.to_string(),
        ];
        match self.streams.get(platform) {
            Some(events) => Ok(Invocation {
                args,
                events: events.clone(),
            }),
            None => Err(ShipError::BuildFailed {
                args,
                exit_code: Some(1),
            }),
        }
    }
}
