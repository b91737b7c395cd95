//! Ship Core - multi-platform release pipeline
//!
//! Builds one target for several platforms and publishes the outputs:
//! - `driver`: runs `bazel build` per platform and collects its event stream
//! - `bes`: decodes the length-delimited Build Event Protocol stream
//! - `completion`: finds the target-completed event and its outputs
//! - `stage`: copies outputs into a tag- and platform-qualified layout
//! - `publish`: creates the remote release and uploads assets concurrently
//! - `pipeline`: ties the stages together, one platform at a time

pub mod admission;
pub mod bes;
pub mod completion;
pub mod config;
pub mod driver;
pub mod error;
pub mod fakes;
pub mod host;
pub mod pipeline;
pub mod publish;
pub mod stage;
pub mod telemetry;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use bes::{decode_stream, encode_stream, ArtifactRef, Event, TargetCompletion};
pub use completion::{extract_completion, first_target_complete};
pub use config::{BazelSettings, GithubEndpoints, ReleaseConfig, ShipConfig};
pub use driver::{BazelDriver, BuildInvoker, Invocation};
pub use error::{HostError, Result, ShipError};
pub use host::{CreateReleaseResponse, ReleaseHost, UploadAssetResponse};
pub use pipeline::{PipelineReport, ReleasePipeline};
pub use publish::{
    PublishOutcome, ReleasePublisher, ReleaseRecord, ReleaseRequest, ReleaseSettings,
    UploadOutcome, UploadReport, UploadedAsset,
};
pub use stage::{AssetStager, PlatformNames, StagedAsset};

/// Ship core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
