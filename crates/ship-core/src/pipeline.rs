//! Release pipeline orchestration.
//!
//! Platforms are built strictly one after another: every invocation uses the
//! build tool's workspace exclusively. The first failing platform aborts the
//! run, so a release never ships a partial platform set. Publishing happens
//! once, after all platforms, and only when a tag is configured.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::completion::extract_completion;
use crate::config::ShipConfig;
use crate::driver::BuildInvoker;
use crate::error::{Result, ShipError};
use crate::host::ReleaseHost;
use crate::publish::{PublishOutcome, ReleasePublisher, ReleaseSettings};
use crate::stage::{AssetStager, StagedAsset};

/// What a pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Every staged asset, grouped by platform in build order.
    pub staged: Vec<StagedAsset>,
    /// `None` when no tag was configured or nothing was staged.
    pub publish: Option<PublishOutcome>,
}

/// Builds, stages and publishes a target across platforms.
pub struct ReleasePipeline {
    invoker: Arc<dyn BuildInvoker>,
    stager: AssetStager,
    publisher: ReleasePublisher,
    platforms: Vec<String>,
    release: ReleaseSettings,
}

impl ReleasePipeline {
    pub fn new(
        invoker: Arc<dyn BuildInvoker>,
        stager: AssetStager,
        publisher: ReleasePublisher,
        platforms: Vec<String>,
        release: ReleaseSettings,
    ) -> Self {
        Self {
            invoker,
            stager,
            publisher,
            platforms,
            release,
        }
    }

    /// Wire a pipeline from configuration.
    pub fn from_config(
        config: &ShipConfig,
        invoker: Arc<dyn BuildInvoker>,
        host: Arc<dyn ReleaseHost>,
    ) -> Self {
        let stager = AssetStager::new(
            config.asset_dir.clone(),
            config.tag(),
            config.platform_names(),
        );
        Self::new(
            invoker,
            stager,
            ReleasePublisher::new(host),
            config.platforms.clone(),
            config.release_settings(),
        )
    }

    /// Run the pipeline for `target`.
    #[instrument(skip(self), fields(platforms = self.platforms.len()))]
    pub async fn run(&self, target: &str) -> Result<PipelineReport> {
        if !self.platforms.is_empty() && target.trim().is_empty() {
            return Err(ShipError::Config(
                "a build target is required when platforms are configured".to_string(),
            ));
        }

        let mut staged = Vec::new();
        for platform in &self.platforms {
            let assets = self
                .build_platform(target, platform)
                .await
                .map_err(|e| e.for_platform(platform))?;
            staged.extend(assets);
        }

        let publish = if self.release.tag.is_empty() {
            info!(staged = staged.len(), "no tag configured, skipping publish");
            None
        } else if staged.is_empty() {
            warn!(tag = %self.release.tag, "nothing staged, skipping publish");
            None
        } else {
            Some(self.publisher.publish(&self.release, &staged).await?)
        };

        Ok(PipelineReport { staged, publish })
    }

    async fn build_platform(&self, target: &str, platform: &str) -> Result<Vec<StagedAsset>> {
        info!(target = %target, platform = %platform, "building platform");
        let invocation = self.invoker.invoke(target, platform).await?;
        let completion = extract_completion(&invocation.events, &invocation.args)?;
        self.stager.stage(platform, &completion.artifacts).await
    }
}
