//! Ship - multi-platform release tool
//!
//! The `ship` command builds one target for several platforms, stages the
//! outputs under tag- and platform-qualified names and publishes them as a
//! GitHub release.
//!
//! ## Commands
//!
//! - `release`: build, stage and (when a tag is given) publish a target

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use ship_core::config::DEFAULT_CONFIG_FILE;
use ship_core::telemetry::init_tracing;
use ship_core::{BazelDriver, PipelineReport, PublishOutcome, ReleasePipeline, ShipConfig};
use ship_github::{GithubClient, GithubConfig};

#[derive(Parser)]
#[command(name = "ship")]
#[command(author = "Ship Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build a target for several platforms and publish a release", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, stage and publish a release
    Release(ReleaseArgs),
}

#[derive(Args, Debug, Default)]
struct ReleaseArgs {
    /// Build target, e.g. //cmd/tool
    target: String,

    /// Config file (missing file means defaults)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Platform to build; repeat for several (replaces the configured list)
    #[arg(short, long = "platform")]
    platforms: Vec<String>,

    /// PLATFORM=NAME display-name override; repeatable
    #[arg(long = "platform-name")]
    platform_names: Vec<String>,

    /// Directory staged assets are copied into
    #[arg(long)]
    asset_dir: Option<PathBuf>,

    /// Repository owner
    #[arg(long)]
    owner: Option<String>,

    /// Repository name
    #[arg(long)]
    repo: Option<String>,

    /// Release tag; publishing is skipped without one
    #[arg(long)]
    tag: Option<String>,

    /// Commit the release tag points at
    #[arg(long)]
    commit: Option<String>,

    /// Release notes file
    #[arg(long)]
    notes: Option<PathBuf>,

    /// Validate the release but do not create it
    #[arg(long)]
    dry_run: bool,

    /// Maximum concurrent asset uploads
    #[arg(long)]
    max_uploads: Option<usize>,

    /// Build tool executable
    #[arg(long)]
    bazel: Option<PathBuf>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl ReleaseArgs {
    /// Layer the flags given on the command line over `config`.
    fn apply(&self, config: &mut ShipConfig) {
        if !self.platforms.is_empty() {
            config.platforms = self.platforms.clone();
        }
        config
            .platform_names
            .extend(self.platform_names.iter().cloned());
        if let Some(dir) = &self.asset_dir {
            config.asset_dir = dir.clone();
        }
        if let Some(program) = &self.bazel {
            config.bazel.program = program.clone();
        }

        let release = &mut config.release;
        if let Some(owner) = &self.owner {
            release.owner = owner.clone();
        }
        if let Some(repo) = &self.repo {
            release.repo = repo.clone();
        }
        if let Some(tag) = &self.tag {
            release.tag = tag.clone();
        }
        if let Some(commit) = &self.commit {
            release.commit = commit.clone();
        }
        if let Some(notes) = &self.notes {
            release.notes = notes.clone();
        }
        if let Some(max) = self.max_uploads {
            release.max_uploads = max;
        }
        release.dry_run |= self.dry_run;
    }

    /// Token to authenticate with, when this run will reach the network.
    fn token_for(&self, config: &ShipConfig) -> Result<Option<String>> {
        let publishes = !config.release.tag.is_empty() && !config.release.dry_run;
        let token = self.token.clone().filter(|t| !t.trim().is_empty());
        if publishes && token.is_none() {
            bail!("a GitHub token is required to publish (--token or GITHUB_TOKEN)");
        }
        Ok(token)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json_logs, level);

    let result = match cli.command {
        Commands::Release(args) => cmd_release(args).await,
    };

    if let Err(e) = result {
        eprintln!("release failed: {e:#}");
        std::process::exit(1);
    }
}

async fn cmd_release(args: ReleaseArgs) -> Result<()> {
    let mut config = ShipConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    args.apply(&mut config);

    let mut github = GithubConfig::from_endpoints(&config.github);
    if let Some(token) = args.token_for(&config)? {
        github = github.with_token(&token);
    }
    let host = GithubClient::new(github).context("creating GitHub client")?;
    let driver = BazelDriver::new(&config.bazel);

    info!(target = %args.target, platforms = ?config.platforms, "starting release");
    let pipeline = ReleasePipeline::from_config(&config, Arc::new(driver), Arc::new(host));
    let report = pipeline.run(&args.target).await?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &PipelineReport) {
    for asset in &report.staged {
        println!("staged {} ({})", asset.path.display(), asset.sha256);
    }

    match &report.publish {
        Some(PublishOutcome::Published { release, report }) => {
            println!(
                "uploaded {} assets in {:.2?}",
                report.uploaded.len(),
                report.elapsed
            );
            println!("Release successful: {}", release.tag());
        }
        Some(PublishOutcome::DryRunStop { request }) => {
            println!(
                "Dry run: skipped creating release {} for {}/{}",
                request.tag, request.owner, request.repo
            );
        }
        None => println!("No tag given, skipped publishing"),
    }
}
