//! GitHub releases backend
//!
//! Implements [`ReleaseHost`] over the GitHub REST API: one JSON `POST` to
//! create a release and one octet-stream `POST` per asset to the uploads
//! host. Responses are handed back raw; the publisher decides what a status
//! means.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ship_core::{
    CreateReleaseResponse, GithubEndpoints, HostError, ReleaseHost, ReleaseRecord,
    ReleaseRequest, UploadAssetResponse,
};

/// Media type GitHub recommends for REST calls.
const GITHUB_JSON: &str = "application/vnd.github+json";
/// Media type for raw asset bytes.
const OCTET_STREAM: &str = "application/octet-stream";

/// GitHub connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    /// REST API base, e.g. `https://api.github.com`
    pub api_url: String,
    /// Asset upload base, e.g. `https://uploads.github.com`
    pub upload_url: String,
    /// Bearer token. Requests go unauthenticated without one.
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self::from_endpoints(&GithubEndpoints::default())
    }
}

impl GithubConfig {
    /// Config for the given endpoints, without a token.
    pub fn from_endpoints(endpoints: &GithubEndpoints) -> Self {
        GithubConfig {
            api_url: endpoints.api_url.clone(),
            upload_url: endpoints.upload_url.clone(),
            token: None,
            user_agent: format!("ship/{}", ship_core::VERSION),
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// Body of a release creation request.
#[derive(Debug, Serialize)]
struct NewRelease<'a> {
    tag_name: &'a str,
    target_commitish: &'a str,
    body: &'a str,
}

/// The only response field we read back.
#[derive(Debug, Deserialize)]
struct IdOnly {
    id: i64,
}

/// GitHub releases client.
pub struct GithubClient {
    config: GithubConfig,
    http_client: reqwest::Client,
}

impl GithubClient {
    /// Create a new GitHub client
    pub fn new(config: GithubConfig) -> Result<Self, HostError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HostError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(GithubClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ReleaseHost for GithubClient {
    async fn create_release(
        &self,
        request: &ReleaseRequest,
    ) -> Result<CreateReleaseResponse, HostError> {
        let url = releases_url(&self.config.api_url, &request.owner, &request.repo);
        debug!(url = %url, tag = %request.tag, "creating release");

        let payload = NewRelease {
            tag_name: &request.tag,
            target_commitish: &request.commit,
            body: &request.notes,
        };
        let response = self
            .authorized(self.http_client.post(&url))
            .header(ACCEPT, GITHUB_JSON)
            .json(&payload)
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HostError::Body(e.to_string()))?;

        Ok(CreateReleaseResponse {
            status,
            id: parse_id(&body),
            body,
        })
    }

    async fn upload_asset(
        &self,
        release: &ReleaseRecord,
        name: &str,
        contents: Vec<u8>,
    ) -> Result<UploadAssetResponse, HostError> {
        let request = &release.request;
        let url = asset_upload_url(
            &self.config.upload_url,
            &request.owner,
            &request.repo,
            release.id,
            name,
        )?;
        debug!(url = %url, size = contents.len(), "uploading asset");

        let response = self
            .authorized(self.http_client.post(url))
            .header(ACCEPT, GITHUB_JSON)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(contents)
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HostError::Body(e.to_string()))?;

        Ok(UploadAssetResponse {
            status,
            asset_id: parse_id(&body),
            body,
        })
    }
}

/// `{api}/repos/{owner}/{repo}/releases`
pub fn releases_url(api_url: &str, owner: &str, repo: &str) -> String {
    format!(
        "{}/repos/{}/{}/releases",
        api_url.trim_end_matches('/'),
        owner,
        repo
    )
}

/// `{upload}/repos/{owner}/{repo}/releases/{id}/assets?name={name}`, with
/// `name` query-encoded.
pub fn asset_upload_url(
    upload_url: &str,
    owner: &str,
    repo: &str,
    release_id: i64,
    name: &str,
) -> Result<Url, HostError> {
    let base = format!(
        "{}/repos/{}/{}/releases/{}/assets",
        upload_url.trim_end_matches('/'),
        owner,
        repo,
        release_id
    );
    let mut url = Url::parse(&base)
        .map_err(|e| HostError::Transport(format!("invalid upload URL {base}: {e}")))?;
    url.query_pairs_mut().append_pair("name", name);
    Ok(url)
}

/// Top-level `id` of a JSON response body, if there is one.
pub fn parse_id(body: &str) -> Option<i64> {
    serde_json::from_str::<IdOnly>(body).ok().map(|r| r.id)
}
