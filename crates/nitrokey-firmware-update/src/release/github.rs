//! GitHub release repository

use std::io::Read;
use std::time::Duration;

use nitrokey_device::Model;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{Asset, Release, ReleaseRepository};
use crate::error::ReleaseError;
use crate::model_data::{FIRMWARE_REPOSITORY_OWNER, model_data};

/// Base URL of the GitHub REST API.
pub const API_BASE_URL: &str = "https://api.github.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CHUNK_SIZE: usize = 1024;

#[derive(Debug, Deserialize)]
struct ApiRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<ApiAsset>,
}

#[derive(Debug, Deserialize)]
struct ApiAsset {
    browser_download_url: String,
}

impl TryFrom<ApiRelease> for Release {
    type Error = ReleaseError;

    fn try_from(release: ApiRelease) -> Result<Self, ReleaseError> {
        let assets = release
            .assets
            .into_iter()
            .map(|asset| asset.browser_download_url)
            .collect();
        Release::new(release.tag_name, assets)
    }
}

/// Releases of a GitHub repository.
#[derive(Debug, Clone)]
pub struct GithubRepository {
    owner: String,
    name: String,
    api_base: String,
    client: Client,
}

impl GithubRepository {
    /// Create a repository client for `owner/name`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Http`] if the HTTP client cannot be built.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, ReleaseError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("nitrokey-firmware-update/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReleaseError::Http(e.to_string()))?;
        Ok(Self {
            owner: owner.into(),
            name: name.into(),
            api_base: API_BASE_URL.to_string(),
            client,
        })
    }

    /// The firmware repository of a model.
    ///
    /// # Errors
    ///
    /// See [`GithubRepository::new`].
    pub fn for_model(model: Model) -> Result<Self, ReleaseError> {
        Self::new(
            FIRMWARE_REPOSITORY_OWNER,
            model_data(model).firmware_repository(),
        )
    }

    /// Use another API endpoint, e.g. a GitHub Enterprise server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// `owner/name`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    fn releases_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases/{path}",
            self.api_base, self.owner, self.name
        )
    }

    fn fetch_release(&self, url: &str, tag: Option<&str>) -> Result<Release, ReleaseError> {
        debug!(url, "Fetching firmware release");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .map_err(|e| ReleaseError::Http(e.to_string()))?;
        if let (StatusCode::NOT_FOUND, Some(tag)) = (response.status(), tag) {
            return Err(ReleaseError::NotFound {
                tag: tag.to_string(),
            });
        }
        let release: ApiRelease = response
            .error_for_status()
            .and_then(|response| response.json())
            .map_err(|e| ReleaseError::Http(e.to_string()))?;
        Release::try_from(release)
    }
}

/// The firmware release repository of a model.
///
/// # Errors
///
/// See [`GithubRepository::new`].
pub fn firmware_repository(model: Model) -> Result<GithubRepository, ReleaseError> {
    GithubRepository::for_model(model)
}

impl ReleaseRepository for GithubRepository {
    fn latest_release(&self) -> Result<Release, ReleaseError> {
        self.fetch_release(&self.releases_url("latest"), None)
    }

    fn release(&self, tag: &str) -> Result<Release, ReleaseError> {
        self.fetch_release(&self.releases_url(&format!("tags/{tag}")), Some(tag))
    }

    fn download(
        &self,
        asset: &Asset,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<Vec<u8>, ReleaseError> {
        let mut response = self
            .client
            .get(&asset.url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| ReleaseError::Http(e.to_string()))?;
        let total = response.content_length().unwrap_or(0);

        let mut data = Vec::new();
        let mut chunk = [0u8; CHUNK_SIZE];
        progress(0, total);
        loop {
            let read = response
                .read(&mut chunk)
                .map_err(|e| ReleaseError::Http(e.to_string()))?;
            let Some(bytes) = chunk.get(..read).filter(|bytes| !bytes.is_empty()) else {
                break;
            };
            data.extend_from_slice(bytes);
            progress(u64::try_from(data.len()).unwrap_or(u64::MAX), total);
        }

        info!(url = %asset.url, size = data.len(), "Downloaded release asset");
        Ok(data)
    }
}
