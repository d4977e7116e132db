//! Firmware release repositories
//!
//! Releases are looked up by tag (or the latest one is used) and the
//! container asset is picked from the release assets with a per-model
//! pattern, see [`ModelData::firmware_pattern`](crate::ModelData::firmware_pattern).

#[cfg(feature = "github")]
#[cfg_attr(docsrs, doc(cfg(feature = "github")))]
pub mod github;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use nitrokey_version::{Version, VersionError};
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::error::ReleaseError;

/// A published firmware release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    /// Release tag, e.g. `v1.8.2`
    pub tag: String,
    /// Download URLs of the release assets
    pub assets: Vec<String>,
}

impl Release {
    /// Create a release, rejecting releases without assets.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::NoAssets`] if `assets` is empty.
    pub fn new(tag: impl Into<String>, assets: Vec<String>) -> Result<Self, ReleaseError> {
        let tag = tag.into();
        if assets.is_empty() {
            return Err(ReleaseError::NoAssets { tag });
        }
        Ok(Self { tag, assets })
    }

    /// The version named by the tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is not a `v`-prefixed version.
    pub fn version(&self) -> Result<Version, VersionError> {
        Version::from_v_str(&self.tag)
    }

    /// Find the single asset whose URL matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::AmbiguousAsset`] if several assets match and
    /// [`ReleaseError::InvalidPattern`] if the pattern does not compile.
    pub fn find_asset(&self, pattern: &str) -> Result<Option<Asset>, ReleaseError> {
        let regex = Regex::new(pattern).map_err(|e| ReleaseError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let mut matches = self.assets.iter().filter(|url| regex.is_match(url));
        let Some(url) = matches.next() else {
            return Ok(None);
        };
        if matches.next().is_some() {
            return Err(ReleaseError::AmbiguousAsset {
                tag: self.tag.clone(),
                pattern: pattern.to_string(),
            });
        }
        Ok(Some(Asset {
            tag: self.tag.clone(),
            url: url.clone(),
        }))
    }

    /// Like [`Release::find_asset`], but a missing asset is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::NoMatchingAsset`] if no asset matches.
    pub fn require_asset(&self, pattern: &str) -> Result<Asset, ReleaseError> {
        self.find_asset(pattern)?
            .ok_or_else(|| ReleaseError::NoMatchingAsset {
                tag: self.tag.clone(),
                pattern: pattern.to_string(),
            })
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

/// A downloadable file of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Tag of the release the asset belongs to
    pub tag: String,
    /// Download URL
    pub url: String,
}

impl Asset {
    /// The last path segment of the URL.
    pub fn filename(&self) -> Option<&str> {
        let path = self.url.split(['?', '#']).next()?;
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Source of firmware releases.
pub trait ReleaseRepository {
    /// The most recent release.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the release has no assets.
    fn latest_release(&self) -> Result<Release, ReleaseError>;

    /// The release with the given tag.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::NotFound`] if there is no such release.
    fn release(&self, tag: &str) -> Result<Release, ReleaseError>;

    /// Download an asset.
    ///
    /// `progress` receives the number of bytes read so far and the total size
    /// (zero if unknown). It is called once with zero bytes before the
    /// transfer starts.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Http`] if the transfer fails.
    fn download(
        &self,
        asset: &Asset,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<Vec<u8>, ReleaseError>;

    /// The release with the given tag, or the latest release.
    ///
    /// # Errors
    ///
    /// See [`ReleaseRepository::release`] and [`ReleaseRepository::latest_release`].
    fn release_or_latest(&self, tag: Option<&str>) -> Result<Release, ReleaseError> {
        match tag {
            Some(tag) => self.release(tag),
            None => self.latest_release(),
        }
    }
}

impl<R: ReleaseRepository + ?Sized> ReleaseRepository for Box<R> {
    fn latest_release(&self) -> Result<Release, ReleaseError> {
        (**self).latest_release()
    }

    fn release(&self, tag: &str) -> Result<Release, ReleaseError> {
        (**self).release(tag)
    }

    fn download(
        &self,
        asset: &Asset,
        progress: &mut dyn FnMut(u64, u64),
    ) -> Result<Vec<u8>, ReleaseError> {
        (**self).download(asset, progress)
    }
}

/// Download an asset into a directory, keeping the file name of its URL.
///
/// # Errors
///
/// Returns [`ReleaseError::Http`] if `dir` is not a directory or the URL has
/// no file name, [`ReleaseError::Overwrite`] if the file exists and
/// `overwrite` is not set, and [`ReleaseError::Io`] if writing fails.
pub fn download_to_dir(
    repository: &dyn ReleaseRepository,
    asset: &Asset,
    dir: &Path,
    overwrite: bool,
    progress: &mut dyn FnMut(u64, u64),
) -> Result<PathBuf, ReleaseError> {
    if !dir.exists() {
        return Err(ReleaseError::Http(format!(
            "Directory {} does not exist",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(ReleaseError::Http(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let filename = asset
        .filename()
        .ok_or_else(|| ReleaseError::Http(format!("No file name in URL {}", asset.url)))?;
    let path = dir.join(filename);
    if path.exists() && !overwrite {
        return Err(ReleaseError::Overwrite(path.display().to_string()));
    }

    let data = repository.download(asset, progress)?;
    fs::write(&path, &data).map_err(|e| ReleaseError::Io(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), size = data.len(), "Downloaded firmware asset");
    Ok(path)
}
