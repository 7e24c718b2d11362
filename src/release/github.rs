use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::{AssetDescriptor, DownloadProgress, ReleaseDescriptor, ReleaseSource};
use crate::error::InstallError;
use crate::util::{format_bytes, format_speed};

const GITHUB_API: &str = "https://api.github.com";
const CLIENT_USER_AGENT: &str = concat!("wwmru/", env!("CARGO_PKG_VERSION"));
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DOWNLOAD_READ_TIMEOUT: Duration = Duration::from_secs(120);
/// Writes hit the disk in blocks of this size regardless of asset size.
pub const DOWNLOAD_CHUNK_SIZE: usize = 256 * 1024;

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: Option<String>,
    name: Option<String>,
    body: Option<String>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
    size: Option<u64>,
}

impl GithubRelease {
    fn version(&self) -> Option<String> {
        [self.tag_name.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_owned)
    }

    fn into_descriptor(self, fallback_version: &str) -> ReleaseDescriptor {
        let version = self
            .version()
            .unwrap_or_else(|| fallback_version.to_owned());
        ReleaseDescriptor {
            version,
            notes: self.body.unwrap_or_default(),
            assets: self
                .assets
                .into_iter()
                .map(|asset| AssetDescriptor {
                    name: asset.name,
                    download_url: asset.browser_download_url,
                    size: asset.size,
                })
                .collect(),
        }
    }
}

/// GitHub Releases of `owner/repo`.
#[derive(Clone)]
pub struct GithubReleases {
    metadata: Client,
    downloads: Client,
    owner: String,
    repo: String,
}

impl GithubReleases {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        let metadata = Client::builder()
            .timeout(METADATA_TIMEOUT)
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("github: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        let downloads = Client::builder()
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .read_timeout(DOWNLOAD_READ_TIMEOUT)
            .user_agent(CLIENT_USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("github: falling back to default download client ({err})");
                Client::new()
            });
        Self {
            metadata,
            downloads,
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    fn releases_url(&self, tail: &[&str]) -> Result<Url, InstallError> {
        let mut url = Url::parse(GITHUB_API)
            .map_err(|e| InstallError::Unknown(format!("invalid API url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| InstallError::Unknown("API url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "releases"])
            .extend(tail);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, InstallError> {
        debug!("github: GET {url}");
        let response = self
            .metadata
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| InstallError::from_http(context, e))?
            .error_for_status()
            .map_err(|e| InstallError::from_http(context, e))?;
        response
            .json::<T>()
            .await
            .map_err(|e| InstallError::Network {
                message: format!("{context}: unexpected response ({e})"),
                timed_out: e.is_timeout(),
            })
    }
}

impl ReleaseSource for GithubReleases {
    async fn latest(&self) -> Result<ReleaseDescriptor, InstallError> {
        let url = self.releases_url(&["latest"])?;
        let release: GithubRelease = self.get_json(url, "latest release").await?;
        let descriptor = release.into_descriptor("unknown");
        info!("github: latest release is {}", descriptor.version);
        Ok(descriptor)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ReleaseDescriptor>, InstallError> {
        let mut url = self.releases_url(&[])?;
        url.query_pairs_mut()
            .append_pair("per_page", &limit.to_string());
        let releases: Vec<GithubRelease> = self.get_json(url, "recent releases").await?;
        Ok(recent_descriptors(releases, limit))
    }

    async fn by_tag(&self, tag: &str) -> Result<ReleaseDescriptor, InstallError> {
        let url = self.releases_url(&["tags", tag])?;
        let release: GithubRelease = self
            .get_json(url, &format!("release {tag}"))
            .await?;
        Ok(release.into_descriptor(tag))
    }

    async fn download(
        &self,
        asset: &AssetDescriptor,
        dest: &Path,
        progress: &mut (dyn FnMut(DownloadProgress) + Send),
    ) -> Result<u64, InstallError> {
        let context = format!("asset {}", asset.name);
        let response = self
            .downloads
            .get(&asset.download_url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await
            .map_err(|e| InstallError::from_http(&context, e))?
            .error_for_status()
            .map_err(|e| InstallError::from_http(&context, e))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallError::io(parent, e))?;
        }
        let file = File::create(dest)
            .await
            .map_err(|e| InstallError::io(dest, e))?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);

        let total = response.content_length().or(asset.size);
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_tick = Instant::now();
        let mut last_bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| InstallError::Network {
                message: format!("{context}: stream error ({e})"),
                timed_out: e.is_timeout(),
            })?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| InstallError::io(dest, e))?;
            downloaded += chunk.len() as u64;

            let since = last_tick.elapsed().as_secs_f32();
            if since > 0.2 {
                let speed = (downloaded - last_bytes) as f32 / since;
                progress(DownloadProgress {
                    downloaded,
                    total,
                    speed: format_speed(speed),
                });
                last_tick = Instant::now();
                last_bytes = downloaded;
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| InstallError::io(dest, e))?;

        progress(DownloadProgress {
            downloaded,
            total,
            speed: "0 B/s".into(),
        });

        if let Some(total) = total
            && downloaded < total
        {
            return Err(InstallError::Network {
                message: format!(
                    "{context}: download incomplete, received {downloaded} of {total} bytes"
                ),
                timed_out: false,
            });
        }

        debug!(
            "github: downloaded {} ({}) to {}",
            asset.name,
            format_bytes(downloaded),
            dest.display()
        );
        Ok(downloaded)
    }
}

fn recent_descriptors(releases: Vec<GithubRelease>, limit: usize) -> Vec<ReleaseDescriptor> {
    releases
        .into_iter()
        .filter(|release| release.version().is_some())
        .map(|release| release.into_descriptor("unknown"))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELEASE_JSON: &str = r#"{
        "tag_name": "v1.7",
        "name": "Patch 1.7",
        "body": "Fixed quest dialogue",
        "prerelease": false,
        "assets": [
            {
                "name": "translate_words_map_en",
                "browser_download_url": "https://github.com/zvgna/translate/releases/download/v1.7/translate_words_map_en",
                "size": 1048576
            },
            {
                "name": "translate_words_map_en_diff",
                "browser_download_url": "https://github.com/zvgna/translate/releases/download/v1.7/translate_words_map_en_diff"
            }
        ]
    }"#;

    #[test]
    fn converts_release_json_into_descriptor() {
        let release: GithubRelease = serde_json::from_str(RELEASE_JSON).unwrap();
        let descriptor = release.into_descriptor("unknown");
        assert_eq!(descriptor.version, "v1.7");
        assert_eq!(descriptor.notes, "Fixed quest dialogue");
        assert_eq!(descriptor.assets.len(), 2);
        assert_eq!(descriptor.assets[0].size, Some(1_048_576));
        assert_eq!(descriptor.assets[1].size, None);
        assert!(
            descriptor.assets[1]
                .download_url
                .ends_with("/v1.7/translate_words_map_en_diff")
        );
    }

    #[test]
    fn version_falls_back_to_name_then_requested_tag() {
        let named: GithubRelease =
            serde_json::from_str(r#"{ "tag_name": "", "name": "Spring update" }"#).unwrap();
        assert_eq!(named.into_descriptor("v9").version, "Spring update");

        let bare: GithubRelease = serde_json::from_str(r#"{ "tag_name": null }"#).unwrap();
        let descriptor = bare.into_descriptor("v9");
        assert_eq!(descriptor.version, "v9");
        assert!(descriptor.notes.is_empty());
        assert!(descriptor.assets.is_empty());
    }

    #[test]
    fn recent_skips_untagged_releases_and_honours_limit() {
        let releases: Vec<GithubRelease> = serde_json::from_str(
            r#"[
                { "tag_name": "v5" },
                { "tag_name": null, "name": null },
                { "tag_name": "v4" },
                { "name": "v3" },
                { "tag_name": "v2" }
            ]"#,
        )
        .unwrap();
        let versions: Vec<String> = recent_descriptors(releases, 3)
            .into_iter()
            .map(|release| release.version)
            .collect();
        assert_eq!(versions, vec!["v5", "v4", "v3"]);
    }

    #[test]
    fn builds_release_urls_with_encoded_tags() {
        let source = GithubReleases::new("zvgna", "translate");
        let latest = source.releases_url(&["latest"]).unwrap();
        assert_eq!(
            latest.as_str(),
            "https://api.github.com/repos/zvgna/translate/releases/latest"
        );
        let tagged = source.releases_url(&["tags", "v1.0 beta"]).unwrap();
        assert_eq!(
            tagged.as_str(),
            "https://api.github.com/repos/zvgna/translate/releases/tags/v1.0%20beta"
        );
    }
}
