use std::future::Future;
use std::path::Path;

use crate::error::InstallError;

pub mod github;

pub use github::GithubReleases;

/// Immutable snapshot of one published release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub version: String,
    pub notes: String,
    pub assets: Vec<AssetDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub name: String,
    pub download_url: String,
    pub size: Option<u64>,
}

impl ReleaseDescriptor {
    /// Exact-name lookup; when a release carries duplicates the first one wins.
    pub fn find_asset(&self, name: &str) -> Option<&AssetDescriptor> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

/// Which release an install should apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseSelector {
    Latest,
    Tag(String),
}

impl ReleaseSelector {
    /// Version label to report when the release itself could not be fetched.
    pub fn label(&self) -> &str {
        match self {
            ReleaseSelector::Latest => "unknown",
            ReleaseSelector::Tag(tag) => tag,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
    pub speed: String,
}

/// Remote host publishing the translation releases.
pub trait ReleaseSource: Send + Sync {
    fn latest(&self) -> impl Future<Output = Result<ReleaseDescriptor, InstallError>> + Send;

    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ReleaseDescriptor>, InstallError>> + Send;

    fn by_tag(
        &self,
        tag: &str,
    ) -> impl Future<Output = Result<ReleaseDescriptor, InstallError>> + Send;

    /// Stream `asset` into `dest`, replacing any existing file. Returns the bytes written.
    fn download(
        &self,
        asset: &AssetDescriptor,
        dest: &Path,
        progress: &mut (dyn FnMut(DownloadProgress) + Send),
    ) -> impl Future<Output = Result<u64, InstallError>> + Send;

    fn fetch(
        &self,
        selector: &ReleaseSelector,
    ) -> impl Future<Output = Result<ReleaseDescriptor, InstallError>> + Send {
        async move {
            match selector {
                ReleaseSelector::Latest => self.latest().await,
                ReleaseSelector::Tag(tag) => self.by_tag(tag).await,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    use super::{AssetDescriptor, DownloadProgress, ReleaseDescriptor, ReleaseSource};
    use crate::error::InstallError;

    #[derive(Clone)]
    pub enum Payload {
        Bytes(Vec<u8>),
        /// Writes the partial bytes, then fails like a dropped connection.
        FailAfter(Vec<u8>),
        Panic,
    }

    /// Serves a single release whose assets are the given payloads.
    pub struct FakeSource {
        release: ReleaseDescriptor,
        payloads: HashMap<String, Payload>,
    }

    impl FakeSource {
        pub fn new(version: &str, payloads: &[(&str, Payload)]) -> Self {
            let assets = payloads
                .iter()
                .map(|(name, _)| AssetDescriptor {
                    name: (*name).to_owned(),
                    download_url: format!("https://example.invalid/{version}/{name}"),
                    size: None,
                })
                .collect();
            Self {
                release: ReleaseDescriptor {
                    version: version.to_owned(),
                    notes: format!("notes for {version}"),
                    assets,
                },
                payloads: payloads
                    .iter()
                    .map(|(name, payload)| ((*name).to_owned(), payload.clone()))
                    .collect(),
            }
        }
    }

    impl ReleaseSource for FakeSource {
        async fn latest(&self) -> Result<ReleaseDescriptor, InstallError> {
            Ok(self.release.clone())
        }

        async fn recent(&self, limit: usize) -> Result<Vec<ReleaseDescriptor>, InstallError> {
            let mut releases = vec![self.release.clone()];
            releases.truncate(limit);
            Ok(releases)
        }

        async fn by_tag(&self, tag: &str) -> Result<ReleaseDescriptor, InstallError> {
            if tag == self.release.version {
                Ok(self.release.clone())
            } else {
                Err(InstallError::not_found(format!("release {tag}")))
            }
        }

        async fn download(
            &self,
            asset: &AssetDescriptor,
            dest: &Path,
            progress: &mut (dyn FnMut(DownloadProgress) + Send),
        ) -> Result<u64, InstallError> {
            match self.payloads.get(&asset.name) {
                Some(Payload::Bytes(bytes)) => {
                    fs::write(dest, bytes).map_err(|e| InstallError::io(dest, e))?;
                    progress(DownloadProgress {
                        downloaded: bytes.len() as u64,
                        total: Some(bytes.len() as u64),
                        speed: "0 B/s".into(),
                    });
                    Ok(bytes.len() as u64)
                }
                Some(Payload::FailAfter(partial)) => {
                    fs::write(dest, partial).map_err(|e| InstallError::io(dest, e))?;
                    Err(InstallError::Network {
                        message: "connection reset".into(),
                        timed_out: false,
                    })
                }
                Some(Payload::Panic) => panic!("decoder exploded"),
                None => Err(InstallError::not_found(asset.name.clone())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, url: &str) -> AssetDescriptor {
        AssetDescriptor {
            name: name.into(),
            download_url: url.into(),
            size: None,
        }
    }

    #[test]
    fn finds_assets_by_exact_name_first_match_wins() {
        let release = ReleaseDescriptor {
            version: "v1".into(),
            notes: String::new(),
            assets: vec![
                asset("translate_words_map_en_diff", "https://host/diff"),
                asset("translate_words_map_en", "https://host/first"),
                asset("translate_words_map_en", "https://host/second"),
            ],
        };
        let found = release.find_asset("translate_words_map_en").unwrap();
        assert_eq!(found.download_url, "https://host/first");
        assert!(release.find_asset("Translate_Words_Map_En").is_none());
        assert!(release.find_asset("translate_words_map").is_none());
    }

    #[test]
    fn selector_label_falls_back_for_latest() {
        assert_eq!(ReleaseSelector::Latest.label(), "unknown");
        assert_eq!(ReleaseSelector::Tag("v2.1".into()).label(), "v2.1");
    }
}
