//! Media source resolution
//!
//! Source grammar accepted by `open`:
//! - `asset://<path>` - bundled asset
//! - bare path without a scheme - local file
//! - `file://...` - local file
//! - anything else - networked URL
//!
//! Streaming manifests are classified by extension, see [`detect_manifest_type`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const ASSET_SCHEME: &str = "asset://";

/// Where the media bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Asset,
    File,
    Network,
}

/// Manifest types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestType {
    Hls,
    Dash,
    SmoothStreaming,
    /// Plain progressive file
    Progressive,
}

impl ManifestType {
    /// Mime type handed to engines that need a hint
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            ManifestType::Hls => Some("application/x-mpegurl"),
            ManifestType::Dash => Some("application/dash+xml"),
            ManifestType::SmoothStreaming => Some("application/vnd.ms-sstr+xml"),
            ManifestType::Progressive => None,
        }
    }

    pub fn is_adaptive(&self) -> bool {
        !matches!(self, ManifestType::Progressive)
    }
}

/// A resolved source, ready to hand to a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    /// The string the host passed to `open`, echoed in `mediaInfo`
    pub source: String,
    /// Resolved URL
    pub url: Url,
    pub kind: SourceKind,
    pub manifest: ManifestType,
}

impl MediaSource {
    /// Resolve a host source string.
    ///
    /// Relative bare paths resolve against the working directory. `asset://`
    /// sources resolve under `asset_root` when one is configured and keep the
    /// `asset:` scheme otherwise.
    pub fn resolve(source: &str, asset_root: Option<&Path>) -> Result<Self> {
        let (url, kind) = if let Some(asset) = source.strip_prefix(ASSET_SCHEME) {
            let url = match asset_root {
                Some(root) => file_url(&root.join(asset.trim_start_matches('/')))?,
                None => Url::parse(&format!("asset:///{}", asset.trim_start_matches('/')))
                    .map_err(|e| Error::InvalidSource(format!("{source}: {e}")))?,
            };
            (url, SourceKind::Asset)
        } else if !source.contains("://") {
            if source.is_empty() {
                return Err(Error::InvalidSource("empty source".into()));
            }
            (file_url(Path::new(source))?, SourceKind::File)
        } else {
            let url = Url::parse(source).map_err(|e| Error::InvalidSource(format!("{source}: {e}")))?;
            let kind = if url.scheme() == "file" {
                SourceKind::File
            } else {
                SourceKind::Network
            };
            (url, kind)
        };

        let manifest = detect_manifest_type(url.as_str());
        Ok(Self {
            source: source.to_string(),
            url,
            kind,
            manifest,
        })
    }

    /// Bytes come over the network
    pub fn is_networked(&self) -> bool {
        self.kind == SourceKind::Network
    }
}

fn file_url(path: &Path) -> Result<Url> {
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map_err(|_| Error::InvalidSource(format!("not a valid file path: {}", path.display())))
}

/// Detect manifest type from the URL string.
///
/// Matches `.mpd`, `.m3u8` and `.ism/manifest` anywhere in the string, case
/// insensitively. When several occur, the one starting last wins.
pub fn detect_manifest_type(url: &str) -> ManifestType {
    const PATTERNS: [(&str, ManifestType); 3] = [
        (".mpd", ManifestType::Dash),
        (".m3u8", ManifestType::Hls),
        (".ism/manifest", ManifestType::SmoothStreaming),
    ];

    let lowered = url.to_ascii_lowercase();
    PATTERNS
        .iter()
        .filter_map(|(pattern, kind)| lowered.rfind(pattern).map(|at| (at, *kind)))
        .max_by_key(|(at, _)| *at)
        .map(|(_, kind)| kind)
        .unwrap_or(ManifestType::Progressive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_hls() {
        assert_eq!(detect_manifest_type("https://example.com/master.m3u8"), ManifestType::Hls);
        assert_eq!(detect_manifest_type("https://example.com/MASTER.M3U8?token=1"), ManifestType::Hls);
    }

    #[test]
    fn test_detect_dash() {
        assert_eq!(detect_manifest_type("https://example.com/manifest.mpd"), ManifestType::Dash);
    }

    #[test]
    fn test_detect_smooth_streaming() {
        assert_eq!(
            detect_manifest_type("https://example.com/video.ism/Manifest"),
            ManifestType::SmoothStreaming
        );
    }

    #[test]
    fn test_last_occurrence_wins() {
        assert_eq!(
            detect_manifest_type("https://example.com/a.mpd/redirect/b.m3u8"),
            ManifestType::Hls
        );
        assert_eq!(
            detect_manifest_type("https://example.com/a.m3u8?next=b.mpd"),
            ManifestType::Dash
        );
    }

    #[test]
    fn test_progressive_fallback() {
        assert_eq!(detect_manifest_type("https://example.com/clip.mp4"), ManifestType::Progressive);
        assert_eq!(ManifestType::Progressive.mime_type(), None);
    }

    #[test]
    fn test_resolve_network() {
        let source = MediaSource::resolve("https://cdn.example.com/live/index.m3u8", None).unwrap();
        assert_eq!(source.kind, SourceKind::Network);
        assert_eq!(source.manifest, ManifestType::Hls);
        assert!(source.is_networked());
    }

    #[test]
    fn test_resolve_file_url_is_local() {
        let source = MediaSource::resolve("file:///tmp/clip.mp4", None).unwrap();
        assert_eq!(source.kind, SourceKind::File);
        assert!(!source.is_networked());
    }

    #[test]
    fn test_resolve_bare_path() {
        let source = MediaSource::resolve("/var/media/movie.mkv", None).unwrap();
        assert_eq!(source.kind, SourceKind::File);
        assert_eq!(source.url.scheme(), "file");
        assert_eq!(source.source, "/var/media/movie.mkv");
    }

    #[test]
    fn test_resolve_relative_path() {
        let source = MediaSource::resolve("video.mp4", None).unwrap();
        assert_eq!(source.kind, SourceKind::File);
        assert!(source.url.path().ends_with("/video.mp4"));
    }

    #[test]
    fn test_resolve_asset() {
        let source = MediaSource::resolve("asset://videos/intro.mp4", None).unwrap();
        assert_eq!(source.kind, SourceKind::Asset);
        assert_eq!(source.url.as_str(), "asset:///videos/intro.mp4");

        let rooted = MediaSource::resolve("asset://videos/intro.mp4", Some(Path::new("/opt/app/assets"))).unwrap();
        assert_eq!(rooted.url.as_str(), "file:///opt/app/assets/videos/intro.mp4");
        assert!(!rooted.is_networked());
    }

    #[test]
    fn test_resolve_invalid() {
        assert!(MediaSource::resolve("http://[::1", None).is_err());
        assert!(MediaSource::resolve("", None).is_err());
    }
}
