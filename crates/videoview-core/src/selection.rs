//! Default track selection
//!
//! Resolution order, each step only when the previous found nothing:
//! 1. the session's preferred language
//! 2. each system language, in order
//! 3. no language filter: for audio the last primary-flagged track, else the
//!    first track; for subtitles nothing (hidden)

use crate::language::best_match;
use crate::types::{TrackId, TrackInfo, TrackKind};
use tracing::debug;

/// Picks default audio and subtitle tracks
#[derive(Debug, Clone, Default)]
pub struct TrackSelector {
    system_languages: Vec<String>,
}

impl TrackSelector {
    /// `system_languages` is the platform preference list, most preferred first
    pub fn new<I, S>(system_languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            system_languages: system_languages
                .into_iter()
                .map(|lang| lang.as_ref().to_lowercase())
                .filter(|lang| !lang.is_empty())
                .collect(),
        }
    }

    pub fn system_languages(&self) -> &[String] {
        &self.system_languages
    }

    /// Default track of `kind` among `tracks`. Tracks of other kinds are ignored.
    pub fn select_default(&self, kind: TrackKind, tracks: &[TrackInfo], preferred: &str) -> Option<TrackId> {
        let candidates: Vec<&TrackInfo> = tracks.iter().filter(|t| t.kind == kind).collect();
        if candidates.is_empty() {
            return None;
        }

        let by_language = |lang: &str| {
            best_match(lang, candidates.iter().map(|t| (t.id, t.language.as_str())))
        };

        if let Some(id) = by_language(preferred) {
            debug!(%kind, %id, preferred, "Default track from preferred language");
            return Some(id);
        }
        for lang in &self.system_languages {
            if let Some(id) = by_language(lang) {
                debug!(%kind, %id, language = %lang, "Default track from system language");
                return Some(id);
            }
        }

        match kind {
            TrackKind::Audio => candidates
                .iter()
                .rev()
                .find(|t| t.primary)
                .or_else(|| candidates.first())
                .map(|t| t.id),
            TrackKind::Subtitle => None,
        }
    }
}
