//! CLI command implementations

use crate::output::{to_json, to_table, OutputFormat};
use crate::scenario::{self, Scenario};
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;
use tracing::info;
use videoview_core::{
    config::system_languages_from_env, MediaSource, PlayerConfig, TrackId, TrackInfo, TrackKind,
    TrackSelector,
};

#[derive(Serialize, Tabled)]
struct Classification {
    source: String,
    url: String,
    kind: String,
    manifest: String,
    networked: bool,
}

/// Resolve a source string
pub fn classify(source: &str, asset_root: Option<&Path>, format: &str) -> anyhow::Result<()> {
    let resolved = MediaSource::resolve(source, asset_root)?;
    let report = Classification {
        source: resolved.source.clone(),
        url: resolved.url.to_string(),
        kind: format!("{:?}", resolved.kind),
        manifest: format!("{:?}", resolved.manifest),
        networked: resolved.is_networked(),
    };

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&report)),
        OutputFormat::Table => println!("{}", to_table([report])),
        OutputFormat::Text => {
            println!("Source: {}", report.source);
            println!("  URL: {}", report.url);
            println!("  Kind: {}", report.kind);
            println!("  Manifest: {}", report.manifest);
            if let Some(mime) = resolved.manifest.mime_type() {
                println!("  MIME type: {}", mime);
            }
            println!("  Networked: {}", report.networked);
        }
    }

    Ok(())
}

/// Parse `id=language[,primary]`
pub fn parse_track(kind: TrackKind, arg: &str) -> anyhow::Result<TrackInfo> {
    let (id, rest) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("track '{}' is not id=language", arg))?;
    let id: u32 = id.trim().parse().with_context(|| format!("track id in '{}'", arg))?;
    let mut parts = rest.split(',');
    let language = parts.next().unwrap_or_default().trim();
    let mut track = match kind {
        TrackKind::Audio => TrackInfo::audio(id, language),
        TrackKind::Subtitle => TrackInfo::subtitle(id, language),
    };
    for flag in parts {
        match flag.trim() {
            "primary" => track = track.with_primary(true),
            other => return Err(anyhow!("unknown track flag '{}'", other)),
        }
    }
    Ok(track)
}

/// Pick the default track
pub fn select(
    kind: &str,
    tracks: &[String],
    preferred: &str,
    system: &[String],
    format: &str,
) -> anyhow::Result<()> {
    let kind: TrackKind = kind.parse().map_err(|_| anyhow!("unknown track kind '{}'", kind))?;
    let tracks = tracks
        .iter()
        .map(|arg| parse_track(kind, arg))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let selector = if system.is_empty() {
        TrackSelector::new(system_languages_from_env())
    } else {
        TrackSelector::new(system)
    };

    let selected = selector.select_default(kind, &tracks, preferred);
    info!(%kind, tracks = tracks.len(), ?selected, "Selection finished");
    print_selection(kind, selected, &tracks, format);
    Ok(())
}

fn print_selection(kind: TrackKind, selected: Option<TrackId>, tracks: &[TrackInfo], format: &str) {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            let track = selected.and_then(|id| tracks.iter().find(|t| t.id == id));
            println!("{}", to_json(&serde_json::json!({ "kind": kind, "selected": selected, "track": track })));
        }
        OutputFormat::Table | OutputFormat::Text => match selected {
            Some(id) => println!("{}", id),
            None => println!("none"),
        },
    }
}

#[derive(Tabled)]
struct EventRow {
    at: String,
    event: &'static str,
    payload: String,
}

/// Run a scenario and print its event stream
pub fn simulate(path: &Path, config: Option<&Path>, format: &str) -> anyhow::Result<()> {
    let scenario = Scenario::from_file(path).with_context(|| format!("reading {}", path.display()))?;
    let config = match config {
        Some(config) => PlayerConfig::from_file(config)?,
        None => PlayerConfig::default(),
    };
    info!(steps = scenario.steps.len(), "Running scenario");
    let timeline = scenario::run(&scenario, config);

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&timeline)),
        OutputFormat::Table => {
            let rows = timeline.iter().map(|timed| EventRow {
                at: format!("{}ms", timed.at),
                event: timed.event.name(),
                payload: timed.event.to_json(),
            });
            println!("{}", to_table(rows));
        }
        OutputFormat::Text => {
            for timed in &timeline {
                println!("{:>8}ms  {}", timed.at, timed.event.to_json());
            }
        }
    }

    Ok(())
}
