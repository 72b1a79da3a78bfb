//! Stream metadata lookup via ffprobe.
//!
//! Internet radio servers publish the current track as an ICY `StreamTitle`
//! tag, usually formatted `Artist - Title`, and the station name as
//! `icy-name`. ffprobe reports both under `format.tags` in its JSON output.

use super::ffmpeg::find_tool;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Tag carrying the current `Artist - Title` string.
pub const STREAM_TITLE_TAG: &str = "StreamTitle";

/// Tag carrying the station name.
pub const STATION_NAME_TAG: &str = "icy-name";

const ARTIST_TITLE_SEPARATOR: &str = " - ";

/// Currently playing track. Empty strings mean unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    /// The tag value exactly as published by the stream.
    pub raw: String,
}

impl TrackInfo {
    /// Updates the track from probed tags and returns whether a known tag was found.
    ///
    /// `StreamTitle` wins over `icy-name`. A station name only replaces the
    /// title and raw text; the artist is left as it was.
    pub fn apply_tags(&mut self, tags: &HashMap<String, String>) -> bool {
        if let Some(stream_title) = tags.get(STREAM_TITLE_TAG) {
            self.raw = stream_title.clone();
            match stream_title.split_once(ARTIST_TITLE_SEPARATOR) {
                Some((artist, title)) => {
                    self.artist = artist.trim().to_string();
                    self.title = title.trim().to_string();
                }
                None => {
                    self.title = stream_title.clone();
                    self.artist.clear();
                }
            }
            true
        } else if let Some(station) = tags.get(STATION_NAME_TAG) {
            self.raw = station.clone();
            self.title = station.clone();
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Extracts `format.tags` from ffprobe's `-print_format json -show_format` output.
///
/// # Errors
/// - If the payload is not valid JSON of the expected shape
pub fn parse_probe_output(json: &[u8]) -> Result<HashMap<String, String>> {
    let output: ProbeOutput =
        serde_json::from_slice(json).context("Malformed ffprobe output")?;
    Ok(output.format.tags)
}

/// Runs ffprobe against `stream_url` and returns the stream's tags.
///
/// The probe is killed if it has not finished within `timeout`.
///
/// # Errors
/// - If ffprobe cannot be found or started
/// - If it times out or exits unsuccessfully
/// - If its output cannot be parsed
pub async fn probe_tags(stream_url: &str, timeout: Duration) -> Result<HashMap<String, String>> {
    let ffprobe = find_tool("ffprobe")?;

    let probe = Command::new(&ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(stream_url)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, probe)
        .await
        .map_err(|_| anyhow!("ffprobe timed out after {}s", timeout.as_secs_f32()))?
        .context("Failed to run ffprobe")?;

    if !output.status.success() {
        return Err(anyhow!("ffprobe exited with {}", output.status));
    }

    parse_probe_output(&output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_stream_title_is_split_on_first_separator() {
        let mut track = TrackInfo::default();
        assert!(track.apply_tags(&tags(&[("StreamTitle", "AC/DC - Back In Black - Live")])));

        assert_eq!(track.artist, "AC/DC");
        assert_eq!(track.title, "Back In Black - Live");
        assert_eq!(track.raw, "AC/DC - Back In Black - Live");
    }

    #[test]
    fn test_stream_title_without_separator() {
        let mut track = TrackInfo {
            artist: "Old Artist".to_string(),
            ..Default::default()
        };
        track.apply_tags(&tags(&[("StreamTitle", "Station Jingle")]));

        assert_eq!(track.title, "Station Jingle");
        assert_eq!(track.artist, "");
    }

    #[test]
    fn test_station_name_fallback() {
        let mut track = TrackInfo {
            artist: "Previous".to_string(),
            ..Default::default()
        };
        track.apply_tags(&tags(&[("icy-name", "Rock Antenne")]));

        assert_eq!(track.title, "Rock Antenne");
        assert_eq!(track.raw, "Rock Antenne");
        assert_eq!(track.artist, "Previous");
    }

    #[test]
    fn test_stream_title_wins_over_station_name() {
        let mut track = TrackInfo::default();
        track.apply_tags(&tags(&[("icy-name", "Radio"), ("StreamTitle", "A - B")]));

        assert_eq!(track.artist, "A");
        assert_eq!(track.title, "B");
    }

    #[test]
    fn test_unknown_tags_leave_track_unchanged() {
        let mut track = TrackInfo {
            title: "Keep".to_string(),
            artist: "Me".to_string(),
            raw: "Me - Keep".to_string(),
        };
        let before = track.clone();

        assert!(!track.apply_tags(&tags(&[("encoder", "Lavf")])));
        assert_eq!(track, before);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "format": {
                "filename": "http://radio.example/stream",
                "tags": { "icy-name": "Radio", "StreamTitle": "A - B" }
            }
        }"#;

        let tags = parse_probe_output(json).unwrap();
        assert_eq!(tags.get("StreamTitle").map(String::as_str), Some("A - B"));
        assert_eq!(tags.get("icy-name").map(String::as_str), Some("Radio"));
    }

    #[test]
    fn test_parse_probe_output_without_tags() {
        let tags = parse_probe_output(br#"{"format": {"filename": "x"}}"#).unwrap();
        assert!(tags.is_empty());
        assert!(parse_probe_output(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_probe_output_rejects_garbage() {
        assert!(parse_probe_output(b"not json").is_err());
    }
}
