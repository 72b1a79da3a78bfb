//! One-shot now-playing lookup.

use crate::config::RadioscopeConfig;
use crate::source::{probe_tags, TrackInfo};

/// Prints the current artist and title of a stream.
///
/// # Errors
/// - If the config file is invalid
/// - If ffprobe is missing, fails, or times out
pub async fn handle_probe(url: String) -> anyhow::Result<()> {
    let file = RadioscopeConfig::load()?;
    let tags = probe_tags(&url, file.metadata.timeout()).await?;

    let mut track = TrackInfo::default();
    if !track.apply_tags(&tags) {
        tracing::info!("No track metadata for {}", url);
        println!("No track information available for {url}");
        return Ok(());
    }

    tracing::info!("Probed {}: {}", url, track.raw);
    print!("{}", describe(&track));
    Ok(())
}

fn describe(track: &TrackInfo) -> String {
    let mut out = String::new();
    if !track.artist.is_empty() {
        out.push_str(&format!("Artist: {}\n", track.artist));
    }
    if !track.title.is_empty() {
        out.push_str(&format!("Title:  {}\n", track.title));
    }
    out.push_str(&format!("Raw:    {}\n", track.raw));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_full_track() {
        let track = TrackInfo {
            artist: "Artist".to_string(),
            title: "Song".to_string(),
            raw: "Artist - Song".to_string(),
        };
        assert_eq!(
            describe(&track),
            "Artist: Artist\nTitle:  Song\nRaw:    Artist - Song\n"
        );
    }

    #[test]
    fn test_describe_raw_only() {
        let track = TrackInfo {
            raw: "Station Jingle".to_string(),
            ..Default::default()
        };
        assert_eq!(describe(&track), "Raw:    Station Jingle\n");
    }
}
