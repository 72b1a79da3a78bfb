//! Display recent log entries from the application.

use crate::logging::{self, LOG_FILE_PREFIX};
use anyhow::anyhow;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LINES: usize = 50;

/// Prints the last lines of the most recent log file.
///
/// A missing log directory or empty log is reported, not treated as an error.
///
/// # Errors
/// - If the log directory cannot be determined or read
/// - If the log file cannot be read
pub fn handle_logs() -> Result<(), anyhow::Error> {
    let log_dir = logging::log_dir()?;

    if !log_dir.exists() {
        println!("Log directory does not exist yet: {}", log_dir.display());
        println!("Logs will be created when radioscope runs.");
        return Ok(());
    }

    let Some(log_file) = find_latest_log(&log_dir)? else {
        println!("No log files found in: {}", log_dir.display());
        println!("Run 'radioscope <URL>' to generate logs.");
        return Ok(());
    };

    let content =
        fs::read_to_string(&log_file).map_err(|e| anyhow!("Failed to read log file: {e}"))?;

    if content.is_empty() {
        println!("Log file is empty: {}", log_file.display());
        return Ok(());
    }

    let lines = tail(&content, DEFAULT_LINES);
    let total = content.lines().count();

    if lines.len() < total {
        println!("Showing last {} of {} lines:", lines.len(), total);
    } else {
        println!("Showing all {total} lines:");
    }
    println!("Full log file at: {}", log_file.display());
    println!();

    for line in lines {
        println!("{line}");
    }

    Ok(())
}

/// Returns at most the last `count` lines of `content`.
fn tail(content: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].to_vec()
}

/// Finds the most recently modified log file in the directory.
fn find_latest_log(log_dir: &Path) -> Result<Option<PathBuf>, anyhow::Error> {
    let entries =
        fs::read_dir(log_dir).map_err(|e| anyhow!("Failed to read log directory: {e}"))?;

    let mut latest: Option<(PathBuf, std::time::SystemTime)> = None;

    for entry in entries {
        let path = entry
            .map_err(|e| anyhow!("Failed to read directory entry: {e}"))?
            .path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        {
            continue;
        }

        let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        if latest.as_ref().map_or(true, |(_, newest)| modified > *newest) {
            latest = Some((path, modified));
        }
    }

    Ok(latest.map(|(path, _)| path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_short_content() {
        assert_eq!(tail("a\nb\n", 50), vec!["a", "b"]);
    }

    #[test]
    fn test_tail_long_content() {
        let content: String = (0..60).map(|i| format!("line {i}\n")).collect();
        let lines = tail(&content, 50);
        assert_eq!(lines.len(), 50);
        assert_eq!(lines[0], "line 10");
        assert_eq!(lines[49], "line 59");
    }

    #[test]
    fn test_find_latest_log_ignores_other_files() {
        let dir = std::env::temp_dir().join(format!("radioscope-tail-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        assert!(find_latest_log(&dir).unwrap().is_none());

        fs::write(dir.join("unrelated.txt"), "x").unwrap();
        fs::write(dir.join("radioscope.log.2026-10-16"), "x").unwrap();

        let latest = find_latest_log(&dir).unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap(), "radioscope.log.2026-10-16");

        fs::remove_dir_all(&dir).unwrap();
    }
}
