//! Configuration file editor command.
//!
//! Opens the radioscope config file in the user's preferred editor,
//! writing the commented default template first if no file exists.

use crate::config::{config_path, DEFAULT_CONFIG};
use std::fs;
use std::path::Path;
use std::process::Command;

/// Opens the config file in the user's preferred editor.
///
/// Tries `$EDITOR`, then nano, then vi.
///
/// # Errors
/// - If the config file cannot be created
/// - If no editor can be found or executed
/// - If the editor exits unsuccessfully
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = config_path()?;
    ensure_config_file(&config_path)?;

    tracing::info!("Opening config file: {}", config_path.display());

    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open editor '{editor}': {e}. Make sure the editor is installed and accessible."
            )
        })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    tracing::info!("Config file edited successfully");
    Ok(())
}

/// Writes the default template to `path` unless a file is already there.
///
/// Returns `true` if the file was created.
fn ensure_config_file(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create config directory: {e}"))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;

    tracing::info!("Created default config file: {}", path.display());
    Ok(true)
}

fn find_editor() -> anyhow::Result<String> {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    for editor in ["nano", "vi"] {
        if is_editor_available(editor) {
            return Ok(editor.to_string());
        }
    }

    Err(anyhow::anyhow!(
        "No editor found. Please set the $EDITOR environment variable."
    ))
}

fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
