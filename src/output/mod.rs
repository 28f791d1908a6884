use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::pipeline::event::VideoResult;

/// Save collected video results to a file
pub async fn save_to_file(
    results: &[VideoResult],
    path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let content = match format {
        OutputFormat::Text => format_as_text(results),
        OutputFormat::Json => format_as_json(results)?,
    };

    fs_err::write(path, content)?;
    Ok(())
}

/// Load previously saved video results from a JSON file
pub fn load_from_file(path: &Path) -> Result<Vec<VideoResult>> {
    let content = fs_err::read_to_string(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse transcripts from {}", path.display()))
}

/// Render results as titled plain-text blocks
pub fn format_as_text(results: &[VideoResult]) -> String {
    results
        .iter()
        .map(|r| format!("=== {} ===\n{}\n\n{}", r.title, r.url, r.transcript))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render results as a JSON array
pub fn format_as_json(results: &[VideoResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("Failed to serialize results")
}
