//! Cosmetic canonicalization of the merged output, dispatched on file extension.
//!
//! Formatting must never block a fix from being applied: every failure path
//! (unparseable content, missing external tool, non-zero exit) logs a warning
//! and degrades to the input unchanged.

use std::{path::Path, process::Command};

/// Canonicalize `content` according to the target file's extension.
///
/// Unknown extensions are returned unchanged.
pub fn format_content(path: &Path, content: &str) -> String {
	match path.extension().and_then(|e| e.to_str()) {
		Some("yaml" | "yml") => format_yaml(content).unwrap_or_else(|| {
			tracing::warn!(path = %path.display(), "yaml parse failed, leaving content unformatted");
			content.to_string()
		}),
		Some("json") => format_json(content).unwrap_or_else(|| {
			tracing::warn!(path = %path.display(), "json parse failed, leaving content unformatted");
			content.to_string()
		}),
		Some("tf") => format_terraform(content).unwrap_or_else(|| {
			tracing::warn!(path = %path.display(), "terraform fmt unavailable or failed, leaving content unformatted");
			content.to_string()
		}),
		_ => content.to_string(),
	}
}

fn format_yaml(content: &str) -> Option<String> {
	let value: serde_yaml::Value = serde_yaml::from_str(content).ok()?;
	serde_yaml::to_string(&value).ok()
}

fn format_json(content: &str) -> Option<String> {
	let value: serde_json::Value = serde_json::from_str(content).ok()?;
	let mut pretty = serde_json::to_string_pretty(&value).ok()?;
	pretty.push('\n');
	Some(pretty)
}

/// Delegate to the external `terraform fmt` tool through a scratch file.
///
/// The scratch file lives in a tempdir that is removed when the guard drops,
/// whatever the outcome.
fn format_terraform(content: &str) -> Option<String> {
	let dir = tempfile::tempdir().ok()?;
	let scratch = dir.path().join("autoheal.tf");
	std::fs::write(&scratch, content).ok()?;

	let status = Command::new("terraform").arg("fmt").arg(&scratch).status().ok()?;
	if !status.success() {
		return None;
	}

	std::fs::read_to_string(&scratch).ok()
}
