use crate::db::{Database, ExportRecord};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Result of an export attempt as reported to the UI and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExportOutcome {
    Success { path: String },
    Cancelled,
    Error { message: String },
}

pub fn render_export(records: &[ExportRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("Failed to serialize export data")
}

/// Writes every log entry to `path`. Failures are reported in the outcome, never propagated.
pub fn write_export(db_path: &Path, path: Option<&Path>) -> ExportOutcome {
    let Some(path) = path.filter(|path| !path.as_os_str().is_empty()) else {
        info!("export cancelled");
        return ExportOutcome::Cancelled;
    };

    match try_write_export(db_path, path) {
        Ok(count) => {
            info!(path = %path.display(), entries = count, "export written");
            ExportOutcome::Success {
                path: path.display().to_string(),
            }
        }
        Err(error) => {
            error!(error = %format!("{error:#}"), path = %path.display(), "export failed");
            ExportOutcome::Error {
                message: format!("{error:#}"),
            }
        }
    }
}

fn try_write_export(db_path: &Path, path: &Path) -> Result<usize> {
    let records = Database::open(db_path)?.export_all()?;
    let content = render_export(&records)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;

    Ok(records.len())
}

pub fn resolve_output(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| crate::config::expand_home(trimmed))
}
