use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, ResultExt};

pub const REPORT_FILE: &str = "report.json";

/// Filesystem-safe version of a company name.
pub fn safe_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        "unnamed".to_string()
    } else {
        joined
    }
}

/// Writes `report` to `<output_dir>/<name>_<YYYYmmdd_HHMMSS>/report.json`,
/// creating the directory, and returns the file path.
pub async fn save_report<T: Serialize>(output_dir: &Path, name: &str, report: &T) -> Result<PathBuf, AppError> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let dir = output_dir.join(format!("{}_{}", safe_name(name), stamp));

    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    tracing::info!("Report saved to {}", path.display());
    Ok(path)
}
