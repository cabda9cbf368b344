use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::models::CaptureEvent;

/// ISO-8601 local time with `:` and `.` replaced by `-`, so the value can be
/// used as a file name or object key segment.
pub fn safe_timestamp(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
        .replace([':', '.'], "-")
}

/// `<project>/<employee>/<timestamp>.png`
pub fn artifact_key(project_name: &str, employee_name: &str, timestamp: &str) -> PathBuf {
    PathBuf::from(path_segment(project_name))
        .join(path_segment(employee_name))
        .join(format!("{}.png", path_segment(timestamp)))
}

fn path_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Writes the capture under `root` before it is uploaded.
pub async fn stage_capture(root: &Path, event: &CaptureEvent) -> std::io::Result<PathBuf> {
    let path = root.join(artifact_key(
        &event.project_name,
        &event.employee_name,
        &event.timestamp,
    ));
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &event.png_bytes).await?;
    Ok(path)
}
