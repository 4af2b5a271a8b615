//! Helpers for the `pixelframe` command-line uploader.

use anyhow::{Context, Result};
use bytes::Bytes;
use pixelframe_core::{RawFile, UploaderConfig, UploaderEvent};
use std::path::{Path, PathBuf};

/// Declared media type of a file, guessed from its extension.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Read the files of one selection, the way a file picker would offer them.
///
/// Paths not matching the configured accept list are skipped, and only the
/// first remaining file is kept unless `multiple` is enabled.
pub async fn read_selection(paths: &[PathBuf], config: &UploaderConfig) -> Result<Vec<RawFile>> {
    let accept = config.accept_list();
    let mut files = Vec::new();

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = content_type_for(path);

        if !accept.matches(&name, &content_type) {
            tracing::warn!(
                file = %name,
                content_type = %content_type,
                "Skipping file outside accept list"
            );
            continue;
        }

        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(RawFile::new(name, content_type, Bytes::from(data)));

        if !config.multiple {
            break;
        }
    }

    Ok(files)
}

/// One JSON line per event: `{"event": "<full name>", "detail": {...}}`.
pub fn event_line(event: &UploaderEvent) -> Result<String> {
    let mut value = serde_json::to_value(event).context("Serialize event")?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("event".to_string(), serde_json::json!(event.name()));
    }
    serde_json::to_string(&value).context("Serialize event")
}

/// Initialize tracing for CLI binaries.
///
/// Logs go to stderr; stdout carries the event stream.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelframe_core::UnitId;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn selection_honours_accept_and_multiple() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write(&dir, "notes.txt"),
            write(&dir, "a.png"),
            write(&dir, "b.mp4"),
        ];

        let mut config = UploaderConfig::default();
        let single = read_selection(&paths, &config).await.unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].name, "a.png");
        assert_eq!(single[0].content_type, "image/png");

        config.multiple = true;
        let all = read_selection(&paths, &config).await.unwrap();
        let names: Vec<_> = all.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.mp4"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.png");
        assert!(read_selection(&[missing], &UploaderConfig::default())
            .await
            .is_err());
    }

    #[test]
    fn event_line_uses_full_event_name() {
        let line = event_line(&UploaderEvent::Progress {
            id: UnitId::from("unit-1"),
            progress: 40,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "pixelframe-uploader-progress");
        assert_eq!(value["detail"]["progress"], 40);

        let line = event_line(&UploaderEvent::ProcessStart).unwrap();
        assert!(line.contains("pixelframe-uploader-process-start"));
    }
}
