//! Output file naming for captures.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};

use crate::error::RecordError;

const DEFAULT_EXTENSION: &str = "mp3";

/// Give up on finding a free name after this many collisions.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// File extension for a stream's `Content-Type`.
///
/// Audio is stored as received, so the extension only mirrors the codec the
/// server announced. Unknown or missing types fall back to `mp3`.
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let Some(content_type) = content_type else {
        return DEFAULT_EXTENSION;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "audio/aac" | "audio/aacp" | "audio/x-aac" => "aac",
        "audio/ogg" | "application/ogg" | "audio/vorbis" => "ogg",
        "audio/opus" => "opus",
        "audio/flac" | "audio/x-flac" => "flac",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        _ => DEFAULT_EXTENSION,
    }
}

/// `recording-<timestamp>.<ext>`, with a `-<n>` suffix for retries after a collision.
pub fn output_file_name(timestamp: i64, extension: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("recording-{timestamp}.{extension}")
    } else {
        format!("recording-{timestamp}-{attempt}.{extension}")
    }
}

/// Create the output directory if needed.
pub async fn ensure_output_dir(dir: &Path) -> Result<(), RecordError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| RecordError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })
}

/// Create a new, never pre-existing, output file inside `dir`.
pub async fn create_output_file(
    dir: &Path,
    timestamp: i64,
    extension: &str,
) -> Result<(PathBuf, File), RecordError> {
    let mut attempt = 0;
    loop {
        let path = dir.join(output_file_name(timestamp, extension, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                attempt += 1;
            }
            Err(source) => return Err(RecordError::OutputFile { path, source }),
        }
    }
}
