//! Storage of uploaded images and recordings under the upload directory.
//!
//! Files are written to `<upload_dir>/<area>/<name>` and referenced from the
//! database by their public path `/uploads/<area>/<name>`, which is also the
//! URL the static file service answers on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AppError, AppResult};

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads/";

pub const GAZE_AREA: &str = "gaze";
pub const SCREENING_AREA: &str = "screenings";
pub const SPEECH_AREA: &str = "speech-therapy";
pub const TEMP_AREA: &str = "tmp";

/// Largest accepted gaze snapshot.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Largest accepted speech recording.
pub const MAX_AUDIO_BYTES: usize = 50 * 1024 * 1024;

/// Largest accepted screening attachment.
pub const MAX_SCREENING_BYTES: usize = 20 * 1024 * 1024;

/// A file written to disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Path recorded in the database, e.g. `/uploads/gaze/17000-ab12.jpg`.
    pub public_path: String,
    pub disk_path: PathBuf,
}

/// Write `bytes` to a fresh, collision-free name inside `area`.
pub async fn store(root: &Path, area: &str, extension: &str, bytes: &[u8]) -> AppResult<StoredFile> {
    let dir = root.join(area);
    tokio::fs::create_dir_all(&dir).await?;

    let name = format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        sanitize_extension(extension)
    );
    let disk_path = dir.join(&name);
    tokio::fs::write(&disk_path, bytes).await?;

    Ok(StoredFile {
        public_path: format!("{PUBLIC_PREFIX}{area}/{name}"),
        disk_path,
    })
}

/// Map a stored public path back to its location on disk.
///
/// Returns `None` for paths outside the upload directory.
pub fn resolve(root: &Path, public_path: &str) -> Option<PathBuf> {
    let relative = public_path.strip_prefix(PUBLIC_PREFIX)?;
    if relative
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return None;
    }
    Some(root.join(relative))
}

/// Best-effort removal; a file that is already gone is not an error.
pub async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}

fn sanitize_extension(ext: &str) -> String {
    let clean: String = ext
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    if clean.is_empty() {
        "bin".to_string()
    } else {
        clean
    }
}

/// Lower-cased extension of an uploaded file name, without the dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

// ---------------------------------------------------------------------------
// Base64 images
// ---------------------------------------------------------------------------

/// Decode a webcam frame sent either as a data URL
/// (`data:image/png;base64,...`) or as bare base64.
///
/// Returns the bytes and the file extension implied by the MIME type
/// (`jpg` when there is none).
pub fn decode_image(encoded: &str) -> Result<(Vec<u8>, &'static str), base64::DecodeError> {
    let (mime, payload) = match encoded.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((meta, data)) => (meta.split(';').next().unwrap_or(""), data),
            None => ("", rest),
        },
        None => ("", encoded),
    };
    let bytes = STANDARD.decode(payload.trim())?;
    Ok((bytes, image_extension(mime)))
}

fn image_extension(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

pub fn image_extension_for_content_type(content_type: &str) -> Option<&'static str> {
    content_type
        .starts_with("image/")
        .then(|| image_extension(content_type))
}

// ---------------------------------------------------------------------------
// Multipart forms
// ---------------------------------------------------------------------------

/// The file part of a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A parsed multipart form: text fields plus at most one file.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    /// Non-empty text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Numeric text field; unparsable values read as absent.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.text(name).and_then(|v| v.parse().ok())
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.text(name), Some("true" | "1"))
    }
}

/// Read every part of `multipart`, keeping the part named `file_field` as the
/// file and everything else as text.
///
/// Fails with 413 as soon as the file grows past `max_file_bytes`.
pub async fn read_form(
    mut multipart: Multipart,
    file_field: &str,
    max_file_bytes: usize,
) -> AppResult<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == file_field {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?
            {
                if bytes.len() + chunk.len() > max_file_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "File exceeds the {} MB limit",
                        max_file_bytes / (1024 * 1024)
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
            form.file = Some(UploadedFile {
                file_name,
                content_type,
                bytes,
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}
