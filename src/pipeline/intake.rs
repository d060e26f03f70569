//! Upload intake: validates one multipart image field and stages it on disk
//! for the duration of a single request.
//!
//! The staged file is owned by a [`StagedUpload`] guard. Whoever holds the
//! guard must call `release()` when the pipeline finishes; if the guard is
//! dropped without it (panic, early return) the file is still deleted.
//! Deletion failures are logged and never propagated — cleanup must not mask
//! the primary outcome.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Extensions accepted for receipt uploads.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// Declared MIME types accepted for receipt uploads.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("nenhuma imagem foi enviada")]
    NoFile,

    #[error("tipo de arquivo não suportado: {0}")]
    UnsupportedType(String),

    #[error("arquivo com {size} bytes excede o limite de {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("falha ao gravar arquivo enviado: {0}")]
    Io(#[from] std::io::Error),
}

/// One file field as read from the multipart request.
#[derive(Debug)]
pub struct UploadField {
    pub original_name: String,
    pub declared_mime: String,
    pub bytes: Vec<u8>,
}

/// Guard over the staged file. Deletes the file at most once: either via
/// `release()` or, as a safety net, on drop.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    released: bool,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file. Consumes the guard, so release happens
    /// exactly once per upload.
    pub fn release(mut self) {
        self.released = true;
        delete_quiet(&self.path);
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!(path = %self.path.display(), "staged upload dropped without release");
            delete_quiet(&self.path);
        }
    }
}

fn delete_quiet(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), "failed to remove staged file: {e}");
        }
    }
}

/// Validate an uploaded image and write it into `staging_dir` under a
/// collision-resistant name. Validation runs before any disk write, so a
/// rejected upload leaves nothing behind.
pub fn stage_upload(
    staging_dir: &Path,
    upload: UploadField,
    max_bytes: usize,
) -> Result<StagedUpload, IntakeError> {
    let ext = extension_of(&upload.original_name)
        .ok_or_else(|| IntakeError::UnsupportedType(upload.original_name.clone()))?;

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(IntakeError::UnsupportedType(upload.original_name.clone()));
    }
    if !ALLOWED_MIME_TYPES.contains(&upload.declared_mime.to_lowercase().as_str()) {
        return Err(IntakeError::UnsupportedType(upload.declared_mime.clone()));
    }
    if upload.bytes.len() > max_bytes {
        return Err(IntakeError::TooLarge {
            size: upload.bytes.len(),
            limit: max_bytes,
        });
    }

    std::fs::create_dir_all(staging_dir)?;

    // timestamp + random suffix keeps concurrent uploads from colliding
    let filename = format!(
        "imagem-{}-{}.{ext}",
        chrono::Utc::now().timestamp_millis(),
        rand::random::<u32>(),
    );
    let path = staging_dir.join(filename);
    std::fs::write(&path, &upload.bytes)?;

    tracing::debug!(path = %path.display(), size = upload.bytes.len(), "upload staged");

    Ok(StagedUpload {
        path,
        released: false,
    })
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
