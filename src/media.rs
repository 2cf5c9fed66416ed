//! Local filesystem store for uploaded images and videos.
//!
//! Callers only ever see an opaque reference (a generated file name). The
//! store decides where bytes live and hands the same reference back for
//! reads and deletion.

use bytes::Bytes;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// URL prefix under which stored media is served.
pub const PUBLIC_PREFIX: &str = "/static/uploads";

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Upload {
    /// Declared content type, falling back to a guess from the file name.
    pub fn mime_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_or_octet_stream()
                    .to_string()
            })
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `data` and return the new reference. Only the extension of
    /// `suggested_name` survives; the rest of the name is generated.
    pub fn store(&self, data: &[u8], suggested_name: &str) -> AppResult<String> {
        let reference = generate_reference(suggested_name);
        let path = self.root.join(&reference);
        std::fs::write(&path, data)?;
        tracing::debug!("Stored media {} ({} bytes)", reference, data.len());
        Ok(reference)
    }

    pub fn store_upload(&self, upload: &Upload) -> AppResult<String> {
        self.store(&upload.data, &upload.file_name)
    }

    /// Remove a stored object. Missing objects and failed removals are
    /// logged, never surfaced.
    pub fn release(&self, reference: &str) {
        let Some(path) = self.resolve(reference) else {
            tracing::warn!("Refusing to release invalid media reference {:?}", reference);
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Released media {}", reference),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to release media {}: {}", reference, e),
        }
    }

    /// Read a stored object. A missing object is `None`, not an error.
    pub fn read(&self, reference: &str) -> AppResult<Option<Vec<u8>>> {
        let path = self.resolve(reference).ok_or(AppError::NotFound)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, reference: &str) -> bool {
        self.resolve(reference).is_some_and(|p| p.is_file())
    }

    /// Map a reference to a path inside the root, rejecting anything that
    /// is not a plain file name.
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        if !is_plain_name(reference) {
            return None;
        }
        Some(self.root.join(reference))
    }
}

/// Public URL for a stored reference.
pub fn url_for(reference: &str) -> String {
    format!("{}/{}", PUBLIC_PREFIX, reference)
}

fn is_plain_name(reference: &str) -> bool {
    !reference.is_empty()
        && reference != "."
        && reference != ".."
        && !reference.contains(['/', '\\', '\0'])
}

fn generate_reference(suggested_name: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix = hex::encode(rand::random::<[u8; 3]>());
    format!("{}_{}{}", stamp, suffix, sanitized_extension(suggested_name))
}

/// Lower-cased extension with a leading dot, restricted to ASCII
/// alphanumerics. Empty when the name has no usable extension.
fn sanitized_extension(name: &str) -> String {
    let ext: String = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    if ext.is_empty() {
        String::new()
    } else {
        format!(".{}", ext)
    }
}
