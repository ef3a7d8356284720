//! On-disk slide layout.
//!
//! ```text
//! <slides_dir>/<session_id>/slide-01.png
//!                           slide-02.png
//! <uploads_dir>/<unix_millis>-<name>.pdf   (staged, deleted after rasterizing)
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::errors::{Result, SlideError};
use crate::naming::{
    is_valid_session_id, parse_slide_file_name, sanitize_upload_name, slide_file_name,
};

/// Root directories for slide images and staged uploads.
#[derive(Clone, Debug)]
pub struct SlideLibrary {
    slides_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl SlideLibrary {
    /// Library rooted at the given directories. Nothing is created yet.
    pub fn new(slides_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            slides_dir: slides_dir.into(),
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Root of all session slide directories.
    pub fn slides_dir(&self) -> &Path {
        &self.slides_dir
    }

    /// Staging directory for uploads.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Create both root directories.
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.slides_dir).await?;
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        Ok(())
    }

    /// Directory holding one session's slides.
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf> {
        if !is_valid_session_id(session_id) {
            return Err(SlideError::InvalidSessionId(session_id.to_owned()));
        }
        Ok(self.slides_dir.join(session_id))
    }

    /// Path of one slide image. Only `slide-N.png` names resolve.
    pub fn slide_path(&self, session_id: &str, file: &str) -> Result<PathBuf> {
        if parse_slide_file_name(file).is_none() {
            return Err(SlideError::InvalidSlideName(file.to_owned()));
        }
        Ok(self.session_dir(session_id)?.join(file))
    }

    /// Where to stage an upload before rasterizing it.
    pub fn staging_path(&self, original_name: &str) -> PathBuf {
        let stamp = Utc::now().timestamp_millis();
        self.uploads_dir
            .join(format!("{stamp}-{}", sanitize_upload_name(original_name)))
    }

    /// Number of `.png` files in a session directory. A missing directory
    /// counts as zero.
    pub async fn count_slides(&self, session_id: &str) -> Result<u32> {
        let dir = self.session_dir(session_id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.ends_with(".png"))
            {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Rename rasterizer output to the zero-padded `slide-NN.png` form.
    /// Returns how many files were renamed.
    pub async fn normalize(&self, session_id: &str) -> Result<u32> {
        let dir = self.session_dir(session_id)?;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut renamed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(n) = parse_slide_file_name(name) else {
                continue;
            };
            let canonical = slide_file_name(n);
            if canonical != name {
                tokio::fs::rename(entry.path(), dir.join(&canonical)).await?;
                debug!(session_id, from = name, to = %canonical, "normalized slide name");
                renamed += 1;
            }
        }
        Ok(renamed)
    }

    /// Remove every existing slide of a session before a fresh conversion.
    pub async fn reset_session(&self, session_id: &str) -> Result<PathBuf> {
        let dir = self.session_dir(session_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}
