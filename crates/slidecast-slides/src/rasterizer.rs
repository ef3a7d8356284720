//! PDF to PNG conversion.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::errors::{Result, SlideError};
use crate::library::SlideLibrary;
use crate::naming::is_pdf_name;

/// Result of converting one document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterOutcome {
    /// Number of slide images now in the session directory.
    pub slide_count: u32,
}

/// Converts a staged document into the session's numbered image set.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Convert `pdf` into `slide-NN.png` images for `session_id`, replacing
    /// any previous set.
    async fn convert(&self, pdf: &Path, session_id: &str) -> Result<RasterOutcome>;
}

/// Shells out to poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    library: SlideLibrary,
    command: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    /// Rasterizer writing into `library` with the given binary and resolution.
    pub fn new(library: SlideLibrary, command: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            library,
            command: command.into(),
            dpi,
        }
    }

    /// Slide library this rasterizer writes into.
    pub fn library(&self) -> &SlideLibrary {
        &self.library
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    #[instrument(skip(self), fields(command = %self.command.display()))]
    async fn convert(&self, pdf: &Path, session_id: &str) -> Result<RasterOutcome> {
        let name = pdf.to_string_lossy();
        if !is_pdf_name(&name) {
            return Err(SlideError::NotPdf(name.into_owned()));
        }
        let out_dir = self.library.reset_session(session_id).await?;

        let output = tokio::process::Command::new(&self.command)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf)
            .arg(out_dir.join("slide"))
            .output()
            .await
            .map_err(|source| SlideError::ToolMissing {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SlideError::Rasterize {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let _ = self.library.normalize(session_id).await?;
        let slide_count = self.library.count_slides(session_id).await?;
        info!(session_id, slide_count, "converted PDF to slides");
        Ok(RasterOutcome { slide_count })
    }
}
