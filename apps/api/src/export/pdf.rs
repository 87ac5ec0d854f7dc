//! PDF export via LibreOffice: the PPTX is written to a scratch directory and
//! converted with `soffice --headless --convert-to pdf`.
//!
//! Each conversion gets its own user profile inside the scratch directory. Headless
//! instances sharing a profile lock each other out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

const WINDOWS_CANDIDATES: [&str; 2] = [
    r"C:\Program Files\LibreOffice\program\soffice.exe",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
];

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("LibreOffice not found. Please install it to convert to PDF ({0})")]
    NotFound(String),

    #[error("PDF conversion timed out after {0} seconds")]
    Timeout(u64),

    #[error("Failed to convert to PDF: {0}")]
    Conversion(String),

    #[error("PDF conversion I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct PdfConverter {
    soffice: PathBuf,
    timeout: Duration,
}

impl PdfConverter {
    /// `explicit` wins; otherwise the Windows install locations are probed, then `soffice`
    /// is looked up on `PATH`.
    pub fn new(explicit: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            soffice: resolve_soffice(explicit),
            timeout,
        }
    }

    pub fn soffice(&self) -> &Path {
        &self.soffice
    }

    /// Converts PPTX bytes to PDF bytes.
    pub async fn convert_pptx(&self, pptx: &[u8]) -> Result<Vec<u8>, PdfError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("presentation.pptx");
        let output = scratch.path().join("presentation.pdf");
        let profile = scratch.path().join("profile");
        tokio::fs::write(&input, pptx).await?;

        debug!(
            "Running {} on {}",
            self.soffice.display(),
            input.display()
        );
        let run = Command::new(&self.soffice)
            .arg(format!("-env:UserInstallation={}", file_url(&profile)))
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(scratch.path())
            .arg(&input)
            .kill_on_drop(true)
            .output();

        let result = match tokio::time::timeout(self.timeout, run).await {
            Err(_) => return Err(PdfError::Timeout(self.timeout.as_secs())),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PdfError::NotFound(self.soffice.display().to_string()))
            }
            Ok(result) => result?,
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(PdfError::Conversion(if stderr.is_empty() {
                format!("soffice exited with {}", result.status)
            } else {
                stderr
            }));
        }

        let pdf = tokio::fs::read(&output).await.map_err(|e| {
            PdfError::Conversion(format!("soffice produced no PDF ({e})"))
        })?;
        info!("Converted presentation to PDF ({} bytes)", pdf.len());
        Ok(pdf)
    }
}

/// `file://` URL for an absolute path, as LibreOffice expects for `UserInstallation`.
fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/").replace(' ', "%20");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

fn resolve_soffice(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if cfg!(windows) {
        if let Some(found) = WINDOWS_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            return found;
        }
    }
    PathBuf::from("soffice")
}
