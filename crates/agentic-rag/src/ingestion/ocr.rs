//! OCR for scanned PDFs (pdftoppm + tesseract)
//!
//! OCR is best effort: missing tools or failures yield empty text.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// Text recovered by OCR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOutput {
    /// Page texts as `[Page N OCR]` blocks separated by blank lines
    pub text: String,
    /// Number of rendered page images
    pub images_processed: usize,
}

/// Check if tesseract is available
pub fn has_tesseract() -> bool {
    Command::new("tesseract")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check if pdftoppm is available (`-v` prints to stderr, so only spawning is checked)
pub fn has_pdftoppm() -> bool {
    Command::new("pdftoppm").arg("-v").output().is_ok()
}

fn tools_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        let available = has_pdftoppm() && has_tesseract();
        if !available {
            tracing::info!("OCR disabled: pdftoppm and tesseract are required");
        }
        available
    })
}

/// OCR engine for PDF uploads
#[derive(Debug, Clone)]
pub struct OcrEngine {
    config: OcrConfig,
}

impl OcrEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Whether OCR will actually run
    pub fn is_available(&self) -> bool {
        self.config.enabled && tools_available()
    }

    /// OCR every page of a PDF; never fails
    pub fn extract(&self, filename: &str, data: &[u8]) -> OcrOutput {
        if !filename.to_lowercase().ends_with(".pdf") || !self.is_available() {
            return OcrOutput::default();
        }

        match self.run(data) {
            Ok(output) => {
                if !output.text.is_empty() {
                    tracing::info!(
                        "OCR extracted {} characters from {} page images of {}",
                        output.text.len(),
                        output.images_processed,
                        filename
                    );
                }
                output
            }
            Err(e) => {
                tracing::warn!("OCR failed for {}: {}", filename, e);
                OcrOutput::default()
            }
        }
    }

    fn run(&self, data: &[u8]) -> Result<OcrOutput> {
        let temp_dir = tempfile::Builder::new().prefix("agentic-rag-ocr-").tempdir()?;
        let pdf_path = temp_dir.path().join("input.pdf");
        fs::write(&pdf_path, data)?;

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.config.dpi.to_string())
            .arg(&pdf_path)
            .arg(temp_dir.path().join("page"))
            .output()
            .map_err(|e| Error::Internal(format!("pdftoppm failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Internal(format!("pdftoppm error: {}", stderr)));
        }

        let mut page_images: Vec<_> = fs::read_dir(temp_dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        page_images.sort();

        let mut blocks = Vec::new();
        for (i, image_path) in page_images.iter().enumerate() {
            match self.ocr_image(image_path) {
                Ok(text) if !text.trim().is_empty() => {
                    blocks.push(format!("[Page {} OCR]\n{}", i + 1, text.trim()));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("tesseract failed on page {}: {}", i + 1, e),
            }
        }

        Ok(OcrOutput {
            text: blocks.join("\n\n"),
            images_processed: page_images.len(),
        })
    }

    fn ocr_image(&self, image_path: &Path) -> Result<String> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .output()
            .map_err(|e| Error::Internal(format!("tesseract failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Internal(format!("tesseract error: {}", stderr)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
