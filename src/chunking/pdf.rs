//! PDF Chunker
//!
//! Extracts the text runs of every page with `pdf-extract` and hands the
//! concatenated text to the window chunker.

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use super::{Chunk, Chunker, WindowChunker};
use crate::error::UploadError;

/// The only MIME type the upload surface accepts
pub const PDF_MIME: &str = "application/pdf";

/// A file handed to the session: display name, declared type and raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, sniffing its type from content and extension
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime = sniff_mime(&name, &bytes);
        Ok(Self { name, mime, bytes })
    }

    pub fn is_pdf(&self) -> bool {
        self.mime.eq_ignore_ascii_case(PDF_MIME)
    }
}

/// Guess a MIME type from the `%PDF-` magic header, falling back to the
/// file extension.
pub fn sniff_mime(name: &str, bytes: &[u8]) -> String {
    let has_pdf_ext = Path::new(name)
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if bytes.starts_with(b"%PDF-") || has_pdf_ext {
        PDF_MIME.to_string()
    } else {
        "application/octet-stream".to_string()
    }
}

/// Pull the raw text out of a PDF held in memory.
///
/// `pdf-extract` can panic on malformed input, so the call is isolated and a
/// panic is reported as an unreadable document.
pub fn extract_text(bytes: &[u8]) -> Result<String, UploadError> {
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => return Err(UploadError::Unreadable(e.to_string())),
        Err(_) => return Err(UploadError::Unreadable("PDF parser panicked".to_string())),
    };

    if text.trim().is_empty() {
        return Err(UploadError::NoText);
    }

    debug!(chars = text.chars().count(), "extracted PDF text");
    Ok(text)
}

/// Extracts and chunks PDF uploads
#[derive(Debug, Clone)]
pub struct PdfChunker {
    window: WindowChunker,
}

impl PdfChunker {
    pub fn new() -> Self {
        Self {
            window: WindowChunker::new(),
        }
    }

    pub fn with_sizes(chunk_size: usize, overlap: usize) -> Self {
        Self {
            window: WindowChunker::with_sizes(chunk_size, overlap),
        }
    }

    /// Validate the upload, extract its text and split it into chunks
    pub fn process(&self, upload: &Upload) -> Result<Vec<Chunk>, UploadError> {
        if !upload.is_pdf() {
            return Err(UploadError::UnsupportedType(upload.mime.clone()));
        }

        let text = extract_text(&upload.bytes)?;
        let chunks = self.window.chunk(&text);
        if chunks.is_empty() {
            return Err(UploadError::NoText);
        }
        Ok(chunks)
    }
}

impl Default for PdfChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for PdfChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.window.chunk(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_mime_from_magic() {
        assert_eq!(sniff_mime("report", b"%PDF-1.7\n..."), PDF_MIME);
    }

    #[test]
    fn test_sniff_mime_from_extension() {
        assert_eq!(sniff_mime("Report.PDF", b""), PDF_MIME);
        assert_eq!(sniff_mime("notes.txt", b"hello"), "application/octet-stream");
    }

    #[test]
    fn test_non_pdf_rejected() {
        let upload = Upload::new("notes.txt", "text/plain", b"hello".to_vec());
        let err = PdfChunker::new().process(&upload).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType(ref m) if m == "text/plain"));
    }

    #[test]
    fn test_garbage_pdf_is_unreadable() {
        let upload = Upload::new("broken.pdf", PDF_MIME, b"%PDF-1.4 not really".to_vec());
        let err = PdfChunker::new().process(&upload).unwrap_err();
        assert!(matches!(err, UploadError::Unreadable(_) | UploadError::NoText));
    }

    #[test]
    fn test_from_path_reads_name_and_type() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let upload = Upload::from_path(&path).unwrap();
        assert_eq!(upload.name, "doc.pdf");
        assert!(upload.is_pdf());
        assert_eq!(upload.bytes, b"%PDF-1.4");
    }

    #[test]
    fn test_chunker_trait_delegates_to_window() {
        let chunker = PdfChunker::with_sizes(5, 2);
        assert_eq!(chunker.chunk("AAAA BBBB CCCC").len(), 5);
    }
}
