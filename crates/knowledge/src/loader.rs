//! Document loading.
//!
//! Turns a source file into page-level text units tagged with the file name.
//! PDF extraction is CPU-bound and runs on the blocking pool.

use std::path::{Path, PathBuf};

use luxas_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::types::sha256_hex;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Text,
    Markdown,
}

impl DocumentFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(AppError::UnsupportedFormat(format!(
                "{} (extension '{}')",
                path.display(),
                ext
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::Markdown => "markdown",
        }
    }
}

/// Text of one page, or of the whole file for unpaginated formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File name, used as the citation key
    pub source: String,
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub pages: Vec<PageText>,
    pub byte_count: u64,
    /// SHA-256 of the raw file bytes
    pub content_hash: String,
}

impl LoadedDocument {
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }

    /// All pages joined by blank lines.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Citation key for a file: its file name.
pub fn source_name(path: &Path) -> AppResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::Document(format!("Invalid file name: {}", path.display())))
}

/// Read and decode a document.
pub fn load_document(path: &Path) -> AppResult<LoadedDocument> {
    let format = DocumentFormat::from_path(path)?;
    let source = source_name(path)?;

    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Document(format!("Failed to read {}: {}", path.display(), e)))?;

    let pages = match format {
        DocumentFormat::Pdf => extract_pdf_pages(path, &bytes)?,
        DocumentFormat::Text | DocumentFormat::Markdown => {
            let text = String::from_utf8(bytes.clone()).map_err(|_| {
                AppError::Document(format!("{} is not valid UTF-8", path.display()))
            })?;
            vec![PageText { page: None, text }]
        }
    };

    tracing::debug!(
        source = %source,
        format = format.as_str(),
        pages = pages.len(),
        bytes = bytes.len(),
        "Loaded document"
    );

    Ok(LoadedDocument {
        source,
        path: path.to_path_buf(),
        format,
        pages,
        byte_count: bytes.len() as u64,
        content_hash: sha256_hex(&bytes),
    })
}

/// Load a document on the blocking thread pool.
pub async fn load_document_blocking(path: PathBuf) -> AppResult<LoadedDocument> {
    let display = path.display().to_string();
    tokio::task::spawn_blocking(move || load_document(&path))
        .await
        .map_err(|e| AppError::Document(format!("Loader crashed on {}: {}", display, e)))?
}

fn extract_pdf_pages(path: &Path, bytes: &[u8]) -> AppResult<Vec<PageText>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
        AppError::Document(format!("Failed to extract text from {}: {}", path.display(), e))
    })?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText {
            page: Some(i as u32 + 1),
            text,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("data/LOI_123.PDF")).unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.md")).unwrap(),
            DocumentFormat::Markdown
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("expose.txt")).unwrap(),
            DocumentFormat::Text
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let err = DocumentFormat::from_path(Path::new("rapport.docx")).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));

        let err = DocumentFormat::from_path(Path::new("README")).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_text_document() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("loi_123.txt");
        std::fs::write(&path, "Article 1\n\nLa présente loi a pour objet...").unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc.source, "loi_123.txt");
        assert_eq!(doc.format, DocumentFormat::Text);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].page, None);
        assert!(doc.pages[0].text.starts_with("Article 1"));
        assert_eq!(doc.content_hash.len(), 64);
    }

    #[test]
    fn test_source_is_stable_across_loads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("loi_123.md");
        std::fs::write(&path, "# Exposé des motifs").unwrap();

        let first = load_document(&path).unwrap();
        let second = load_document(&path).unwrap();
        assert_eq!(first.source, second.source);
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn test_invalid_utf8_is_document_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, AppError::Document(_)));
    }

    #[test]
    fn test_corrupt_pdf_is_document_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, AppError::Document(_)));
    }

    #[tokio::test]
    async fn test_blocking_loader() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "texte").unwrap();

        let doc = load_document_blocking(path).await.unwrap();
        assert_eq!(doc.char_count(), 5);
        assert!(!doc.is_blank());
    }
}
