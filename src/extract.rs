//! Local text acquisition for file-based ingestion.
//!
//! Turns supported files into plain UTF-8 document text: `.txt` and `.md`
//! are read directly, `.pdf` goes through `pdf-extract`. Anything else is
//! rejected so the pipeline skips it instead of indexing garbage.

use std::path::Path;

use crate::error::{Error, Result};

/// File extensions the directory scanner picks up.
const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "pdf"];

/// Whether a path has a supported extension.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|s| *s == ext)
        })
        .unwrap_or(false)
}

/// Read a file and return its text content.
///
/// Fails with [`Error::Validation`] for unsupported types or files whose
/// extraction yields no text.
pub fn read_document(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let text = match ext.as_str() {
        "txt" | "md" => std::fs::read_to_string(path)?,
        "pdf" => {
            let bytes = std::fs::read(path)?;
            extract_pdf(&bytes)?
        }
        _ => {
            return Err(Error::validation(
                "file",
                format!("unsupported file type: {}", path.display()),
            ))
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(
            "file",
            format!("no text content in {}", path.display()),
        ));
    }
    Ok(trimmed.to_string())
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::validation("file", format!("PDF extraction failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions() {
        assert!(is_supported(Path::new("notes.txt")));
        assert!(is_supported(Path::new("README.md")));
        assert!(is_supported(Path::new("paper.PDF")));
        assert!(!is_supported(Path::new("image.png")));
        assert!(!is_supported(Path::new("no_extension")));
    }

    #[test]
    fn reads_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "  some document text \n").unwrap();
        assert_eq!(read_document(&path).unwrap(), "some document text");
    }

    #[test]
    fn rejects_empty_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "   \n ").unwrap();
        assert!(matches!(
            read_document(&empty),
            Err(Error::Validation { .. })
        ));

        let image = dir.path().join("image.png");
        std::fs::write(&image, [0u8; 4]).unwrap();
        assert!(matches!(
            read_document(&image),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn invalid_pdf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(read_document(&path).is_err());
    }
}
