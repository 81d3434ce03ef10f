use super::IngestError;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Text of one PDF page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    /// File name of the PDF
    pub source: String,
    /// 1-based page number
    pub page: u32,
    pub text: String,
}

/// List the `.pdf` files directly inside `dir`, sorted by file name.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::Io {
        source: e,
        context: format!("Failed to read directory: {}", dir.display()),
    })?;

    let mut pdfs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IngestError::Io {
            source: e,
            context: format!("Failed to read entry in {}", dir.display()),
        })?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }

    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(pdfs)
}

/// Extract the text of every page of a PDF.
pub fn load_pdf(path: &Path) -> Result<Vec<PageDocument>, IngestError> {
    let document = Document::load(path).map_err(|e| IngestError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut pages = Vec::new();
    for page_number in document.get_pages().into_keys() {
        let text = document
            .extract_text(&[page_number])
            .map_err(|e| IngestError::Pdf {
                path: path.to_path_buf(),
                message: format!("page {}: {}", page_number, e),
            })?;

        pages.push(PageDocument {
            source: source.clone(),
            page: page_number,
            text,
        });
    }

    tracing::debug!(source = %source, pages = pages.len(), "Loaded PDF");
    Ok(pages)
}
