//! Page counting over rendered output, built on top of `lopdf`.

use lopdf::Document;
use thiserror::Error;

/// Errors that can occur while counting the pages of a rendered document.
#[derive(Debug, Error)]
pub enum PageCountError {
    /// The output format has no page structure this counter understands.
    #[error("page counting is not supported for format '{0}'")]
    UnsupportedFormat(String),
    /// The PDF bytes could not be parsed by `lopdf`.
    #[error("failed to parse PDF bytes: {0}")]
    Malformed(#[from] lopdf::Error),
}

/// Counts the pages of rendered output.
pub trait PageCounter: Send + Sync {
    /// Returns `true` if `format` can be counted.
    fn supports(&self, format: &str) -> bool;

    /// Counts the pages of `bytes`, which were rendered in `format`.
    fn count(&self, format: &str, bytes: &[u8]) -> Result<usize, PageCountError>;
}

/// Counts pages of PDF output by walking the document's page tree.
#[derive(Clone, Debug)]
pub struct PdfPageCounter {
    format: String,
}

impl PdfPageCounter {
    /// Creates a counter that accepts the given format identifier.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl Default for PdfPageCounter {
    fn default() -> Self {
        Self::new("pdf")
    }
}

impl PageCounter for PdfPageCounter {
    fn supports(&self, format: &str) -> bool {
        format.eq_ignore_ascii_case(&self.format)
    }

    fn count(&self, format: &str, bytes: &[u8]) -> Result<usize, PageCountError> {
        if !self.supports(format) {
            return Err(PageCountError::UnsupportedFormat(format.to_string()));
        }
        let document = Document::load_mem(bytes)?;
        Ok(document.get_pages().len())
    }
}
