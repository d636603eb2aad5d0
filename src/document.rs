//! The rendered document returned to callers.

/// Rendered output plus the metadata reported by the rendering engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    /// Rendered bytes.
    pub content: Vec<u8>,
    /// MIME type of `content`.
    pub mime_type: String,
    /// Text encoding of `content`, empty for binary formats.
    pub encoding: String,
    /// File extension matching the output format.
    pub extension: String,
    /// Identifiers of auxiliary streams produced alongside the main output.
    pub stream_ids: Vec<String>,
    /// Number of pages, or 0 when not requested or not countable.
    pub page_count: usize,
}
