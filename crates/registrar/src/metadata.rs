//! Opaque registrar metadata documents.

/// Content type the metadata API expects for documents.
pub const METADATA_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";

/// A registrar-schema metadata document (DataCite kernel XML).
///
/// The document is supplied by the tenant and passed through unchanged,
/// except where a saga rewrites its related identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataDocument(String);

impl MetadataDocument {
    /// Wraps an XML document.
    pub fn new(xml: impl Into<String>) -> Self {
        Self(xml.into())
    }

    /// Returns the document text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MetadataDocument {
    fn from(xml: String) -> Self {
        Self(xml)
    }
}

impl From<&str> for MetadataDocument {
    fn from(xml: &str) -> Self {
        Self(xml.to_string())
    }
}
