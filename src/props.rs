//! Document metadata property keys and shared value types.

/// A metadata property that can be queried on any document.
///
/// Backends return `None` for keys they have no value for; absent metadata is
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentProperty {
    Title,
    Author,
    Copyright,
    Subject,
    Publisher,
    /// Original publication/creation date.
    CreationDate,
    ModificationDate,
    /// The application that produced the file.
    CreatorApp,
}

/// Raw embedded image bytes plus the detected media type.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub data: Vec<u8>,
    /// MIME type like `image/jpeg`, detected from magic bytes or declared by
    /// the container.
    pub media_type: String,
}

impl ImageData {
    pub fn new(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            data,
            media_type: media_type.into(),
        }
    }
}
