//! Error types for folio operations.

use thiserror::Error;

/// Errors produced by a backend while probing or opening a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Invalid FB2: {0}")]
    InvalidFb2(String),

    #[error("Invalid MOBI: {0}")]
    InvalidMobi(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a [`Doc`](crate::Doc) ended up without a backend.
///
/// `UnknownFormat` is the normal "no backend accepted this file" outcome.
/// `Backend` means a probe accepted the file but construction failed; per the
/// dispatch contract that failure is terminal and no other backend is tried.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unrecognized document format")]
    UnknownFormat,

    #[error(transparent)]
    Backend(#[from] Error),
}

impl LoadError {
    /// True for the generic no-backend-matched case.
    pub fn is_unknown_format(&self) -> bool {
        matches!(self, LoadError::UnknownFormat)
    }
}
