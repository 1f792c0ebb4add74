//! Custom error types and result handling for htmldir operations.
//!
//! This module defines the error handling system used throughout the crate.
//! All operations return a [`Result<T>`] which is a type alias for `std::result::Result<T, Error>`.
//!
use std::path::PathBuf;

/// Type alias for Results with htmldir errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all htmldir operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library (working directory, writes, promotion)
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Malformed markup while loading a content document
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    /// Malformed attribute while loading a content document
    #[error(transparent)]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
    /// Content documents must be UTF-8
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
    /// Template syntax or rendering errors
    #[error(transparent)]
    Template(#[from] minijinja::Error),
    /// Metadata sidecar serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    HtmldirBuilder(#[from] crate::htmldir::HtmldirConfigBuilderError),
    /// A content document lacks the structure needed to build a page
    /// (no `<head>`/`<body>`, duplicates, or no parsed markup at all)
    #[error("Invalid document structure: {0}")]
    Structure(String),
    /// The spine has no items, so the index page cannot link anywhere
    #[error("The book spine is empty")]
    EmptySpine,
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// Two manifest items share the same href
    #[error("Duplicate manifest href: {0}")]
    DuplicateHref(String),
    /// Error for resources that couldn't be found (e.g., a template override file)
    #[error("Not found: {0}")]
    NotFound(String),
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

// Basic From<String> conversion for convenience
impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.to_string())
    }
}
