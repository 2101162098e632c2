#![forbid(unsafe_code)]

/// Errors produced by the Sigtuna XML canonicalization library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid document subset expression: {0}")]
    SubsetQuery(String),

    #[error("node kind cannot seed a document subset: {0}")]
    UnsupportedNode(String),

    #[error("inconsistent node tree: {0}")]
    TreeConsistency(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
