#![forbid(unsafe_code)]

pub use sigtuna_c14n as c14n;
pub use sigtuna_core as core;
pub use sigtuna_xml as xml;

pub use sigtuna_c14n::{canonicalize, canonicalize_document, C14nMode, C14nSettings};
pub use sigtuna_core::{Error, Result};
pub use sigtuna_xml::XmlDocument;
