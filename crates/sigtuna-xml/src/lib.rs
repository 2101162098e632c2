#![forbid(unsafe_code)]

//! XML document abstraction for the Sigtuna canonicalization library.
//!
//! Provides an owned document wrapper over `roxmltree`, the per-element
//! namespace axis computation, and the XPath-subset evaluator used to
//! resolve document-subset expressions.

pub mod axis;
pub mod document;
pub mod xpath;

pub use document::XmlDocument;
pub use xpath::SelectedNode;

/// Return roxmltree parsing options that allow DTD.
///
/// DTD is allowed because roxmltree does not load external entities or
/// perform entity substitution beyond internal entity definitions, so it
/// is safe. Canonicalization test vectors commonly use DTDs for entity
/// and default-attribute definitions.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    let mut options = roxmltree::ParsingOptions::default();
    options.allow_dtd = true;
    options
}
