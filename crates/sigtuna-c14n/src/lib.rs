#![forbid(unsafe_code)]

//! XML Canonicalization for the Sigtuna library.
//!
//! Implements the four supported W3C canonicalization variants:
//! - Canonical XML 1.0 (with and without comments)
//! - Exclusive Canonical XML 1.0 (with and without comments)
//!
//! all with optional document-subset canonicalization driven by a subset
//! expression (see [`C14nSettings::query`]).
//!
//! ```
//! use sigtuna_c14n::{canonicalize_document, C14nSettings};
//!
//! let doc = roxmltree::Document::parse(r#"<r b="2" a="1"/>"#).unwrap();
//! let output = canonicalize_document(&doc, &C14nSettings::new()).unwrap();
//! assert_eq!(output, r#"<r a="1" b="2"></r>"#);
//! ```

pub mod escape;
pub mod render;
pub mod settings;
pub mod subset;

mod engine;

use engine::Engine;
use sigtuna_core::{algorithm, Result};
use subset::Subset;

pub use settings::C14nSettings;

/// The canonicalization mode, one per supported algorithm URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(Self::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(self, Self::InclusiveWithComments | Self::ExclusiveWithComments)
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }

    /// Settings pre-configured for this mode.
    pub fn settings(&self) -> C14nSettings {
        C14nSettings::new()
            .exclusive(self.is_exclusive())
            .with_comments(self.with_comments())
    }
}

/// Canonicalize an XML node.
///
/// Without a subset expression the apex node's whole subtree is
/// canonicalized.  With one, the expression is evaluated against the apex
/// node and the walk then covers the full document, emitting exactly the
/// selected nodes.  Fails with [`sigtuna_core::Error::SubsetQuery`] when
/// the expression is malformed or references an unbound prefix; no
/// partial output is produced.
pub fn canonicalize(node: roxmltree::Node<'_, '_>, settings: &C14nSettings) -> Result<String> {
    let subset = Subset::build(node, settings)?;
    let apex = if subset.is_explicit() {
        node.document().root()
    } else {
        node
    };
    Engine::new(settings, &subset).render_node(apex)
}

/// Canonicalize a whole parsed document.
pub fn canonicalize_document(
    doc: &roxmltree::Document<'_>,
    settings: &C14nSettings,
) -> Result<String> {
    canonicalize(doc.root(), settings)
}
