#![forbid(unsafe_code)]

//! Per-call canonicalization settings.

use sigtuna_core::ns;
use std::collections::BTreeSet;

/// Settings for one canonicalization call.
///
/// Built once with the consuming setter methods and passed by reference
/// into [`crate::canonicalize`].  The value is immutable for the duration
/// of the call; a caller reusing the engine must build a fresh value (or
/// clone and adjust one) rather than relying on any implicit reset.
///
/// ```
/// use sigtuna_c14n::C14nSettings;
///
/// let settings = C14nSettings::new()
///     .exclusive(true)
///     .inclusive_namespace("soap");
/// assert!(settings.is_exclusive());
/// ```
#[derive(Debug, Clone, Default)]
pub struct C14nSettings {
    exclusive: bool,
    with_comments: bool,
    subset_query: Option<String>,
    namespace_bindings: Vec<(String, String)>,
    inclusive_namespaces: BTreeSet<String>,
}

impl C14nSettings {
    /// Canonical XML 1.0, no comments, whole subtree of the apex node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch between Canonical XML (false) and Exclusive XML
    /// Canonicalization (true).
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Include comment nodes in the canonical output.
    pub fn with_comments(mut self, with_comments: bool) -> Self {
        self.with_comments = with_comments;
        self
    }

    /// Set the document-subset expression.
    ///
    /// The expression is evaluated with the apex node as context node, but
    /// canonicalization then walks the whole document, consulting the
    /// evaluated subset for every visibility decision.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.subset_query = Some(query.into());
        self
    }

    /// Bind a namespace prefix for use inside the subset expression.
    ///
    /// Bindings only affect subset evaluation, never the output.
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespace_bindings.push((prefix.into(), uri.into()));
        self
    }

    /// Add a prefix to the InclusiveNamespaces list used in exclusive
    /// mode.  The token `#default` names the default namespace.
    pub fn inclusive_namespace(mut self, prefix: impl Into<String>) -> Self {
        self.inclusive_namespaces.insert(prefix.into());
        self
    }

    /// Add several prefixes to the InclusiveNamespaces list.
    pub fn inclusive_namespaces<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for prefix in prefixes {
            self.inclusive_namespaces.insert(prefix.into());
        }
        self
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn keeps_comments(&self) -> bool {
        self.with_comments
    }

    pub fn subset_query(&self) -> Option<&str> {
        self.subset_query.as_deref()
    }

    pub fn namespace_bindings(&self) -> &[(String, String)] {
        &self.namespace_bindings
    }

    /// Check whether a namespace prefix follows inclusive-mode rules even
    /// under exclusive canonicalization.  The empty prefix stands for the
    /// default namespace and is matched by the `#default` token.
    pub fn is_inclusive_prefix(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            self.inclusive_namespaces.contains(ns::DEFAULT_NS_TOKEN)
        } else {
            self.inclusive_namespaces.contains(prefix)
        }
    }
}
