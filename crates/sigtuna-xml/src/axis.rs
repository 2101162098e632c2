#![forbid(unsafe_code)]

//! Namespace axis computation.
//!
//! In the XPath data model every element carries a namespace axis: the
//! complete set of prefix→URI bindings in scope at that element, inherited
//! bindings included.  roxmltree resolves declarations at parse time, so
//! the axis is reconstructed here from the in-scope namespace data rather
//! than from stored tree nodes.
//!
//! The returned map is keyed by prefix with the default namespace under
//! the empty string, which also happens to be the rendered-name sort order
//! required by canonicalization (`xmlns` before `xmlns:a` before `xmlns:b`).

use sigtuna_core::ns;
use std::collections::BTreeMap;

/// Compute the namespace axis for an element.
///
/// The reserved `xml` prefix is always present.  A default-namespace entry
/// is present with its resolved URI when non-empty; it is present with an
/// *empty* URI exactly when an `xmlns=""` undeclaration is observable at
/// this element, i.e. the element resolves no default namespace while some
/// strict ancestor element resolves a non-empty one.
pub fn namespace_axis(element: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    let mut axis: BTreeMap<String, String> = BTreeMap::new();

    for decl in element.namespaces() {
        let prefix = decl.name().unwrap_or("");
        if prefix.is_empty() || prefix == ns::XML_PREFIX {
            continue;
        }
        // A prefixed binding with an empty URI is not expressible in
        // XML 1.0; skip rather than carry a broken entry.
        if decl.uri().is_empty() {
            continue;
        }
        axis.insert(prefix.to_owned(), decl.uri().to_owned());
    }

    axis.insert(ns::XML_PREFIX.to_owned(), ns::XML.to_owned());

    let default_uri = element.default_namespace().unwrap_or("");
    if !default_uri.is_empty() {
        axis.insert(String::new(), default_uri.to_owned());
    } else if has_ancestor_with_default(element) {
        axis.insert(String::new(), String::new());
    }

    axis
}

/// Check whether any strict ancestor element resolves a non-empty default
/// namespace.
fn has_ancestor_with_default(element: roxmltree::Node<'_, '_>) -> bool {
    let mut current = element.parent();
    while let Some(node) = current {
        if node.is_element() && node.default_namespace().is_some_and(|uri| !uri.is_empty()) {
            return true;
        }
        current = node.parent();
    }
    false
}

/// Find a non-empty prefix bound to `uri` at the given element.
///
/// The reserved `xml` prefix resolves without a declaration.  The default
/// namespace binding never yields a prefix here; attribute names in
/// particular can only be qualified through a prefixed binding.
pub fn prefix_for(element: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == ns::XML {
        return Some(ns::XML_PREFIX.to_owned());
    }
    for decl in element.namespaces() {
        if decl.uri() != uri {
            continue;
        }
        if let Some(name) = decl.name() {
            if !name.is_empty() {
                return Some(name.to_owned());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> roxmltree::Document<'_> {
        roxmltree::Document::parse(xml).unwrap()
    }

    #[test]
    fn test_axis_inherits_bindings() {
        let doc = parse(r#"<e1 xmlns:a="http://a"><e2 xmlns:b="http://b"/></e1>"#);
        let e2 = doc.descendants().find(|n| n.has_tag_name("e2")).unwrap();
        let axis = namespace_axis(e2);
        assert_eq!(axis.get("a").map(String::as_str), Some("http://a"));
        assert_eq!(axis.get("b").map(String::as_str), Some("http://b"));
        assert_eq!(axis.get("xml").map(String::as_str), Some(ns::XML));
        assert!(!axis.contains_key(""));
    }

    #[test]
    fn test_axis_default_namespace() {
        let doc = parse(r#"<e1 xmlns="http://d"><e2/></e1>"#);
        let e2 = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "e2")
            .unwrap();
        let axis = namespace_axis(e2);
        assert_eq!(axis.get("").map(String::as_str), Some("http://d"));
    }

    #[test]
    fn test_axis_observable_undeclaration() {
        let doc = parse(r#"<e0 xmlns="http://d"><e1 xmlns=""><e2/></e1></e0>"#);
        for name in ["e1", "e2"] {
            let node = doc
                .descendants()
                .find(|n| n.is_element() && n.tag_name().name() == name)
                .unwrap();
            let axis = namespace_axis(node);
            assert_eq!(axis.get("").map(String::as_str), Some(""), "axis of {name}");
        }
    }

    #[test]
    fn test_axis_no_phantom_undeclaration() {
        // Nothing ever declared a default namespace, so no empty entry.
        let doc = parse(r#"<e1 xmlns=""><e2/></e1>"#);
        let e2 = doc.descendants().find(|n| n.has_tag_name("e2")).unwrap();
        assert!(!namespace_axis(e2).contains_key(""));
    }

    #[test]
    fn test_prefix_for() {
        let doc = parse(r#"<e1 xmlns:a="http://a" xmlns="http://d"><e2/></e1>"#);
        let e2 = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "e2")
            .unwrap();
        assert_eq!(prefix_for(e2, "http://a").as_deref(), Some("a"));
        assert_eq!(prefix_for(e2, ns::XML).as_deref(), Some("xml"));
        assert_eq!(prefix_for(e2, "http://nowhere"), None);
    }
}
