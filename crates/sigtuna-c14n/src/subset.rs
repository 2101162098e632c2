#![forbid(unsafe_code)]

//! Document subset resolution.
//!
//! A canonicalization call operates either on the whole subtree of the
//! apex node (no subset expression) or on an explicit node set produced by
//! evaluating the settings' subset expression.  Membership decisions are
//! made here for every node kind; namespace bindings are compared
//! structurally by (owning element, prefix, URI) because two enumerations
//! of the same binding are never the same object.

use crate::settings::C14nSettings;
use sigtuna_core::Result;
use sigtuna_xml::xpath::{self, SelectedNode};
use std::collections::HashSet;

/// The resolved document subset for one canonicalization call.
pub struct Subset {
    /// Apex of the whole-subtree subset; `None` when `members` is set.
    apex: Option<roxmltree::NodeId>,
    members: Option<Members>,
}

#[derive(Default)]
struct Members {
    nodes: HashSet<roxmltree::NodeId>,
    attributes: HashSet<(roxmltree::NodeId, String, String)>,
    namespaces: HashSet<(roxmltree::NodeId, String, String)>,
}

impl Subset {
    /// Build the subset for `apex` under the given settings.
    ///
    /// With a subset expression, the expression is evaluated with `apex`
    /// as the context node — but the traversal apex for the subsequent
    /// walk becomes the document root, because an arbitrary expression may
    /// select nodes outside the original apex's subtree.  Both halves of
    /// that asymmetry are intentional.
    pub fn build(apex: roxmltree::Node<'_, '_>, settings: &C14nSettings) -> Result<Self> {
        let query = match settings.subset_query() {
            None => {
                return Ok(Self {
                    apex: Some(apex.id()),
                    members: None,
                })
            }
            Some(query) => query,
        };

        let mut members = Members::default();
        for selected in xpath::evaluate(apex, query, settings.namespace_bindings())? {
            match selected {
                SelectedNode::Tree(id) => {
                    members.nodes.insert(id);
                }
                SelectedNode::Attribute {
                    element,
                    namespace,
                    local,
                } => {
                    members.attributes.insert((element, namespace, local));
                }
                SelectedNode::Namespace {
                    element,
                    prefix,
                    uri,
                } => {
                    members.namespaces.insert((element, prefix, uri));
                }
            }
        }

        Ok(Self {
            apex: None,
            members: Some(members),
        })
    }

    /// Whether this subset came from an explicit expression, in which case
    /// traversal starts at the document root rather than the apex node.
    pub fn is_explicit(&self) -> bool {
        self.members.is_some()
    }

    /// Check if a tree node (element, text, comment, PI, root) is in the
    /// subset.
    pub fn contains_node(&self, node: roxmltree::Node<'_, '_>) -> bool {
        match &self.members {
            Some(members) => members.nodes.contains(&node.id()),
            None => self.in_apex_subtree(node),
        }
    }

    /// Check if an attribute of `element` is in the subset.
    pub fn contains_attribute(
        &self,
        element: roxmltree::Node<'_, '_>,
        attr: &roxmltree::Attribute<'_, '_>,
    ) -> bool {
        match &self.members {
            Some(members) => members.attributes.contains(&(
                element.id(),
                attr.namespace().unwrap_or("").to_owned(),
                attr.name().to_owned(),
            )),
            None => self.in_apex_subtree(element),
        }
    }

    /// Check if a namespace binding on `element` is in the subset.
    pub fn contains_namespace(
        &self,
        element: roxmltree::Node<'_, '_>,
        prefix: &str,
        uri: &str,
    ) -> bool {
        match &self.members {
            Some(members) => {
                members
                    .namespaces
                    .contains(&(element.id(), prefix.to_owned(), uri.to_owned()))
            }
            None => self.in_apex_subtree(element),
        }
    }

    /// Find the nearest strict ancestor element of `element` that is in
    /// the subset.  Returns `None` once the walk leaves the element axis.
    pub fn visible_ancestor<'a, 'input>(
        &self,
        element: roxmltree::Node<'a, 'input>,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        let mut current = element.parent();
        while let Some(node) = current {
            if !node.is_element() {
                return None;
            }
            if self.contains_node(node) {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    fn in_apex_subtree(&self, node: roxmltree::Node<'_, '_>) -> bool {
        let apex = match self.apex {
            Some(apex) => apex,
            None => return false,
        };
        let mut current = Some(node);
        while let Some(n) = current {
            if n.id() == apex {
                return true;
            }
            current = n.parent();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> roxmltree::Document<'_> {
        roxmltree::Document::parse(xml).unwrap()
    }

    fn element<'a>(doc: &'a roxmltree::Document<'a>, name: &str) -> roxmltree::Node<'a, 'a> {
        doc.descendants()
            .find(|n| n.is_element() && n.tag_name().name() == name)
            .unwrap()
    }

    #[test]
    fn test_whole_subtree_membership() {
        let doc = parse("<a><b><c/></b><d/></a>");
        let b = element(&doc, "b");
        let subset = Subset::build(b, &C14nSettings::new()).unwrap();
        assert!(!subset.is_explicit());
        assert!(subset.contains_node(b));
        assert!(subset.contains_node(element(&doc, "c")));
        assert!(!subset.contains_node(element(&doc, "a")));
        assert!(!subset.contains_node(element(&doc, "d")));
    }

    #[test]
    fn test_whole_subtree_attributes_follow_element() {
        let doc = parse(r#"<a x="1"><b y="2"/></a>"#);
        let b = element(&doc, "b");
        let subset = Subset::build(b, &C14nSettings::new()).unwrap();
        let y = b.attributes().next().unwrap();
        assert!(subset.contains_attribute(b, &y));
        let a = element(&doc, "a");
        let x = a.attributes().next().unwrap();
        assert!(!subset.contains_attribute(a, &x));
    }

    #[test]
    fn test_explicit_membership() {
        let doc = parse(r#"<a><b/><c/></a>"#);
        let settings = C14nSettings::new().query("//b");
        let subset = Subset::build(doc.root(), &settings).unwrap();
        assert!(subset.is_explicit());
        assert!(subset.contains_node(element(&doc, "b")));
        assert!(!subset.contains_node(element(&doc, "c")));
        assert!(!subset.contains_node(element(&doc, "a")));
    }

    #[test]
    fn test_explicit_namespace_identity() {
        let doc = parse(r#"<a xmlns:p="http://p"><b/></a>"#);
        let settings = C14nSettings::new().query("//namespace::p");
        let subset = Subset::build(doc.root(), &settings).unwrap();
        let a = element(&doc, "a");
        let b = element(&doc, "b");
        // The binding is in scope on both elements; both axis enumerations
        // must be found, compared structurally.
        assert!(subset.contains_namespace(a, "p", "http://p"));
        assert!(subset.contains_namespace(b, "p", "http://p"));
        assert!(!subset.contains_namespace(a, "p", "http://other"));
        assert!(!subset.contains_namespace(a, "q", "http://p"));
    }

    #[test]
    fn test_visible_ancestor() {
        let doc = parse("<a><b><c/></b></a>");
        let settings = C14nSettings::new().query("//a|//c");
        let subset = Subset::build(doc.root(), &settings).unwrap();
        let c = element(&doc, "c");
        let ancestor = subset.visible_ancestor(c).unwrap();
        assert_eq!(ancestor.tag_name().name(), "a");
        let a = element(&doc, "a");
        assert!(subset.visible_ancestor(a).is_none());
    }

    #[test]
    fn test_invalid_query_is_fatal() {
        let doc = parse("<a/>");
        let settings = C14nSettings::new().query("//a[@");
        assert!(Subset::build(doc.root(), &settings).is_err());
    }
}
