#![forbid(unsafe_code)]

//! The canonicalization engine.
//!
//! One recursive dispatcher routes every node kind to its renderer.  The
//! element renderer is where the actual canonicalization work happens: it
//! assembles the namespace string from the sorted namespace axis, the
//! attribute string from the sorted attribute axis (with reserved `xml:`
//! attributes inherited through excluded ancestors), recurses into child
//! nodes, and emits tags only when the element itself is in the subset.
//! An excluded element still surfaces its visible namespace declarations,
//! attributes and descendants.

use crate::escape;
use crate::render::{Attr, NsDecl};
use crate::settings::C14nSettings;
use crate::subset::Subset;
use sigtuna_core::{ns, Error, Result};
use sigtuna_xml::axis::{namespace_axis, prefix_for};

pub(crate) struct Engine<'a> {
    settings: &'a C14nSettings,
    subset: &'a Subset,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(settings: &'a C14nSettings, subset: &'a Subset) -> Self {
        Self { settings, subset }
    }

    /// Canonicalize a single node.  The single recursive entry point.
    pub(crate) fn render_node(&self, node: roxmltree::Node<'_, '_>) -> Result<String> {
        match node.node_type() {
            roxmltree::NodeType::Root => self.render_document(node),
            roxmltree::NodeType::Element => self.render_element(node),
            roxmltree::NodeType::Text => {
                if self.subset.contains_node(node) {
                    Ok(escape::escape_text(node.text().unwrap_or("")))
                } else {
                    Ok(String::new())
                }
            }
            roxmltree::NodeType::PI => {
                if self.subset.contains_node(node) {
                    Ok(render_pi(node))
                } else {
                    Ok(String::new())
                }
            }
            // Comments follow the with-comments flag only; they are not
            // filtered through the subset.
            roxmltree::NodeType::Comment => {
                if self.settings.keeps_comments() {
                    Ok(format!("<!--{}-->", node.text().unwrap_or("")))
                } else {
                    Ok(String::new())
                }
            }
        }
    }

    /// Document node: render each child in document order, join the
    /// non-empty results with a single linefeed.  No byte-order mark, XML
    /// declaration or doctype content is ever emitted.
    fn render_document(&self, node: roxmltree::Node<'_, '_>) -> Result<String> {
        let mut parts = Vec::new();
        for child in node.children() {
            let rendered = self.render_node(child)?;
            if !rendered.is_empty() {
                parts.push(rendered);
            }
        }
        Ok(parts.join("\n"))
    }

    fn render_element(&self, element: roxmltree::Node<'_, '_>) -> Result<String> {
        let included = self.subset.contains_node(element);

        let namespace_string = self.namespace_string(element, included)?;
        let attribute_string = self.attribute_string(element, included)?;

        let mut nested = String::new();
        for child in element.children() {
            nested.push_str(&self.render_node(child)?);
        }

        if included {
            let name = element_qname(element)?;
            Ok(format!(
                "<{name}{namespace_string}{attribute_string}>{nested}</{name}>"
            ))
        } else {
            Ok(format!("{namespace_string}{attribute_string}{nested}"))
        }
    }

    /// Render the namespace axis of an element: sorted by rendered name
    /// (`xmlns` first, then `xmlns:...` lexicographically), each entry
    /// filtered through the namespace rendering rules.
    fn namespace_string(
        &self,
        element: roxmltree::Node<'_, '_>,
        included: bool,
    ) -> Result<String> {
        let mut out = String::new();
        // The axis map is keyed by prefix, which matches the rendered-name
        // order.
        for (prefix, uri) in namespace_axis(element) {
            out.push_str(&self.render_namespace(element, included, &prefix, &uri)?);
        }
        Ok(out)
    }

    /// Decide whether a single namespace binding is rendered, and render
    /// it.  Returns an empty string for suppressed bindings.
    fn render_namespace(
        &self,
        element: roxmltree::Node<'_, '_>,
        element_included: bool,
        prefix: &str,
        uri: &str,
    ) -> Result<String> {
        // The reserved xml binding is implicit and never rendered.
        if prefix == ns::XML_PREFIX && uri == ns::XML {
            return Ok(String::new());
        }

        // The namespace node itself must be in the subset.
        if !self.subset.contains_namespace(element, prefix, uri) {
            return Ok(String::new());
        }

        // An empty default namespace is only rendered when it undeclares a
        // default namespace some visible ancestor actually carries.
        if prefix.is_empty() && uri.is_empty() {
            if !element_included {
                return Ok(String::new());
            }
            let ancestor_default = self
                .subset
                .visible_ancestor(element)
                .and_then(|a| a.default_namespace().map(str::to_owned));
            if !ancestor_default.is_some_and(|u| !u.is_empty()) {
                return Ok(String::new());
            }
        }

        if !self.settings.is_exclusive() || self.settings.is_inclusive_prefix(prefix) {
            // Inclusive rules: suppress a declaration the nearest visible
            // ancestor already makes with the same URI.
            if let Some(ancestor) = self.subset.visible_ancestor(element) {
                if namespace_axis(ancestor).get(prefix).map(String::as_str) == Some(uri) {
                    return Ok(String::new());
                }
            }
        } else {
            // Exclusive rules: only declarations the element visibly
            // utilizes are rendered, and only where no included ancestor
            // that also utilizes the prefix resolves it identically.
            if !element_included {
                return Ok(String::new());
            }
            if !self.visibly_utilizes(element, prefix)? {
                return Ok(String::new());
            }
            if let Some(ancestor) = self.utilizing_included_ancestor(element, prefix)? {
                if namespace_axis(ancestor).get(prefix).map(String::as_str) == Some(uri) {
                    return Ok(String::new());
                }
            }
        }

        Ok(NsDecl {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }
        .render())
    }

    /// Render the attribute axis of an element.
    ///
    /// An included element inherits the reserved `xml:` attributes of its
    /// whole ancestor chain (nearest declaration of each local name wins),
    /// with the element's own in-subset attributes overriding inherited
    /// ones of the same local name.  An excluded element renders only its
    /// own in-subset attributes.
    fn attribute_string(
        &self,
        element: roxmltree::Node<'_, '_>,
        included: bool,
    ) -> Result<String> {
        let mut attrs: Vec<Attr> = Vec::new();

        for attr in element.attributes() {
            if !self.subset.contains_attribute(element, &attr) {
                continue;
            }
            attrs.push(Attr {
                ns_uri: attr.namespace().unwrap_or("").to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name: attr_qname(element, &attr)?,
                value: attr.value().to_owned(),
            });
        }

        if included {
            for (local, value) in inherited_xml_attributes(element) {
                let already_present = attrs
                    .iter()
                    .any(|a| a.ns_uri == ns::XML && a.local_name == local);
                if !already_present {
                    attrs.push(Attr {
                        ns_uri: ns::XML.to_owned(),
                        local_name: local.clone(),
                        qualified_name: format!("xml:{local}"),
                        value,
                    });
                }
            }
        }

        attrs.sort();

        let mut out = String::new();
        for attr in &attrs {
            out.push_str(&attr.render());
        }
        Ok(out)
    }

    /// Check whether an element visibly utilizes a namespace prefix: its
    /// own qualified name carries the prefix, or one of its in-subset
    /// attributes does.  The empty prefix stands for the default
    /// namespace, which only a prefixless element can utilize.
    fn visibly_utilizes(&self, element: roxmltree::Node<'_, '_>, prefix: &str) -> Result<bool> {
        if element_prefix(element)? == prefix {
            return Ok(true);
        }
        if prefix.is_empty() {
            return Ok(false);
        }
        for attr in element.attributes() {
            if !self.subset.contains_attribute(element, &attr) {
                continue;
            }
            if let Some(uri) = attr.namespace() {
                if uri == ns::XML {
                    continue;
                }
                if prefix_for(element, uri).as_deref() == Some(prefix) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Find the nearest strict ancestor that is both in the subset and
    /// visibly utilizes `prefix`.
    fn utilizing_included_ancestor<'t, 'input>(
        &self,
        element: roxmltree::Node<'t, 'input>,
        prefix: &str,
    ) -> Result<Option<roxmltree::Node<'t, 'input>>> {
        let mut current = element.parent();
        while let Some(node) = current {
            if !node.is_element() {
                return Ok(None);
            }
            if self.subset.contains_node(node) && self.visibly_utilizes(node, prefix)? {
                return Ok(Some(node));
            }
            current = node.parent();
        }
        Ok(None)
    }
}

/// Collect `xml:` attributes from the whole strict-ancestor chain; the
/// nearest declaration of each local name wins.
fn inherited_xml_attributes(element: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let mut inherited: Vec<(String, String)> = Vec::new();
    let mut current = element.parent();
    while let Some(node) = current {
        if node.is_element() {
            for attr in node.attributes() {
                if attr.namespace() == Some(ns::XML)
                    && !inherited.iter().any(|(local, _)| local == attr.name())
                {
                    inherited.push((attr.name().to_owned(), attr.value().to_owned()));
                }
            }
        }
        current = node.parent();
    }
    inherited
}

/// The element's own namespace prefix ("" when unprefixed).
fn element_prefix(element: roxmltree::Node<'_, '_>) -> Result<String> {
    let tag = element.tag_name();
    let uri = match tag.namespace() {
        None => return Ok(String::new()),
        Some(uri) => uri,
    };
    // An unprefixed element in the default namespace.
    if element.default_namespace() == Some(uri) {
        return Ok(String::new());
    }
    prefix_for(element, uri).ok_or_else(|| {
        Error::TreeConsistency(format!(
            "no in-scope prefix for element namespace {uri}"
        ))
    })
}

/// The element's qualified name.
fn element_qname(element: roxmltree::Node<'_, '_>) -> Result<String> {
    let prefix = element_prefix(element)?;
    if prefix.is_empty() {
        Ok(element.tag_name().name().to_owned())
    } else {
        Ok(format!("{}:{}", prefix, element.tag_name().name()))
    }
}

/// The qualified name of an attribute.  Attributes are never in the
/// default namespace, so a namespaced attribute must resolve a prefix.
fn attr_qname(
    element: roxmltree::Node<'_, '_>,
    attr: &roxmltree::Attribute<'_, '_>,
) -> Result<String> {
    match attr.namespace() {
        None => Ok(attr.name().to_owned()),
        Some(uri) => match prefix_for(element, uri) {
            Some(prefix) => Ok(format!("{}:{}", prefix, attr.name())),
            None => Err(Error::TreeConsistency(format!(
                "no in-scope prefix for attribute namespace {uri}"
            ))),
        },
    }
}

/// Processing instruction: `<?target?>`, or `<?target data?>` when the
/// data is non-empty.  The data is rendered verbatim.
fn render_pi(node: roxmltree::Node<'_, '_>) -> String {
    match node.pi() {
        Some(pi) => match pi.value {
            Some(data) if !data.is_empty() => format!("<?{} {}?>", pi.target, data),
            _ => format!("<?{}?>", pi.target),
        },
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(xml: &str, settings: &C14nSettings) -> String {
        let doc = roxmltree::Document::parse(xml).unwrap();
        crate::canonicalize(doc.root(), settings).unwrap()
    }

    #[test]
    fn test_attribute_sorting() {
        let output = c14n(r#"<root><a b="1" a="2"/></root>"#, &C14nSettings::new());
        assert_eq!(output, r#"<root><a a="2" b="1"></a></root>"#);
    }

    #[test]
    fn test_namespace_rendering_sorted() {
        let output = c14n(
            r#"<root xmlns:b="http://b" xmlns:a="http://a"/>"#,
            &C14nSettings::new(),
        );
        assert_eq!(
            output,
            r#"<root xmlns:a="http://a" xmlns:b="http://b"></root>"#
        );
    }

    #[test]
    fn test_duplicate_declaration_suppressed() {
        let output = c14n(
            r#"<r xmlns:p="http://x"><c xmlns:p="http://x"/></r>"#,
            &C14nSettings::new(),
        );
        assert_eq!(output, r#"<r xmlns:p="http://x"><c></c></r>"#);
    }

    #[test]
    fn test_redeclaration_with_new_uri_rendered() {
        let output = c14n(
            r#"<r xmlns:p="http://x"><c xmlns:p="http://y"/></r>"#,
            &C14nSettings::new(),
        );
        assert_eq!(
            output,
            r#"<r xmlns:p="http://x"><c xmlns:p="http://y"></c></r>"#
        );
    }

    #[test]
    fn test_text_escaping() {
        let output = c14n(r#"<root>a &amp; b &lt; c</root>"#, &C14nSettings::new());
        assert_eq!(output, "<root>a &amp; b &lt; c</root>");
    }

    #[test]
    fn test_cdata_rendered_as_text() {
        let output = c14n(
            "<root><![CDATA[2 < 3 & 4 > 1]]></root>",
            &C14nSettings::new(),
        );
        assert_eq!(output, "<root>2 &lt; 3 &amp; 4 &gt; 1</root>");
    }

    #[test]
    fn test_comments_follow_flag() {
        let xml = "<root><!--note--></root>";
        assert_eq!(c14n(xml, &C14nSettings::new()), "<root></root>");
        assert_eq!(
            c14n(xml, &C14nSettings::new().with_comments(true)),
            "<root><!--note--></root>"
        );
    }

    #[test]
    fn test_exclusive_drops_unused_declaration() {
        let output = c14n(
            r#"<a:root xmlns:a="http://a" xmlns:b="http://b"><a:child/></a:root>"#,
            &C14nSettings::new().exclusive(true),
        );
        assert_eq!(
            output,
            r#"<a:root xmlns:a="http://a"><a:child></a:child></a:root>"#
        );
    }

    #[test]
    fn test_exclusive_inclusive_prefix_list() {
        let output = c14n(
            r#"<a:root xmlns:a="http://a" xmlns:b="http://b"><a:child/></a:root>"#,
            &C14nSettings::new().exclusive(true).inclusive_namespace("b"),
        );
        assert_eq!(
            output,
            r#"<a:root xmlns:a="http://a" xmlns:b="http://b"><a:child></a:child></a:root>"#
        );
    }

    #[test]
    fn test_pi_rendering() {
        let output = c14n("<?go here?><root/><?stop?>", &C14nSettings::new());
        assert_eq!(output, "<?go here?>\n<root></root>\n<?stop?>");
    }
}
