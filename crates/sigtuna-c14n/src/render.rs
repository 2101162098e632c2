#![forbid(unsafe_code)]

//! Rendering primitives for namespace declarations and attributes.

use crate::escape;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for the default namespace).
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

impl NsDecl {
    /// Render this namespace declaration, leading space included.
    pub fn render(&self) -> String {
        if self.prefix.is_empty() {
            format!(" xmlns=\"{}\"", escape::escape_attr(&self.uri))
        } else {
            format!(
                " xmlns:{}=\"{}\"",
                self.prefix,
                escape::escape_attr(&self.uri)
            )
        }
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // The default namespace renders as the bare name `xmlns`, which
        // sorts before every `xmlns:...`; prefixes sort lexicographically.
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    /// The local name.
    pub local_name: String,
    /// The qualified name (prefix:local or just local).
    pub qualified_name: String,
    /// The attribute value.
    pub value: String,
}

impl Attr {
    /// Render this attribute, leading space included.
    pub fn render(&self) -> String {
        format!(
            " {}=\"{}\"",
            self.qualified_name,
            escape::escape_attr(&self.value)
        )
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Attributes with no namespace come before those with a namespace.
        // Among those with namespaces, sort by (ns_uri, local_name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then(self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(prefix: &str, uri: &str) -> NsDecl {
        NsDecl {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }
    }

    #[test]
    fn test_ns_decl_render() {
        assert_eq!(decl("", "http://d").render(), " xmlns=\"http://d\"");
        assert_eq!(decl("a", "http://a").render(), " xmlns:a=\"http://a\"");
        assert_eq!(decl("", "").render(), " xmlns=\"\"");
    }

    #[test]
    fn test_ns_decl_order() {
        let mut decls = vec![decl("b", "u"), decl("", "u"), decl("a", "u")];
        decls.sort();
        let prefixes: Vec<&str> = decls.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(prefixes, ["", "a", "b"]);
    }

    #[test]
    fn test_attr_order() {
        let attr = |ns: &str, local: &str| Attr {
            ns_uri: ns.to_owned(),
            local_name: local.to_owned(),
            qualified_name: local.to_owned(),
            value: String::new(),
        };
        let mut attrs = vec![
            attr("http://b", "a"),
            attr("", "z"),
            attr("http://a", "b"),
            attr("", "a"),
            attr("http://a", "a"),
        ];
        attrs.sort();
        let keys: Vec<(&str, &str)> = attrs
            .iter()
            .map(|a| (a.ns_uri.as_str(), a.local_name.as_str()))
            .collect();
        assert_eq!(
            keys,
            [
                ("", "a"),
                ("", "z"),
                ("http://a", "a"),
                ("http://a", "b"),
                ("http://b", "a"),
            ]
        );
    }

    #[test]
    fn test_attr_render_escapes_value() {
        let attr = Attr {
            ns_uri: String::new(),
            local_name: "a".to_owned(),
            qualified_name: "a".to_owned(),
            value: "x\"<&".to_owned(),
        };
        assert_eq!(attr.render(), " a=\"x&quot;&lt;&amp;\"");
    }
}
