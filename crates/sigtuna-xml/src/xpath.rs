#![forbid(unsafe_code)]

//! Minimal XPath subset for document-subset expressions.
//!
//! Canonicalization for signature processing only ever sees a narrow
//! fragment of XPath: unions of location paths over the child, attribute
//! and namespace axes.  This module implements exactly that fragment:
//!
//! - union expressions: `A|B|C`
//! - absolute (`/a`, `//a`) and relative (`.`, `./a`, `a/b`) paths,
//!   with `//` meaning descendant-or-self
//! - axes: child (default), `@` / `attribute::`, `namespace::`, `self::`
//! - node tests: `*`, `name`, `prefix:name`, `prefix:*`, `node()`,
//!   `text()`, `comment()`, `processing-instruction()` and
//!   `processing-instruction('target')`
//!
//! Prefixes in name tests are resolved through the caller-supplied
//! bindings; the `xml` prefix is predeclared.  Anything outside the
//! fragment is a [`Error::SubsetQuery`].

use crate::axis::namespace_axis;
use sigtuna_core::{ns, Error};

/// A node selected by a subset expression.
///
/// Tree nodes are identified by id.  Attribute and namespace nodes have no
/// tree identity in roxmltree and are identified structurally, which is
/// also the comparison rule canonicalization needs: two enumerations of
/// the same namespace binding must compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectedNode {
    /// A document, element, text, comment or processing-instruction node.
    Tree(roxmltree::NodeId),
    /// An attribute, identified by owning element, namespace URI and
    /// local name.  `namespace` is empty for no-namespace attributes.
    Attribute {
        element: roxmltree::NodeId,
        namespace: String,
        local: String,
    },
    /// A namespace binding, identified by owning element, prefix and URI.
    /// `prefix` is empty for the default namespace.
    Namespace {
        element: roxmltree::NodeId,
        prefix: String,
        uri: String,
    },
}

/// Evaluate a subset expression with `context` as the context node.
///
/// Returns the matched nodes in first-encounter order, deduplicated.
pub fn evaluate(
    context: roxmltree::Node<'_, '_>,
    expr: &str,
    bindings: &[(String, String)],
) -> Result<Vec<SelectedNode>, Error> {
    let paths = Parser::new(expr, bindings).parse()?;

    let mut result = Vec::new();
    for path in &paths {
        for selected in eval_path(context, path) {
            if !result.contains(&selected) {
                result.push(selected);
            }
        }
    }
    Ok(result)
}

// ── Expression structure ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Attribute,
    Namespace,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    /// `*` — any node of the axis' principal kind.
    Any,
    /// A name test, namespace resolved at parse time.  `namespace` is
    /// empty for unprefixed tests, which match no-namespace names only.
    Name { namespace: String, local: String },
    /// `prefix:*`
    NamespaceAny { namespace: String },
    /// `node()`
    AnyKind,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()` with optional target literal.
    Pi { target: Option<String> },
}

#[derive(Debug, Clone)]
struct Step {
    /// True when the step was preceded by `//` (descendant-or-self).
    descendant: bool,
    axis: Axis,
    test: NodeTest,
}

#[derive(Debug, Clone)]
struct Path {
    absolute: bool,
    steps: Vec<Step>,
}

// ── Parser ───────────────────────────────────────────────────────────

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    bindings: &'a [(String, String)],
}

impl<'a> Parser<'a> {
    fn new(expr: &str, bindings: &'a [(String, String)]) -> Self {
        Self {
            chars: expr.chars().collect(),
            pos: 0,
            bindings,
        }
    }

    fn parse(mut self) -> Result<Vec<Path>, Error> {
        let mut paths = vec![self.parse_path()?];
        loop {
            self.skip_ws();
            if self.eat('|') {
                paths.push(self.parse_path()?);
            } else if self.pos == self.chars.len() {
                return Ok(paths);
            } else {
                return Err(self.error("unexpected trailing content"));
            }
        }
    }

    fn parse_path(&mut self) -> Result<Path, Error> {
        self.skip_ws();
        let absolute = self.eat('/');
        let mut steps = Vec::new();

        if absolute {
            let descendant = self.eat('/');
            if self.at_step_start() {
                steps.push(self.parse_step(descendant)?);
            } else if descendant {
                return Err(self.error("expected a step after `//`"));
            } else {
                // A bare `/` selects the document root.
                return Ok(Path {
                    absolute,
                    steps,
                });
            }
        } else {
            if !self.at_step_start() {
                return Err(self.error("expected a location path"));
            }
            steps.push(self.parse_step(false)?);
        }

        loop {
            self.skip_ws();
            if !self.eat('/') {
                break;
            }
            let descendant = self.eat('/');
            steps.push(self.parse_step(descendant)?);
        }

        // Attribute and namespace nodes have no children to step into.
        for step in steps.iter().take(steps.len().saturating_sub(1)) {
            if matches!(step.axis, Axis::Attribute | Axis::Namespace) {
                return Err(Error::SubsetQuery(
                    "attribute and namespace steps must be the last step of a path".to_owned(),
                ));
            }
        }

        Ok(Path { absolute, steps })
    }

    fn parse_step(&mut self, descendant: bool) -> Result<Step, Error> {
        self.skip_ws();

        if self.eat('@') {
            let test = self.parse_node_test()?;
            return Ok(Step {
                descendant,
                axis: Axis::Attribute,
                test,
            });
        }

        // `.` — abbreviation for self::node(), unless it starts a name.
        if self.peek() == Some('.') {
            self.pos += 1;
            return Ok(Step {
                descendant,
                axis: Axis::SelfNode,
                test: NodeTest::AnyKind,
            });
        }

        // An explicit axis specifier?
        let mark = self.pos;
        if let Some(name) = self.try_ncname() {
            if self.eat_str("::") {
                let axis = match name.as_str() {
                    "child" => Axis::Child,
                    "attribute" => Axis::Attribute,
                    "namespace" => Axis::Namespace,
                    "self" => Axis::SelfNode,
                    "descendant-or-self" | "descendant" => {
                        let test = self.parse_node_test()?;
                        return Ok(Step {
                            descendant: true,
                            axis: if name == "descendant-or-self" {
                                Axis::SelfNode
                            } else {
                                Axis::Child
                            },
                            test,
                        });
                    }
                    other => {
                        return Err(Error::SubsetQuery(format!("unsupported axis `{other}`")))
                    }
                };
                let test = self.parse_node_test()?;
                return Ok(Step {
                    descendant,
                    axis,
                    test,
                });
            }
            // Not an axis after all; rewind and read as a node test.
            self.pos = mark;
        }

        let test = self.parse_node_test()?;
        Ok(Step {
            descendant,
            axis: Axis::Child,
            test,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, Error> {
        self.skip_ws();

        if self.eat('*') {
            return Ok(NodeTest::Any);
        }

        let name = self
            .try_ncname()
            .ok_or_else(|| self.error("expected a node test"))?;

        if self.eat('(') {
            let test = match name.as_str() {
                "node" => NodeTest::AnyKind,
                "text" => NodeTest::Text,
                "comment" => NodeTest::Comment,
                "processing-instruction" => {
                    self.skip_ws();
                    let target = if self.peek() == Some('\'') || self.peek() == Some('"') {
                        Some(self.parse_literal()?)
                    } else {
                        None
                    };
                    NodeTest::Pi { target }
                }
                other => {
                    return Err(Error::SubsetQuery(format!(
                        "unsupported node test `{other}()`"
                    )))
                }
            };
            self.skip_ws();
            if !self.eat(')') {
                return Err(self.error("expected `)`"));
            }
            return Ok(test);
        }

        if self.eat(':') {
            let namespace = self.resolve_prefix(&name)?;
            if self.eat('*') {
                return Ok(NodeTest::NamespaceAny { namespace });
            }
            let local = self
                .try_ncname()
                .ok_or_else(|| self.error("expected a local name after `:`"))?;
            return Ok(NodeTest::Name { namespace, local });
        }

        Ok(NodeTest::Name {
            namespace: String::new(),
            local: name,
        })
    }

    fn parse_literal(&mut self) -> Result<String, Error> {
        let quote = self.peek().ok_or_else(|| self.error("expected a literal"))?;
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated literal"))
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<String, Error> {
        if prefix == ns::XML_PREFIX {
            return Ok(ns::XML.to_owned());
        }
        self.bindings
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.clone())
            .ok_or_else(|| Error::SubsetQuery(format!("unbound namespace prefix `{prefix}`")))
    }

    // ── Lexing helpers ───────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        if self.chars[self.pos..].starts_with(&chars) {
            self.pos += chars.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn at_step_start(&self) -> bool {
        matches!(self.peek(), Some(c) if c == '@' || c == '*' || c == '.' || is_name_start(c))
    }

    fn try_ncname(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c) => self.pos += 1,
            _ => return None,
        }
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    fn error(&self, message: &str) -> Error {
        Error::SubsetQuery(format!("{message} at offset {}", self.pos))
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

// ── Evaluation ───────────────────────────────────────────────────────

fn eval_path(context: roxmltree::Node<'_, '_>, path: &Path) -> Vec<SelectedNode> {
    let doc = context.document();
    let mut current: Vec<roxmltree::Node<'_, '_>> = if path.absolute {
        vec![doc.root()]
    } else {
        vec![context]
    };

    for step in &path.steps {
        match step.axis {
            Axis::Attribute => {
                return collect_attributes(&current, step);
            }
            Axis::Namespace => {
                return collect_namespaces(&current, step);
            }
            Axis::Child | Axis::SelfNode => {
                current = tree_step(&current, step);
            }
        }
    }

    current
        .into_iter()
        .map(|node| SelectedNode::Tree(node.id()))
        .collect()
}

/// Apply a child or self step, honoring the `//` descendant-or-self flag.
fn tree_step<'a, 'input>(
    current: &[roxmltree::Node<'a, 'input>],
    step: &Step,
) -> Vec<roxmltree::Node<'a, 'input>> {
    let mut out = Vec::new();
    for node in current {
        match (step.axis, step.descendant) {
            // `//x` — children of descendant-or-self, i.e. all strict
            // descendants.
            (Axis::Child, true) => {
                for candidate in node.descendants().skip(1) {
                    push_matching(&mut out, candidate, &step.test);
                }
            }
            (Axis::Child, false) => {
                for candidate in node.children() {
                    push_matching(&mut out, candidate, &step.test);
                }
            }
            (Axis::SelfNode, true) => {
                for candidate in node.descendants() {
                    push_matching(&mut out, candidate, &step.test);
                }
            }
            (Axis::SelfNode, false) => {
                push_matching(&mut out, *node, &step.test);
            }
            (Axis::Attribute | Axis::Namespace, _) => unreachable!("handled by caller"),
        }
    }
    out
}

fn push_matching<'a, 'input>(
    out: &mut Vec<roxmltree::Node<'a, 'input>>,
    candidate: roxmltree::Node<'a, 'input>,
    test: &NodeTest,
) {
    if matches_tree_node(candidate, test) && !out.iter().any(|n| n.id() == candidate.id()) {
        out.push(candidate);
    }
}

fn matches_tree_node(node: roxmltree::Node<'_, '_>, test: &NodeTest) -> bool {
    match test {
        NodeTest::Any => node.is_element(),
        NodeTest::Name { namespace, local } => {
            node.is_element()
                && node.tag_name().name() == local.as_str()
                && node.tag_name().namespace().unwrap_or("") == namespace.as_str()
        }
        NodeTest::NamespaceAny { namespace } => {
            node.is_element() && node.tag_name().namespace().unwrap_or("") == namespace.as_str()
        }
        NodeTest::AnyKind => true,
        NodeTest::Text => node.is_text(),
        NodeTest::Comment => node.is_comment(),
        NodeTest::Pi { target } => match node.pi() {
            Some(pi) => target.as_deref().map_or(true, |t| t == pi.target),
            None => false,
        },
    }
}

/// Elements whose attribute or namespace axes a final step draws from.
fn axis_owners<'a, 'input>(
    current: &[roxmltree::Node<'a, 'input>],
    descendant: bool,
) -> Vec<roxmltree::Node<'a, 'input>> {
    let mut owners: Vec<roxmltree::Node<'a, 'input>> = Vec::new();
    for node in current {
        if descendant {
            for candidate in node.descendants() {
                if candidate.is_element() && !owners.iter().any(|n| n.id() == candidate.id()) {
                    owners.push(candidate);
                }
            }
        } else if node.is_element() && !owners.iter().any(|n| n.id() == node.id()) {
            owners.push(*node);
        }
    }
    owners
}

fn collect_attributes(
    current: &[roxmltree::Node<'_, '_>],
    step: &Step,
) -> Vec<SelectedNode> {
    let mut out = Vec::new();
    for owner in axis_owners(current, step.descendant) {
        for attr in owner.attributes() {
            let namespace = attr.namespace().unwrap_or("");
            let matched = match &step.test {
                NodeTest::Any | NodeTest::AnyKind => true,
                NodeTest::Name {
                    namespace: test_ns,
                    local,
                } => namespace == test_ns.as_str() && attr.name() == local.as_str(),
                NodeTest::NamespaceAny { namespace: test_ns } => namespace == test_ns.as_str(),
                _ => false,
            };
            if matched {
                out.push(SelectedNode::Attribute {
                    element: owner.id(),
                    namespace: namespace.to_owned(),
                    local: attr.name().to_owned(),
                });
            }
        }
    }
    out
}

fn collect_namespaces(
    current: &[roxmltree::Node<'_, '_>],
    step: &Step,
) -> Vec<SelectedNode> {
    let mut out = Vec::new();
    for owner in axis_owners(current, step.descendant) {
        for (prefix, uri) in namespace_axis(owner) {
            let matched = match &step.test {
                NodeTest::Any | NodeTest::AnyKind => true,
                // A name test on the namespace axis matches the prefix.
                NodeTest::Name {
                    namespace: test_ns,
                    local,
                } => test_ns.is_empty() && prefix == *local,
                _ => false,
            };
            if matched {
                out.push(SelectedNode::Namespace {
                    element: owner.id(),
                    prefix,
                    uri,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> roxmltree::Document<'_> {
        roxmltree::Document::parse(xml).unwrap()
    }

    fn names(doc: &roxmltree::Document<'_>, selected: &[SelectedNode]) -> Vec<String> {
        selected
            .iter()
            .filter_map(|s| match s {
                SelectedNode::Tree(id) => doc
                    .get_node(*id)
                    .filter(|n| n.is_element())
                    .map(|n| n.tag_name().name().to_owned()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_descendant_name() {
        let doc = parse("<a><b><c/></b><c/></a>");
        let result = evaluate(doc.root(), "//c", &[]).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(names(&doc, &result), ["c", "c"]);
    }

    #[test]
    fn test_union_with_attribute() {
        let doc = parse(r#"<e1><e3 xml:lang="fr" xml:space="default"/></e1>"#);
        let result = evaluate(doc.root(), "//e3|//e3/@xml:lang", &[]).unwrap();
        let e3 = doc.descendants().find(|n| n.has_tag_name("e3")).unwrap();
        assert!(result.contains(&SelectedNode::Tree(e3.id())));
        assert!(result.contains(&SelectedNode::Attribute {
            element: e3.id(),
            namespace: sigtuna_core::ns::XML.to_owned(),
            local: "lang".to_owned(),
        }));
        // xml:space was not selected.
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_namespace_axis_by_prefix() {
        let doc = parse(r#"<e1 xmlns:ns1="http://a" xmlns:ns2="http://b"/>"#);
        let e1 = doc.root_element();
        let result = evaluate(doc.root(), "//namespace::ns2", &[]).unwrap();
        assert_eq!(
            result,
            [SelectedNode::Namespace {
                element: e1.id(),
                prefix: "ns2".to_owned(),
                uri: "http://b".to_owned(),
            }]
        );
    }

    #[test]
    fn test_namespace_axis_wildcard() {
        let doc = parse(r#"<e1 xmlns:ns1="http://a"><e2/></e1>"#);
        let result = evaluate(doc.root(), "//namespace::*", &[]).unwrap();
        // Both elements carry ns1 and the implicit xml binding.
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_attribute_wildcard_union() {
        let doc = parse(r#"<e1 attr1="value"><e2/></e1>"#);
        let e1 = doc.root_element();
        let result = evaluate(doc.root(), "//@*|//e2", &[]).unwrap();
        assert!(result.contains(&SelectedNode::Attribute {
            element: e1.id(),
            namespace: String::new(),
            local: "attr1".to_owned(),
        }));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_processing_instruction_target() {
        let doc = parse("<?test1?><e3/><?test2 data?>");
        let result = evaluate(doc.root(), "//processing-instruction('test1')", &[]).unwrap();
        assert_eq!(result.len(), 1);
        let all = evaluate(doc.root(), "//processing-instruction()", &[]).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_relative_prefixed_step() {
        let doc = parse(r#"<root xmlns:d="http://d"><d:inner/></root>"#);
        let bindings = [("d".to_owned(), "http://d".to_owned())];
        let result = evaluate(doc.root_element(), "./d:inner", &bindings).unwrap();
        assert_eq!(result.len(), 1);
        let inner = doc.descendants().filter(|n| n.is_element()).nth(1).unwrap();
        assert_eq!(result[0], SelectedNode::Tree(inner.id()));
    }

    #[test]
    fn test_wildcard_elements_only() {
        let doc = parse("<a>text<b/><!--c--></a>");
        let result = evaluate(doc.root(), "//*", &[]).unwrap();
        assert_eq!(names(&doc, &result), ["a", "b"]);
    }

    #[test]
    fn test_unbound_prefix_is_error() {
        let doc = parse("<a/>");
        let err = evaluate(doc.root(), "//nope:a", &[]).unwrap_err();
        assert!(matches!(err, Error::SubsetQuery(_)));
    }

    #[test]
    fn test_malformed_expression_is_error() {
        let doc = parse("<a/>");
        for expr in ["//", "a|", "//a[1]", "count(//a)", ""] {
            assert!(
                evaluate(doc.root(), expr, &[]).is_err(),
                "expected error for `{expr}`"
            );
        }
    }
}
