//! Canonical in-memory graph description.
//!
//! The builder produces exactly one [`GraphDescription`] per render. Both
//! backends are derived from it independently: [`GraphDescription::to_dot`]
//! serializes the line-oriented textual form, and the native adapter in
//! [`crate::native`] flattens the same tree into a typed graph object. The
//! two can therefore never diverge.
//!
//! Block nesting is structural here: a wrapper that is opened is closed by
//! construction, in exact reverse order, because blocks own their bodies.

use std::fmt::{self, Write};

/// An attribute value, controlling how it is quoted in the textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Emitted verbatim: `key=value`.
    Plain(String),
    /// Emitted quoted: `key="value"`.
    Quoted(String),
    /// Emitted as an HTML-like label: `key=<value>`.
    Html(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Plain(v) => write!(f, "{v}"),
            AttrValue::Quoted(v) => write!(f, "\"{v}\""),
            AttrValue::Html(v) => write!(f, "<{v}>"),
        }
    }
}

/// A single `key=value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    key: String,
    value: AttrValue,
}

impl Attr {
    /// Creates an unquoted attribute.
    pub fn plain(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_owned(),
            value: AttrValue::Plain(value.into()),
        }
    }

    /// Creates a quoted attribute.
    pub fn quoted(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_owned(),
            value: AttrValue::Quoted(value.into()),
        }
    }

    /// Creates an HTML-like label attribute.
    pub fn html(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_owned(),
            value: AttrValue::Html(value.into()),
        }
    }

    /// Returns the attribute key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the attribute value.
    pub fn value(&self) -> &AttrValue {
        &self.value
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Rank-grouping kinds recognized by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKind {
    Source,
    Sink,
    Min,
    Max,
}

impl RankKind {
    /// The keyword emitted inside a rank-grouping block.
    pub fn keyword(self) -> &'static str {
        match self {
            RankKind::Source => "source",
            RankKind::Sink => "sink",
            RankKind::Min => "min",
            RankKind::Max => "max",
        }
    }
}

/// One statement of the description.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Global or block-scoped attribute: `key=value;`.
    Attribute(Attr),
    /// Node declaration: `id [k=v,...];` (bare `id;` when no attributes).
    Node { id: String, attrs: Vec<Attr> },
    /// Edge: `tail->head [k=v,...];`.
    Edge {
        tail: String,
        head: String,
        attrs: Vec<Attr>,
    },
    /// Rank-grouping block: `{rank=min; ...}`.
    Rank { kind: RankKind, body: Vec<Statement> },
    /// Named block: `subgraph id { ... }`.
    Block { id: String, body: Vec<Statement> },
}

impl Statement {
    /// Declaration of a zero-size point-shaped anchor node.
    pub fn zero_point(id: impl Into<String>) -> Statement {
        Statement::Node {
            id: id.into(),
            attrs: vec![
                Attr::plain("shape", "point"),
                Attr::plain("width", ".01"),
                Attr::quoted("label", ""),
            ],
        }
    }

    /// A bare node reference, as used inside rank groups.
    pub fn node_ref(id: impl Into<String>) -> Statement {
        Statement::Node {
            id: id.into(),
            attrs: Vec::new(),
        }
    }

    fn write_dot(&self, out: &mut String) {
        match self {
            Statement::Attribute(attr) => {
                let _ = writeln!(out, "{attr};");
            }
            Statement::Node { id, attrs } => {
                if attrs.is_empty() {
                    let _ = writeln!(out, "{id};");
                } else {
                    let _ = writeln!(out, "{id} [{}];", join_attrs(attrs));
                }
            }
            Statement::Edge { tail, head, attrs } => {
                if attrs.is_empty() {
                    let _ = writeln!(out, "{tail}->{head};");
                } else {
                    let _ = writeln!(out, "{tail}->{head} [{}];", join_attrs(attrs));
                }
            }
            Statement::Rank { kind, body } => {
                let _ = writeln!(out, "{{rank={};", kind.keyword());
                for statement in body {
                    statement.write_dot(out);
                }
                out.push_str("}\n");
            }
            Statement::Block { id, body } => {
                let _ = writeln!(out, "subgraph {id} {{");
                for statement in body {
                    statement.write_dot(out);
                }
                out.push_str("}\n");
            }
        }
    }
}

fn join_attrs(attrs: &[Attr]) -> String {
    let mut out = String::new();
    for (i, attr) in attrs.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{attr}");
    }
    out
}

/// The complete description for one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDescription {
    statements: Vec<Statement>,
}

impl GraphDescription {
    /// Creates a description from already-ordered statements.
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Returns the top-level statements in emission order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Serializes the textual form consumed by process-based engines.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph unix {\n");
        for statement in &self.statements {
            statement.write_dot(&mut out);
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_statement() {
        let mut desc = String::new();
        Statement::Attribute(Attr::plain("remincross", "true")).write_dot(&mut desc);
        assert_eq!(desc, "remincross=true;\n");
    }

    #[test]
    fn test_node_with_and_without_attrs() {
        let mut out = String::new();
        Statement::node_ref("n1").write_dot(&mut out);
        Statement::zero_point("sp3").write_dot(&mut out);
        assert_eq!(out, "n1;\nsp3 [shape=point,width=.01,label=\"\"];\n");
    }

    #[test]
    fn test_edge_with_weight() {
        let mut out = String::new();
        Statement::Edge {
            tail: "minPoint3".into(),
            head: "sourceIn3".into(),
            attrs: vec![Attr::plain("weight", "999")],
        }
        .write_dot(&mut out);
        assert_eq!(out, "minPoint3->sourceIn3 [weight=999];\n");
    }

    #[test]
    fn test_rank_block() {
        let mut out = String::new();
        Statement::Rank {
            kind: RankKind::Min,
            body: vec![Statement::node_ref("a"), Statement::node_ref("b")],
        }
        .write_dot(&mut out);
        assert_eq!(out, "{rank=min;\na;\nb;\n}\n");
    }

    #[test]
    fn test_nested_blocks_balance() {
        let desc = GraphDescription::new(vec![Statement::Block {
            id: "cluster3a".into(),
            body: vec![Statement::Block {
                id: "cluster3".into(),
                body: vec![Statement::node_ref("n1")],
            }],
        }]);
        let dot = desc.to_dot();
        let opens = dot.matches('{').count();
        let closes = dot.matches('}').count();
        assert_eq!(opens, closes);
        assert!(dot.starts_with("digraph unix {\n"));
        assert!(dot.contains("subgraph cluster3a {\nsubgraph cluster3 {\nn1;\n}\n}\n"));
    }

    #[test]
    fn test_html_label_quoting() {
        let attr = Attr::html("label", "<table></table>");
        assert_eq!(attr.to_string(), "label=<<table></table>>");
    }
}
