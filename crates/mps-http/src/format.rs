// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A small element tree shared by all of §4.4's non-raw response encoders.
//! Each response is built once as a `Node` tree; `render_xml`/`render_rss`
//! and `render_object` then walk the same tree into the five text formats,
//! so the result shape (element/field names, ordering, nesting) can't drift
//! between formats the way five hand-written encoders would risk.

use base64::Engine;

use crate::escape::{escape_for_quote, xml_escape};
use crate::path::Extensions;

#[derive(Debug, Clone)]
pub enum Node {
    Leaf(&'static str, String),
    Group(&'static str, Vec<Node>),
    /// A repeated element: `name` wraps each inner child-list independently,
    /// e.g. `searchResult` repeated once per `SearchResult`.
    Items(&'static str, Vec<Vec<Node>>),
}

pub fn leaf(name: &'static str, value: impl ToString) -> Node {
    Node::Leaf(name, value.to_string())
}

pub fn opt_leaf(name: &'static str, value: &Option<impl ToString>) -> Option<Node> {
    value.as_ref().map(|v| leaf(name, v.to_string()))
}

pub fn base64_leaf(name: &'static str, bytes: &[u8]) -> Node {
    Node::Leaf(name, base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Renders `nodes` as bare XML fragments under one `root` element, the
/// plain-XML format (`text/xml`).
pub fn render_xml(root: &'static str, nodes: &[Node]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!("<{root}>"));
    render_children(nodes, &mut out);
    out.push_str(&format!("</{root}>"));
    out
}

/// Renders the same tree wrapped in an RSS 2.0 envelope (`application/
/// rss+xml`), with optional `mps`/`opensearch` namespace declarations per
/// §4.4's `extensions` selector.
pub fn render_rss(root: &'static str, nodes: &[Node], extensions: Extensions) -> String {
    let mut ns = String::new();
    if extensions.mps {
        ns.push_str(" xmlns:mps=\"https://example.invalid/mps\"");
    }
    if extensions.opensearch {
        ns.push_str(" xmlns:opensearch=\"https://a9.com/-/spec/opensearch/1.1/\"");
        ns.push_str(" xmlns:relevance=\"https://a9.com/-/opensearch/extensions/relevance/1.0/\"");
    }
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!("<rss version=\"2.0\"{ns}><channel><title>{root}</title>"));
    render_children(nodes, &mut out);
    out.push_str("</channel></rss>");
    out
}

fn render_children(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Leaf(name, value) => {
                out.push_str(&format!("<{name}>{}</{name}>", xml_escape(value)));
            }
            Node::Group(name, children) => {
                out.push_str(&format!("<{name}>"));
                render_children(children, out);
                out.push_str(&format!("</{name}>"));
            }
            Node::Items(name, items) => {
                for children in items {
                    out.push_str(&format!("<{name}>"));
                    render_children(children, out);
                    out.push_str(&format!("</{name}>"));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSyntax {
    Json,
    Ruby,
    Python,
}

impl ObjectSyntax {
    fn quote(self) -> char {
        match self {
            ObjectSyntax::Json | ObjectSyntax::Ruby => '"',
            ObjectSyntax::Python => '\'',
        }
    }

    fn key_value_separator(self) -> &'static str {
        match self {
            ObjectSyntax::Json | ObjectSyntax::Python => ": ",
            ObjectSyntax::Ruby => " => ",
        }
    }

    fn key(self, name: &str) -> String {
        match self {
            ObjectSyntax::Ruby => format!(":{name}"),
            ObjectSyntax::Json | ObjectSyntax::Python => {
                format!("{q}{name}{q}", q = self.quote())
            }
        }
    }

    fn string_literal(self, value: &str) -> String {
        let q = self.quote();
        format!("{q}{}{q}", escape_for_quote(value, q))
    }
}

/// Renders the tree as one object literal, the shared shape behind
/// `text/x-json`, `text/x-ruby`, and `text/x-python`.
pub fn render_object(root: &'static str, nodes: &[Node], syntax: ObjectSyntax) -> String {
    let mut out = String::new();
    out.push('{');
    out.push_str(&syntax.key(root));
    out.push_str(syntax.key_value_separator());
    render_object_body(nodes, syntax, &mut out);
    out.push('}');
    out
}

fn render_object_body(nodes: &[Node], syntax: ObjectSyntax, out: &mut String) {
    out.push('{');
    let mut first = true;
    for node in nodes {
        if !first {
            out.push(',');
        }
        first = false;
        match node {
            Node::Leaf(name, value) => {
                out.push_str(&syntax.key(name));
                out.push_str(syntax.key_value_separator());
                out.push_str(&syntax.string_literal(value));
            }
            Node::Group(name, children) => {
                out.push_str(&syntax.key(name));
                out.push_str(syntax.key_value_separator());
                render_object_body(children, syntax, out);
            }
            Node::Items(name, items) => {
                out.push_str(&syntax.key(name));
                out.push_str(syntax.key_value_separator());
                out.push('[');
                for (i, children) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    render_object_body(children, syntax, out);
                }
                out.push(']');
            }
        }
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_xml_nests_groups_and_repeats_items() {
        let nodes = vec![
            leaf("search", "hello"),
            Node::Items(
                "searchResult",
                vec![
                    vec![leaf("documentKey", "k1")],
                    vec![leaf("documentKey", "k2")],
                ],
            ),
        ];
        let xml = render_xml("searchResponse", &nodes);
        assert!(xml.contains("<search>hello</search>"));
        assert!(xml.contains("<searchResult><documentKey>k1</documentKey></searchResult>"));
        assert!(xml.contains("<searchResult><documentKey>k2</documentKey></searchResult>"));
    }

    #[test]
    fn render_rss_adds_extension_namespaces() {
        let rss = render_rss("searchResponse", &[], Extensions { mps: true, opensearch: true });
        assert!(rss.contains("xmlns:mps="));
        assert!(rss.contains("xmlns:opensearch="));
    }

    #[test]
    fn render_object_quotes_python_strings_with_single_quote() {
        let nodes = vec![leaf("title", "it's ok")];
        let out = render_object("doc", &nodes, ObjectSyntax::Python);
        assert!(out.contains("'it\\'s ok'"));
    }
}
