//! Explicit HTML tree used by every stage that needs structure.
//!
//! Markup is parsed inertly through `html5ever` (no script runs, no resource
//! loads) and copied into plain owned nodes, so repair, URL rewriting and the
//! post-mount passes work headlessly. Serialization is deterministic.

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{LocalName, Namespace, ParseOpts, QualName, parse_fragment as parse_html};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::error::RepairError;

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

/// An ordered run of top-level nodes, i.e. the body of a post.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Replaces the value in place, or appends the attribute when absent.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(Attr {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|attr| attr.name != name);
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|name| name == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            collect_text(child, &mut out);
        }
        out
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }
}

impl Fragment {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Parses `html` as the children of a `<body>` element.
    ///
    /// Fails only when the markup nests deeper than `max_depth` elements.
    pub fn parse(html: &str, max_depth: usize) -> Result<Self, RepairError> {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let context = QualName::new(None, Namespace::from(HTML_NS), LocalName::from("body"));
        let dom = parse_html(RcDom::default(), opts, context, Vec::new()).one(html);

        let mut nodes = Vec::new();
        for child in dom.document.children.borrow().iter() {
            match &child.data {
                // Fragment parsing roots everything under a synthetic <html>.
                NodeData::Element { name, .. } if &*name.local == "html" => {
                    for grandchild in child.children.borrow().iter() {
                        convert(grandchild, 1, max_depth, &mut nodes)?;
                    }
                }
                _ => convert(child, 1, max_depth, &mut nodes)?,
            }
        }
        Ok(Self { nodes })
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            collect_text(node, &mut out);
        }
        out
    }

    /// Visits every element in document order (pre-order).
    pub fn for_each_element_mut(&mut self, visit: &mut impl FnMut(&mut Element)) {
        for node in &mut self.nodes {
            visit_mut(node, visit);
        }
    }

    pub fn for_each_element(&self, visit: &mut impl FnMut(&Element)) {
        for node in &self.nodes {
            visit_ref(node, visit);
        }
    }

    /// Applies `map` bottom-up to every node list, letting it replace nodes.
    pub fn rewrite_nodes(&mut self, map: &mut impl FnMut(Node) -> Vec<Node>) {
        self.nodes = rewrite_list(std::mem::take(&mut self.nodes), map);
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            serialize(node, None, &mut out);
        }
        out
    }
}

fn convert(
    handle: &Handle,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<Node>,
) -> Result<(), RepairError> {
    match &handle.data {
        NodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            match out.last_mut() {
                Some(Node::Text(previous)) => previous.push_str(&text),
                _ => out.push(Node::Text(text)),
            }
        }
        NodeData::Element { name, attrs, .. } => {
            if depth > max_depth {
                return Err(RepairError::TooDeep { limit: max_depth });
            }
            let mut element = Element::new(name.local.to_string());
            for attr in attrs.borrow().iter() {
                element.attrs.push(Attr {
                    name: attr.name.local.to_string(),
                    value: attr.value.to_string(),
                });
            }
            for child in handle.children.borrow().iter() {
                convert(child, depth + 1, max_depth, &mut element.children)?;
            }
            out.push(Node::Element(element));
        }
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert(child, depth, max_depth, out)?;
            }
        }
        NodeData::Doctype { .. } | NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {}
    }
    Ok(())
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            for child in &element.children {
                collect_text(child, out);
            }
        }
    }
}

fn visit_mut(node: &mut Node, visit: &mut impl FnMut(&mut Element)) {
    if let Node::Element(element) = node {
        visit(element);
        for child in &mut element.children {
            visit_mut(child, visit);
        }
    }
}

fn visit_ref(node: &Node, visit: &mut impl FnMut(&Element)) {
    if let Node::Element(element) = node {
        visit(element);
        for child in &element.children {
            visit_ref(child, visit);
        }
    }
}

fn rewrite_list(nodes: Vec<Node>, map: &mut impl FnMut(Node) -> Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let node = match node {
            Node::Element(mut element) => {
                element.children = rewrite_list(std::mem::take(&mut element.children), map);
                Node::Element(element)
            }
            text => text,
        };
        for replaced in map(node) {
            if let (Node::Text(text), Some(Node::Text(previous))) = (&replaced, out.last_mut()) {
                previous.push_str(text);
                continue;
            }
            out.push(replaced);
        }
    }
    out
}

fn serialize(node: &Node, parent: Option<&str>, out: &mut String) {
    match node {
        Node::Text(text) => {
            if parent.is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name)) {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for attr in &element.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape_attr(&attr.value));
                out.push('"');
            }
            out.push('>');
            if element.is_void() {
                return;
            }
            for child in &element.children {
                serialize(child, Some(&element.name), out);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
