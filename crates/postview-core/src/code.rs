use crate::tree::{Element, Node};

/// Marker set on a `<code>` element once a highlighter has processed it.
pub const HIGHLIGHTED_ATTR: &str = "data-highlighted";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// A run of code text with the style a grammar assigned to it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HighlightToken {
    pub text: String,
    pub color: Option<Rgb>,
    pub italic: bool,
    pub underline: bool,
}

impl HighlightToken {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            italic: false,
            underline: false,
        }
    }

    fn style(&self) -> String {
        let mut style = String::new();
        if let Some(Rgb { r, g, b }) = self.color {
            style.push_str(&format!("color:#{:02x}{:02x}{:02x};", r, g, b));
        }
        if self.italic {
            style.push_str("font-style:italic;");
        }
        if self.underline {
            style.push_str("text-decoration:underline;");
        }
        style
    }

    fn into_node(self) -> Node {
        let style = self.style();
        if style.is_empty() {
            return Node::Text(self.text);
        }
        Node::Element(
            Element::new("span")
                .with_attr("style", style)
                .with_child(Node::Text(self.text)),
        )
    }
}

/// A `<pre><code>` block of a mounted document, open to highlighting only.
///
/// Token text is always emitted as text nodes and styles are generated from
/// numeric colors, so highlighting cannot smuggle markup into the page.
pub struct CodeBlock<'a> {
    code: &'a mut Element,
    pre_classes: Vec<String>,
}

impl<'a> CodeBlock<'a> {
    pub(crate) fn new(code: &'a mut Element, pre_classes: Vec<String>) -> Self {
        Self { code, pre_classes }
    }

    /// Language named by a `language-x` or `lang-x` class on the code element,
    /// falling back to the enclosing `<pre>`.
    pub fn language_hint(&self) -> Option<String> {
        self.code
            .classes()
            .chain(self.pre_classes.iter().map(String::as_str))
            .find_map(language_from_class)
            .map(|lang| lang.to_ascii_lowercase())
    }

    pub fn text(&self) -> String {
        self.code.text_content()
    }

    pub fn is_highlighted(&self) -> bool {
        self.code.attr(HIGHLIGHTED_ATTR).is_some()
    }

    /// Replaces the block's content with styled tokens and marks it processed.
    pub fn apply_tokens(&mut self, language: &str, tokens: Vec<HighlightToken>) {
        self.code.children = tokens.into_iter().map(HighlightToken::into_node).collect();
        let language = class_safe(language);
        if !language.is_empty() {
            self.code.add_class(&format!("language-{}", language));
        }
        self.code.add_class("hl");
        self.code.set_attr(HIGHLIGHTED_ATTR, "yes");
    }

    /// Marks the block processed without touching its text.
    pub fn mark_plain(&mut self) {
        self.code.set_attr(HIGHLIGHTED_ATTR, "yes");
    }
}

fn language_from_class(class: &str) -> Option<&str> {
    class
        .strip_prefix("language-")
        .or_else(|| class.strip_prefix("lang-"))
        .filter(|lang| !lang.is_empty())
}

fn class_safe(language: &str) -> String {
    language
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '#' | '-' | '_'))
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Calls `visit` for the first `<code>` child of every `<pre>`.
pub(crate) fn visit_code_blocks(nodes: &mut [Node], visit: &mut impl FnMut(&mut CodeBlock<'_>)) {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };
        if element.name == "pre" {
            let pre_classes: Vec<String> = element.classes().map(str::to_string).collect();
            let code = element.children.iter_mut().find_map(|child| match child {
                Node::Element(code) if code.name == "code" => Some(code),
                _ => None,
            });
            if let Some(code) = code {
                visit(&mut CodeBlock::new(code, pre_classes));
                continue;
            }
        }
        visit_code_blocks(&mut element.children, visit);
    }
}
