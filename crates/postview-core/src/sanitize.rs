use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use ammonia::Builder;
use serde::Serialize;

pub const EMPTY_PARAGRAPH: &str = "<p></p>";

/// Class the post editor puts on uploaded images.
pub const INLINE_IMAGE_CLASS: &str = "inline-image";

/// HTML that passed the allow-list and may be mounted as raw markup.
///
/// Only this crate can construct one: from sanitizer output, or by serializing
/// a mounted tree that itself came from sanitizer output or escaped text.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub(crate) fn from_trusted(html: String) -> Self {
        Self(html)
    }

    pub fn empty_paragraph() -> Self {
        Self(EMPTY_PARAGRAPH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl AsRef<str> for SafeHtml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allow-list sanitizer for post bodies; build once and reuse.
pub struct Sanitizer {
    builder: Builder<'static>,
}

impl Sanitizer {
    pub fn new() -> Self {
        let tags: HashSet<&'static str> = [
            "a",
            "b",
            "blockquote",
            "br",
            "code",
            "del",
            "em",
            "h1",
            "h2",
            "h3",
            "hr",
            "i",
            "img",
            "li",
            "ol",
            "p",
            "pre",
            "s",
            "strike",
            "strong",
            "ul",
        ]
        .iter()
        .copied()
        .collect();

        let mut tag_attributes = HashMap::new();
        tag_attributes.insert("a", ["href", "target", "rel"].iter().copied().collect());
        tag_attributes.insert("img", ["src", "alt", "class"].iter().copied().collect());
        // Language hints for the highlighter (`language-rust`).
        tag_attributes.insert("code", ["class"].iter().copied().collect());
        tag_attributes.insert("pre", ["class"].iter().copied().collect());

        let mut builder = Builder::default();
        builder
            .tags(tags)
            .tag_attributes(tag_attributes)
            .generic_attributes(HashSet::new())
            .add_url_schemes(["data"])
            .attribute_filter(filter_attribute)
            // The rewriter owns `rel`; ammonia must not add its own.
            .link_rel(None)
            .strip_comments(true);
        Self { builder }
    }

    /// Runs the allow-list. The result may be blank if nothing was allowed.
    pub fn clean(&self, html: &str) -> SafeHtml {
        SafeHtml::from_trusted(self.builder.clean(html).to_string())
    }
}

/// Second pass over attributes that survived the allow-list: `data:` URLs
/// only as `data:image/` sources, and `class` only for language hints and
/// the editor's image class.
fn filter_attribute<'u>(element: &str, attribute: &str, value: &'u str) -> Option<Cow<'u, str>> {
    match (element, attribute) {
        ("img", "src") if has_scheme(value, "data:") => {
            has_scheme(value, "data:image/").then_some(Cow::Borrowed(value))
        }
        (_, "href" | "src") if has_scheme(value, "data:") => None,
        ("img", "class") => keep_classes(value, |class| class == INLINE_IMAGE_CLASS),
        ("code" | "pre", "class") => keep_classes(value, is_language_class),
        _ => Some(Cow::Borrowed(value)),
    }
}

fn has_scheme(value: &str, prefix: &str) -> bool {
    value
        .trim_start()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn is_language_class(class: &str) -> bool {
    class.starts_with("language-") || class.starts_with("lang-")
}

fn keep_classes<'u>(value: &'u str, keep: impl Fn(&str) -> bool) -> Option<Cow<'u, str>> {
    let kept: Vec<&str> = value.split_ascii_whitespace().filter(|class| keep(class)).collect();
    if kept.is_empty() {
        None
    } else {
        Some(Cow::Owned(kept.join(" ")))
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sanitizer").finish_non_exhaustive()
    }
}
