use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// How a stored post body is encoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Encoding {
    /// Markup produced by the rich-text editor.
    RealHtml,
    /// Escaped tags (`&lt;h2&gt;`), possibly with real anchors mixed in.
    MixedHtmlAndEscaped,
    /// Paragraphs separated by blank lines with `#` heading markers.
    LegacyPlainText,
}

impl Encoding {
    pub fn is_html(self) -> bool {
        !matches!(self, Encoding::LegacyPlainText)
    }

    pub fn needs_repair(self) -> bool {
        matches!(self, Encoding::MixedHtmlAndEscaped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::RealHtml => "real-html",
            Encoding::MixedHtmlAndEscaped => "mixed-html-and-escaped",
            Encoding::LegacyPlainText => "legacy-plain-text",
        }
    }
}

static ESCAPED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&lt;(?:/|[A-Za-z])").expect("ESCAPED_TAG regex is valid")
});

static REAL_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(?:[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?|/[A-Za-z][A-Za-z0-9-]*\s*)>")
        .expect("REAL_TAG regex is valid")
});

/// True when `text` contains an entity-escaped tag such as `&lt;p` or `&lt;/`.
pub fn has_escaped_tags(text: &str) -> bool {
    ESCAPED_TAG.is_match(text)
}

pub fn has_real_tags(text: &str) -> bool {
    REAL_TAG.is_match(text)
}

/// Escaped-tag signal wins over real tags: such content always needs repair.
pub fn classify(raw: &str) -> Encoding {
    if has_escaped_tags(raw) {
        Encoding::MixedHtmlAndEscaped
    } else if has_real_tags(raw) {
        Encoding::RealHtml
    } else {
        Encoding::LegacyPlainText
    }
}
