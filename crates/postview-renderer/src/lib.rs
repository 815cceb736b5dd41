mod highlight;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use postview_core::{SafeHtml, TocEntry, TocNode, ViewportBand, escape_attr, escape_text, nest_toc};

pub use highlight::{HighlightReport, Highlighter, HighlighterConfig};

const BASE_CSS: &str = include_str!("../assets/postview.css");
const BASE_JS: &str = include_str!("../assets/postview.js");

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

/// Wraps rendered post bodies into standalone pages.
#[derive(Debug, Clone)]
pub struct Renderer {
    theme: Theme,
    band: ViewportBand,
    custom_vars: BTreeMap<String, String>,
}

impl Renderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            band: ViewportBand::default(),
            custom_vars: BTreeMap::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_band(mut self, band: ViewportBand) -> Self {
        self.band = band;
        self
    }

    pub fn stylesheet(&self) -> String {
        let mut out = String::new();
        let (light_vars, dark_vars) = default_theme_vars();

        match self.theme {
            Theme::Auto => {
                out.push_str(&root_block(&light_vars, "  ", true));
                out.push_str("@media (prefers-color-scheme: dark) {\n");
                out.push_str(&root_block(&dark_vars, "    ", true));
                out.push_str("}\n");
            }
            Theme::Light => out.push_str(&root_block(&light_vars, "  ", true)),
            Theme::Dark => out.push_str(&root_block(&dark_vars, "  ", true)),
        }

        if !self.custom_vars.is_empty() {
            out.push_str(&root_block(&self.custom_vars, "  ", false));
        }

        out.push_str(BASE_CSS);
        out
    }

    /// Table-of-contents sidebar for `toc`, or nothing when it is empty.
    pub fn toc_nav(&self, toc: &[TocEntry]) -> String {
        if toc.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        out.push_str("<nav class=\"postview-toc\" data-root-margin=\"");
        out.push_str(&escape_attr(&self.band.root_margin()));
        out.push_str("\">\n");
        push_toc_list(&mut out, &nest_toc(toc), 1);
        out.push_str("</nav>\n");
        out
    }

    pub fn embed_html(
        &self,
        title: Option<&str>,
        body: &SafeHtml,
        toc: &[TocEntry],
        with_inline_css: bool,
        with_inline_js: bool,
    ) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n");
        out.push_str("<html lang=\"en\">\n");
        out.push_str("<head>\n");
        out.push_str("  <meta charset=\"utf-8\" />\n");
        out.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
        if let Some(title) = title {
            out.push_str("  <title>");
            out.push_str(&escape_text(title));
            out.push_str("</title>\n");
        }
        if with_inline_css {
            out.push_str("  <style>\n");
            out.push_str(&self.stylesheet());
            out.push_str("\n  </style>\n");
        }
        out.push_str("</head>\n");
        out.push_str("<body>\n");
        out.push_str("<div class=\"postview-page\">\n");
        out.push_str("<article class=\"postview-body\">\n");
        out.push_str(body.as_str());
        if !body.as_str().ends_with('\n') {
            out.push('\n');
        }
        out.push_str("</article>\n");
        out.push_str(&self.toc_nav(toc));
        out.push_str("</div>\n");
        if with_inline_js && !toc.is_empty() {
            out.push_str("  <script>\n");
            out.push_str(BASE_JS);
            out.push_str("\n  </script>\n");
        }
        out.push_str("</body>\n");
        out.push_str("</html>\n");
        out
    }

    pub fn generate_files(&self, out_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(out_dir)?;
        fs::write(out_dir.join("postview.css"), self.stylesheet())?;
        fs::write(out_dir.join("postview.js"), BASE_JS)?;
        Ok(())
    }
}

fn push_toc_list(out: &mut String, nodes: &[TocNode], depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push_str("<ul>\n");
    for node in nodes {
        out.push_str(&indent);
        out.push_str("  <li><a href=\"#");
        out.push_str(&escape_attr(&node.entry.id));
        out.push_str("\" data-target=\"");
        out.push_str(&escape_attr(&node.entry.id));
        out.push_str("\">");
        out.push_str(&escape_text(&node.entry.text));
        out.push_str("</a>");
        if node.children.is_empty() {
            out.push_str("</li>\n");
        } else {
            out.push('\n');
            push_toc_list(out, &node.children, depth + 2);
            out.push_str(&indent);
            out.push_str("  </li>\n");
        }
    }
    out.push_str(&indent);
    out.push_str("</ul>\n");
}

/// Reading palette; every variable here is referenced by `postview.css`.
fn default_theme_vars() -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let palette = |pairs: [(&str, &str); 7]| {
        pairs
            .into_iter()
            .map(|(key, value)| (format!("--postview-{key}"), value.to_string()))
            .collect::<BTreeMap<_, _>>()
    };

    let light = palette([
        ("bg", "#fffdf7"),
        ("fg", "#2d2a26"),
        ("muted", "#7a7166"),
        ("border", "#e6dfd3"),
        ("accent", "#c2410c"),
        ("code-bg", "#f6f1e7"),
        ("code-fg", "#3b352e"),
    ]);

    let dark = palette([
        ("bg", "#17151a"),
        ("fg", "#ece7df"),
        ("muted", "#a39a8f"),
        ("border", "#35303a"),
        ("accent", "#fb923c"),
        ("code-bg", "#221f27"),
        ("code-fg", "#f3eee6"),
    ]);

    (light, dark)
}

fn root_block(vars: &BTreeMap<String, String>, indent: &str, include_color_scheme: bool) -> String {
    let outer = &indent[..indent.len() - 2];
    let mut out = String::new();
    out.push_str(outer);
    out.push_str(":root {\n");
    if include_color_scheme {
        out.push_str(indent);
        out.push_str("color-scheme: light dark;\n");
    }
    for (key, value) in vars {
        out.push_str(indent);
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
        out.push_str(";\n");
    }
    out.push_str(outer);
    out.push_str("}\n");
    out
}
