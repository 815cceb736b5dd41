use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use postview_core::{HighlightToken, MountedDocument, Rgb};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style, Theme as SyntectTheme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::Theme;

/// Languages registered by [`HighlighterConfig::default_set`]: the name used
/// in `language-x` hints, and the syntect token that resolves its grammar.
const DEFAULT_GRAMMARS: &[(&str, &str)] = &[
    ("bash", "sh"),
    ("sh", "sh"),
    ("shell", "sh"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("c++", "cpp"),
    ("css", "css"),
    ("go", "go"),
    ("html", "html"),
    ("java", "java"),
    ("javascript", "js"),
    ("js", "js"),
    ("jsx", "js"),
    ("json", "json"),
    ("markdown", "md"),
    ("md", "md"),
    ("php", "php"),
    ("python", "py"),
    ("py", "py"),
    ("ruby", "rb"),
    ("rb", "rb"),
    ("rust", "rs"),
    ("rs", "rs"),
    ("sql", "sql"),
    ("xml", "xml"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
];

/// Grammar registry and color theme, built once at startup and passed to
/// [`Highlighter`].
pub struct HighlighterConfig {
    syntax_set: SyntaxSet,
    theme: SyntectTheme,
    /// Hint name -> syntect syntax name.
    grammars: BTreeMap<String, String>,
    /// Syntect syntax name -> canonical hint name, for auto-detected blocks.
    canonical: BTreeMap<String, String>,
}

impl HighlighterConfig {
    /// An empty registry: every block stays plain until grammars are added.
    pub fn new(syntax_set: SyntaxSet, theme: SyntectTheme) -> Self {
        Self {
            syntax_set,
            theme,
            grammars: BTreeMap::new(),
            canonical: BTreeMap::new(),
        }
    }

    /// Syntect's bundled grammars, registered under common blog languages.
    pub fn default_set(theme: Theme) -> Self {
        let theme_set = ThemeSet::load_defaults();
        let theme = pick_theme(theme, &theme_set);
        let mut config = Self::new(SyntaxSet::load_defaults_newlines(), theme);
        for (name, token) in DEFAULT_GRAMMARS {
            config = config.with_grammar(name, token);
        }
        config
    }

    /// Registers `name` (as used in `language-x` hints) for the grammar found by
    /// `token`. Unknown tokens are skipped with a warning.
    pub fn with_grammar(mut self, name: &str, token: &str) -> Self {
        let name = name.to_ascii_lowercase();
        let Some(syntax) = self.syntax_set.find_syntax_by_token(token) else {
            warn!("highlight: no grammar for token {token:?}, {name:?} stays plain");
            return self;
        };
        let syntax_name = syntax.name.clone();
        self.canonical
            .entry(syntax_name.clone())
            .or_insert_with(|| name.clone());
        self.grammars.insert(name, syntax_name);
        self
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.grammars.keys().map(String::as_str)
    }

    fn grammar(&self, name: &str) -> Option<(&str, &SyntaxReference)> {
        let syntax_name = self.grammars.get(name)?;
        let syntax = self.syntax_set.find_syntax_by_name(syntax_name)?;
        let canonical = self.canonical.get(syntax_name).map(String::as_str)?;
        Some((canonical, syntax))
    }

    /// First-line detection (shebangs, `<?xml`, `<?php`, modelines), limited
    /// to registered grammars. Unhinted blocks without such a first line stay
    /// plain; there is no content scoring.
    fn detect(&self, text: &str) -> Option<(&str, &SyntaxReference)> {
        let first_line = text.lines().find(|line| !line.trim().is_empty())?;
        let syntax = self.syntax_set.find_syntax_by_first_line(first_line)?;
        let canonical = self.canonical.get(&syntax.name)?;
        Some((canonical.as_str(), syntax))
    }
}

impl fmt::Debug for HighlighterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlighterConfig")
            .field("theme", &self.theme.name)
            .field("grammars", &self.grammars)
            .finish_non_exhaustive()
    }
}

/// What one [`Highlighter::highlight_all`] pass did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HighlightReport {
    pub highlighted: usize,
    pub plain: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct Highlighter {
    config: HighlighterConfig,
}

impl Highlighter {
    pub fn new(config: HighlighterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HighlighterConfig {
        &self.config
    }

    /// Highlights every code block not yet marked as processed.
    ///
    /// Blocks in unregistered languages stay plain text but are marked too, so
    /// calling this after every re-render is cheap. Unhinted blocks are only
    /// highlighted when their first line names the language.
    pub fn highlight_all(&self, document: &mut MountedDocument) -> HighlightReport {
        let mut report = HighlightReport::default();
        document.for_each_code_block(|block| {
            if block.is_highlighted() {
                report.skipped += 1;
                return;
            }
            let text = block.text();
            let grammar = match block.language_hint() {
                Some(hint) => self.config.grammar(&hint),
                None => self.config.detect(&text),
            };
            let Some((language, syntax)) = grammar else {
                block.mark_plain();
                report.plain += 1;
                return;
            };
            match self.tokenize(&text, syntax) {
                Ok(tokens) => {
                    block.apply_tokens(language, tokens);
                    report.highlighted += 1;
                }
                Err(err) => {
                    warn!("highlight: {language} block left plain: {err}");
                    block.mark_plain();
                    report.plain += 1;
                }
            }
        });
        debug!(
            "highlight: {} highlighted, {} plain, {} already done",
            report.highlighted, report.plain, report.skipped
        );
        report
    }

    fn tokenize(
        &self,
        text: &str,
        syntax: &SyntaxReference,
    ) -> Result<Vec<HighlightToken>, syntect::Error> {
        let mut highlighter = HighlightLines::new(syntax, &self.config.theme);
        let mut tokens: Vec<HighlightToken> = Vec::new();
        for line in LinesWithEndings::from(text) {
            for (style, piece) in highlighter.highlight_line(line, &self.config.syntax_set)? {
                let token = token_from_style(style, piece);
                match tokens.last_mut() {
                    Some(last) if same_style(last, &token) => last.text.push_str(&token.text),
                    _ => tokens.push(token),
                }
            }
        }
        Ok(tokens)
    }
}

fn token_from_style(style: Style, text: &str) -> HighlightToken {
    let color = style.foreground;
    HighlightToken {
        text: text.to_string(),
        color: Some(Rgb {
            r: color.r,
            g: color.g,
            b: color.b,
        }),
        italic: style.font_style.contains(FontStyle::ITALIC),
        underline: style.font_style.contains(FontStyle::UNDERLINE),
    }
}

fn same_style(a: &HighlightToken, b: &HighlightToken) -> bool {
    a.color == b.color && a.italic == b.italic && a.underline == b.underline
}

fn pick_theme(theme: Theme, theme_set: &ThemeSet) -> SyntectTheme {
    let candidates = match theme {
        Theme::Dark => ["Monokai Extended Bright", "Monokai Extended", "base16-ocean.dark"],
        Theme::Light => ["InspiredGitHub", "Solarized (light)", "base16-ocean.light"],
        Theme::Auto => ["InspiredGitHub", "Solarized (light)", "base16-ocean.light"],
    };
    for name in candidates {
        if let Some(found) = theme_set.themes.get(name) {
            return found.clone();
        }
    }
    match theme_set.themes.values().next() {
        Some(found) => found.clone(),
        None => {
            warn!("highlight: no bundled themes, using syntect defaults");
            SyntectTheme::default()
        }
    }
}
