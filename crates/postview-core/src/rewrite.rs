use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{PipelineConfig, RepairLimits};
use crate::diagnostic::{Diagnostic, DiagnosticSeverity, I_HREF_RECOVERED, W_HREF_UNRESOLVED};
use crate::tree::{Element, Fragment};

/// Path prefix under which the blog API serves uploaded images.
pub const API_MOUNT_PREFIX: &str = "/api/";

pub const EXTERNAL_LINK_TARGET: &str = "_blank";
pub const EXTERNAL_LINK_REL: &str = "noopener noreferrer";

static IMAGE_GROUP_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-f0-9]{24}$").expect("IMAGE_GROUP_ID regex is valid"));

static HREF_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href\s*=\s*"([^"]*)""#).expect("HREF_FRAGMENT regex is valid"));

static URL_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("URL_IN_TEXT regex is valid"));

/// Resolves an image reference the way the blog API expects.
///
/// Absolute (`http…`) and `data:` URLs pass through, a bare 24-character
/// image-group id maps to the group endpoint at the configured size, and
/// API-relative paths are prefixed with the API origin.
pub fn resolve_image_url(url: &str, config: &PipelineConfig) -> String {
    let url = url.trim();
    if url.is_empty() || url.starts_with("http") || url.starts_with("data:") {
        return url.to_string();
    }
    if IMAGE_GROUP_ID.is_match(url) {
        return format!(
            "{}/api/v1/blog/images/group/{}?size={}",
            config.api_base(),
            url,
            config.image_size()
        );
    }
    if url.starts_with(API_MOUNT_PREFIX) {
        return format!("{}{}", config.api_base(), url);
    }
    url.to_string()
}

/// String-level entry point: absolutizes API images and makes anchors safe.
///
/// An `api_base` that is not an absolute `http(s)` origin leaves image sources
/// untouched; anchors are still secured. Markup that cannot be parsed within
/// the default limits is returned as-is.
pub fn rewrite_urls(html: &str, api_base: &str) -> String {
    let config = match PipelineConfig::new(api_base) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!("rewrite_urls: {err}; image sources left unchanged");
            None
        }
    };
    let mut fragment = match Fragment::parse(html, RepairLimits::default().max_depth) {
        Ok(fragment) => fragment,
        Err(err) => {
            warn!("rewrite_urls: {err}");
            return html.to_string();
        }
    };
    let mut diagnostics = Vec::new();
    rewrite_elements(&mut fragment, config.as_ref(), &mut diagnostics);
    fragment.to_html()
}

/// Rewrites image sources and anchors in place.
pub fn rewrite_fragment(
    fragment: &mut Fragment,
    config: &PipelineConfig,
    diagnostics: &mut Vec<Diagnostic>,
) {
    rewrite_elements(fragment, Some(config), diagnostics);
}

fn rewrite_elements(
    fragment: &mut Fragment,
    config: Option<&PipelineConfig>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut images = 0usize;
    let mut anchors = 0usize;
    fragment.for_each_element_mut(&mut |element| match element.name.as_str() {
        "img" => {
            if let (Some(src), Some(config)) = (element.attr("src"), config) {
                let resolved = resolve_image_url(src, config);
                if resolved != src {
                    images += 1;
                    element.set_attr("src", resolved);
                }
            }
        }
        "a" => {
            if normalize_anchor(element, diagnostics) {
                anchors += 1;
            }
        }
        _ => {}
    });
    debug!("rewrite: {images} image sources resolved, {anchors} external anchors secured");
}

/// Repairs a malformed `href` and forces safe opening of external links.
/// Returns true when the anchor points off-site.
fn normalize_anchor(element: &mut Element, diagnostics: &mut Vec<Diagnostic>) -> bool {
    let Some(href) = element.attr("href") else {
        return false;
    };

    let href = if href.contains('<') {
        let text = element.text_content();
        match recover_href(href, &text) {
            Some(recovered) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticSeverity::Info,
                    I_HREF_RECOVERED,
                    format!("malformed link target replaced with {recovered}"),
                ));
                recovered
            }
            None => {
                warn!("rewrite: unresolvable link target {href:?}");
                diagnostics.push(Diagnostic::warning(
                    W_HREF_UNRESOLVED,
                    format!("link \"{}\" has no recoverable target", text.trim()),
                ));
                String::new()
            }
        }
    } else {
        href.trim().to_string()
    };

    let external = is_external_href(&href);
    element.set_attr("href", href);
    if external {
        element.set_attr("target", EXTERNAL_LINK_TARGET);
        element.set_attr("rel", EXTERNAL_LINK_REL);
    } else {
        // Only external links may open a new window.
        element.remove_attr("target");
        element.remove_attr("rel");
    }
    external
}

/// True for `http:`/`https:` URLs in any letter case and for
/// protocol-relative `//host` references.
pub fn is_external_href(href: &str) -> bool {
    let href = href.trim_start();
    if href.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

/// Best-effort recovery of a link target from a corrupted `href`.
///
/// Tries an embedded `href="…"` fragment first, then the first URL in the
/// anchor's text. Only a single malformed anchor per pass is expected.
pub fn recover_href(corrupted: &str, anchor_text: &str) -> Option<String> {
    let from_fragment = HREF_FRAGMENT
        .captures_iter(corrupted)
        .filter_map(|captures| captures.get(1))
        .map(|value| value.as_str().trim())
        .find(|value| !value.is_empty() && !value.contains('<'));
    if let Some(value) = from_fragment {
        return Some(value.to_string());
    }
    URL_IN_TEXT
        .find(anchor_text)
        .map(|found| found.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://api.example.com";

    #[test]
    fn api_images_become_absolute() {
        let html = rewrite_urls("<img src=\"/api/v1/blog/images/abc\">", BASE);
        assert_eq!(
            html,
            "<img src=\"https://api.example.com/api/v1/blog/images/abc\">"
        );
    }

    #[test]
    fn absolute_images_are_unchanged() {
        let html = rewrite_urls("<img src=\"https://cdn.x/y.png\">", BASE);
        assert_eq!(html, "<img src=\"https://cdn.x/y.png\">");
    }

    #[test]
    fn group_ids_resolve_to_sized_variant() {
        let config = PipelineConfig::new(BASE).expect("base");
        assert_eq!(
            resolve_image_url("65a1f0c2b3d4e5f60718293a", &config),
            "https://api.example.com/api/v1/blog/images/group/65a1f0c2b3d4e5f60718293a?size=card"
        );
        assert_eq!(resolve_image_url("/static/logo.png", &config), "/static/logo.png");
        assert_eq!(resolve_image_url("data:image/png;base64,AA", &config), "data:image/png;base64,AA");
    }

    #[test]
    fn external_links_open_safely() {
        let html = rewrite_urls("<p><a href=\"https://x.io\">x</a></p>", BASE);
        assert_eq!(
            html,
            "<p><a href=\"https://x.io\" target=\"_blank\" rel=\"noopener noreferrer\">x</a></p>"
        );
    }

    #[test]
    fn external_links_override_author_rel() {
        let html = rewrite_urls("<a href=\"http://x.io\" rel=\"opener\" target=\"_self\">x</a>", BASE);
        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("rel=\"noopener noreferrer\""));
        assert!(!html.contains("opener\""));
    }

    #[test]
    fn scheme_case_and_protocol_relative_links_are_external() {
        for href in ["HTTPS://evil.io", "Http://x.io", "//evil.io/path"] {
            let html = rewrite_urls(&format!("<a href=\"{href}\" target=\"_blank\">x</a>"), BASE);
            assert!(html.contains("rel=\"noopener noreferrer\""), "{html}");
        }
        assert!(!is_external_href("/about"));
        assert!(!is_external_href("httpfoo/bar"));
        assert!(!is_external_href("mailto:a@b.c"));
    }

    #[test]
    fn internal_links_lose_author_target() {
        let html = rewrite_urls("<a href=\"/about\" target=\"_blank\" rel=\"opener\">x</a>", BASE);
        assert_eq!(html, "<a href=\"/about\">x</a>");
    }

    #[test]
    fn invalid_api_base_leaves_images_alone() {
        let html = rewrite_urls(
            "<img src=\"/api/v1/x\"><a href=\"https://x.io\">x</a>",
            "api.example.com",
        );
        assert!(html.starts_with("<img src=\"/api/v1/x\">"), "{html}");
        assert!(html.contains("rel=\"noopener noreferrer\""), "{html}");
    }

    #[test]
    fn internal_links_stay_in_place() {
        let html = rewrite_urls("<a href=\"/blog/other-post\">next</a>", BASE);
        assert_eq!(html, "<a href=\"/blog/other-post\">next</a>");
    }

    #[test]
    fn recover_prefers_embedded_href_fragment() {
        let recovered = recover_href("<a href=\"https://x.io/a\">https://x.io/a</a>", "click");
        assert_eq!(recovered.as_deref(), Some("https://x.io/a"));
    }

    #[test]
    fn recover_falls_back_to_url_in_text() {
        let recovered = recover_href("<a href=", "see https://x.io/docs now");
        assert_eq!(recovered.as_deref(), Some("https://x.io/docs"));
    }

    #[test]
    fn unrecoverable_href_becomes_empty_but_keeps_text() {
        let mut fragment = Fragment::parse("<a href=\"<broken\">label</a>", 16).expect("parse");
        let config = PipelineConfig::default();
        let mut diagnostics = Vec::new();
        rewrite_fragment(&mut fragment, &config, &mut diagnostics);
        assert_eq!(fragment.to_html(), "<a href=\"\">label</a>");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, W_HREF_UNRESOLVED);
    }

    #[test]
    fn malformed_href_from_nested_anchor_is_recovered() {
        let mut fragment =
            Fragment::parse("<a href=\"<a href=\">https://x.io</a>", 16).expect("parse");
        let mut diagnostics = Vec::new();
        rewrite_fragment(&mut fragment, &PipelineConfig::default(), &mut diagnostics);
        let html = fragment.to_html();
        assert!(html.starts_with("<a href=\"https://x.io\" target=\"_blank\""), "{html}");
        assert_eq!(diagnostics[0].code, I_HREF_RECOVERED);
    }
}
