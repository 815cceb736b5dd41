use std::panic;

use postview_core::{
    ContentPipeline, Encoding, Fragment, MountedDocument, RepairLimits, classify,
    is_external_href, repair, try_repair,
};

const CASES: usize = 300;
const MAX_PIECES: usize = 24;
const PLAIN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 \
\n\t#*`$[](){}!:+-_=./\\\"'";

/// Fragments that show up in stored post bodies, good and bad.
const PIECES: &[&str] = &[
    "<p>",
    "</p>",
    "<h2>",
    "</h2>",
    "<h3>",
    "</h3>",
    "<strong>",
    "</strong>",
    "<pre><code class=\"language-js\">",
    "</code></pre>",
    "<a href=\"https://x.io/a\">",
    "<a href=\"/about\">",
    "<a href=\"HTTPS://x.io\" target=\"_blank\">",
    "<a href=\"//x.io\" target=\"_blank\">",
    "<a href=\"javascript:alert(1)\">",
    "<a href=\"<broken",
    "</a>",
    "<img src=\"/api/v1/blog/images/abc\">",
    "<img src=x onerror=alert(1)>",
    "<script>",
    "</script>",
    "<div onclick=\"steal()\">",
    "</div>",
    "<svg onload=alert(1)>",
    "<!-- note -->",
    "&lt;p&gt;",
    "&lt;/p&gt;",
    "&lt;h2&gt;",
    "&lt;/h2&gt;",
    "&lt;a href=&quot;",
    "&quot;&gt;",
    "&lt;/a&gt;",
    "&lt;script&gt;",
    "&lt;/script&gt;",
    "&lt;img src=x onerror=&quot;alert(1)&quot;&gt;",
    "&amp;lt;b&amp;gt;",
    "&amp;",
    "&#39;",
    "&lt;",
    "&gt;",
    "https://x.io/b",
    "# ",
    "## ",
    "\n\n",
    " ",
    "text",
    "more words",
];

#[test]
fn pipeline_never_panics_on_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x3c6e_f372_fe94_f82b);
    let pipeline = ContentPipeline::default();
    for case in 0..CASES {
        let source = random_content(&mut rng);
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let document = pipeline.render(&source);
            let mut mounted = MountedDocument::mount(&document);
            mounted.extract_toc();
            mounted.to_safe_html()
        }));
        if result.is_err() {
            return Err(format!("render panicked for case {}: {:?}", case, source).into());
        }
    }
    Ok(())
}

#[test]
fn repair_is_idempotent_on_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0xa54f_f53a_5f1d_36f1);
    for case in 0..CASES {
        let source = random_content(&mut rng);
        let once = repair(&source);
        let twice = repair(&once);
        if once != twice {
            return Err(format!(
                "repair not idempotent for case {}\nSource: {:?}\nOnce:   {:?}\nTwice:  {:?}",
                case, source, once, twice
            )
            .into());
        }
    }
    Ok(())
}

#[test]
fn output_is_script_free_on_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x510e_527f_ade6_82d1);
    let pipeline = ContentPipeline::default();
    for case in 0..CASES {
        let source = random_content(&mut rng);
        let document = pipeline.render(&source);
        let html = MountedDocument::mount(&document).to_safe_html().into_string();
        if let Err(message) = check_safe(&html) {
            return Err(format!(
                "unsafe output for case {}: {}\nSource: {:?}\nOutput: {:?}",
                case, message, source, html
            )
            .into());
        }
    }
    Ok(())
}

#[test]
fn external_links_are_always_secured() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x9b05_688c_2b3e_6c1f);
    let pipeline = ContentPipeline::default();
    for case in 0..CASES {
        let source = random_content(&mut rng);
        let document = pipeline.render(&source);
        let html = MountedDocument::mount(&document).to_safe_html().into_string();
        let tree = Fragment::parse(&html, 1024)?;
        let mut failure = None;
        tree.for_each_element(&mut |element| {
            let external = element.name == "a"
                && element.attr("href").is_some_and(is_external_href);
            if external
                && (element.attr("target") != Some("_blank")
                    || element.attr("rel") != Some("noopener noreferrer"))
            {
                failure = Some(format!("{:?}", element.attrs));
            }
        });
        if let Some(attrs) = failure {
            return Err(format!(
                "insecure external link for case {}: {}\nSource: {:?}",
                case, attrs, source
            )
            .into());
        }
    }
    Ok(())
}

#[test]
fn text_without_tags_is_always_legacy() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x1f83_d9ab_fb41_bd6b);
    for case in 0..CASES {
        let len = rng.gen_range(0, 256);
        let source = random_plain(&mut rng, len);
        if classify(&source) != Encoding::LegacyPlainText {
            return Err(format!("case {} not legacy: {:?}", case, source).into());
        }
    }
    Ok(())
}

#[test]
fn escaped_heading_always_repairs_to_heading() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = Lcg::new(0x5be0_cd19_137e_2179);
    let pipeline = ContentPipeline::default();
    for case in 0..CASES / 3 {
        let before_len = rng.gen_range(0, 64);
        let after_len = rng.gen_range(0, 64);
        let source = format!(
            "{}&lt;h2&gt;Heading&lt;/h2&gt;{}",
            random_plain(&mut rng, before_len),
            random_plain(&mut rng, after_len)
        );
        if classify(&source) != Encoding::MixedHtmlAndEscaped {
            return Err(format!("case {} not mixed: {:?}", case, source).into());
        }
        let document = pipeline.render(&source);
        let html = document.safe_html().map(|html| html.as_str()).unwrap_or("");
        if !html.contains("<h2>Heading</h2>") {
            return Err(format!("case {} lost its heading: {:?}", case, html).into());
        }
    }
    Ok(())
}

#[test]
fn oversized_input_is_rejected_not_parsed() {
    let limits = RepairLimits {
        max_input_bytes: 64,
        max_depth: 16,
    };
    let source = "&lt;p&gt;".repeat(32);
    assert!(try_repair(&source, limits).is_err());
}

fn check_safe(html: &str) -> Result<(), String> {
    if html.to_ascii_lowercase().contains("<script") {
        return Err("script tag".to_string());
    }
    let tree = Fragment::parse(html, 1024).map_err(|err| err.to_string())?;
    let mut problem = None;
    tree.for_each_element(&mut |element| {
        if element.name == "script" || element.name == "svg" || element.name == "div" {
            problem = Some(format!("disallowed element {}", element.name));
        }
        for attr in &element.attrs {
            if attr.name.starts_with("on") {
                problem = Some(format!("event handler {}", attr.name));
            }
            if attr.value.to_ascii_lowercase().contains("javascript:") {
                problem = Some(format!("script url in {}", attr.name));
            }
        }
    });
    match problem {
        Some(problem) => Err(problem),
        None => Ok(()),
    }
}

fn random_content(rng: &mut Lcg) -> String {
    let pieces = rng.gen_range(0, MAX_PIECES + 1);
    let mut out = String::new();
    for _ in 0..pieces {
        let idx = rng.gen_range(0, PIECES.len());
        out.push_str(PIECES.get(idx).copied().unwrap_or(" "));
    }
    out
}

fn random_plain(rng: &mut Lcg, len: usize) -> String {
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let idx = rng.gen_range(0, PLAIN_CHARSET.len());
        let byte = PLAIN_CHARSET.get(idx).copied().unwrap_or(b' ');
        out.push(byte as char);
    }
    out
}

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let span = max - min;
        let value = (self.next() >> 1) as usize;
        min + (value % span)
    }
}
