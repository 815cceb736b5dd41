use postview_core::{
    ContentPipeline, Diagnostic, MountedDocument, PipelineConfig, Subscription, TocEntry,
    ViewportBand, start_tracking,
};
use postview_renderer::{Highlighter, HighlighterConfig, Theme};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit, ScrollBehavior,
    ScrollIntoViewOptions,
};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderOptions {
    api_base: Option<String>,
    image_size: Option<String>,
    highlight: Option<bool>,
    theme: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderResult {
    html: String,
    encoding: &'static str,
    toc: Vec<TocEntry>,
    diagnostics: Vec<Diagnostic>,
}

/// Pipeline and highlighter built once per page, reused for every post.
#[wasm_bindgen]
pub struct PostRenderer {
    pipeline: ContentPipeline,
    highlighter: Option<Highlighter>,
}

#[wasm_bindgen]
impl PostRenderer {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<PostRenderer, JsValue> {
        let options = options_from_js(options)?;
        PostRenderer::from_options(&options).map_err(|err| JsValue::from_str(&err))
    }

    pub fn render(&self, content: &str) -> Result<JsValue, JsValue> {
        let result = self.render_result(content);
        serde_wasm_bindgen::to_value(&result).map_err(|err| JsValue::from_str(&err.to_string()))
    }
}

impl PostRenderer {
    fn from_options(options: &RenderOptions) -> Result<Self, String> {
        let mut config = PipelineConfig::default();
        if let Some(base) = &options.api_base {
            config = config.with_api_base(base).map_err(|err| err.to_string())?;
        }
        if let Some(size) = &options.image_size {
            config = config.with_image_size(size).map_err(|err| err.to_string())?;
        }
        let theme = match options.theme.as_deref() {
            Some(name) => Theme::parse(name).ok_or_else(|| format!("unknown theme: {name}"))?,
            None => Theme::Auto,
        };
        let highlighter = options
            .highlight
            .unwrap_or(true)
            .then(|| Highlighter::new(HighlighterConfig::default_set(theme)));
        Ok(Self {
            pipeline: ContentPipeline::new(config),
            highlighter,
        })
    }

    fn render_result(&self, content: &str) -> RenderResult {
        let document = self.pipeline.render(content);
        let mut mounted = MountedDocument::mount(&document);
        let toc = mounted.extract_toc();
        if let Some(highlighter) = &self.highlighter {
            highlighter.highlight_all(&mut mounted);
        }
        RenderResult {
            html: mounted.to_safe_html().into_string(),
            encoding: document.encoding().as_str(),
            toc,
            diagnostics: document.diagnostics().to_vec(),
        }
    }
}

#[wasm_bindgen]
pub fn render_post(content: &str) -> Result<JsValue, JsValue> {
    render_post_with_options(content, JsValue::UNDEFINED)
}

#[wasm_bindgen]
pub fn render_post_with_options(content: &str, options: JsValue) -> Result<JsValue, JsValue> {
    PostRenderer::new(options)?.render(content)
}

fn options_from_js(value: JsValue) -> Result<RenderOptions, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(RenderOptions::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Tracks which heading of the mounted post is being read.
///
/// Call `stop()` (or let the JS wrapper be freed) when the post unmounts.
#[wasm_bindgen]
pub struct HeadingObserver {
    observer: IntersectionObserver,
    subscription: Subscription,
    _callback: Closure<dyn FnMut(js_sys::Array)>,
}

#[wasm_bindgen]
impl HeadingObserver {
    /// Observes the elements with `heading_ids` and calls `on_change(id)` each
    /// time the active heading changes.
    #[wasm_bindgen(constructor)]
    pub fn new(heading_ids: Vec<String>, on_change: js_sys::Function) -> Result<HeadingObserver, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let subscription = start_tracking(heading_ids.iter().cloned());
        subscription.on_change(move |id| {
            notify(&on_change, id);
        });

        let handle = subscription.handle();
        let callback = Closure::wrap(Box::new(move |entries: js_sys::Array| {
            for entry in entries.iter() {
                let entry: IntersectionObserverEntry = entry.unchecked_into();
                handle.observe(&entry.target().id(), entry.is_intersecting());
            }
        }) as Box<dyn FnMut(js_sys::Array)>);

        let init = IntersectionObserverInit::new();
        init.set_root_margin(&ViewportBand::default().root_margin());
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
        for id in &heading_ids {
            if let Some(element) = document.get_element_by_id(id) {
                observer.observe(&element);
            }
        }

        Ok(HeadingObserver {
            observer,
            subscription,
            _callback: callback,
        })
    }

    #[wasm_bindgen(getter)]
    pub fn active_id(&self) -> Option<String> {
        self.subscription.active_id()
    }

    pub fn stop(&self) {
        self.observer.disconnect();
        self.subscription.stop();
    }
}

impl Drop for HeadingObserver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Calls `on_change(id)`; an exception is reported on the console, not rethrown.
fn notify(on_change: &js_sys::Function, id: Option<&str>) -> bool {
    let value = id.map(JsValue::from_str).unwrap_or(JsValue::NULL);
    match on_change.call1(&JsValue::NULL, &value) {
        Ok(_) => true,
        Err(err) => {
            web_sys::console::warn_2(&JsValue::from_str("postview: on_change threw"), &err);
            false
        }
    }
}

/// Smoothly scrolls the heading into view without touching the URL or history.
#[wasm_bindgen]
pub fn scroll_to_heading(id: &str) -> bool {
    let Some(element) = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(id))
    else {
        return false;
    };
    let options = ScrollIntoViewOptions::new();
    options.set_behavior(ScrollBehavior::Smooth);
    element.scroll_into_view_with_scroll_into_view_options(&options);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_html_toc_and_encoding() {
        let renderer = PostRenderer::from_options(&RenderOptions::default()).expect("renderer");
        let result = renderer.render_result(
            "&lt;h2&gt;One&lt;/h2&gt;&lt;pre&gt;&lt;code class=&quot;language-js&quot;&gt;let a;&lt;/code&gt;&lt;/pre&gt;&lt;h2&gt;Two&lt;/h2&gt;",
        );
        assert_eq!(result.encoding, "mixed-html-and-escaped");
        assert_eq!(result.toc.len(), 2);
        assert!(result.html.contains("<h2 id=\"heading-0\">One</h2>"));
        assert!(result.html.contains("data-highlighted=\"yes\""));
    }

    #[test]
    fn highlighting_can_be_disabled() {
        let options = RenderOptions {
            highlight: Some(false),
            ..RenderOptions::default()
        };
        let renderer = PostRenderer::from_options(&options).expect("renderer");
        let result = renderer.render_result("<pre><code>x</code></pre>");
        assert_eq!(result.html, "<pre><code>x</code></pre>");
        assert!(result.toc.is_empty());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = RenderOptions {
            api_base: Some("not a url".into()),
            ..RenderOptions::default()
        };
        assert!(PostRenderer::from_options(&options).is_err());
        let options = RenderOptions {
            theme: Some("sepia".into()),
            ..RenderOptions::default()
        };
        assert!(PostRenderer::from_options(&options).is_err());
    }
}
