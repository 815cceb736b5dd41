use log::{debug, warn};

use crate::classify::{Encoding, classify};
use crate::config::{PipelineConfig, RepairLimits};
use crate::diagnostic::{Diagnostic, W_REPAIR_FALLBACK, W_SANITIZED_EMPTY};
use crate::error::RepairError;
use crate::legacy::{Block, legacy_blocks};
use crate::repair::try_repair;
use crate::rewrite::rewrite_fragment;
use crate::sanitize::{SafeHtml, Sanitizer};
use crate::tree::Fragment;

/// Renderable form of a post body: trusted markup or native blocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RenderOutput {
    Html(SafeHtml),
    Blocks(Vec<Block>),
}

/// One render of one post body. Re-derive it when the content changes.
#[derive(Clone, Debug)]
pub struct ContentDocument {
    raw: String,
    encoding: Encoding,
    output: RenderOutput,
    diagnostics: Vec<Diagnostic>,
    limits: RepairLimits,
}

impl ContentDocument {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Encoding detected for the raw content. When repair had to give up this
    /// stays the detected value while the output holds legacy blocks.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn output(&self) -> &RenderOutput {
        &self.output
    }

    pub fn safe_html(&self) -> Option<&SafeHtml> {
        match &self.output {
            RenderOutput::Html(html) => Some(html),
            RenderOutput::Blocks(_) => None,
        }
    }

    pub fn blocks(&self) -> Option<&[Block]> {
        match &self.output {
            RenderOutput::Html(_) => None,
            RenderOutput::Blocks(blocks) => Some(blocks),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Parse limits the output was produced under; mounting reuses them.
    pub fn limits(&self) -> RepairLimits {
        self.limits
    }

    pub fn into_output(self) -> RenderOutput {
        self.output
    }
}

/// Classify, repair, rewrite and sanitize post bodies.
#[derive(Debug, Default)]
pub struct ContentPipeline {
    config: PipelineConfig,
    sanitizer: Sanitizer,
}

impl ContentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            sanitizer: Sanitizer::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn render(&self, raw: &str) -> ContentDocument {
        let encoding = classify(raw);
        debug!("render: {} bytes classified as {}", raw.len(), encoding.as_str());
        let mut diagnostics = Vec::new();

        let output = if encoding.is_html() {
            match self.render_html(raw, encoding, &mut diagnostics) {
                Ok(html) => RenderOutput::Html(html),
                Err(err) => {
                    warn!("render: falling back to plain text: {err}");
                    diagnostics.push(Diagnostic::warning(
                        W_REPAIR_FALLBACK,
                        format!("content rendered as plain text: {err}"),
                    ));
                    RenderOutput::Blocks(legacy_blocks(raw).collect())
                }
            }
        } else {
            RenderOutput::Blocks(legacy_blocks(raw).collect())
        };

        ContentDocument {
            raw: raw.to_string(),
            encoding,
            output,
            diagnostics,
            limits: self.config.limits(),
        }
    }

    fn render_html(
        &self,
        raw: &str,
        encoding: Encoding,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<SafeHtml, RepairError> {
        let limits = self.config.limits();
        let repaired = if encoding.needs_repair() {
            try_repair(raw, limits)?
        } else {
            raw.to_string()
        };
        if repaired.len() > limits.max_input_bytes {
            return Err(RepairError::TooLarge {
                len: repaired.len(),
                limit: limits.max_input_bytes,
            });
        }

        let mut fragment = Fragment::parse(&repaired, limits.max_depth)?;
        rewrite_fragment(&mut fragment, &self.config, diagnostics);

        let html = self.sanitizer.clean(&fragment.to_html());
        if html.is_blank() {
            debug!("render: sanitizer removed all content");
            diagnostics.push(Diagnostic::warning(
                W_SANITIZED_EMPTY,
                "no allowed markup left after sanitizing",
            ));
            return Ok(SafeHtml::empty_paragraph());
        }
        Ok(html)
    }
}
