mod classify;
mod code;
mod config;
mod diagnostic;
mod document;
mod entities;
mod error;
mod legacy;
mod mount;
mod repair;
mod rewrite;
mod sanitize;
mod toc;
mod tracker;
mod tree;

pub use classify::{Encoding, classify, has_escaped_tags, has_real_tags};
pub use code::{CodeBlock, HIGHLIGHTED_ATTR, HighlightToken, Rgb};
pub use config::{
    API_URL_ENV, DEFAULT_API_BASE, DEFAULT_IMAGE_SIZE, IMAGE_SIZE_ENV, PipelineConfig, RepairLimits,
};
pub use diagnostic::{
    Diagnostic, DiagnosticSeverity, I_HREF_RECOVERED, W_HREF_UNRESOLVED, W_REPAIR_FALLBACK,
    W_SANITIZED_EMPTY,
};
pub use document::{ContentDocument, ContentPipeline, RenderOutput};
pub use entities::decode_markup_entities;
pub use error::{ConfigError, RepairError};
pub use legacy::{Block, BlockKind, LegacyBlocks, legacy_blocks};
pub use mount::MountedDocument;
pub use repair::{repair, try_repair};
pub use rewrite::{
    API_MOUNT_PREFIX, EXTERNAL_LINK_REL, EXTERNAL_LINK_TARGET, is_external_href, recover_href,
    resolve_image_url, rewrite_fragment, rewrite_urls,
};
pub use sanitize::{EMPTY_PARAGRAPH, SafeHtml, Sanitizer};
pub use toc::{MIN_TOC_HEADINGS, TocEntry, TocNode, extract_toc, heading_id, nest_toc};
pub use tracker::{Subscription, TrackerHandle, ViewportBand, start_tracking};
pub use tree::{Attr, Element, Fragment, Node, escape_attr, escape_text};
