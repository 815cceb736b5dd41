//! Recovery of post bodies saved by the old editor.
//!
//! That editor escaped the whole body as text but auto-linked bare URLs with
//! real `<a>` elements, so stored content mixes `&lt;p&gt;` with live anchors,
//! sometimes inside an escaped `href`. Real anchors are unwrapped to their text
//! first; the escaped markup around them carries the intended link once decoded.

use log::{debug, warn};

use crate::classify::has_escaped_tags;
use crate::config::RepairLimits;
use crate::entities::decode_markup_entities;
use crate::error::RepairError;
use crate::tree::{Fragment, Node};

/// Repairs `raw`, returning it unchanged if it cannot be parsed within the
/// default limits.
pub fn repair(raw: &str) -> String {
    try_repair(raw, RepairLimits::default()).unwrap_or_else(|err| {
        warn!("repair skipped: {err}");
        raw.to_string()
    })
}

/// Unwraps real anchors and decodes escaped markup.
///
/// Content without escaped tags is returned as-is, and repaired output never
/// contains `&lt;`, so `try_repair(try_repair(x)) == try_repair(x)`.
pub fn try_repair(raw: &str, limits: RepairLimits) -> Result<String, RepairError> {
    if !has_escaped_tags(raw) {
        return Ok(raw.to_string());
    }
    if raw.len() > limits.max_input_bytes {
        return Err(RepairError::TooLarge {
            len: raw.len(),
            limit: limits.max_input_bytes,
        });
    }

    let mut fragment = Fragment::parse(raw, limits.max_depth)?;
    let unwrapped = unwrap_anchors(&mut fragment);
    let serialized = fragment.to_html();
    debug!(
        "repair: unwrapped {} anchors, {} -> {} bytes before decoding",
        unwrapped,
        raw.len(),
        serialized.len()
    );
    Ok(decode_markup_entities(&serialized))
}

/// Replaces every anchor element with its text content; returns how many.
fn unwrap_anchors(fragment: &mut Fragment) -> usize {
    let mut count = 0;
    fragment.rewrite_nodes(&mut |node| match node {
        Node::Element(element) if element.name == "a" => {
            count += 1;
            vec![Node::Text(element.text_content())]
        }
        other => vec![other],
    });
    count
}
