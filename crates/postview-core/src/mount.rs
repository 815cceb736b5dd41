use log::warn;

use crate::code::{CodeBlock, visit_code_blocks};
use crate::config::RepairLimits;
use crate::document::{ContentDocument, RenderOutput};
use crate::sanitize::SafeHtml;
use crate::toc::{TocEntry, extract_toc};
use crate::tree::{Element, Fragment, Node};

/// The rendered tree of a post body, as it would sit in the page.
///
/// Built only from renderer output, so serializing it yields trusted markup.
/// Post-mount passes mutate it in place through narrow entry points: heading
/// ids for the table of contents and token spans for highlighting.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MountedDocument {
    tree: Fragment,
}

impl MountedDocument {
    pub fn mount(document: &ContentDocument) -> Self {
        Self::from_output(document.output(), document.limits())
    }

    /// Mounts `output` under the limits the pipeline rendered it with.
    pub fn from_output(output: &RenderOutput, limits: RepairLimits) -> Self {
        let tree = match output {
            RenderOutput::Html(html) => {
                Fragment::parse(html.as_str(), limits.max_depth).unwrap_or_else(|err| {
                    warn!("mount: {err}; mounting an empty paragraph");
                    Fragment::new(vec![Node::Element(Element::new("p"))])
                })
            }
            RenderOutput::Blocks(blocks) => {
                Fragment::new(blocks.iter().map(|block| block.to_node()).collect())
            }
        };
        Self { tree }
    }

    pub fn tree(&self) -> &Fragment {
        &self.tree
    }

    /// Visits every `<pre><code>` block in document order.
    pub fn for_each_code_block(&mut self, mut visit: impl FnMut(&mut CodeBlock<'_>)) {
        visit_code_blocks(&mut self.tree.nodes, &mut visit);
    }

    pub fn extract_toc(&mut self) -> Vec<TocEntry> {
        extract_toc(&mut self.tree)
    }

    pub fn to_safe_html(&self) -> SafeHtml {
        SafeHtml::from_trusted(self.tree.to_html())
    }
}
