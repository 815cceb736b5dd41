use serde::Serialize;

use crate::tree::Fragment;

/// Fewer headings than this and the post gets no table of contents.
pub const MIN_TOC_HEADINGS: usize = 2;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// A heading with the entries nested beneath it, for sidebar outlines.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TocNode {
    pub entry: TocEntry,
    pub children: Vec<TocNode>,
}

pub fn heading_id(index: usize) -> String {
    format!("heading-{}", index)
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        _ => None,
    }
}

/// Assigns `heading-{n}` ids to h1–h3 in document order and lists them.
///
/// Ids are recomputed from scratch on every call. Returns an empty list when
/// the document has fewer than [`MIN_TOC_HEADINGS`] headings.
pub fn extract_toc(tree: &mut Fragment) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    tree.for_each_element_mut(&mut |element| {
        if let Some(level) = heading_level(&element.name) {
            let id = heading_id(entries.len());
            element.set_attr("id", id.clone());
            entries.push(TocEntry {
                id,
                text: element.text_content().trim().to_string(),
                level,
            });
        }
    });
    if entries.len() < MIN_TOC_HEADINGS {
        entries.clear();
    }
    entries
}

/// Groups entries under the nearest preceding entry of a lower level.
pub fn nest_toc(entries: &[TocEntry]) -> Vec<TocNode> {
    let mut iter = entries.iter().peekable();
    build_level(&mut iter)
}

fn build_level<'a, I>(iter: &mut std::iter::Peekable<I>) -> Vec<TocNode>
where
    I: Iterator<Item = &'a TocEntry>,
{
    let mut out = Vec::new();
    while let Some(entry) = iter.next() {
        // Collect following entries until the next heading of the same/higher level.
        let mut children = Vec::new();
        while let Some(next) = iter.peek() {
            if next.level <= entry.level {
                break;
            }
            if let Some(child) = iter.next() {
                children.push(child.clone());
            }
        }
        out.push(TocNode {
            entry: entry.clone(),
            children: nest_toc(&children),
        });
    }
    out
}
