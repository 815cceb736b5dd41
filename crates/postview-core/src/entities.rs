/// Decodes the entities produced by escaping markup as text.
///
/// `&lt;`, `&gt;`, `&quot;` and `&#39;` go first; `&amp;` goes last so an
/// escaped literal such as `&amp;lt;` stays a visible `<` instead of turning
/// into markup. That literal is emitted as `&#60;` (and `&amp;gt;` as `&#62;`):
/// browsers render it the same way, but it no longer looks like an escaped tag,
/// which keeps repeated decoding stable.
pub fn decode_markup_entities(text: &str) -> String {
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decode_amp(&decoded)
}

fn decode_amp(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("&amp;") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + "&amp;".len()..];
        if let Some(stripped) = tail.strip_prefix("lt;") {
            out.push_str("&#60;");
            rest = stripped;
        } else if let Some(stripped) = tail.strip_prefix("gt;") {
            out.push_str("&#62;");
            rest = stripped;
        } else {
            out.push('&');
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}
