//! Inline the bridge script into an HTML document.
//!
//! Preference order: just before `</head>`, just after `<head>`, in a new
//! `<head>` right after `<html>`, or wrap the fragment in a full document.
//! Tag matching is ASCII case-insensitive.

use positron_ipc::BridgeScript;

pub fn inject_bridge(html: &str, script: &BridgeScript) -> String {
    let tag = format!("<script>{}</script>", script.source());

    if let Some(pos) = find_ci(html, "</head>") {
        return splice(html, pos, &tag);
    }
    if let Some(end) = open_tag_end(html, "<head") {
        return splice(html, end, &tag);
    }
    if let Some(end) = open_tag_end(html, "<html") {
        return splice(html, end, &format!("<head>{tag}</head>"));
    }
    format!("<html><head>{tag}</head><body>{html}</body></html>")
}

fn splice(html: &str, at: usize, insert: &str) -> String {
    let mut out = String::with_capacity(html.len() + insert.len());
    out.push_str(&html[..at]);
    out.push_str(insert);
    out.push_str(&html[at..]);
    out
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Byte offset just past the `>` of the first `<name ...>` / `<name>` tag.
fn open_tag_end(html: &str, name: &str) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find(name) {
        let start = from + rel;
        let after = start + name.len();
        match lower.as_bytes().get(after) {
            Some(b'>') => return Some(after + 1),
            Some(c) if c.is_ascii_whitespace() => {
                return lower[after..].find('>').map(|gt| after + gt + 1);
            }
            _ => from = after,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> BridgeScript {
        BridgeScript::default()
    }

    fn tag() -> String {
        format!("<script>{}</script>", script().source())
    }

    #[test]
    fn injects_before_head_close() {
        let html = "<html><head><title>x</title></head><body></body></html>";
        let out = inject_bridge(html, &script());
        assert_eq!(
            out,
            format!("<html><head><title>x</title>{}</head><body></body></html>", tag())
        );
    }

    #[test]
    fn injects_after_head_open_without_close() {
        let out = inject_bridge("<HEAD><title>x</title>", &script());
        assert!(out.starts_with(&format!("<HEAD>{}", tag())));
    }

    #[test]
    fn head_with_attributes() {
        let out = inject_bridge("<head lang=\"en\"><meta charset=utf-8>", &script());
        assert!(out.starts_with(&format!("<head lang=\"en\">{}", tag())));
    }

    #[test]
    fn header_element_is_not_head() {
        let out = inject_bridge("<html><body><header>hi</header></body></html>", &script());
        assert!(out.starts_with(&format!("<html><head>{}</head><body><header>", tag())));
    }

    #[test]
    fn wraps_bare_fragment() {
        let out = inject_bridge("<h1>Hello</h1>", &script());
        assert_eq!(
            out,
            format!("<html><head>{}</head><body><h1>Hello</h1></body></html>", tag())
        );
    }

    #[test]
    fn injects_only_once() {
        let html = "<head></head><template><head></head></template>";
        let out = inject_bridge(html, &script());
        assert_eq!(out.matches("ipcRenderer = {").count(), 1);
    }
}
