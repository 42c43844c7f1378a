//! Plain text from crawled HTML.

use log::warn;

/// Wide enough that no Korean word is ever broken across lines.
const WRAP_WIDTH: usize = 400;

/// Elements whose text is never article content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Renders an HTML document as plain text. Markup, attribute values and
/// script or style bodies are dropped. Unparseable input yields `""`.
pub fn html_to_text(html: &str) -> String {
    let cleaned = strip_elements(html, SKIPPED_ELEMENTS);
    match html2text::from_read(cleaned.as_bytes(), WRAP_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to convert HTML to text: {}", e);
            String::new()
        }
    }
}

/// Cuts every `<tag ...>...</tag>` for the given tag names, case-insensitively.
/// An unclosed element is cut to the end of the input.
fn strip_elements(html: &str, tags: &[&str]) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some((open, tag)) = next_open(&lower, pos, tags) {
        out.push_str(&html[pos..open]);
        let close_tag = format!("</{}", tag);
        pos = match lower[open..].find(&close_tag) {
            Some(rel) => {
                let close = open + rel;
                match lower[close..].find('>') {
                    Some(end) => close + end + 1,
                    None => html.len(),
                }
            }
            None => html.len(),
        };
    }
    out.push_str(&html[pos..]);
    out
}

/// The earliest opening tag at or after `from` among `tags`.
fn next_open<'a>(lower: &str, from: usize, tags: &[&'a str]) -> Option<(usize, &'a str)> {
    tags.iter()
        .filter_map(|tag| {
            let needle = format!("<{}", tag);
            let mut search = from;
            while let Some(rel) = lower[search..].find(&needle) {
                let at = search + rel;
                let after = lower[at + needle.len()..].chars().next();
                // `<scripts>` or `<style-guide>` are not the element.
                if matches!(after, None | Some('>') | Some('/'))
                    || after.is_some_and(char::is_whitespace)
                {
                    return Some((at, *tag));
                }
                search = at + needle.len();
            }
            None
        })
        .min_by_key(|(at, _)| *at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::normalize;

    #[test]
    fn test_markup_and_scripts_are_dropped() {
        let html = r#"<div class="본문영역"><script>var 광고=1;</script><p>반도체</p></div>"#;
        let text = normalize(Some(&html_to_text(html)));
        assert_eq!(text, "반도체");
    }

    #[test]
    fn test_strip_elements_is_case_insensitive() {
        let html = "a<STYLE type=\"text/css\">p{}</Style>b<script>x</script>c";
        assert_eq!(strip_elements(html, SKIPPED_ELEMENTS), "abc");
    }

    #[test]
    fn test_unclosed_script_cuts_the_rest() {
        assert_eq!(strip_elements("본문<script>var x", SKIPPED_ELEMENTS), "본문");
    }

    #[test]
    fn test_similar_tag_names_are_kept() {
        assert_eq!(strip_elements("<scripts>본문</scripts>", SKIPPED_ELEMENTS), "<scripts>본문</scripts>");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = normalize(Some(&html_to_text("인공 지능 발전 전망")));
        assert_eq!(text, "인공 지능 발전 전망");
    }
}
