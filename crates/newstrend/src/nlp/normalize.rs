//! Whitespace and control-character normalization.

/// Normalizes article text before tokenization.
///
/// Non-breaking spaces and control characters (other than CR, LF and TAB)
/// become spaces, every whitespace run collapses to a single space, and the
/// result is trimmed. `None` yields an empty string.
pub fn normalize(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        let ch = match ch {
            '\u{00A0}' => ' ',
            '\r' | '\n' | '\t' => ch,
            c if c.is_control() => ' ',
            c => c,
        };
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}
