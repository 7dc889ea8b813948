const MAX_SNIPPET_LENGTH: usize = 200;
const MAX_ERROR_LENGTH: usize = 2_000;

/// Collapse every whitespace run (newlines included) into one space.
pub fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Response excerpt for logs: single line, at most 200 characters.
pub fn snippet(body: &str) -> String {
    truncate_chars(&one_line(body), MAX_SNIPPET_LENGTH)
}

pub fn truncate_error(error: &str) -> String {
    truncate_chars(error, MAX_ERROR_LENGTH)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_collapses_whitespace() {
        assert_eq!(one_line("  a\n\tb   c \r\n"), "a b c");
    }

    #[test]
    fn test_snippet_short_body_untouched() {
        assert_eq!(snippet("<p>ok</p>"), "<p>ok</p>");
    }

    #[test]
    fn test_snippet_truncates_long_body() {
        let body = "x".repeat(500);
        let s = snippet(&body);
        assert_eq!(s.len(), 203);
        assert!(s.ends_with("..."));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let body = "é".repeat(300);
        let s = snippet(&body);
        assert_eq!(s.chars().count(), 203);
    }

    #[test]
    fn test_truncate_error_short() {
        assert_eq!(truncate_error("connection refused"), "connection refused");
    }
}
