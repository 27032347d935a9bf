// src/utils/html.rs

/// Sanitizes admin-supplied question text before it is stored.
///
/// Question bodies may carry light markup (sub/superscripts, bold, line
/// breaks) that the exam screen renders as HTML, so tags are whitelisted
/// rather than escaped. Scripts and event-handler attributes are stripped.
pub fn sanitize_question_text(input: &str) -> String {
    ammonia::clean(input.trim())
}

/// Sanitizes optional text, mapping blank results to `None`.
pub fn sanitize_optional(input: Option<&str>) -> Option<String> {
    input
        .map(sanitize_question_text)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_formatting_strips_scripts() {
        let cleaned = sanitize_question_text("x<sup>2</sup><script>alert(1)</script>");
        assert_eq!(cleaned, "x<sup>2</sup>");
    }

    #[test]
    fn strips_event_handlers() {
        let cleaned = sanitize_question_text(r#"<b onclick="steal()">Find v</b>"#);
        assert_eq!(cleaned, "<b>Find v</b>");
    }

    #[test]
    fn blank_becomes_none() {
        assert_eq!(sanitize_optional(Some("  ")), None);
        assert_eq!(sanitize_optional(None), None);
        assert_eq!(sanitize_optional(Some("a")), Some("a".to_string()));
    }
}
