//! Truncates tool output before it's appended to the message history, so a
//! runaway `cargo test -- --nocapture` doesn't blow the context window.

const MAX_CHARS: usize = 10_000;
const HEAD_LINES: usize = 100;
const TAIL_LINES: usize = 100;

/// Truncates `text` to at most `MAX_CHARS` characters. For content with more
/// than `HEAD_LINES + TAIL_LINES` lines, keeps the first and last chunk with
/// a marker noting how much was dropped, since the head usually shows what
/// ran and the tail usually shows the final error.
pub fn truncate_output(text: &str) -> String {
    if text.chars().count() <= MAX_CHARS {
        return text.to_string();
    }

    let lines: Vec<&str> = text.lines().collect();
    if lines.len() > HEAD_LINES + TAIL_LINES {
        let head = &lines[..HEAD_LINES];
        let tail = &lines[lines.len() - TAIL_LINES..];
        let omitted = lines.len() - HEAD_LINES - TAIL_LINES;
        return format!(
            "{}\n... [{} lines omitted] ...\n{}",
            head.join("\n"),
            omitted,
            tail.join("\n")
        );
    }

    let head: String = text.chars().take(MAX_CHARS).collect();
    format!("{head}\n[... truncated]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_passes_through_unchanged() {
        assert_eq!(truncate_output("hello"), "hello");
    }

    #[test]
    fn long_line_structured_output_keeps_head_and_tail() {
        let lines: Vec<String> = (0..500).map(|i| format!("line {}", i)).collect();
        let text = lines.join("\n");
        let truncated = truncate_output(&text);
        assert!(truncated.contains("line 0"));
        assert!(truncated.contains("line 499"));
        assert!(truncated.contains("omitted"));
    }

    #[test]
    fn long_single_line_is_hard_truncated() {
        let text = "x".repeat(50_000);
        let truncated = truncate_output(&text);
        assert!(truncated.starts_with(&"x".repeat(MAX_CHARS)));
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn truncation_marker_appears_exactly_once() {
        let text = "x".repeat(50_000);
        let truncated = truncate_output(&text);
        assert_eq!(truncated.matches("truncated").count(), 1);
    }
}
