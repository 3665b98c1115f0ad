//! Extracts `{"tool": "<name>", "arguments": {...}}` objects embedded in LLM
//! prose. Deterministic brace-balanced scan, no JSON-in-JSON recursion
//! beyond what `serde_json` parses for us once we've found the span.
//!
//! Mirrors the shape of the teacher's TOOL_CALL-block extractor — find a
//! marker, find the end of the block, parse what's between them, return the
//! parsed call plus the surrounding prose — but the marker here is simply
//! the first balanced `{` and the payload is JSON, not an indented key list.

use maestro_core::ToolCall;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallParseError {
    MissingToolField,
    InvalidJson,
}

/// Finds the first JSON object in `response` that has a top-level `tool`
/// string field, parses it into a `ToolCall`, and returns it alongside the
/// prose with that object's text removed. Returns `None` if no such object
/// is present (a plain prose turn).
pub fn extract_tool_call(response: &str) -> Option<(ToolCall, String)> {
    let bytes = response.as_bytes();
    let mut search_from = 0;

    while let Some(rel_start) = response[search_from..].find('{') {
        let start = search_from + rel_start;
        if let Some(end) = find_balanced_end(bytes, start) {
            let candidate = &response[start..=end];
            if let Ok(call) = parse_object(candidate) {
                let prose = format!("{}{}", response[..start].trim(), response[end + 1..].trim());
                return Some((call, prose.trim().to_string()));
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte index of the `}` that balances the `{` at `start`, or `None` if the
/// braces never close (truncated response).
fn find_balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_object(text: &str) -> Result<ToolCall, ToolCallParseError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|_| ToolCallParseError::InvalidJson)?;
    let tool = value
        .get("tool")
        .and_then(|v| v.as_str())
        .ok_or(ToolCallParseError::MissingToolField)?
        .to_string();
    let arguments = value.get("arguments").cloned().unwrap_or(serde_json::json!({}));
    Ok(ToolCall {
        id: Uuid::new_v4().to_string(),
        name: tool,
        arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tool_call_embedded_in_prose() {
        let response = r#"I'll read that file.

{"tool": "read_file", "arguments": {"path": "src/lib.rs"}}

Then I'll report back."#;
        let (call, prose) = extract_tool_call(response).unwrap();
        assert_eq!(call.name, "read_file");
        assert_eq!(call.arguments["path"], "src/lib.rs");
        assert!(!prose.contains("\"tool\""));
    }

    #[test]
    fn plain_prose_yields_none() {
        assert!(extract_tool_call("I don't need any tools for this.").is_none());
    }

    #[test]
    fn object_without_a_tool_field_is_not_mistaken_for_a_call() {
        let response = r#"Here's some context: {"note": "not a tool call"}"#;
        assert!(extract_tool_call(response).is_none());
    }

    #[test]
    fn nested_braces_in_arguments_do_not_truncate_the_match() {
        let response = r#"{"tool": "run_command", "arguments": {"command": "echo", "env": {"KEY": "value"}}}"#;
        let (call, _) = extract_tool_call(response).unwrap();
        assert_eq!(call.arguments["env"]["KEY"], "value");
    }
}
