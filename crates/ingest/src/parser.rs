use std::fmt::Write;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::DateTime;
use jevons_core::{LiveUsageEvent, UsageEvent};
use jevons_store::tsv::iso_from_epoch;
use serde_json::Value;
use sha2::{Digest, Sha256};

const PREVIEW_MAX_CHARS: usize = 180;
const NO_PREVIEW: &str = "-";

/// Everything extracted from one session log in a single pass.
#[derive(Debug, Clone, Default)]
pub struct ParsedSession {
    pub events: Vec<LiveUsageEvent>,
    /// First `cwd` seen in the file.
    pub project_path: Option<String>,
    pub lines_read: usize,
    pub read_error: Option<String>,
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{:02x}", byte);
    }
    out
}

/// SHA-256 of `source:line`, hex encoded.
pub fn hash_line(source: &str, line: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b":");
    hasher.update(line.as_bytes());
    hex_digest(&hasher.finalize())
}

fn parse_json_line(line: &str) -> Option<Value> {
    serde_json::from_str(line).ok()
}

fn parse_epoch(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

fn content_blocks(content: &Value) -> Option<&Vec<Value>> {
    content.as_array()
}

/// A user row is a human prompt unless every content block is a tool result.
fn is_human_prompt(content: Option<&Value>) -> bool {
    let Some(content) = content else {
        return true;
    };
    match content_blocks(content) {
        Some(blocks) if !blocks.is_empty() => !blocks.iter().all(|block| {
            block.get("type").and_then(Value::as_str) == Some("tool_result")
        }),
        _ => true,
    }
}

fn content_type(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(_)) => "text".to_string(),
        Some(Value::Array(blocks)) => blocks
            .first()
            .and_then(|block| block.get("type"))
            .and_then(Value::as_str)
            .filter(|kind| !kind.is_empty())
            .unwrap_or(NO_PREVIEW)
            .to_string(),
        _ => NO_PREVIEW.to_string(),
    }
}

fn prompt_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// Collapses whitespace and truncates to 180 characters with a `...` suffix.
pub fn prompt_preview(text: &str) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return NO_PREVIEW.to_string();
    }
    if cleaned.chars().count() > PREVIEW_MAX_CHARS {
        let mut out: String = cleaned.chars().take(PREVIEW_MAX_CHARS - 3).collect();
        out.push_str("...");
        return out;
    }
    cleaned
}

fn usage_tuple(usage: &Value) -> [u64; 4] {
    let field = |key: &str| usage.get(key).and_then(Value::as_u64).unwrap_or(0);
    [
        field("input_tokens"),
        field("output_tokens"),
        field("cache_read_input_tokens"),
        field("cache_creation_input_tokens"),
    ]
}

/// Parses a session log. `source` feeds the row signatures and should be the
/// file path.
pub fn parse_session<R: BufRead>(
    mut reader: R,
    source: &str,
    project_slug: &str,
    session_id: &str,
) -> ParsedSession {
    let mut parsed = ParsedSession::default();
    let mut pending_human = false;
    let mut last_usage: Option<[u64; 4]> = None;
    let mut last_prompt = NO_PREVIEW.to_string();
    let mut buf = String::new();

    loop {
        buf.clear();
        match reader.read_line(&mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                parsed.read_error = Some(err.to_string());
                break;
            }
        }
        parsed.lines_read += 1;
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        let Some(row) = parse_json_line(line) else {
            continue;
        };
        if parsed.project_path.is_none()
            && let Some(cwd) = row.get("cwd").and_then(Value::as_str)
            && !cwd.is_empty()
        {
            parsed.project_path = Some(cwd.to_string());
        }
        let Some(message) = row.get("message").filter(|value| value.is_object()) else {
            continue;
        };
        let content = message.get("content");
        match row.get("type").and_then(Value::as_str) {
            Some("user") => {
                if is_human_prompt(content) {
                    pending_human = true;
                    last_prompt = prompt_preview(&prompt_text(content));
                }
            }
            Some("assistant") => {
                let Some(usage) = message.get("usage").filter(|value| value.is_object()) else {
                    continue;
                };
                if row.get("isApiErrorMessage").and_then(Value::as_bool) == Some(true) {
                    continue;
                }
                let tuple = usage_tuple(usage);
                if last_usage == Some(tuple) && !pending_human {
                    continue;
                }
                let Some(ts_epoch) = row
                    .get("timestamp")
                    .and_then(Value::as_str)
                    .and_then(parse_epoch)
                else {
                    continue;
                };
                let [input, output, cache_read, cache_create] = tuple;
                let billable = input.saturating_add(output);
                parsed.events.push(LiveUsageEvent {
                    event: UsageEvent {
                        ts_epoch,
                        ts_iso: iso_from_epoch(ts_epoch),
                        project_slug: project_slug.to_string(),
                        session_id: session_id.to_string(),
                        input,
                        output,
                        cache_read,
                        cache_create,
                        billable,
                        total_with_cache: billable
                            .saturating_add(cache_read)
                            .saturating_add(cache_create),
                        content_type: content_type(content),
                        signature: hash_line(source, line),
                    },
                    prompt_preview: last_prompt.clone(),
                });
                last_usage = Some(tuple);
                pending_human = false;
            }
            _ => {}
        }
    }
    parsed
}

pub fn parse_session_file(
    path: &Path,
    project_slug: &str,
    session_id: &str,
) -> std::io::Result<ParsedSession> {
    let file = File::open(path)?;
    let source = path.to_string_lossy();
    Ok(parse_session(
        BufReader::new(file),
        &source,
        project_slug,
        session_id,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ParsedSession {
        parse_session(body.as_bytes(), "/src/proj/sess.jsonl", "proj", "sess")
    }

    const PROMPT: &str = r#"{"type":"user","timestamp":"2025-01-15T10:00:00Z","cwd":"/home/me/proj","message":{"role":"user","content":"Fix   the\nbug"}}"#;
    const REPLY: &str = r#"{"type":"assistant","timestamp":"2025-01-15T10:00:05.123Z","message":{"role":"assistant","content":[{"type":"text","text":"ok"}],"usage":{"input_tokens":10,"output_tokens":5,"cache_read_input_tokens":3,"cache_creation_input_tokens":2}}}"#;
    const TOOL_RESULT: &str = r#"{"type":"user","timestamp":"2025-01-15T10:00:06Z","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"x"}]}}"#;

    #[test]
    fn assistant_usage_becomes_event_with_preview() {
        let parsed = parse(&format!("{PROMPT}\n{REPLY}\n"));
        assert_eq!(parsed.events.len(), 1);
        let live = &parsed.events[0];
        assert_eq!(live.prompt_preview, "Fix the bug");
        assert_eq!(live.event.ts_epoch, 1_736_935_205);
        assert_eq!(live.event.ts_iso, "2025-01-15T10:00:05Z");
        assert_eq!(live.event.billable, 15);
        assert_eq!(live.event.total_with_cache, 20);
        assert_eq!(live.event.content_type, "text");
        assert_eq!(live.event.signature, hash_line("/src/proj/sess.jsonl", REPLY));
        assert_eq!(parsed.project_path.as_deref(), Some("/home/me/proj"));
    }

    #[test]
    fn streaming_duplicates_are_skipped_until_a_human_prompt() {
        let tool_dup = format!("{REPLY}\n{REPLY}\n{TOOL_RESULT}\n{REPLY}\n");
        assert_eq!(parse(&tool_dup).events.len(), 1);
        let prompted = format!("{REPLY}\n{PROMPT}\n{REPLY}\n");
        assert_eq!(parse(&prompted).events.len(), 2);
    }

    #[test]
    fn api_errors_and_bad_rows_are_ignored() {
        let error = REPLY.replace(r#""type":"assistant","#, r#""type":"assistant","isApiErrorMessage":true,"#);
        let bad_ts = REPLY.replace("2025-01-15T10:00:05.123Z", "yesterday");
        let body = format!("{error}\nnot json\n{bad_ts}\n");
        let parsed = parse(&body);
        assert!(parsed.events.is_empty());
        assert_eq!(parsed.lines_read, 3);
    }

    #[test]
    fn preview_defaults_and_truncates() {
        let parsed = parse(&format!("{REPLY}\n"));
        assert_eq!(parsed.events[0].prompt_preview, "-");
        assert!(parsed.project_path.is_none());

        let long = "word ".repeat(100);
        let preview = prompt_preview(&long);
        assert_eq!(preview.chars().count(), 180);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn content_type_falls_back_to_dash() {
        assert_eq!(content_type(None), "-");
        assert_eq!(content_type(Some(&serde_json::json!("hi"))), "text");
        assert_eq!(content_type(Some(&serde_json::json!([]))), "-");
        assert_eq!(
            content_type(Some(&serde_json::json!([{"type": "tool_use"}]))),
            "tool_use"
        );
    }
}
