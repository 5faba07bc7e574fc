//! Reduces free-form model output to a [`NormalizedResult`].
//!
//! The stages run in a fixed order (fence strip, strict parse, embedded
//! object recovery, heuristic classification) and each one only hands off to
//! the next on failure. None of them can fail outright.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::models::{CitationRecord, NormalizedResult, Status};

pub const MAX_CHANGES: usize = 2;
pub const UNPARSEABLE_CHANGE: &str = "could not parse response format";

const ERROR_MARKERS: &[&str] = &[
    "无法识别",
    "无法解析",
    "错误",
    "error",
    "unrecognizable",
    "unparseable",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Batch(Vec<CitationRecord>),
    Single(CitationRecord),
    Unparseable,
}

pub fn normalize(raw: &str) -> NormalizedResult {
    let body = strip_code_fence(raw);

    match parse_response(&body) {
        ParsedResponse::Batch(records) => aggregate(&records),
        ParsedResponse::Single(record) => from_single(record, &body),
        ParsedResponse::Unparseable => match recover_embedded_object(&body) {
            Some(record) => from_single(record, &body),
            None => {
                tracing::warn!(
                    chars = body.chars().count(),
                    "model output is not structured, classifying raw text"
                );
                classify_unstructured(&body)
            }
        },
    }
}

/// Removes a leading ``` fence (with optional language tag). The body ends
/// at the first line that is only a closing fence; anything after it is
/// dropped. Unfenced text is only trimmed.
pub fn strip_code_fence(raw: &str) -> String {
    let text = raw.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }

    let opening_end = Regex::new(r"^```[A-Za-z0-9_+\-]*")
        .ok()
        .and_then(|re| re.find(text).map(|opening| opening.end()))
        .unwrap_or(3);
    let rest = &text[opening_end..];

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim() == "```" {
            return rest[..offset].trim().to_string();
        }
        offset += line.len();
    }

    let inner = rest.trim();
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim().to_string()
}

pub fn parse_response(body: &str) -> ParsedResponse {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => {
            ParsedResponse::Batch(items.iter().map(CitationRecord::from_value).collect())
        }
        Ok(value @ Value::Object(_)) => ParsedResponse::Single(CitationRecord::from_value(&value)),
        _ => ParsedResponse::Unparseable,
    }
}

pub fn aggregate(records: &[CitationRecord]) -> NormalizedResult {
    let formatted = records
        .iter()
        .filter(|record| record.has_result())
        .map(|record| record.result.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let status = records
        .iter()
        .fold(Status::Success, |acc, record| acc.worst(record.status));

    let changes = collect_changes(records.iter().flat_map(|record| record.changes.iter()));

    NormalizedResult {
        formatted,
        status,
        changes,
    }
}

/// A lone object without a usable `result` is passed through as-is: the
/// body is presumed to already be the intended output.
pub fn from_single(record: CitationRecord, body: &str) -> NormalizedResult {
    if !record.has_result() {
        return NormalizedResult {
            formatted: body.to_string(),
            status: Status::Success,
            changes: Vec::new(),
        };
    }

    let changes = collect_changes(record.changes.iter());
    NormalizedResult {
        formatted: record.result,
        status: record.status,
        changes,
    }
}

/// Looks for an object between the first `{` and the last `}`. Only objects
/// carrying a non-blank `result` count as recovered.
pub fn recover_embedded_object(body: &str) -> Option<CitationRecord> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }

    let value = serde_json::from_str::<Value>(&body[start..=end]).ok()?;
    if !value.is_object() {
        return None;
    }

    let record = CitationRecord::from_value(&value);
    record.has_result().then_some(record)
}

pub fn classify_unstructured(body: &str) -> NormalizedResult {
    let lower = body.to_lowercase();
    let is_error =
        body.trim().is_empty() || ERROR_MARKERS.iter().any(|marker| lower.contains(marker));

    NormalizedResult {
        formatted: body.to_string(),
        status: if is_error {
            Status::Error
        } else {
            Status::Success
        },
        changes: if is_error {
            vec![UNPARSEABLE_CHANGE.to_string()]
        } else {
            Vec::new()
        },
    }
}

fn collect_changes<'a>(changes: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut unique = Vec::new();
    for change in changes {
        if unique.len() == MAX_CHANGES {
            break;
        }
        if seen.insert(change.as_str()) {
            unique.push(change.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(result: &str, status: &str, changes: &[&str]) -> String {
        serde_json::json!({ "result": result, "status": status, "changes": changes }).to_string()
    }

    #[test]
    fn never_panics_on_odd_input() {
        let inputs = [
            "",
            "   \n\t ",
            "```",
            "``````",
            "```json",
            "}{",
            "{",
            "[",
            "null",
            "42",
            "\"just a string\"",
            "[1, \"two\", null, {}]",
            "{\"result\": null}",
            "\u{0}\u{1}\u{fffd}",
            "```json\n{\"result\": \"A\"",
        ];
        for input in inputs {
            let out = normalize(input);
            assert!(out.changes.len() <= MAX_CHANGES, "input {input:?}");
        }
    }

    #[test]
    fn empty_text_is_an_error() {
        let out = normalize("  ");
        assert_eq!(out.status, Status::Error);
        assert_eq!(out.changes, vec![UNPARSEABLE_CHANGE]);
        assert_eq!(out.formatted, "");
    }

    #[test]
    fn strips_fence_with_language_tag() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  plain  "), "plain");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn prose_after_closing_fence_is_dropped() {
        let raw = format!(
            "```json\n[{},{}]\n```\nHope this helps!",
            record("A", "success", &[]),
            record("B", "warning", &["missing year"])
        );
        assert!(strip_code_fence(&raw).starts_with('['));

        let out = normalize(&raw);
        assert_eq!(out.formatted, "A\n\nB");
        assert_eq!(out.status, Status::Warning);
        assert_eq!(out.changes, vec!["missing year"]);
    }

    #[test]
    fn only_the_first_fenced_block_is_kept() {
        let raw = "```json\n{\"result\":\"X\"}\n```\nAlso:\n```\nnotes\n```";
        assert_eq!(strip_code_fence(raw), "{\"result\":\"X\"}");
        assert_eq!(normalize(raw).formatted, "X");
    }

    #[test]
    fn fenced_input_matches_unfenced() {
        let payloads = [
            record("[1] A. T[J]. J, 2020.", "warning", &["missing year"]),
            format!(
                "[{},{}]",
                record("A", "success", &[]),
                record("B", "error", &["x"])
            ),
            "{\"status\":\"success\"}".to_string(),
            "null".to_string(),
            "\"error\"".to_string(),
            "[]".to_string(),
        ];
        for payload in payloads {
            let fenced = format!("```json\n{payload}\n```");
            assert_eq!(normalize(&fenced), normalize(&payload), "payload {payload}");
        }
    }

    #[test]
    fn error_dominates_in_any_order() {
        let orders = [
            ["success", "warning", "error"],
            ["error", "success", "warning"],
            ["warning", "error", "success"],
        ];
        for order in orders {
            let body = format!(
                "[{}]",
                order
                    .iter()
                    .map(|status| record("R", status, &[]))
                    .collect::<Vec<_>>()
                    .join(",")
            );
            assert_eq!(normalize(&body).status, Status::Error);
        }

        let warn = format!(
            "[{},{}]",
            record("A", "success", &[]),
            record("B", "warning", &[])
        );
        assert_eq!(normalize(&warn).status, Status::Warning);

        let ok = format!(
            "[{},{}]",
            record("A", "success", &[]),
            record("B", "success", &[])
        );
        assert_eq!(normalize(&ok).status, Status::Success);
    }

    #[test]
    fn changes_are_deduplicated_and_capped() {
        let body = format!(
            "[{},{},{}]",
            record("A", "success", &["completed year", "completed year"]),
            record("B", "success", &["identified type"]),
            record("C", "success", &["fixed punctuation"])
        );
        let out = normalize(&body);
        assert_eq!(out.changes, vec!["completed year", "identified type"]);
    }

    #[test]
    fn duplicate_change_keeps_first_position() {
        let body = format!(
            "[{},{}]",
            record("A", "success", &["b"]),
            record("B", "success", &["b", "a"])
        );
        assert_eq!(normalize(&body).changes, vec!["b", "a"]);
    }

    #[test]
    fn single_object_caps_changes() {
        let body = record("R", "warning", &["one", "two", "three"]);
        let out = normalize(&body);
        assert_eq!(out.formatted, "R");
        assert_eq!(out.status, Status::Warning);
        assert_eq!(out.changes, vec!["one", "two"]);
    }

    #[test]
    fn join_skips_empty_results() {
        let body = r#"[{"result":"A","status":"success","changes":[]},{"result":"","status":"warning","changes":["missing year"]},{"result":"C","status":"success","changes":[]}]"#;
        let out = normalize(body);
        assert_eq!(out.formatted, "A\n\nC");
        assert_eq!(out.status, Status::Warning);
        assert_eq!(out.changes, vec!["missing year"]);
    }

    #[test]
    fn whitespace_result_is_dropped_from_join() {
        let body = format!(
            "[{},{}]",
            record("  ", "success", &[]),
            record("B", "success", &[])
        );
        assert_eq!(normalize(&body).formatted, "B");
    }

    #[test]
    fn array_items_default_missing_fields() {
        let out = normalize(r#"[{"result":"A"}, "junk", {"changes":["x"]}]"#);
        assert_eq!(out.formatted, "A");
        assert_eq!(out.status, Status::Success);
        assert_eq!(out.changes, vec!["x"]);
    }

    #[test]
    fn object_without_result_passes_through() {
        let body = r#"{"status":"error","changes":["ignored"]}"#;
        let out = normalize(body);
        assert_eq!(out.formatted, body);
        assert_eq!(out.status, Status::Success);
        assert!(out.changes.is_empty());
    }

    #[test]
    fn recovers_object_embedded_in_prose() {
        let raw = r#"Here is the answer: {"result":"X","status":"success","changes":[]} Thanks!"#;
        let out = normalize(raw);
        assert_eq!(out.formatted, "X");
        assert_eq!(out.status, Status::Success);
        assert!(out.changes.is_empty());
    }

    #[test]
    fn embedded_object_without_result_falls_back_to_heuristic() {
        let raw = r#"Sorry, error: {"status":"error"}"#;
        assert!(recover_embedded_object(raw).is_none());
        let out = normalize(raw);
        assert_eq!(out.formatted, raw);
        assert_eq!(out.status, Status::Error);
    }

    #[test]
    fn unrecognized_marker_is_an_error() {
        let out = normalize("无法识别输入内容");
        assert_eq!(out.status, Status::Error);
        assert_eq!(out.changes, vec![UNPARSEABLE_CHANGE]);
        assert_eq!(out.formatted, "无法识别输入内容");
    }

    #[test]
    fn plain_citation_text_passes_as_success() {
        let raw = "[1] Zhang S. Title[J]. Journal, 2020.";
        let out = normalize(raw);
        assert_eq!(out.status, Status::Success);
        assert_eq!(out.formatted, raw);
        assert!(out.changes.is_empty());
    }

    #[test]
    fn error_marker_is_case_insensitive() {
        assert_eq!(normalize("Model ERROR occurred").status, Status::Error);
    }

    #[test]
    fn scalar_json_is_classified_as_text() {
        let out = normalize("123");
        assert_eq!(out.formatted, "123");
        assert_eq!(out.status, Status::Success);
    }
}
