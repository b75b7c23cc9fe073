//! Message adapter — widget thread items → `UiMessage`
//!
//! Pinned to the widget's thread-item schema as documented for the 1.x SDK:
//!
//! | field                 | meaning                                  |
//! |-----------------------|------------------------------------------|
//! | `id`                  | string or number, unique within a thread |
//! | `role` / `author` / `sender` | author, first non-null wins       |
//! | `content` (string)    | plain text body                          |
//! | `text`                | plain text body (older items)            |
//! | `content.text`        | single content block                     |
//! | `content[0].text`     | first of several content blocks          |
//!
//! Records without a user/assistant role or without text are dropped.

use serde_json::Value;

use super::types::{Role, UiMessage};

const ROLE_FIELDS: [&str; 3] = ["role", "author", "sender"];

/// Normalize an ordered slice of thread items, preserving order.
///
/// Pure: the same input always yields the same output, including the
/// positional ids assigned to items that carry none.
pub fn adapt_messages(records: &[Value]) -> Vec<UiMessage> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| adapt_record(index, record))
        .collect()
}

fn adapt_record(index: usize, record: &Value) -> Option<UiMessage> {
    let role = ROLE_FIELDS
        .iter()
        .find_map(|field| record.get(*field).filter(|v| !v.is_null()))
        .and_then(Value::as_str)
        .and_then(Role::parse)?;
    let text = extract_text(record)?;

    Some(UiMessage {
        id: extract_id(record).unwrap_or_else(|| format!("msg-{}", index)),
        role,
        text,
    })
}

fn extract_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn extract_text(record: &Value) -> Option<String> {
    let content = record.get("content");
    let candidates = [
        content.and_then(Value::as_str),
        record.get("text").and_then(Value::as_str),
        content
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str),
        content
            .and_then(|c| c.get(0))
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drops_system_keeps_user() {
        let records = vec![
            json!({"role": "system", "text": "x"}),
            json!({"role": "user", "text": "hi"}),
        ];
        let out = adapt_messages(&records);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].role, Role::User);
        assert_eq!(out[0].text, "hi");
    }

    #[test]
    fn test_idempotent() {
        let records = vec![
            json!({"role": "user", "content": "שלום"}),
            json!({"id": "a1", "author": "assistant", "content": [{"type": "output_text", "text": "hello"}]}),
            json!({"role": "tool", "text": "ignored"}),
        ];
        let first = adapt_messages(&records);
        let second = adapt_messages(&records);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_role_field_precedence() {
        let out = adapt_messages(&[json!({"role": "assistant", "author": "user", "text": "t"})]);
        assert_eq!(out[0].role, Role::Assistant);

        let out = adapt_messages(&[json!({"sender": "user", "text": "t"})]);
        assert_eq!(out[0].role, Role::User);
    }

    #[test]
    fn test_text_shapes() {
        let records = vec![
            json!({"role": "user", "content": "plain"}),
            json!({"role": "user", "text": "legacy"}),
            json!({"role": "user", "content": {"text": "nested"}}),
            json!({"role": "user", "content": [{"text": "block"}, {"text": "second"}]}),
        ];
        let texts: Vec<_> = adapt_messages(&records)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["plain", "legacy", "nested", "block"]);
    }

    #[test]
    fn test_empty_content_falls_through_to_text() {
        let out = adapt_messages(&[json!({"role": "user", "content": "", "text": "fallback"})]);
        assert_eq!(out[0].text, "fallback");
    }

    #[test]
    fn test_drops_records_without_text() {
        let records = vec![
            json!({"role": "assistant"}),
            json!({"role": "assistant", "content": []}),
            json!({"role": "assistant", "content": [{"type": "image"}]}),
            json!("not an object"),
        ];
        assert!(adapt_messages(&records).is_empty());
    }

    #[test]
    fn test_ids() {
        let records = vec![
            json!({"id": "m-1", "role": "user", "text": "a"}),
            json!({"id": 7, "role": "assistant", "text": "b"}),
            json!({"role": "system", "text": "skipped"}),
            json!({"role": "user", "text": "c"}),
        ];
        let ids: Vec<_> = adapt_messages(&records).into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m-1", "7", "msg-3"]);
    }

    #[test]
    fn test_null_role_falls_through_to_author() {
        let out = adapt_messages(&[json!({"role": null, "author": "user", "text": "hi"})]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].role, Role::User);
        assert_eq!(out[0].text, "hi");
    }
}
