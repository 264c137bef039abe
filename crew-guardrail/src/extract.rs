//! Extraction of the first balanced JSON object from model output.

use serde_json::Value;

/// Find and parse the first balanced JSON object in `text`.
///
/// Tries to parse the whole text first (the well-behaved case), then scans
/// for the first `{`..`}` span with balanced braces, tolerating braces inside
/// string literals and escaped quotes. A greedy regex would capture the wrong
/// span when the reply contains multiple braces or trailing prose.
pub fn extract_json(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Some(value);
        }
    }

    let span = first_balanced_object(text)?;
    serde_json::from_str(span).ok()
}

/// Return the first substring spanning a balanced `{…}` object, or `None`.
fn first_balanced_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(open) = text[start..].find('{') {
        let open = start + open;
        let mut depth = 0usize;
        let mut in_str = false;
        let mut escaped = false;
        for (offset, &b) in bytes[open..].iter().enumerate() {
            if in_str {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_str = false;
                }
                continue;
            }
            match b {
                b'"' => in_str = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[open..=open + offset]);
                    }
                }
                _ => {}
            }
        }
        // No balanced object starting here; try the next brace.
        start = open + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_text_json_is_the_fast_path() {
        let value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn json_embedded_in_prose_is_found() {
        let value = extract_json(r#"Here you go: {"verdict": "allow"} enjoy!"#).unwrap();
        assert_eq!(value["verdict"], "allow");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let value = extract_json(r#"{"rationale": "uses { and } in text", "ok": true}"#).unwrap();
        assert_eq!(value["rationale"], "uses { and } in text");
    }

    #[test]
    fn escaped_quotes_inside_strings_are_handled() {
        let value = extract_json(r#"noise {"a": "say \"hi\" {now}"} noise"#).unwrap();
        assert_eq!(value["a"], "say \"hi\" {now}");
    }

    #[test]
    fn unbalanced_brace_then_valid_object_is_recovered() {
        let value = extract_json(r#"{ broken... {"ok": 1}"#);
        // The scanner moves past the unparseable span and finds the object.
        assert_eq!(value.unwrap(), json!({"ok": 1}));
    }

    #[test]
    fn no_object_yields_none() {
        assert!(extract_json("").is_none());
        assert!(extract_json("plain prose").is_none());
        assert!(extract_json("[1, 2, 3]").is_none());
        assert!(extract_json("{ never closed").is_none());
    }

    #[test]
    fn first_of_multiple_objects_wins() {
        let value = extract_json(r#"{"first": 1} {"second": 2}"#).unwrap();
        assert_eq!(value, json!({"first": 1}));
    }
}
