//! Request payloads built from step tables
//!
//! Step tables arrive as plain strings. Values that parse as JSON are sent
//! as JSON values, unless prefixed with `(string)`. Write requests carrying
//! nested values switch from form encoding to a JSON body.

use bdd_core::{BddError, Result};
use reqwest::Method;
use serde_json::{Map, Value};

pub const STRING_MARKER: &str = "(string)";

/// Ordered request parameters
pub type Payload = Map<String, Value>;

/// Read a two-column table as `key | value` pairs.
pub fn from_rows_hash(rows: &[Vec<String>]) -> Result<Payload> {
    let mut payload = Payload::new();
    for row in rows {
        match row.as_slice() {
            [key, value] => {
                payload.insert(key.clone(), Value::String(value.clone()));
            }
            _ => {
                return Err(BddError::assertion(format!(
                    "Expected two columns per row, got {}: {row:?}",
                    row.len()
                )))
            }
        }
    }
    Ok(payload)
}

pub fn is_json(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

/// Decode top-level string values that hold JSON.
pub fn decode_json_strings(payload: Payload) -> Payload {
    payload
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => decode_string(text),
                other => other,
            };
            (key, value)
        })
        .collect()
}

fn decode_string(text: String) -> Value {
    if let Some(raw) = text.strip_prefix(STRING_MARKER) {
        return Value::String(raw.to_string());
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Encoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Form(Vec<(String, String)>),
    Json(Payload),
}

impl Body {
    /// Pick the wire encoding for `payload` sent with `method`.
    pub fn encode(method: &Method, payload: Payload) -> Self {
        if payload.is_empty() {
            return Body::Empty;
        }
        let writes = [Method::POST, Method::PUT, Method::PATCH].contains(method);
        let nested = payload
            .values()
            .any(|v| matches!(v, Value::Array(_) | Value::Object(_)));
        if writes && nested {
            Body::Json(payload)
        } else {
            Body::Form(form_pairs(&payload))
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Body::Json(_))
    }
}

/// Flatten parameters the way PHP's `http_build_query` does: nested values
/// become `key[sub]` pairs, booleans `1`/`0`, nulls are skipped.
pub fn form_pairs(payload: &Payload) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in payload {
        flatten(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten(name: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((name, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((name, n.to_string())),
        Value::String(s) => out.push((name, s.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{name}[{index}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten(format!("{name}[{key}]"), item, out);
            }
        }
    }
}

/// Parse a step verb such as `post` or `DELETE`.
pub fn parse_method(verb: &str) -> Result<Method> {
    Method::from_bytes(verb.trim().to_uppercase().as_bytes()).map_err(|_| {
        BddError::UnsupportedVerb {
            verb: verb.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(pairs: &[(&str, &str)]) -> Vec<Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| vec![k.to_string(), v.to_string()])
            .collect()
    }

    #[test]
    fn json_strings_are_decoded() {
        let payload = from_rows_hash(&rows(&[
            ("users", r#"[{"identify":{"account":"signer1"}}]"#),
            ("name", "document"),
            ("status", "1"),
        ]))
        .unwrap();

        let decoded = decode_json_strings(payload);

        assert_eq!(decoded["users"], json!([{"identify": {"account": "signer1"}}]));
        assert_eq!(decoded["name"], json!("document"));
        assert_eq!(decoded["status"], json!(1));
    }

    #[test]
    fn string_marker_keeps_raw_text() {
        let payload = from_rows_hash(&rows(&[("code", "(string)[1,2]")])).unwrap();
        let decoded = decode_json_strings(payload);
        assert_eq!(decoded["code"], json!("[1,2]"));
    }

    #[test]
    fn three_columns_are_rejected() {
        let bad = vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]];
        assert!(from_rows_hash(&bad).is_err());
    }

    #[test]
    fn nested_write_payload_becomes_json() {
        let payload = decode_json_strings(
            from_rows_hash(&rows(&[("file", r#"{"url":"http://x"}"#)])).unwrap(),
        );
        assert!(Body::encode(&Method::POST, payload.clone()).is_json());
        assert!(Body::encode(&Method::PATCH, payload.clone()).is_json());
        assert!(!Body::encode(&Method::GET, payload).is_json());
    }

    #[test]
    fn flat_payload_stays_form() {
        let payload = decode_json_strings(
            from_rows_hash(&rows(&[("userid", "test"), ("enabled", "true")])).unwrap(),
        );
        assert_eq!(
            Body::encode(&Method::POST, payload),
            Body::Form(vec![
                ("userid".to_string(), "test".to_string()),
                ("enabled".to_string(), "1".to_string()),
            ])
        );
    }

    #[test]
    fn form_flattening_matches_php_brackets() {
        let mut payload = Payload::new();
        payload.insert("a".into(), json!({"b": [1, null, false]}));
        assert_eq!(
            form_pairs(&payload),
            vec![
                ("a[b][0]".to_string(), "1".to_string()),
                ("a[b][2]".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn empty_payload_has_no_body() {
        assert_eq!(Body::encode(&Method::POST, Payload::new()), Body::Empty);
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(parse_method("post").unwrap(), Method::POST);
        assert_eq!(parse_method("Delete").unwrap(), Method::DELETE);
        assert!(parse_method("not a verb").is_err());
    }
}
