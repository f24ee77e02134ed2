//! The `key | value` assertion table for JSON documents
//!
//! A key is either a top-level member of the document or a `(jq)` query.
//! A value is compared as JSON when both sides parse as JSON, as text
//! otherwise, or, when prefixed with `(jq)`, used as a filter that must
//! evaluate to `true` against the actual value.

use bdd_core::{ensure, BddError, Result};
use serde_json::Value;

use crate::jq::{JsonQuery, JQ_MARKER};
use crate::payload::is_json;
use crate::template::{display, Fields};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedValue {
    pub key: String,
    pub value: String,
}

impl ExpectedValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Read a table whose header row names the `key` and `value` columns.
    pub fn from_table(rows: &[Vec<String>]) -> Result<Vec<Self>> {
        let (header, body) = rows
            .split_first()
            .ok_or_else(|| BddError::assertion("The expected values table is empty"))?;
        let column = |name: &str| {
            header.iter().position(|h| h == name).ok_or_else(|| {
                BddError::assertion(format!("The expected values table has no \"{name}\" column"))
            })
        };
        let key = column("key")?;
        let value = column("value")?;
        body.iter()
            .map(|row| {
                let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
                Ok(Self::new(cell(key), cell(value)))
            })
            .collect()
    }
}

/// Check every expected row against `json`.
pub async fn match_json(
    json: &str,
    expected: &[ExpectedValue],
    fields: &Fields,
    jq: &dyn JsonQuery,
) -> Result<()> {
    ensure(is_json(json), || format!("Failed asserting that '{json}' is valid JSON."))?;
    for row in expected {
        let key = fields.render(&row.key);
        let value = fields.render(&row.value);
        let actual = actual_value(&key, json, jq).await?;

        if let Some(filter) = value.strip_prefix(JQ_MARKER) {
            ensure(jq.matches(filter, &actual).await?, || {
                format!("The jq \"{filter}\" do not match with: {actual}")
            })?;
            continue;
        }

        if is_json(&actual) && is_json(&value) {
            let want: Value = serde_json::from_str(&value)?;
            let got: Value = serde_json::from_str(&actual)?;
            ensure(want == got, || {
                format!("Key: {key} JSON: {json}\nExpected JSON: {value}\nActual JSON: {actual}")
            })?;
            continue;
        }

        ensure(value == actual, || {
            format!("Key: {key} JSON: {json}\nExpected: {value:?}\nActual: {actual:?}")
        })?;
    }
    Ok(())
}

/// The text form of the value addressed by `key` in `json`.
pub async fn actual_value(key: &str, json: &str, jq: &dyn JsonQuery) -> Result<String> {
    let document: Value = serde_json::from_str(json)?;
    ensure(document.is_object() || document.is_array(), || {
        format!("The response is not a JSON array: {json}")
    })?;

    if let Some(query) = key.strip_prefix(JQ_MARKER) {
        return Ok(display(&jq.query(query, json).await?));
    }

    let member = match &document {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    };
    member.map(display).ok_or_else(|| {
        BddError::assertion(format!("Not found: \"{key}\" at array: {document}"))
    })
}
