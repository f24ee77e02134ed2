//! `<field>` interpolation from values captured in earlier responses

use bdd_core::{ensure, BddError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

use crate::jq::JsonQuery;

static JQ_CAPTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((?<alias>[^)]*)\)\(jq\)(?<query>.*)").expect("valid jq capture pattern")
});

static ALIAS_CAPTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\((?<alias>[^)]*)\)(?<path>.*)$").expect("valid alias pattern")
});

/// Values captured by "fetch field" steps, addressable as `<name>`.
///
/// Placeholders are replaced in capture order, so a value that itself
/// holds `<other>` is expanded when `other` was captured after it.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    values: Map<String, Value>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace each `<name>` with its captured value.
    pub fn render(&self, text: &str) -> String {
        let mut rendered = text.to_string();
        for (name, value) in &self.values {
            let placeholder = format!("<{name}>");
            if rendered.contains(&placeholder) {
                rendered = rendered.replace(&placeholder, &display(value));
            }
        }
        rendered
    }

    /// Render every string leaf of a JSON tree in place.
    pub fn render_value(&self, value: &mut Value) {
        match value {
            Value::String(text) => *text = self.render(text),
            Value::Array(items) => items.iter_mut().for_each(|item| self.render_value(item)),
            Value::Object(map) => map.values_mut().for_each(|item| self.render_value(item)),
            _ => {}
        }
    }

    /// Capture a value from `body` as described by `path`.
    ///
    /// * `(alias)(jq)query` stores the jq result under `alias`
    /// * `(alias)a.b` stores the value at `a.b` under `alias` and `a.b`
    /// * `a.b` stores the value under `a.b`
    pub async fn capture(&mut self, path: &str, body: &str, jq: &dyn JsonQuery) -> Result<()> {
        if let Some(caps) = JQ_CAPTURE.captures(path) {
            let document: Value = serde_json::from_str(body)?;
            ensure(document.is_object() || document.is_array(), || {
                format!("The response is not a JSON array: {body}")
            })?;
            let result = jq.query(&caps["query"], body).await?;
            debug!(alias = &caps["alias"], "captured jq field");
            self.insert(&caps["alias"], Value::String(display(&result)));
            return Ok(());
        }

        let (alias, path) = match ALIAS_CAPTURE.captures(path) {
            Some(caps) => (Some(caps["alias"].to_string()), caps["path"].to_string()),
            None => (None, path.to_string()),
        };

        let document: Value = serde_json::from_str(body)?;
        let value = lookup_path(&document, &path).ok_or_else(|| {
            let missing = first_missing_segment(&document, &path);
            BddError::assertion(format!(
                "Key [{missing}] of path [{path}] not found at body: {body}"
            ))
        })?;

        debug!(path = %path, alias = ?alias, "captured field");
        if let Some(alias) = alias {
            self.insert(alias, value.clone());
        }
        self.insert(path, value.clone());
        Ok(())
    }
}

/// Text form of a captured value: strings raw, anything else as JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Walk a dot-separated path through objects and arrays.
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, key| step_into(current, key))
}

fn step_into<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn first_missing_segment<'a>(document: &Value, path: &'a str) -> &'a str {
    let mut current = document;
    for key in path.split('.') {
        match step_into(current, key) {
            Some(next) => current = next,
            None => return key,
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jq::JsonQuery;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;

    struct FixedQuery(Value);

    #[async_trait]
    impl JsonQuery for FixedQuery {
        async fn query(&self, _filter: &str, _json: &str) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    const BODY: &str = r#"{"ocs":{"data":{"uuid":"abc-123","files":[{"id":7}]}}}"#;

    #[test]
    fn renders_strings_raw_and_values_as_json() {
        let mut fields = Fields::new();
        fields.insert("uuid", json!("abc-123"));
        fields.insert("ids", json!([1, 2]));
        assert_eq!(
            fields.render("/file/<uuid>?ids=<ids>&again=<uuid>"),
            "/file/abc-123?ids=[1,2]&again=abc-123"
        );
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let fields = Fields::new();
        assert_eq!(fields.render("<missing>"), "<missing>");
    }

    #[test]
    fn renders_nested_values() {
        let mut fields = Fields::new();
        fields.insert("user", json!("signer1"));
        let mut value = json!({"users": [{"identify": {"account": "<user>"}}], "n": 1});
        fields.render_value(&mut value);
        assert_eq!(value["users"][0]["identify"]["account"], json!("signer1"));
        assert_eq!(value["n"], json!(1));
    }

    #[test]
    fn placeholders_follow_capture_order() {
        let mut fields = Fields::new();
        fields.insert("b", json!("<a>"));
        fields.insert("a", json!("x"));
        assert_eq!(fields.render("<b>"), "x");

        let mut fields = Fields::new();
        fields.insert("a", json!("x"));
        fields.insert("b", json!("<a>"));
        assert_eq!(fields.render("<b>"), "<a>");

        // Recapturing keeps the original position.
        fields.insert("a", json!("y"));
        assert_eq!(fields.render("<a>-<b>"), "y-<a>");
    }

    #[tokio::test]
    async fn captures_plain_path() {
        let mut fields = Fields::new();
        fields
            .capture("ocs.data.uuid", BODY, &FixedQuery(Value::Null))
            .await
            .unwrap();
        assert_eq!(fields.render("<ocs.data.uuid>"), "abc-123");
    }

    #[tokio::test]
    async fn captures_alias_and_array_index() {
        let mut fields = Fields::new();
        fields
            .capture("(fileId)ocs.data.files.0.id", BODY, &FixedQuery(Value::Null))
            .await
            .unwrap();
        assert_eq!(fields.get("fileId"), Some(&json!(7)));
        assert_eq!(fields.get("ocs.data.files.0.id"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn captures_jq_result_as_text() {
        let mut fields = Fields::new();
        fields
            .capture("(first)(jq).ocs.data.files[0]", BODY, &FixedQuery(json!({"id": 7})))
            .await
            .unwrap();
        assert_eq!(fields.get("first"), Some(&json!(r#"{"id":7}"#)));
    }

    #[tokio::test]
    async fn missing_segment_is_reported() {
        let mut fields = Fields::new();
        let err = fields
            .capture("ocs.meta.status", BODY, &FixedQuery(Value::Null))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Key [meta] of path [ocs.meta.status]"));
    }

    proptest! {
        #[test]
        fn text_without_placeholders_is_untouched(text in "[^<>]{0,40}") {
            let mut fields = Fields::new();
            fields.insert("x", json!("y"));
            prop_assert_eq!(fields.render(&text), text);
        }
    }
}
