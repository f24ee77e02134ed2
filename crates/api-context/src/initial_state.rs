//! Initial state blobs embedded in server-rendered pages
//!
//! Pages hand data to the frontend as
//! `<input type="hidden" id="initial-state-<app>-<key>" value="<base64 json>">`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bdd_core::{ensure, ensure_eq, BddError, Result};
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use crate::payload::is_json;

pub const ID_PREFIX: &str = "initial-state-";

static WITH_ID: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[id]").expect("valid id selector"));

/// Decoded text of the initial state `name` found in `html`.
pub fn extract_initial_state(html: &str, name: &str) -> Result<String> {
    if !html.trim_start().starts_with('<') {
        return Err(BddError::assertion("The response is not HTML"));
    }
    let document = Html::parse_document(html);
    let id = format!("{ID_PREFIX}{name}");
    let encoded = document
        .select(&WITH_ID)
        .find(|element| element.value().id() == Some(id.as_str()))
        .map(|element| element.value().attr("value").unwrap_or_default())
        .ok_or_else(|| BddError::NotFound {
            what: format!("Initial state not found: {name}"),
        })?;

    let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
        BddError::assertion(format!("Initial state {name} is not valid base64: {e}"))
    })?;
    String::from_utf8(bytes)
        .map_err(|e| BddError::assertion(format!("Initial state {name} is not UTF-8: {e}")))
}

/// Compare a decoded initial state with the expected text.
///
/// JSON expectations compare structurally. Otherwise a JSON string literal
/// on the actual side is compared without its surrounding quotes.
pub fn compare_initial_state(actual: &str, expected: &str) -> Result<()> {
    if is_json(expected) {
        let want: Value = serde_json::from_str(expected)?;
        let got: Value = serde_json::from_str(actual).map_err(|_| {
            BddError::assertion(format!("Failed asserting that '{actual}' is valid JSON."))
        })?;
        return ensure(want == got, || {
            format!("Failed asserting that two JSON values are equal.\n--- Expected\n{expected}\n+++ Actual\n{actual}")
        });
    }

    let plain_literal = actual.starts_with('"')
        && serde_json::from_str::<String>(actual).ok().as_deref() == Some(actual.trim_matches('"'));
    if plain_literal {
        return ensure_eq(expected.trim_matches('"'), actual.trim_matches('"'), "");
    }
    ensure_eq(expected, actual, "")
}
