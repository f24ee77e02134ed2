//! Step definitions
//!
//! Quoted arguments may also be written bare, so `as user "admin"` and
//! `as user admin` are the same step. Every phrase is registered for
//! `Given`, `When` and `Then`, so `And`/`But` match whatever came before.

mod commands;
mod requests;
mod responses;
mod users;

use bdd_core::{BddError, Result};
use cucumber::gherkin::Step;

/// Rows of the data table attached to `step`.
pub(crate) fn table_rows(step: &Step) -> Result<&[Vec<String>]> {
    step.table
        .as_ref()
        .map(|table| table.rows.as_slice())
        .ok_or_else(|| BddError::assertion(format!("Step \"{}\" needs a data table", step.value)))
}

/// Text of the doc string attached to `step`.
pub(crate) fn docstring(step: &Step) -> Result<String> {
    let text = step
        .docstring
        .as_deref()
        .ok_or_else(|| BddError::assertion(format!("Step \"{}\" needs a doc string", step.value)))?;
    let text = text.strip_prefix('\n').unwrap_or(text);
    Ok(text.strip_suffix('\n').unwrap_or(text).to_string())
}
