use bdd_core::Result;
use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use super::{docstring, table_rows};
use crate::matcher::ExpectedValue;
use crate::world::ApiWorld;

#[given(regex = r#"^the response should have a status code "?(\d+)"?$"#)]
#[when(regex = r#"^the response should have a status code "?(\d+)"?$"#)]
#[then(regex = r#"^the response should have a status code "?(\d+)"?$"#)]
async fn status_code(world: &mut ApiWorld, code: u16) -> Result<()> {
    world.context.assert_status(code)
}

#[given(regex = r"^the response should be a JSON array with the following mandatory values$")]
#[when(regex = r"^the response should be a JSON array with the following mandatory values$")]
#[then(regex = r"^the response should be a JSON array with the following mandatory values$")]
async fn json_values(world: &mut ApiWorld, step: &Step) -> Result<()> {
    let expected = ExpectedValue::from_table(table_rows(step)?)?;
    world.context.assert_json_values(&expected).await
}

#[given(regex = r#"^the response should contain the initial state "?([^"]*?)"? with the following values:$"#)]
#[when(regex = r#"^the response should contain the initial state "?([^"]*?)"? with the following values:$"#)]
#[then(regex = r#"^the response should contain the initial state "?([^"]*?)"? with the following values:$"#)]
async fn initial_state(world: &mut ApiWorld, step: &Step, name: String) -> Result<()> {
    let expected = docstring(step)?;
    world.context.assert_initial_state(&name, &expected)
}

#[given(regex = r#"^the response should contain the initial state "?([^"]*?)"? json that match with:$"#)]
#[when(regex = r#"^the response should contain the initial state "?([^"]*?)"? json that match with:$"#)]
#[then(regex = r#"^the response should contain the initial state "?([^"]*?)"? json that match with:$"#)]
async fn initial_state_matches(world: &mut ApiWorld, step: &Step, name: String) -> Result<()> {
    let expected = ExpectedValue::from_table(table_rows(step)?)?;
    world.context.assert_initial_state_matches(&name, &expected).await
}
