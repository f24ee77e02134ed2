use bdd_core::Result;
use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use super::table_rows;
use crate::payload::from_rows_hash;
use crate::world::ApiWorld;

#[given(regex = r#"^as user "?([^"]*)"?$"#)]
#[when(regex = r#"^as user "?([^"]*)"?$"#)]
#[then(regex = r#"^as user "?([^"]*)"?$"#)]
async fn as_user(world: &mut ApiWorld, user: String) {
    world.context.set_current_user(&user);
}

#[given(regex = r#"^sending "?([^"\s]+)"? to ocs "?([^"\s]+)"?$"#)]
#[when(regex = r#"^sending "?([^"\s]+)"? to ocs "?([^"\s]+)"?$"#)]
#[then(regex = r#"^sending "?([^"\s]+)"? to ocs "?([^"\s]+)"?$"#)]
async fn sending_ocs(world: &mut ApiWorld, step: &Step, verb: String, url: String) -> Result<()> {
    let body = step
        .table
        .as_ref()
        .map(|_| table_rows(step).and_then(from_rows_hash))
        .transpose()?;
    world.context.send_ocs_request(&verb, &url, body).await?;
    Ok(())
}

#[given(regex = r#"^sending "?([^"\s]+)"? to "?([^"\s]+)"?$"#)]
#[when(regex = r#"^sending "?([^"\s]+)"? to "?([^"\s]+)"?$"#)]
#[then(regex = r#"^sending "?([^"\s]+)"? to "?([^"\s]+)"?$"#)]
async fn sending(world: &mut ApiWorld, step: &Step, verb: String, url: String) -> Result<()> {
    let body = step
        .table
        .as_ref()
        .map(|_| table_rows(step).and_then(from_rows_hash))
        .transpose()?;
    world.context.send_request(&verb, &url, body, Vec::new()).await?;
    Ok(())
}

#[given(regex = r#"^set the custom http header "([^"]*)" with "([^"]*)" as value to next request$"#)]
#[when(regex = r#"^set the custom http header "([^"]*)" with "([^"]*)" as value to next request$"#)]
#[then(regex = r#"^set the custom http header "([^"]*)" with "([^"]*)" as value to next request$"#)]
async fn custom_header(world: &mut ApiWorld, name: String, value: String) {
    world.context.set_custom_header(&name, &value);
}

#[given(regex = r#"^fetch field "?([^"]*?)"? from previous JSON response$"#)]
#[when(regex = r#"^fetch field "?([^"]*?)"? from previous JSON response$"#)]
#[then(regex = r#"^fetch field "?([^"]*?)"? from previous JSON response$"#)]
async fn fetch_field(world: &mut ApiWorld, path: String) -> Result<()> {
    world.context.fetch_field(&path).await
}
