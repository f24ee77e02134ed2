use bdd_core::Result;
use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use super::table_rows;
use crate::world::ApiWorld;

#[given(regex = r#"^user "?([^"]*?)"? exists$"#)]
#[when(regex = r#"^user "?([^"]*?)"? exists$"#)]
#[then(regex = r#"^user "?([^"]*?)"? exists$"#)]
async fn user_exists(world: &mut ApiWorld, user: String) -> Result<()> {
    world.context.assure_user_exists(&user).await
}

#[given(regex = r#"^guest "?([^"]*?)"? exists$"#)]
#[when(regex = r#"^guest "?([^"]*?)"? exists$"#)]
#[then(regex = r#"^guest "?([^"]*?)"? exists$"#)]
async fn guest_exists(world: &mut ApiWorld, guest: String) -> Result<()> {
    world.context.assure_guest_exists(&guest).await
}

#[given(regex = r#"^set the display name of user "([^"]*)" to "([^"]*)"$"#)]
#[when(regex = r#"^set the display name of user "([^"]*)" to "([^"]*)"$"#)]
#[then(regex = r#"^set the display name of user "([^"]*)" to "([^"]*)"$"#)]
async fn display_name(world: &mut ApiWorld, user: String, name: String) -> Result<()> {
    world
        .context
        .set_user_display_name(&user, Some(&name))
        .await
}

#[given(regex = r#"^set the email of user "([^"]*)" to "([^"]*)"$"#)]
#[when(regex = r#"^set the email of user "([^"]*)" to "([^"]*)"$"#)]
#[then(regex = r#"^set the email of user "([^"]*)" to "([^"]*)"$"#)]
async fn email(world: &mut ApiWorld, user: String, address: String) -> Result<()> {
    world.context.set_user_email(&user, &address).await
}

#[given(regex = r#"^the following "?([^"]*?)"? app config is set$"#)]
#[when(regex = r#"^the following "?([^"]*?)"? app config is set$"#)]
#[then(regex = r#"^the following "?([^"]*?)"? app config is set$"#)]
async fn app_config(world: &mut ApiWorld, step: &Step, app_id: String) -> Result<()> {
    let rows = table_rows(step)?;
    world.context.set_app_config(&app_id, rows).await
}
