use bdd_core::Result;
use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use super::docstring;
use crate::world::ApiWorld;

#[given(regex = r#"^run the command "(.*)"$"#)]
#[when(regex = r#"^run the command "(.*)"$"#)]
#[then(regex = r#"^run the command "(.*)"$"#)]
async fn run_command(world: &mut ApiWorld, command: String) -> Result<()> {
    world.context.run_command(&command).await?;
    Ok(())
}

#[given(regex = r#"^run the command "(.*)" with result code (\d+)$"#)]
#[when(regex = r#"^run the command "(.*)" with result code (\d+)$"#)]
#[then(regex = r#"^run the command "(.*)" with result code (\d+)$"#)]
async fn run_command_with_code(world: &mut ApiWorld, command: String, code: i32) -> Result<()> {
    world.context.run_command_expecting(&command, code).await
}

#[given(regex = r#"^run the bash command "(.*)" with result code (\d+)$"#)]
#[when(regex = r#"^run the bash command "(.*)" with result code (\d+)$"#)]
#[then(regex = r#"^run the bash command "(.*)" with result code (\d+)$"#)]
async fn run_bash_command(world: &mut ApiWorld, command: String, code: i32) -> Result<()> {
    world.context.run_bash_command_expecting(&command, code).await
}

#[given(regex = r#"^create an environment "?([^"]*?)"? with value "?([^"]*?)"? to be used by occ command$"#)]
#[when(regex = r#"^create an environment "?([^"]*?)"? with value "?([^"]*?)"? to be used by occ command$"#)]
#[then(regex = r#"^create an environment "?([^"]*?)"? with value "?([^"]*?)"? to be used by occ command$"#)]
async fn command_env(world: &mut ApiWorld, name: String, value: String) {
    world.context.set_command_env(&name, &value);
}

#[given(regex = r"^the output of the last command should contain the following text:$")]
#[when(regex = r"^the output of the last command should contain the following text:$")]
#[then(regex = r"^the output of the last command should contain the following text:$")]
async fn output_contains(world: &mut ApiWorld, step: &Step) -> Result<()> {
    let text = docstring(step)?;
    world.context.assert_output_contains(&text)
}

#[given(regex = r"^the output of the last command should be empty$")]
#[when(regex = r"^the output of the last command should be empty$")]
#[then(regex = r"^the output of the last command should be empty$")]
async fn output_empty(world: &mut ApiWorld) -> Result<()> {
    world.context.assert_output_empty()
}

#[given(regex = r"^wait for (\d+) seconds?$")]
#[when(regex = r"^wait for (\d+) seconds?$")]
#[then(regex = r"^wait for (\d+) seconds?$")]
async fn wait(world: &mut ApiWorld, seconds: u64) {
    world.context.wait_for(seconds).await;
}

#[given(regex = r"^past (\d+) seconds? since wait step$")]
#[when(regex = r"^past (\d+) seconds? since wait step$")]
#[then(regex = r"^past (\d+) seconds? since wait step$")]
async fn past_seconds(world: &mut ApiWorld, seconds: u64) -> Result<()> {
    world.context.assert_elapsed_since_wait(seconds)
}
