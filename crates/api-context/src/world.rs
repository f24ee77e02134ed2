//! The cucumber world and scenario hooks

use bdd_core::config;
use cucumber::{event, gherkin, World};
use futures::future::{FutureExt, LocalBoxFuture};
use std::path::Path;

use crate::context::ApiContext;

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct ApiWorld {
    pub context: ApiContext,
}

impl ApiWorld {
    pub fn new() -> Self {
        Self {
            context: ApiContext::new(config::current()),
        }
    }
}

impl Default for ApiWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Delete the users a scenario created, whatever its outcome.
pub fn after_scenario<'a>(
    _feature: &'a gherkin::Feature,
    _rule: Option<&'a gherkin::Rule>,
    _scenario: &'a gherkin::Scenario,
    _finished: &'a event::ScenarioFinished,
    world: Option<&'a mut ApiWorld>,
) -> LocalBoxFuture<'a, ()> {
    async move {
        if let Some(world) = world {
            world.context.tear_down().await;
        }
    }
    .boxed_local()
}

/// Run the feature files under `features`, one scenario at a time, exiting
/// the process with a failure status if any step fails or matches no step
/// definition.
pub async fn run(features: impl AsRef<Path>) {
    ApiWorld::cucumber()
        .max_concurrent_scenarios(1)
        .fail_on_skipped()
        .after(after_scenario)
        .run_and_exit(features.as_ref().to_path_buf())
        .await;
}
