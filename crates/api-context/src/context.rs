//! Scenario state and the operations behind every step

use bdd_core::endpoints::{APP_CONFIG, CLOUD_USERS, OCS_API_REQUEST_HEADER};
use bdd_core::{ensure, ensure_eq, BddError, ContextConfig, Result};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::auth::credentials_for;
use crate::command::{CommandOutcome, CommandRunner};
use crate::initial_state::{compare_initial_state, extract_initial_state};
use crate::jq::{JqBinary, JsonQuery};
use crate::matcher::{match_json, ExpectedValue};
use crate::payload::{decode_json_strings, parse_method, Body, Payload};
use crate::session::{ApiResponse, HttpSession, OutgoingRequest, RecordedRequest};
use crate::template::Fields;
use crate::url::{full_url, normalize_path, ocs_path};

#[derive(Debug)]
pub struct ApiContext {
    config: ContextConfig,
    current_user: Option<String>,
    fields: Fields,
    session: HttpSession,
    response: ApiResponse,
    jq: JqBinary,
    commands: CommandRunner,
    created_users: Vec<String>,
    waited: Option<(Instant, u64)>,
}

impl ApiContext {
    pub fn new(config: ContextConfig) -> Self {
        let commands = CommandRunner::new(&config);
        Self {
            config,
            current_user: None,
            fields: Fields::new(),
            session: HttpSession::new(),
            response: ApiResponse::default(),
            jq: JqBinary::new(),
            commands,
            created_users: Vec::new(),
            waited: None,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn set_current_user(&mut self, user: &str) {
        debug!(user, "acting user changed");
        self.current_user = Some(user.to_string()).filter(|u| !u.is_empty());
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    pub fn response(&self) -> &ApiResponse {
        &self.response
    }

    pub fn last_request(&self) -> Option<&RecordedRequest> {
        self.session.last_request()
    }

    pub fn created_users(&self) -> &[String] {
        &self.created_users
    }

    pub fn commands(&self) -> &CommandRunner {
        &self.commands
    }

    // Requests

    /// Send `verb` to a web (`/index.php`) or OCS URL and keep the response.
    #[instrument(skip(self, body, headers))]
    pub async fn send_request(
        &mut self,
        verb: &str,
        url: &str,
        body: Option<Payload>,
        headers: Vec<(String, String)>,
    ) -> Result<&ApiResponse> {
        let method = parse_method(verb)?;
        let url = self
            .fields
            .render(&full_url(&self.config.base_url, &normalize_path(url)));

        // Fields go into the decoded leaves so captured quotes cannot break
        // a JSON cell.
        let payload = body.map(|payload| {
            let mut payload = decode_json_strings(payload);
            payload
                .values_mut()
                .for_each(|value| self.fields.render_value(value));
            payload
        });
        let body = Body::encode(&method, payload.unwrap_or_default());

        let user = self.current_user.clone();
        let request = OutgoingRequest {
            method,
            url,
            user: user.as_deref(),
            credentials: credentials_for(user.as_deref(), &self.config),
            headers,
            body,
        };
        self.response = self.session.send(request).await?;
        Ok(&self.response)
    }

    /// Send `verb` to an OCS endpoint, e.g. `/cloud/users`.
    pub async fn send_ocs_request(
        &mut self,
        verb: &str,
        url: &str,
        body: Option<Payload>,
    ) -> Result<&ApiResponse> {
        let headers = vec![(OCS_API_REQUEST_HEADER.to_string(), "true".to_string())];
        self.send_request(verb, &ocs_path(url), body, headers).await
    }

    pub fn set_custom_header(&mut self, name: &str, value: &str) {
        let value = self.fields.render(value);
        self.session.set_custom_header(name, value);
    }

    /// Run an OCS request as the admin, restoring the acting user after.
    async fn ocs_as_admin(
        &mut self,
        verb: &str,
        url: &str,
        body: Option<Payload>,
    ) -> Result<ApiResponse> {
        let previous = self.current_user.replace(self.config.admin_user.clone());
        let result = self.send_ocs_request(verb, url, body).await.cloned();
        self.current_user = previous;
        result
    }

    // Response assertions

    pub fn assert_status(&self, code: u16) -> Result<()> {
        ensure_eq(code, self.response.status, &self.response.body)
    }

    pub async fn assert_json_values(&self, expected: &[ExpectedValue]) -> Result<()> {
        match_json(&self.response.body, expected, &self.fields, &self.jq).await
    }

    /// Capture a value from the last response for later `<field>` use.
    pub async fn fetch_field(&mut self, path: &str) -> Result<()> {
        self.fields.capture(path, &self.response.body, &self.jq).await
    }

    fn initial_state(&self, name: &str) -> Result<String> {
        let decoded = extract_initial_state(&self.response.body, name)?;
        Ok(self.fields.render(&decoded))
    }

    pub fn assert_initial_state(&self, name: &str, expected: &str) -> Result<()> {
        let actual = self.initial_state(name)?;
        compare_initial_state(&actual, &self.fields.render(expected))
    }

    pub async fn assert_initial_state_matches(
        &self,
        name: &str,
        expected: &[ExpectedValue],
    ) -> Result<()> {
        let actual = self.initial_state(name)?;
        match_json(&actual, expected, &self.fields, &self.jq).await
    }

    pub fn jq(&self) -> &dyn JsonQuery {
        &self.jq
    }

    // Users and app config

    async fn user_status(&mut self, user: &str) -> Result<u16> {
        let response = self
            .ocs_as_admin("GET", &format!("{CLOUD_USERS}/{user}"), None)
            .await?;
        Ok(response.status)
    }

    /// Create `user` unless the server already knows it.
    #[instrument(skip(self))]
    pub async fn assure_user_exists(&mut self, user: &str) -> Result<()> {
        if self.user_status(user).await? == 200 {
            return Ok(());
        }
        self.create_user(user).await?;
        self.set_user_display_name(user, None).await?;
        let status = self.user_status(user).await?;
        ensure_eq(200, status, format!("User {user} is missing after creation"))
    }

    async fn create_user(&mut self, user: &str) -> Result<()> {
        let mut body = Payload::new();
        body.insert("userid".into(), json!(user));
        body.insert("password".into(), json!(self.config.test_password));
        let created = self.ocs_as_admin("POST", CLOUD_USERS, Some(body)).await?;
        ensure_eq(200, created.status, "Failed to create user")?;

        // Log in once so the account is fully initialised.
        let previous = self.current_user.replace(user.to_string());
        let login = self
            .send_ocs_request("GET", &format!("{CLOUD_USERS}/{user}"), None)
            .await
            .map(|r| r.status);
        self.current_user = previous;
        ensure_eq(200, login?, "Failed to do first login")?;

        info!(user, "user created");
        self.created_users.push(user.to_string());
        Ok(())
    }

    /// Create a guest account through the guests app console command.
    #[instrument(skip(self))]
    pub async fn assure_guest_exists(&mut self, guest: &str) -> Result<()> {
        if self.user_status(guest).await? == 200 {
            return Ok(());
        }
        let password = self.config.test_password.clone();
        self.commands.set_env("OC_PASS", &password);
        let command = format!("guests:add {} {guest} --password-from-env", self.config.admin_user);
        self.run_command_expecting(&command, 0).await?;
        self.set_user_display_name(guest, None).await?;
        self.created_users.push(guest.to_string());
        Ok(())
    }

    /// Set the display name, `<user>-displayname` when none is given so
    /// tests can tell it apart from the user id.
    pub async fn set_user_display_name(&mut self, user: &str, display_name: Option<&str>) -> Result<()> {
        let display_name = display_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{user}-displayname"));
        self.edit_user(user, "displayname", &display_name).await
    }

    pub async fn set_user_email(&mut self, user: &str, email: &str) -> Result<()> {
        self.edit_user(user, "email", email).await
    }

    async fn edit_user(&mut self, user: &str, key: &str, value: &str) -> Result<()> {
        let mut body = Payload::new();
        body.insert("key".into(), json!(key));
        body.insert("value".into(), json!(value));
        self.ocs_as_admin("PUT", &format!("{CLOUD_USERS}/{user}"), Some(body))
            .await?;
        Ok(())
    }

    /// Store `key | value` rows in the config of `app_id`.
    #[instrument(skip(self, rows))]
    pub async fn set_app_config(&mut self, app_id: &str, rows: &[Vec<String>]) -> Result<()> {
        for row in rows {
            let [key, value] = row.as_slice() else {
                return Err(BddError::assertion(format!(
                    "App config rows need a key and a value: {row:?}"
                )));
            };
            let mut body = Payload::new();
            body.insert("value".into(), Value::String(value.clone()));
            self.ocs_as_admin("POST", &format!("{APP_CONFIG}/{app_id}/{key}"), Some(body))
                .await?;
        }
        Ok(())
    }

    /// Forget the command environment and delete every user the scenario
    /// created.
    pub async fn tear_down(&mut self) {
        self.commands.clear_env();
        let users = std::mem::take(&mut self.created_users);
        for user in users {
            match self
                .ocs_as_admin("DELETE", &format!("{CLOUD_USERS}/{user}"), None)
                .await
            {
                Ok(response) => debug!(user = %user, status = response.status, "user deleted"),
                Err(e) => warn!(user = %user, error = %e, "could not delete user"),
            }
        }
    }

    // Commands

    pub fn set_command_env(&mut self, name: &str, value: &str) {
        self.commands.set_env(name, value);
    }

    pub async fn run_command(&mut self, command: &str) -> Result<CommandOutcome> {
        self.commands.run_console(command).await
    }

    pub async fn run_command_expecting(&mut self, command: &str, code: i32) -> Result<()> {
        let outcome = self.run_command(command).await?;
        ensure_eq(code, outcome.code, outcome.to_string())
    }

    pub async fn run_bash_command_expecting(&mut self, command: &str, code: i32) -> Result<()> {
        let outcome = self.commands.run_shell(command).await?;
        ensure_eq(code, outcome.code, outcome.to_string())
    }

    pub fn assert_output_contains(&self, text: &str) -> Result<()> {
        let output = self.commands.last_output();
        ensure(output.contains(text), || {
            format!("The output of the last command does not contain: {text}\nOutput: {output}")
        })
    }

    pub fn assert_output_empty(&self) -> Result<()> {
        let output = self.commands.last_output();
        ensure(output.is_empty(), || {
            format!("The output of the last command should be empty, but got: {output}")
        })
    }

    // Timing

    pub async fn wait_for(&mut self, seconds: u64) {
        self.waited = Some((Instant::now(), seconds));
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }

    pub fn assert_elapsed_since_wait(&self, seconds: u64) -> Result<()> {
        let (started, _) = self
            .waited
            .ok_or_else(|| BddError::assertion("No wait step ran in this scenario"))?;
        let elapsed = started.elapsed();
        ensure(elapsed >= Duration::from_secs(seconds), || {
            format!("Only {elapsed:?} passed since the wait step, expected at least {seconds}s")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_user_means_anonymous() {
        let mut ctx = ApiContext::new(ContextConfig::default());
        ctx.set_current_user("alice");
        assert_eq!(ctx.current_user(), Some("alice"));
        ctx.set_current_user("");
        assert_eq!(ctx.current_user(), None);
    }

    #[test]
    fn status_assertion_reports_body() {
        let ctx = ApiContext::new(ContextConfig::default());
        assert!(ctx.assert_status(200).is_ok());
        assert!(ctx.assert_status(404).is_err());
    }

    #[test]
    fn custom_headers_are_rendered() {
        let mut ctx = ApiContext::new(ContextConfig::default());
        ctx.fields_mut().insert("token", json!("abc"));
        ctx.set_custom_header("Authorization", "Bearer <token>");
        assert_eq!(
            ctx.session.custom_headers().get("Authorization").map(String::as_str),
            Some("Bearer abc")
        );
    }

    #[tokio::test]
    async fn elapsed_needs_a_wait() {
        let mut ctx = ApiContext::new(ContextConfig::default());
        assert!(ctx.assert_elapsed_since_wait(0).is_err());
        ctx.wait_for(0).await;
        ctx.assert_elapsed_since_wait(0).unwrap();
        assert!(ctx.assert_elapsed_since_wait(60).is_err());
    }
}
