//! Credential selection for the acting user

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bdd_core::{BddError, ContextConfig, Result};
use reqwest::header::HeaderValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// `Authorization` value for HTTP Basic auth.
    pub fn basic_header(&self) -> Result<HeaderValue> {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {token}")).map_err(|e| {
            BddError::Transport {
                reason: format!("invalid credentials for {}: {e}", self.user),
            }
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Basic-auth credentials for `current_user`.
///
/// The admin signs in with the admin password, everybody else with the
/// shared test password. Anonymous requests carry no credentials.
pub fn credentials_for(current_user: Option<&str>, config: &ContextConfig) -> Option<Credentials> {
    let user = current_user.filter(|u| !u.is_empty())?;
    let password = if config.is_admin(user) {
        &config.admin_password
    } else {
        &config.test_password
    };
    Some(Credentials {
        user: user.to_string(),
        password: password.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_uses_admin_password() {
        let config = ContextConfig {
            admin_password: "root-pw".to_string(),
            ..ContextConfig::default()
        };
        let creds = credentials_for(Some("admin"), &config).unwrap();
        assert_eq!(creds.password, "root-pw");
    }

    #[test]
    fn other_users_share_test_password() {
        let config = ContextConfig::default();
        let creds = credentials_for(Some("signer1"), &config).unwrap();
        assert_eq!(creds.user, "signer1");
        assert_eq!(creds.password, "123456");
    }

    #[test]
    fn basic_header_encodes_user_and_password() {
        let creds = credentials_for(Some("alice"), &ContextConfig::default()).unwrap();
        assert_eq!(creds.basic_header().unwrap(), "Basic YWxpY2U6MTIzNDU2");
    }

    #[test]
    fn anonymous_has_no_credentials() {
        let config = ContextConfig::default();
        assert!(credentials_for(None, &config).is_none());
        assert!(credentials_for(Some(""), &config).is_none());
    }
}
