//! Native authentication: connect a mailbox using provider credentials
//!
//! Connecting is a two step exchange. `/connect/authorize` validates the
//! provider settings and returns a short-lived code, which `/connect/token`
//! trades for the account and its access token. Neither call carries
//! client authentication; the client id and secret travel in the body.

use hyper::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::info;

use crate::client::Client;
use crate::error::{NylasError, Result};
use crate::models::Account;

/// Provider-specific settings for a connect request
pub trait AuthorizeSettings: Send + Sync {
    /// Value of the `provider` field, e.g. `gmail`
    fn provider(&self) -> &'static str;

    /// The `settings` object sent to the API
    fn settings_json(&self) -> Result<Value>;
}

macro_rules! authorize_settings {
    ($ty:ty, $provider:literal) => {
        impl AuthorizeSettings for $ty {
            fn provider(&self) -> &'static str {
                $provider
            }

            fn settings_json(&self) -> Result<Value> {
                Ok(serde_json::to_value(self)?)
            }
        }
    };
}

/// Google account connected with an existing OAuth refresh token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmailAuthorizeSettings {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_refresh_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImapAuthorizeSettings {
    pub imap_host: String,
    pub imap_port: u16,
    pub imap_username: String,
    pub imap_password: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub ssl_required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeAuthorizeSettings {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office365AuthorizeSettings {
    pub microsoft_client_secret: String,
    pub microsoft_refresh_token: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlookAuthorizeSettings {
    pub password: String,
}

authorize_settings!(GmailAuthorizeSettings, "gmail");
authorize_settings!(ImapAuthorizeSettings, "imap");
authorize_settings!(ExchangeAuthorizeSettings, "exchange");
authorize_settings!(Office365AuthorizeSettings, "office365");
authorize_settings!(OutlookAuthorizeSettings, "outlook");

/// Request to connect one mailbox to the application
pub struct AuthorizeRequest {
    pub name: String,
    pub email_address: String,
    pub settings: Box<dyn AuthorizeSettings>,
    /// e.g. `email`, `calendar`, `contacts`
    pub scopes: Vec<String>,
}

impl AuthorizeRequest {
    pub fn new(
        name: impl Into<String>,
        email_address: impl Into<String>,
        settings: impl AuthorizeSettings + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            email_address: email_address.into(),
            settings: Box::new(settings),
            scopes: Vec::new(),
        }
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    fn to_body(&self, client_id: &str) -> Result<AuthorizeBody> {
        Ok(AuthorizeBody {
            client_id: client_id.to_string(),
            name: self.name.clone(),
            email_address: self.email_address.clone(),
            provider: self.settings.provider(),
            settings: self.settings.settings_json()?,
            scopes: self.scopes.join(","),
        })
    }
}

impl fmt::Debug for AuthorizeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizeRequest")
            .field("name", &self.name)
            .field("email_address", &self.email_address)
            .field("provider", &self.settings.provider())
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AuthorizeBody {
    client_id: String,
    name: String,
    email_address: String,
    provider: &'static str,
    settings: Value,
    scopes: String,
}

#[derive(Debug, Serialize)]
struct TokenExchange<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct AuthorizeCode {
    #[serde(default)]
    code: String,
}

impl Client {
    /// Connect an account and return it with its new access token.
    ///
    /// Use [`Client::as_account`] with [`Account::access_token`] to act on
    /// the connected mailbox.
    pub async fn connect_account(&self, req: &AuthorizeRequest) -> Result<Account> {
        let code = self.connect_authorize(req).await?;
        let account = self.connect_exchange_code(&code).await?;
        info!(
            account_id = %account.account_id,
            provider = %account.provider,
            "account connected"
        );
        Ok(account)
    }

    /// First step of [`Client::connect_account`]: obtain an authorization code
    pub async fn connect_authorize(&self, req: &AuthorizeRequest) -> Result<String> {
        let body = req.to_body(self.client_id())?;
        let req = self
            .request(Method::POST, "/connect/authorize")?
            .json(&body)?;
        let resp: AuthorizeCode = self.execute_json(req, "authorize code").await?;
        if resp.code.is_empty() {
            return Err(NylasError::InvalidRequest(
                "connect/authorize returned no code".to_string(),
            ));
        }
        Ok(resp.code)
    }

    /// Second step of [`Client::connect_account`]: trade the code for the account
    pub async fn connect_exchange_code(&self, code: &str) -> Result<Account> {
        let req = self
            .request(Method::POST, "/connect/token")?
            .json(&TokenExchange {
                client_id: self.client_id(),
                client_secret: self.client_secret(),
                code,
            })?;
        self.execute_json(req, "connected account").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authorize_body() {
        let req = AuthorizeRequest::new(
            "Name",
            "email@example.org",
            ExchangeAuthorizeSettings {
                username: "user".to_string(),
                password: "pass".to_string(),
            },
        )
        .scopes(["email", "calendar"]);

        let body = serde_json::to_value(req.to_body("clientid").unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "client_id": "clientid",
                "name": "Name",
                "email_address": "email@example.org",
                "provider": "exchange",
                "settings": {"username": "user", "password": "pass"},
                "scopes": "email,calendar"
            })
        );
    }

    #[test]
    fn test_provider_names() {
        let all: Vec<Box<dyn AuthorizeSettings>> = vec![
            Box::new(GmailAuthorizeSettings::default()),
            Box::new(ImapAuthorizeSettings::default()),
            Box::new(ExchangeAuthorizeSettings::default()),
            Box::new(Office365AuthorizeSettings::default()),
            Box::new(OutlookAuthorizeSettings::default()),
        ];
        let names: Vec<_> = all.iter().map(|s| s.provider()).collect();
        assert_eq!(names, vec!["gmail", "imap", "exchange", "office365", "outlook"]);
    }

    #[test]
    fn test_debug_hides_settings() {
        let req = AuthorizeRequest::new(
            "Name",
            "email@example.org",
            OutlookAuthorizeSettings {
                password: "hunter2".to_string(),
            },
        );
        let debug = format!("{:?}", req);
        assert!(debug.contains("outlook"));
        assert!(!debug.contains("hunter2"));
    }
}
