//! The connected account and application-level account management
//!
//! [`Client::account`] uses the account's access token. The management calls
//! authenticate with the application's client secret and act on any
//! account connected to the application.

use hyper::Method;
use serde::Serialize;
use tracing::info;

use crate::client::Client;
use crate::error::Result;
use crate::models::{Account, BillingAccount};

#[derive(Debug, Serialize)]
struct RevokeTokens<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_access_token: Option<&'a str>,
}

impl Client {
    /// The account the access token belongs to
    pub async fn account(&self) -> Result<Account> {
        let req = self.user_request(Method::GET, "/account")?;
        self.execute_json(req, "account").await
    }

    /// Every account connected to the application
    pub async fn accounts(&self) -> Result<Vec<BillingAccount>> {
        let path = format!("/a/{}/accounts", self.client_id());
        let req = self.app_request(Method::GET, &path)?;
        self.execute_json(req, "accounts").await
    }

    /// Downgrade a paid account, stopping sync
    pub async fn cancel_account(&self, id: &str) -> Result<()> {
        let path = format!("/a/{}/accounts/{}/downgrade", self.client_id(), id);
        let req = self.app_request(Method::POST, &path)?;
        self.execute(req).await?;
        info!(account_id = %id, "account cancelled");
        Ok(())
    }

    /// Re-enable a cancelled account
    pub async fn reactivate_account(&self, id: &str) -> Result<()> {
        let path = format!("/a/{}/accounts/{}/upgrade", self.client_id(), id);
        let req = self.app_request(Method::POST, &path)?;
        self.execute(req).await?;
        info!(account_id = %id, "account reactivated");
        Ok(())
    }

    /// Revoke all of an account's access tokens, optionally sparing one
    pub async fn revoke_account_tokens(
        &self,
        id: &str,
        keep_access_token: Option<&str>,
    ) -> Result<()> {
        let path = format!("/a/{}/accounts/{}/revoke-all", self.client_id(), id);
        let req = self
            .app_request(Method::POST, &path)?
            .json(&RevokeTokens { keep_access_token })?;
        self.execute(req).await?;
        info!(account_id = %id, "account tokens revoked");
        Ok(())
    }
}
