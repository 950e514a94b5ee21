//! Caller-owned access session for message sources.
//!
//! Nothing here reads or writes token files. The owner of a [`Session`]
//! decides when to refresh it and with which [`CredentialRefresher`].

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::{NormalizeError, Result};

/// Refresh the token if it expires within this window.
const REFRESH_THRESHOLD_SECS: i64 = 300;

/// A fresh access token handed back by a [`CredentialRefresher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Obtains new access tokens for an account (OAuth refresh flow, keychain, ...).
pub trait CredentialRefresher {
    fn refresh(&self, account: &str) -> Result<RefreshedToken>;
}

/// Bearer-token session for one account.
#[derive(Debug, Clone)]
pub struct Session {
    account: String,
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A session whose token never expires (local sources, tests).
    pub fn new(account: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Set the instant the access token stops being valid.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// The bearer token, or [`NormalizeError::SessionExpired`] once it has lapsed.
    pub fn access_token(&self) -> Result<&str> {
        if self.is_expired_at(Utc::now()) {
            return Err(NormalizeError::SessionExpired);
        }
        Ok(&self.access_token)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// `true` when the token is expired or about to expire.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - Duration::seconds(REFRESH_THRESHOLD_SECS) <= now)
    }

    /// Replace the token with a fresh one from `refresher`.
    pub fn refresh(&mut self, refresher: &dyn CredentialRefresher) -> Result<()> {
        let fresh = refresher.refresh(&self.account)?;
        info!(account = %self.account, expires_at = ?fresh.expires_at, "Session refreshed");
        self.access_token = fresh.access_token;
        self.expires_at = fresh.expires_at;
        Ok(())
    }

    /// Refresh only when [`Self::needs_refresh_at`] says so. Returns whether it did.
    pub fn refresh_if_needed(&mut self, refresher: &dyn CredentialRefresher) -> Result<bool> {
        if !self.needs_refresh_at(Utc::now()) {
            debug!(account = %self.account, "Session still valid");
            return Ok(false);
        }
        self.refresh(refresher)?;
        Ok(true)
    }
}
