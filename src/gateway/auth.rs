//! Admin authentication against the hosted auth service.
//!
//! Signing in exchanges an email and password for an access token, which is
//! saved to a session file so later `admin` commands run as that user. The
//! session is plain JSON; deleting the file signs out.

use super::GatewayError;
use super::rest::{RestGateway, check};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::Path;

/// A signed-in admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Load a saved session. Missing file means signed out.
    pub fn load(path: &Path) -> Result<Option<Self>, GatewayError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), GatewayError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Remove the session file. Returns whether one existed.
    pub fn clear(path: &Path) -> Result<bool, GatewayError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a session that is present and still valid.
    pub fn require(path: &Path, now: DateTime<Utc>) -> Result<Self, GatewayError> {
        match Self::load(path)? {
            Some(s) if !s.is_expired(now) => Ok(s),
            Some(_) => Err(GatewayError::Unauthorized(
                "session expired, run `admin login` again".into(),
            )),
            None => Err(GatewayError::Unauthorized(
                "not signed in, run `admin login` first".into(),
            )),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self, fallback_email: &str, now: DateTime<Utc>) -> Result<Session, GatewayError> {
        let expires_at = TimeDelta::try_seconds(self.expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                GatewayError::Invalid(format!("token lifetime out of range: {}s", self.expires_in))
            })?;
        Ok(Session {
            email: self
                .user
                .and_then(|u| u.email)
                .unwrap_or_else(|| fallback_email.to_string()),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

/// Sign in with email and password.
pub fn sign_in(gw: &RestGateway, email: &str, password: &str) -> Result<Session, GatewayError> {
    let url = format!("{}/auth/v1/token", gw.base_url());
    tracing::debug!(%url, "POST");
    let resp = gw
        .authorize(gw.client().post(&url))
        .query(&[("grant_type", "password")])
        .json(&json!({ "email": email, "password": password }))
        .send()?;
    let token: TokenResponse = check(resp)?.json()?;
    token.into_session(email, Utc::now())
}

/// Ask the auth service to email a password-recovery link.
pub fn request_password_reset(
    gw: &RestGateway,
    email: &str,
    redirect_to: Option<&str>,
) -> Result<(), GatewayError> {
    let url = format!("{}/auth/v1/recover", gw.base_url());
    tracing::debug!(%url, "POST");
    let mut req = gw
        .authorize(gw.client().post(&url))
        .json(&json!({ "email": email }));
    if let Some(to) = redirect_to {
        req = req.query(&[("redirect_to", to)]);
    }
    check(req.send()?)?;
    Ok(())
}

/// Set a new password for the user the gateway's access token belongs to.
///
/// Works with a signed-in session or with the access token carried by a
/// recovery link.
pub fn update_password(gw: &RestGateway, new_password: &str) -> Result<(), GatewayError> {
    validate_password(new_password)?;
    let url = format!("{}/auth/v1/user", gw.base_url());
    tracing::debug!(%url, "PUT");
    let resp = gw
        .authorize(gw.client().put(&url))
        .json(&json!({ "password": new_password }))
        .send()?;
    check(resp)?;
    Ok(())
}

/// The auth service's minimum: six characters.
pub fn validate_password(password: &str) -> Result<(), GatewayError> {
    if password.chars().count() < 6 {
        return Err(GatewayError::Invalid(
            "password must be at least 6 characters".into(),
        ));
    }
    Ok(())
}
