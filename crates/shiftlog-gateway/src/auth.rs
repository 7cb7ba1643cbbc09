//! Caller identity. Every `/api/*` handler resolves the request's user through
//! the configured [`IdentityProvider`] before touching the store.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;
use shiftlog_core::config::{AuthConfig, AuthMode};
use shiftlog_core::UserId;
use tracing::warn;

/// Maps request headers to the user they act for. `None` means unauthenticated.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn resolve(&self, headers: &HeaderMap) -> Option<UserId>;
}

/// `Authorization: Bearer <token>` looked up in a static table.
pub struct TokenTable {
    tokens: HashMap<String, UserId>,
}

impl TokenTable {
    pub fn new(entries: impl IntoIterator<Item = (String, UserId)>) -> Self {
        Self {
            tokens: entries.into_iter().collect(),
        }
    }
}

#[async_trait]
impl IdentityProvider for TokenTable {
    fn name(&self) -> &'static str {
        "token"
    }

    async fn resolve(&self, headers: &HeaderMap) -> Option<UserId> {
        extract_bearer(headers).and_then(|t| self.tokens.get(t).cloned())
    }
}

/// Trusts a header set by an authenticating reverse proxy.
pub struct TrustedProxy {
    header: String,
}

impl TrustedProxy {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for TrustedProxy {
    fn name(&self) -> &'static str {
        "trusted-proxy"
    }

    async fn resolve(&self, headers: &HeaderMap) -> Option<UserId> {
        headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(UserId::from)
    }
}

/// Every request is the same local user.
pub struct DevUser(pub UserId);

#[async_trait]
impl IdentityProvider for DevUser {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn resolve(&self, _headers: &HeaderMap) -> Option<UserId> {
        Some(self.0.clone())
    }
}

/// Rejects everyone. Used when the configured mode cannot work.
pub struct DenyAll;

#[async_trait]
impl IdentityProvider for DenyAll {
    fn name(&self) -> &'static str {
        "deny-all"
    }

    async fn resolve(&self, _headers: &HeaderMap) -> Option<UserId> {
        None
    }
}

pub fn from_config(cfg: &AuthConfig) -> Box<dyn IdentityProvider> {
    match cfg.mode {
        AuthMode::Token => {
            if cfg.tokens.is_empty() {
                warn!("auth mode is token but no tokens are configured; every request will be rejected");
            }
            Box::new(TokenTable::new(
                cfg.tokens
                    .iter()
                    .map(|e| (e.token.clone(), UserId::from(e.user_id.as_str()))),
            ))
        }
        AuthMode::TrustedProxy => Box::new(TrustedProxy::new(cfg.proxy_header.as_str())),
        AuthMode::None => match &cfg.dev_user {
            Some(user) => Box::new(DevUser(UserId::from(user.as_str()))),
            // config validation requires dev_user, but defaults skip validation
            None => {
                warn!("auth mode is none but dev_user is unset; every request will be rejected");
                Box::new(DenyAll)
            }
        },
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
