//! Access guard for views that require a trusted agent.
//!
//! The web layer calls [`TrustGuard::check`] before serving a protected
//! resource and turns a [`LoginRedirect`] into its own redirect response.

use crate::config::TrustConfig;
use crate::identity::Principal;

use super::token::TrustToken;

/// Default query parameter carrying the originally requested path.
pub const DEFAULT_REDIRECT_FIELD: &str = "next";

/// Whether `token` grants trust to `principal`.
///
/// A token issued to a different owner never counts.
pub fn is_trusted(principal: &Principal, token: &TrustToken) -> bool {
    token.is_trusted() && token.owner() == principal
}

/// Where an untrusted agent is sent instead of the protected resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub login_url: String,
    pub redirect_field_name: String,
    pub next: String,
}

impl LoginRedirect {
    /// Redirect target with the `next` parameter appended.
    ///
    /// `next` is inserted verbatim; callers pass an already URL-encoded path.
    pub fn location(&self) -> String {
        let separator = if self.login_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}{}={}",
            self.login_url, self.redirect_field_name, self.next
        )
    }
}

/// Trusted-agent requirement for one protected resource.
#[derive(Debug, Clone)]
pub struct TrustGuard {
    login_url: String,
    redirect_field_name: String,
}

impl TrustGuard {
    /// Guard redirecting to the configured login URL.
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            login_url: config.login_url.clone(),
            redirect_field_name: DEFAULT_REDIRECT_FIELD.to_string(),
        }
    }

    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    pub fn with_redirect_field_name(mut self, name: impl Into<String>) -> Self {
        self.redirect_field_name = name.into();
        self
    }

    /// Allow the request, or say where to send the agent.
    pub fn check(
        &self,
        principal: &Principal,
        token: &TrustToken,
        next: &str,
    ) -> std::result::Result<(), LoginRedirect> {
        if is_trusted(principal, token) {
            Ok(())
        } else {
            Err(LoginRedirect {
                login_url: self.login_url.clone(),
                redirect_field_name: self.redirect_field_name.clone(),
                next: next.to_string(),
            })
        }
    }
}
