use reqwest::RequestBuilder;
use std::fmt;

pub const TOKEN_ENV_VAR: &str = "EARTHDATA_TOKEN";

/// Earthdata Login bearer token, if any.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn from_env() -> Self {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.trim().is_empty() => Self::bearer(token.trim()),
            _ => Self::anonymous(),
        }
    }

    /// Prefers the configured token; an empty or unsubstituted `${VAR}` value falls back to the environment.
    pub fn resolve(configured: Option<&str>) -> Self {
        match configured.map(str::trim) {
            Some(token) if !token.is_empty() && !token.starts_with("${") => Self::bearer(token),
            _ => Self::from_env(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.is_none()
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}
