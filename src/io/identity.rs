//! Caller identity from request headers
//!
//! The service sits behind an authenticating reverse proxy which forwards the
//! signed-in user's email and display name as headers. Nothing here verifies
//! credentials; the proxy is the trust boundary.

use crate::domain::Caller;
use hyper::HeaderMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Missing {header} header")]
    Missing { header: String },

    #[error("Header {header} is not valid UTF-8")]
    Invalid { header: String },
}

/// Resolves the caller behind a request
pub trait IdentityProvider: Send + Sync {
    /// `fallback_name` is used when the request carries no display name
    fn identify(&self, headers: &HeaderMap, fallback_name: Option<&str>) -> Result<Caller, IdentityError>;
}

/// Trusts proxy-set headers, e.g. `X-Auth-Request-Email`
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    email_header: String,
    name_header: String,
}

impl HeaderIdentity {
    pub fn new(email_header: impl Into<String>, name_header: impl Into<String>) -> Self {
        Self {
            email_header: email_header.into().to_ascii_lowercase(),
            name_header: name_header.into().to_ascii_lowercase(),
        }
    }

    fn header<'a>(&self, headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, IdentityError> {
        match headers.get(name) {
            None => Ok(None),
            Some(value) => value
                .to_str()
                .map(|s| Some(s.trim()).filter(|s| !s.is_empty()))
                .map_err(|_| IdentityError::Invalid { header: name.to_string() }),
        }
    }
}

impl Default for HeaderIdentity {
    fn default() -> Self {
        Self::new("x-auth-request-email", "x-auth-request-user")
    }
}

impl IdentityProvider for HeaderIdentity {
    fn identify(&self, headers: &HeaderMap, fallback_name: Option<&str>) -> Result<Caller, IdentityError> {
        let email = self
            .header(headers, &self.email_header)?
            .ok_or_else(|| IdentityError::Missing { header: self.email_header.clone() })?;

        let name = self
            .header(headers, &self.name_header)?
            .or_else(|| fallback_name.map(str::trim).filter(|s| !s.is_empty()))
            .unwrap_or_default();

        Ok(Caller::new(name, email))
    }
}
