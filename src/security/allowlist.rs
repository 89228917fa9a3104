//! Destination allow-listing for outbound webhook deliveries (SSRF defense).
//!
//! The check is a hard precondition: a destination outside the allow-list is
//! a configuration error, never a retryable delivery failure. An empty
//! allow-list blocks everything rather than silently allowing everything.

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum AllowListError {
    #[error("Invalid destination URL: {0}")]
    InvalidUrl(String),
    #[error("Blocked scheme: {0}")]
    BlockedScheme(String),
    #[error("Destination host not allowed: {0}")]
    HostNotAllowed(String),
    #[error("Destination allow-list is empty; all deliveries are blocked")]
    EmptyAllowList,
}

/// Match a host against an allow-list pattern. `*.example.com` matches the
/// apex and any subdomain.
pub fn domain_matches(host: &str, pattern: &str) -> bool {
    if let Some(stripped) = pattern.strip_prefix("*.") {
        let suffix = &pattern[1..];
        host.ends_with(suffix) || host == stripped
    } else {
        host == pattern
    }
}

/// Configured set of hosts outbound deliveries may reach.
#[derive(Debug, Clone)]
pub struct HostAllowList {
    allowed: Vec<String>,
}

impl HostAllowList {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Validate a destination URL against the allow-list.
    pub fn check(&self, destination: &str) -> Result<(), AllowListError> {
        let parsed =
            Url::parse(destination).map_err(|_| AllowListError::InvalidUrl(destination.into()))?;

        let scheme = parsed.scheme();
        if !scheme.eq_ignore_ascii_case("https") && !scheme.eq_ignore_ascii_case("http") {
            return Err(AllowListError::BlockedScheme(scheme.to_string()));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| AllowListError::InvalidUrl(destination.into()))?;

        if self.allowed.is_empty() {
            return Err(AllowListError::EmptyAllowList);
        }
        if !self.allowed.iter().any(|p| domain_matches(host, p)) {
            return Err(AllowListError::HostNotAllowed(host.to_string()));
        }
        Ok(())
    }
}
