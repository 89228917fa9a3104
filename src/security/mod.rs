//! Outbound-request security checks.

pub mod allowlist;

pub use allowlist::{domain_matches, AllowListError, HostAllowList};
