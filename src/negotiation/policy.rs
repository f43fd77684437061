use crate::{Error, ErrorContext, Result};
use semver::{Version, VersionReq};

/// Server versions from which the REST API is available.
pub const DEFAULT_REST_API_SUPPORTED: &str = ">=1.13.0";

/// Decides which protocol a server version speaks.
#[derive(Debug, Clone)]
pub struct CompatibilityPolicy {
    rest_supported: VersionReq,
}

impl CompatibilityPolicy {
    pub fn new(rest_supported: &str) -> Result<Self> {
        let rest_supported = VersionReq::parse(rest_supported).map_err(|e| {
            Error::configuration_with_context(
                "invalid REST version range",
                ErrorContext::new()
                    .with_field_path("rest_supported")
                    .with_details(format!("{:?}: {}", rest_supported, e))
                    .with_source("compatibility_policy"),
            )
        })?;
        Ok(Self { rest_supported })
    }

    /// True when `version` falls inside the REST range.
    ///
    /// A leading `v` is ignored and prereleases are compared by their release number, so
    /// `1.14.0-beta.1` counts as `1.14.0`. Versions that don't parse never select REST.
    pub fn supports_rest(&self, version: &str) -> bool {
        let trimmed = version.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        match Version::parse(trimmed) {
            Ok(v) => self
                .rest_supported
                .matches(&Version::new(v.major, v.minor, v.patch)),
            Err(_) => false,
        }
    }
}

impl Default for CompatibilityPolicy {
    fn default() -> Self {
        Self {
            rest_supported: VersionReq::parse(DEFAULT_REST_API_SUPPORTED)
                .unwrap_or(VersionReq::STAR),
        }
    }
}
