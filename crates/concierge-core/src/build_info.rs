//! Metadata embedded by `build.rs`, reported by `/health` and `--version`.

/// Short git commit hash, or "unknown" outside a checkout.
pub const GIT_HASH: &str = env!("CONCIERGE_GIT_HASH");

/// Build time in seconds since the Unix epoch.
pub const BUILD_TIMESTAMP: &str = env!("CONCIERGE_BUILD_TIMESTAMP");

/// Cargo profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("CONCIERGE_BUILD_PROFILE");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `"0.1.0 (abc1234, debug)"`
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_contains_parts() {
        let v = version_string();
        assert!(v.starts_with(VERSION));
        assert!(v.contains(GIT_HASH));
        assert!(v.contains(BUILD_PROFILE));
    }

    #[test]
    fn test_metadata_not_empty() {
        assert!(!GIT_HASH.is_empty());
        assert!(!BUILD_PROFILE.is_empty());
        assert!(BUILD_TIMESTAMP.parse::<u64>().is_ok());
    }
}
