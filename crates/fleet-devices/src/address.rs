//! Device address resolution.
//!
//! Normalizes the loosely-specified address block on a device record into
//! usable probe URLs and credentials: ordered health-path candidates,
//! bearer-token lookup with environment fallback, and base-URL joining
//! that tolerates trailing slashes and absolute paths.

use fleet_storage::DeviceAddress;

/// Default liveness path when the device declares none.
pub const DEFAULT_HEALTH_PATH: &str = "/healthz";
/// Fixed fallback liveness path, probed after the declared path.
pub const FALLBACK_HEALTH_PATH: &str = "/health";
/// Default status path when the device declares none.
pub const DEFAULT_STATUS_PATH: &str = "/status";

fn with_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Resolvable base URL of the device, if any.
pub fn base_url(address: &DeviceAddress) -> Option<&str> {
    non_empty(address.base_url.as_ref())
}

/// Ordered liveness path candidates: the device-declared path first, then
/// the fixed fallback. The fallback is omitted when it equals the primary.
pub fn health_paths(address: &DeviceAddress) -> Vec<String> {
    let primary = with_leading_slash(
        non_empty(address.health_path.as_ref()).unwrap_or(DEFAULT_HEALTH_PATH),
    );
    if primary == FALLBACK_HEALTH_PATH {
        vec![primary]
    } else {
        vec![primary, FALLBACK_HEALTH_PATH.to_string()]
    }
}

/// Status endpoint path.
pub fn status_path(address: &DeviceAddress) -> String {
    with_leading_slash(non_empty(address.status_path.as_ref()).unwrap_or(DEFAULT_STATUS_PATH))
}

/// Bearer token, preferring the inline token over the environment
/// variable named by `token_env`.
pub fn resolve_bearer_token(address: &DeviceAddress) -> Option<String> {
    if let Some(token) = non_empty(address.token.as_ref()) {
        return Some(token.to_string());
    }
    if let Some(env_name) = non_empty(address.token_env.as_ref()) {
        if let Ok(value) = std::env::var(env_name) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Join a base URL and a path. Absolute URLs pass through unchanged.
pub fn join_device_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.strip_suffix('/').unwrap_or(base);
    format!("{base}{}", with_leading_slash(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> DeviceAddress {
        DeviceAddress::with_base_url("http://10.0.0.5:8080")
    }

    #[test]
    fn test_health_paths_default_with_fallback() {
        assert_eq!(health_paths(&address()), vec!["/healthz", "/health"]);
    }

    #[test]
    fn test_health_paths_declared_first() {
        let mut addr = address();
        addr.health_path = Some("live".to_string());
        assert_eq!(health_paths(&addr), vec!["/live", "/health"]);
    }

    #[test]
    fn test_health_paths_no_duplicate_fallback() {
        let mut addr = address();
        addr.health_path = Some("/health".to_string());
        assert_eq!(health_paths(&addr), vec!["/health"]);
    }

    #[test]
    fn test_status_path_default() {
        assert_eq!(status_path(&address()), "/status");
    }

    #[test]
    fn test_blank_base_url_is_unresolvable() {
        let mut addr = address();
        addr.base_url = Some("   ".to_string());
        assert!(base_url(&addr).is_none());
    }

    #[test]
    fn test_inline_token_wins_over_env() {
        let mut addr = address();
        addr.token = Some("inline".to_string());
        addr.token_env = Some("FLEET_TEST_TOKEN_UNSET".to_string());
        assert_eq!(resolve_bearer_token(&addr).as_deref(), Some("inline"));
    }

    #[test]
    fn test_missing_token_sources_yield_none() {
        let mut addr = address();
        addr.token_env = Some("FLEET_TEST_TOKEN_DEFINITELY_UNSET".to_string());
        assert!(resolve_bearer_token(&addr).is_none());
    }

    #[test]
    fn test_join_handles_trailing_slash() {
        assert_eq!(
            join_device_url("http://dev:8080/", "status"),
            "http://dev:8080/status"
        );
        assert_eq!(
            join_device_url("http://dev:8080", "/status"),
            "http://dev:8080/status"
        );
    }

    #[test]
    fn test_join_passes_absolute_urls_through() {
        assert_eq!(
            join_device_url("http://dev:8080", "https://other/health"),
            "https://other/health"
        );
    }
}
