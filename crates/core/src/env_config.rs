//! Environment variable lookups shared by the binary and the service.

use std::time::Duration;

/// Parse an environment variable, falling back to `default`.
///
/// An unset variable is the normal case and stays silent. A variable that is
/// set but does not parse is logged at warn level before falling back.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    match std::env::var(var) {
        Ok(v) => match v.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        Err(_) => default,
    }
}

/// Non-empty string variable or `default`.
#[must_use]
pub fn env_string_or(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Whole seconds from the environment as a `Duration`.
#[must_use]
pub fn env_duration_secs(var: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_parse_with_default(var, default_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_valid_value() {
        let var_name = "NBSIM_TEST_ENV_PARSE_VALID_5121";
        unsafe { std::env::set_var(var_name, " 42 ") };
        let result: u32 = env_parse_with_default(var_name, 10);
        assert_eq!(result, 42);
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_env_parse_invalid_value() {
        let var_name = "NBSIM_TEST_ENV_PARSE_INVALID_5122";
        unsafe { std::env::set_var(var_name, "soon") };
        let result: u64 = env_parse_with_default(var_name, 3);
        assert_eq!(result, 3);
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_env_string_ignores_blank() {
        let var_name = "NBSIM_TEST_ENV_STRING_5123";
        unsafe { std::env::set_var(var_name, "   ") };
        assert_eq!(env_string_or(var_name, "fallback"), "fallback");
        unsafe { std::env::set_var(var_name, "claude-3-haiku") };
        assert_eq!(env_string_or(var_name, "fallback"), "claude-3-haiku");
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_env_duration_missing_var() {
        let var_name = "NBSIM_TEST_ENV_DURATION_5124";
        unsafe { std::env::remove_var(var_name) };
        assert_eq!(env_duration_secs(var_name, 7), Duration::from_secs(7));
    }
}
