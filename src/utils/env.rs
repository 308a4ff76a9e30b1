use std::str::FromStr;

/// Read an environment variable, preferring the `TIDEWAY_`-prefixed form.
///
/// `get_env_with_prefix("SESSION_COOKIE_NAME")` checks
/// `TIDEWAY_SESSION_COOKIE_NAME` first and falls back to `SESSION_COOKIE_NAME`.
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("TIDEWAY_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Read and parse an environment variable.
///
/// Unparsable values are logged and treated as unset.
pub fn get_env_parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = get_env_with_prefix(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_value_wins() {
        unsafe {
            std::env::set_var("TIDEWAY_SESSIONS_TEST_A", "prefixed");
            std::env::set_var("SESSIONS_TEST_A", "plain");
        }
        assert_eq!(get_env_with_prefix("SESSIONS_TEST_A"), Some("prefixed".to_string()));
        unsafe {
            std::env::remove_var("TIDEWAY_SESSIONS_TEST_A");
            std::env::remove_var("SESSIONS_TEST_A");
        }
    }

    #[test]
    fn test_unprefixed_fallback() {
        unsafe {
            std::env::set_var("SESSIONS_TEST_B", "plain");
        }
        assert_eq!(get_env_with_prefix("SESSIONS_TEST_B"), Some("plain".to_string()));
        unsafe {
            std::env::remove_var("SESSIONS_TEST_B");
        }

        assert_eq!(get_env_with_prefix("SESSIONS_TEST_MISSING"), None);
    }

    #[test]
    fn test_parsed_value() {
        unsafe {
            std::env::set_var("SESSIONS_TEST_C", " true ");
            std::env::set_var("SESSIONS_TEST_D", "maybe");
        }
        assert_eq!(get_env_parsed::<bool>("SESSIONS_TEST_C"), Some(true));
        assert_eq!(get_env_parsed::<bool>("SESSIONS_TEST_D"), None);
        unsafe {
            std::env::remove_var("SESSIONS_TEST_C");
            std::env::remove_var("SESSIONS_TEST_D");
        }
    }
}
