use super::key::SigningKey;
use crate::error::{Result, SessionError};
use crate::utils::{get_env_parsed, get_env_with_prefix};
use serde::{Deserialize, Serialize};

/// When to set the `Secure` attribute on the session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecureCookie {
    /// Set `Secure` only when the request arrived over an encrypted connection
    #[default]
    Auto,
    /// Always set `Secure`
    Always,
    /// Never set `Secure`
    Never,
}

impl std::str::FromStr for SecureCookie {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" | "true" => Ok(Self::Always),
            "never" | "false" => Ok(Self::Never),
            other => Err(SessionError::configuration(format!(
                "Unknown cookie secure policy: {}",
                other
            ))),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Secret used to sign session cookies (hex-encoded, at least 32 bytes)
    ///
    /// **REQUIRED** in production. Generate one with: `openssl rand -hex 32`
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Allow a randomly generated secret when none is configured (FOR DEVELOPMENT ONLY)
    ///
    /// Cookies signed with a generated key become invalid on every restart
    /// and are not accepted by other instances.
    #[serde(default)]
    pub allow_insecure_key: bool,

    /// `Secure` attribute policy for the session cookie
    #[serde(default)]
    pub secure: SecureCookie,

    /// Honor `X-Forwarded-Proto` / `Forwarded` when detecting HTTPS
    ///
    /// Only enable this behind a proxy that overwrites these headers.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secret_key: None,
            allow_insecure_key: false,
            secure: SecureCookie::default(),
            trust_forwarded_headers: false,
        }
    }
}

impl SessionConfig {
    /// Create a new SessionConfig builder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Load session configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(name) = get_env_with_prefix("SESSION_COOKIE_NAME") {
            config.cookie_name = name;
        }

        if let Some(key) = get_env_with_prefix("SESSION_SECRET_KEY") {
            config.secret_key = Some(key);
        }

        if let Some(allow) = get_env_parsed("SESSION_ALLOW_INSECURE_KEY") {
            config.allow_insecure_key = allow;
        }

        if let Some(secure) = get_env_parsed("SESSION_COOKIE_SECURE") {
            config.secure = secure;
        }

        if let Some(trust) = get_env_parsed("SESSION_TRUST_FORWARDED_HEADERS") {
            config.trust_forwarded_headers = trust;
        }

        config
    }

    /// Check the configuration without building a key
    pub fn validate(&self) -> Result<()> {
        if self.cookie_name.is_empty() {
            return Err(SessionError::configuration("Session cookie name must not be empty"));
        }
        if !self
            .cookie_name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b))
        {
            return Err(SessionError::configuration(format!(
                "Invalid session cookie name: {:?}",
                self.cookie_name
            )));
        }
        Ok(())
    }

    /// Build the signing key for this configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configured key is invalid, or if no key is configured and
    /// `allow_insecure_key` is `false`.
    pub fn signing_key(&self) -> Result<SigningKey> {
        if let Some(ref key) = self.secret_key {
            return SigningKey::from_hex(key);
        }

        if self.allow_insecure_key {
            tracing::error!(
                "SECURITY WARNING: using a randomly generated session secret. \
                Sessions will not survive a restart and will not work across instances. \
                Set SESSION_SECRET_KEY (generate with: openssl rand -hex 32)."
            );
            return Ok(SigningKey::generate());
        }

        Err(SessionError::configuration(
            "Sessions require a secret key. \
            Set SESSION_SECRET_KEY or config.secret_key. \
            Generate a key with: openssl rand -hex 32. \
            For development only, set SESSION_ALLOW_INSECURE_KEY=true.",
        ))
    }
}

/// Builder for SessionConfig
#[must_use = "builder does nothing until you call build()"]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.config.cookie_name = name.into();
        self
    }

    pub fn secret_key(mut self, hex_key: impl Into<String>) -> Self {
        self.config.secret_key = Some(hex_key.into());
        self
    }

    pub fn allow_insecure_key(mut self, allow: bool) -> Self {
        self.config.allow_insecure_key = allow;
        self
    }

    pub fn secure(mut self, secure: SecureCookie) -> Self {
        self.config.secure = secure;
        self
    }

    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.config.trust_forwarded_headers = trust;
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_cookie_name() -> String {
    "s".to_string()
}
