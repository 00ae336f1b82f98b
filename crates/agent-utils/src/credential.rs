//! Credential loading
//!
//! Credentials are read once at startup. A missing or blank value is a
//! configuration defect, so loading never retries.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Configuration errors raised while reading settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required credential is unset or empty
    #[error("{name} is not set. Add it to the environment or a .env file.")]
    MissingCredential {
        /// Name of the variable that was looked up
        name: String,
    },

    /// A setting has a value that cannot be parsed
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue {
        /// Name of the setting
        name: String,
        /// Why the value was rejected
        reason: String,
    },
}

/// An API key or other secret
///
/// The value is redacted from `Debug` output and only reachable through
/// [`Credential::expose`].
#[derive(Clone)]
pub struct Credential {
    name: String,
    value: SecretString,
}

impl Credential {
    /// Wrap a raw value, rejecting empty or whitespace-only secrets
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConfigError::MissingCredential { name });
        }
        Ok(Self {
            name,
            value: SecretString::new(value),
        })
    }

    /// Name of the variable this credential was loaded from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access the secret value
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Read a credential from the process environment
///
/// Fails with [`ConfigError::MissingCredential`] when the variable is unset,
/// not valid unicode, or blank.
pub fn load_credential(name: &str) -> Result<Credential, ConfigError> {
    let value = std::env::var(name).map_err(|_| ConfigError::MissingCredential {
        name: name.to_string(),
    })?;
    Credential::new(name, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_value_is_missing() {
        let err = Credential::new("GEMINI_API_KEY", "").unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingCredential {
                name: "GEMINI_API_KEY".to_string()
            }
        );

        assert!(Credential::new("GEMINI_API_KEY", "   \t").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = Credential::new("GEMINI_API_KEY", "super-secret").unwrap();
        let printed = format!("{credential:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("GEMINI_API_KEY"));
        assert_eq!(credential.expose(), "super-secret");
    }

    #[test]
    fn test_load_unset_credential() {
        let result = load_credential("AGENT_UTILS_TEST_UNSET_CREDENTIAL_7F3A");
        assert!(matches!(
            result,
            Err(ConfigError::MissingCredential { ref name }) if name == "AGENT_UTILS_TEST_UNSET_CREDENTIAL_7F3A"
        ));
    }

    #[test]
    fn test_error_message_names_variable() {
        let err = ConfigError::MissingCredential {
            name: "GEMINI_API_KEY".to_string(),
        };
        assert!(err.to_string().starts_with("GEMINI_API_KEY is not set"));
    }
}
