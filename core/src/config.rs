//! Client configuration.
//!
//! # Design
//! The envelope format is a property of the deployment rather than of a
//! single call, so the active `ClientConfig` lives in a process-wide slot.
//! `TypedRequest::handle_response` takes one snapshot per call; callers that
//! want to pin a configuration (tests, multi-tenant hosts) pass one explicitly
//! to `handle_response_with`.

use std::sync::RwLock;

use serde::Deserialize;

use crate::error::ConfigError;

const NESTED_RESPONSE_VAR: &str = "RPC_NESTED_RESPONSE";
const STRICT_OBJECT_TYPE_VAR: &str = "RPC_STRICT_OBJECT_TYPE";

static GLOBAL: RwLock<ClientConfig> = RwLock::new(ClientConfig::DEFAULT);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub response: ResponseConfig,
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseConfig {
    /// The transport delivers `{result}` / `{error}` envelopes, as it does
    /// for multi-call requests, and they must be unwrapped before parsing.
    pub nested_response: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserConfig {
    /// Reject objects whose `objectType` differs from the expected subtype.
    pub strict_object_type: bool,
}

impl ClientConfig {
    pub const DEFAULT: Self = Self {
        response: ResponseConfig {
            nested_response: true,
        },
        parser: ParserConfig {
            strict_object_type: false,
        },
    };

    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Defaults overridden by `RPC_NESTED_RESPONSE` and `RPC_STRICT_OBJECT_TYPE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(NESTED_RESPONSE_VAR) {
            config.response.nested_response = parse_bool(NESTED_RESPONSE_VAR, &value)?;
        }
        if let Some(value) = lookup(STRICT_OBJECT_TYPE_VAR) {
            config.parser.strict_object_type = parse_bool(STRICT_OBJECT_TYPE_VAR, &value)?;
        }
        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        ClientConfig::DEFAULT.response
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ClientConfig::DEFAULT.parser
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

/// Snapshot of the process-wide configuration.
pub fn global() -> ClientConfig {
    GLOBAL
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Replace the process-wide configuration.
pub fn set_global(config: ClientConfig) {
    *GLOBAL
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = config;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_nested_response() {
        let config = ClientConfig::default();
        assert!(config.response.nested_response);
        assert!(!config.parser.strict_object_type);
    }

    #[test]
    fn from_json_fills_missing_sections() {
        let config = ClientConfig::from_json(r#"{"response":{"nestedResponse":false}}"#).unwrap();
        assert!(!config.response.nested_response);
        assert!(!config.parser.strict_object_type);

        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn from_json_rejects_garbage() {
        let err = ClientConfig::from_json("nested").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ClientConfig::from_lookup(|var| match var {
            NESTED_RESPONSE_VAR => Some("0".to_string()),
            STRICT_OBJECT_TYPE_VAR => Some(" TRUE ".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(!config.response.nested_response);
        assert!(config.parser.strict_object_type);
    }

    #[test]
    fn env_rejects_non_boolean() {
        let err = ClientConfig::from_lookup(|var| {
            (var == NESTED_RESPONSE_VAR).then(|| "maybe".to_string())
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidBool { var: NESTED_RESPONSE_VAR, .. }
        ));
    }
}
