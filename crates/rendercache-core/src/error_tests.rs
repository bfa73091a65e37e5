//! Tests for error codes and recoverability.

use crate::config::ConfigError;
use crate::error::Error;

#[test]
fn test_error_codes() {
    let config_err = Error::Config(ConfigError::ParseError("bad toml".to_string()));
    assert_eq!(config_err.code(), "RCACHE-001");

    let internal_err = Error::Internal("invariant broken".to_string());
    assert_eq!(internal_err.code(), "RCACHE-002");
}

#[test]
fn test_error_messages_carry_codes() {
    let err = Error::Internal("size mismatch".to_string());
    assert!(err.to_string().starts_with("[RCACHE-002]"));
}

#[test]
fn test_recoverability() {
    let config_err = Error::Config(ConfigError::ParseError("bad toml".to_string()));
    assert!(config_err.is_recoverable());

    let internal_err = Error::Internal("invariant broken".to_string());
    assert!(!internal_err.is_recoverable());
}
