//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits and timeouts > 0, address is `host:port`)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Host names are not resolved here; binding reports unknown hosts

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a host:port address")]
    InvalidBindAddress(String),
    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,
    #[error("handler.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,
    #[error("logging.filter must not be empty")]
    EmptyLogFilter,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_bind_address(&config.listener.bind_address) {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }
    if config.handler.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.logging.filter.trim().is_empty() {
        errors.push(ValidationError::EmptyLogFilter);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A socket address, or a host name followed by a numeric port.
fn is_bind_address(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "localhost".to_string();
        config.listener.max_connections = 0;
        config.handler.request_timeout_secs = 0;
        config.logging.filter = "  ".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidBindAddress("localhost".to_string()),
                ValidationError::ZeroConnections,
                ValidationError::ZeroRequestTimeout,
                ValidationError::EmptyLogFilter,
            ]
        );
    }

    #[test]
    fn ipv6_addresses_are_accepted() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "[::1]:3000".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn host_names_are_accepted() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "localhost:3000".to_string();
        assert!(validate_config(&config).is_ok());

        for bad in ["localhost:", ":3000", "localhost:http", "::1:3000"] {
            config.listener.bind_address = bad.to_string();
            assert_eq!(
                validate_config(&config),
                Err(vec![ValidationError::InvalidBindAddress(bad.to_string())])
            );
        }
    }
}
