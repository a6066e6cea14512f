//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multiplier >= 1.0)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WithdrawConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;

use crate::config::schema::WithdrawConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WithdrawConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let chain = &config.blockchain;

    if chain.rpc_url.trim().is_empty() {
        errors.push(ValidationError::new("blockchain.rpc_url", "must not be empty"));
    } else if chain.rpc_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::new("blockchain.rpc_url", "is not a valid URL"));
    }

    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "blockchain.rpc_timeout_secs",
            "must be greater than 0",
        ));
    }

    if chain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "blockchain.confirmation_timeout_secs",
            "must be greater than 0",
        ));
    }

    if chain.gas_price_multiplier < 1.0 {
        errors.push(ValidationError::new(
            "blockchain.gas_price_multiplier",
            "must be at least 1.0",
        ));
    }

    if chain.withdraw_gas_limit == 0 {
        errors.push(ValidationError::new(
            "blockchain.withdraw_gas_limit",
            "must be greater than 0",
        ));
    }

    match config.escrow.contract_address.parse::<Address>() {
        Ok(addr) if addr == Address::ZERO => errors.push(ValidationError::new(
            "escrow.contract_address",
            "must not be the zero address",
        )),
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::new(
            "escrow.contract_address",
            "is not a valid address",
        )),
    }

    if config.ledger.path.trim().is_empty() {
        errors.push(ValidationError::new("ledger.path", "must not be empty"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&WithdrawConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = WithdrawConfig::default();
        config.blockchain.rpc_url = String::new();
        config.blockchain.gas_price_multiplier = 0.5;
        config.escrow.contract_address = "not-an-address".to_string();
        config.retries.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "blockchain.rpc_url",
                "blockchain.gas_price_multiplier",
                "escrow.contract_address",
                "retries.max_attempts",
            ]
        );
    }

    #[test]
    fn test_zero_escrow_address_rejected() {
        let mut config = WithdrawConfig::default();
        config.escrow.contract_address = Address::ZERO.to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].to_string(), "escrow.contract_address: must not be the zero address");
    }

    #[test]
    fn test_backoff_bounds_checked() {
        let mut config = WithdrawConfig::default();
        config.retries.base_delay_ms = 5000;
        config.retries.max_delay_ms = 100;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "retries.base_delay_ms");
    }
}
