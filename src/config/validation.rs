//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate mounts, target hosts, headers and timeouts per rule
//! - Detect conflicting mounts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, RuleConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no forwarding rules configured")]
    NoRules,

    #[error("rule '{rule}': mount '{mount}' must start with '/' and not end with '/'")]
    InvalidMount { rule: String, mount: String },

    #[error("rule '{rule}': mount '{mount}' is already used")]
    DuplicateMount { rule: String, mount: String },

    #[error("rule '{rule}': target_host '{target_host}' is not an absolute http URL")]
    InvalidTargetHost { rule: String, target_host: String },

    #[error("rule '{rule}': invalid header '{header}'")]
    InvalidHeader { rule: String, header: String },

    #[error("rule '{rule}': timeout_secs must be greater than 0")]
    ZeroTimeout { rule: String },

    #[error("invalid address '{0}'")]
    InvalidAddress(String),
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.rules.is_empty() {
        errors.push(ValidationError::NoRules);
    }

    let mut mounts = HashSet::new();
    for rule in &config.rules {
        validate_rule(rule, &mut errors);
        if !mounts.insert(rule.mount.as_str()) {
            errors.push(ValidationError::DuplicateMount {
                rule: rule.name.clone(),
                mount: rule.mount.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_rule(rule: &RuleConfig, errors: &mut Vec<ValidationError>) {
    let mount = &rule.mount;
    if !mount.starts_with('/') || (mount.len() > 1 && mount.ends_with('/')) {
        errors.push(ValidationError::InvalidMount {
            rule: rule.name.clone(),
            mount: mount.clone(),
        });
    }

    let valid_host = Url::parse(&rule.target_host)
        .map(|url| url.scheme() == "http" && url.has_host())
        .unwrap_or(false);
    if !valid_host {
        errors.push(ValidationError::InvalidTargetHost {
            rule: rule.name.clone(),
            target_host: rule.target_host.clone(),
        });
    }

    if let Err(err) = rule.header_map() {
        errors.push(err);
    }

    if rule.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout {
            rule: rule.name.clone(),
        });
    }
}
