//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("operator.uid is required")]
    MissingOperator,
    #[error("lock.default_nickname must not be empty")]
    EmptyDefaultNickname,
    #[error("lock.violation_threshold must be at least 1")]
    ZeroThreshold,
    #[error("lock.cooldown_secs must be at least 1")]
    ZeroCooldown,
    #[error("lock.pacing_min_ms ({min}) must be below lock.pacing_max_ms ({max})")]
    InvalidPacingRange { min: u64, max: u64 },
    #[error("maintenance.{0} must be at least 1")]
    ZeroInterval(&'static str),
    #[error("platform.bridge_addr is required")]
    MissingBridgeAddr,
    #[error("platform.event_buffer must be at least 1")]
    ZeroEventBuffer,
    #[error("session.path parent directory does not exist: {0}")]
    SessionPathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.operator.uid.trim().is_empty() {
        errors.push(ValidationError::MissingOperator);
    }

    let lock = &config.lock;
    if lock.default_nickname.is_empty() {
        errors.push(ValidationError::EmptyDefaultNickname);
    }
    if lock.violation_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold);
    }
    if lock.cooldown_secs == 0 {
        errors.push(ValidationError::ZeroCooldown);
    }
    if lock.pacing_min_ms >= lock.pacing_max_ms {
        errors.push(ValidationError::InvalidPacingRange {
            min: lock.pacing_min_ms,
            max: lock.pacing_max_ms,
        });
    }

    // tokio intervals panic on a zero period
    if config.maintenance.keepalive_secs == 0 {
        errors.push(ValidationError::ZeroInterval("keepalive_secs"));
    }
    if config.maintenance.backup_secs == 0 {
        errors.push(ValidationError::ZeroInterval("backup_secs"));
    }

    if config.platform.bridge_addr.trim().is_empty() {
        errors.push(ValidationError::MissingBridgeAddr);
    }
    if config.platform.event_buffer == 0 {
        errors.push(ValidationError::ZeroEventBuffer);
    }

    if let Some(parent) = config.session.path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::SessionPathInvalid(
            config.session.path.display().to_string(),
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

    fn minimal_valid_config() -> String {
        r#"
[operator]
uid = "61578631626802"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_operator_fails() {
        let config: Config = toml::from_str("[operator]\nuid = \"  \"\n").unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingOperator)));
    }

    #[test]
    fn test_inverted_pacing_range_fails() {
        let toml = r#"
[operator]
uid = "op"

[lock]
pacing_min_ms = 3200
pacing_max_ms = 1800
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidPacingRange { min: 3200, max: 1800 }
        )));
    }

    #[test]
    fn test_reports_every_problem() {
        let toml = r#"
[operator]
uid = ""

[lock]
default_nickname = ""
violation_threshold = 0

[maintenance]
keepalive_secs = 0

[session]
path = "/definitely/not/a/real/dir/appstate.json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::SessionPathInvalid(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroInterval("keepalive_secs"))));
    }
}
