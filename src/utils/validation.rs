use crate::utils::error::{IntakeError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str, schemes: &[&str]) -> Result<()> {
    if url_str.is_empty() {
        return Err(IntakeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) if schemes.contains(&url.scheme()) => Ok(()),
        Ok(url) => Err(IntakeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!(
                "Unsupported URL scheme: {}. Expected one of: {}",
                url.scheme(),
                schemes.join(", ")
            ),
        }),
        Err(e) => Err(IntakeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(IntakeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(IntakeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IntakeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Checks that an argv list has a program to run.
pub fn validate_command(field_name: &str, argv: &[String]) -> Result<()> {
    match argv.first() {
        Some(program) => validate_non_empty_string(field_name, program),
        None => Err(IntakeError::MissingConfig {
            field: field_name.to_string(),
        }),
    }
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(IntakeError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        let amqp = ["amqp", "amqps"];
        assert!(validate_url("rabbitmq.server", "amqp://localhost", &amqp).is_ok());
        assert!(validate_url("rabbitmq.server", "amqps://mq.example.com:5671", &amqp).is_ok());
        assert!(validate_url("rabbitmq.server", "", &amqp).is_err());
        assert!(validate_url("rabbitmq.server", "localhost", &amqp).is_err());
        assert!(validate_url("rabbitmq.server", "http://localhost", &amqp).is_err());
    }

    #[test]
    fn test_validate_command() {
        assert!(validate_command("commands.install", &["npm".to_string()]).is_ok());
        assert!(validate_command("commands.install", &[]).is_err());
        assert!(validate_command("commands.install", &["  ".to_string()]).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("database.port", 5432u32, 1, 65535).is_ok());
        assert!(validate_range("database.port", 0u32, 1, 65535).is_err());
    }
}
