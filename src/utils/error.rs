use thiserror::Error;

use crate::driver::DriverError;
use crate::notifiers::NotifyError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_driver_error_display() {
        let err = AppError::Driver(DriverError::ElementNotFound {
            selector: ".price".to_string(),
        });
        assert_eq!(err.to_string(), "Driver error: element not found: .price");
    }

    #[test]
    fn test_config_error_display() {
        let err = AppError::Config("item \"mouse\" has an invalid url".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: item \"mouse\" has an invalid url"
        );
    }
}
