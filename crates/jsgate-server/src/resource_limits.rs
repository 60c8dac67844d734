//! Resource limits for handler execution.

use std::time::Duration;

/// Limits applied around each handler invocation.
///
/// The timeout covers the whole invoke step, including any script-initiated
/// `gFetch`. The engine offers no memory limiting; only wall-clock time is
/// enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    pub execution_timeout: Duration,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            execution_timeout: Duration::from_secs(30),
        }
    }
}

impl ResourceLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    /// Reject configurations the server should not run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.execution_timeout.is_zero() {
            return Err("execution timeout must be greater than zero".to_string());
        }

        if self.execution_timeout.as_secs() > 3600 {
            return Err(format!(
                "execution timeout must be <= 1 hour (got {} seconds)",
                self.execution_timeout.as_secs()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(ResourceLimits::default().execution_timeout.as_secs(), 30);
    }

    #[test]
    fn test_with_execution_timeout() {
        let limits = ResourceLimits::new().with_execution_timeout(Duration::from_millis(5500));
        assert_eq!(limits.execution_timeout.as_millis(), 5500);
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let limits = ResourceLimits::new().with_execution_timeout(Duration::ZERO);
        assert!(limits.validate().unwrap_err().contains("greater than zero"));
    }

    #[test]
    fn test_validate_excessive_timeout_fails() {
        let limits = ResourceLimits::new().with_execution_timeout(Duration::from_secs(7200));
        assert!(limits.validate().unwrap_err().contains("1 hour"));
    }

    #[test]
    fn test_validate_default_passes() {
        assert!(ResourceLimits::default().validate().is_ok());
    }
}
