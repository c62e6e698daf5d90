use crate::error::{Result, ServiceError};
use lockbox_core::codegen::validate_code_length;
use lockbox_core::constants::{
    DEFAULT_CODE_LENGTH, DEFAULT_MAX_GENERATION_ATTEMPTS, DEFAULT_PROVIDER_TIMEOUT_MS,
    DEFAULT_RESYNC_BATCH_SIZE, DEFAULT_SWEEP_INTERVAL_SECS, MAX_PROVIDER_TIMEOUT_MS,
    MIN_PROVIDER_TIMEOUT_MS,
};
use std::time::Duration;

/// Minimum age of a pending code before the sweep retries it, so a sweep
/// never races the issuance that is still pushing the code.
pub const DEFAULT_RESYNC_MIN_AGE: Duration = Duration::from_secs(60);

/// Orchestrator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Digits per generated code.
    pub code_length: usize,

    /// Generation attempts before `CodeSpaceExhausted`.
    pub max_generation_attempts: u32,

    /// Deadline for every adapter call.
    pub provider_timeout: Duration,

    pub resync_min_age: Duration,
    pub resync_batch_size: u32,
    pub sweep_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            resync_min_age: DEFAULT_RESYNC_MIN_AGE,
            resync_batch_size: DEFAULT_RESYNC_BATCH_SIZE,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl ServiceConfig {
    pub fn code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    pub fn max_generation_attempts(mut self, attempts: u32) -> Self {
        self.max_generation_attempts = attempts;
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn resync_min_age(mut self, age: Duration) -> Self {
        self.resync_min_age = age;
        self
    }

    pub fn resync_batch_size(mut self, size: u32) -> Self {
        self.resync_batch_size = size;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Reject settings the service cannot run with.
    ///
    /// # Errors
    /// `ServiceError::Invalid` for a bad code length, `Configuration` for the rest.
    pub fn validate(&self) -> Result<()> {
        validate_code_length(self.code_length)?;

        if self.max_generation_attempts == 0 {
            return Err(ServiceError::Configuration(
                "max_generation_attempts must be at least 1".to_string(),
            ));
        }

        let timeout_ms = self.provider_timeout.as_millis();
        if !(u128::from(MIN_PROVIDER_TIMEOUT_MS)..=u128::from(MAX_PROVIDER_TIMEOUT_MS))
            .contains(&timeout_ms)
        {
            return Err(ServiceError::Configuration(format!(
                "provider_timeout must be between {MIN_PROVIDER_TIMEOUT_MS}ms and {MAX_PROVIDER_TIMEOUT_MS}ms, got {timeout_ms}ms"
            )));
        }

        if self.resync_batch_size == 0 || self.sweep_interval.is_zero() {
            return Err(ServiceError::Configuration(
                "sweep interval and resync batch size must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn provider_timeout_ms(&self) -> u64 {
        u64::try_from(self.provider_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.code_length, 6);
        assert_eq!(config.provider_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(ServiceConfig::default().code_length(3).validate().is_err());
        assert!(
            ServiceConfig::default()
                .max_generation_attempts(0)
                .validate()
                .is_err()
        );
        assert!(
            ServiceConfig::default()
                .provider_timeout(Duration::from_secs(60))
                .validate()
                .is_err()
        );
        assert!(
            ServiceConfig::default()
                .provider_timeout(Duration::from_millis(50))
                .validate()
                .is_ok()
        );
    }
}
