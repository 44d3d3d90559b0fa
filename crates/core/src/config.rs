//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the generator. The builder never reads environment variables while handling a
//! request, which keeps concurrent requests and test harnesses independent of process state.

use crate::constants::{
    DEFAULT_ENHANCEMENT_TIMEOUT_MS, DEFAULT_HL7_VERSION, DEFAULT_RECEIVING_APPLICATION,
    DEFAULT_RECEIVING_FACILITY, DEFAULT_SENDING_APPLICATION_PREFIX,
};
use crate::{GenerationError, GenerationResult};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    sending_application_prefix: String,
    receiving_application: String,
    receiving_facility: String,
    hl7_version: String,
    enhancement_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidInput`] if any identifier is blank or the
    /// enhancement timeout is zero.
    pub fn new(
        sending_application_prefix: String,
        receiving_application: String,
        receiving_facility: String,
        hl7_version: String,
        enhancement_timeout: Duration,
    ) -> GenerationResult<Self> {
        for (name, value) in [
            ("sending_application_prefix", &sending_application_prefix),
            ("receiving_application", &receiving_application),
            ("receiving_facility", &receiving_facility),
            ("hl7_version", &hl7_version),
        ] {
            if value.trim().is_empty() {
                return Err(GenerationError::InvalidInput(format!(
                    "{name} cannot be empty"
                )));
            }
        }

        if enhancement_timeout.is_zero() {
            return Err(GenerationError::InvalidInput(
                "enhancement timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            sending_application_prefix,
            receiving_application,
            receiving_facility,
            hl7_version,
            enhancement_timeout,
        })
    }

    pub fn sending_application_prefix(&self) -> &str {
        &self.sending_application_prefix
    }

    pub fn receiving_application(&self) -> &str {
        &self.receiving_application
    }

    pub fn receiving_facility(&self) -> &str {
        &self.receiving_facility
    }

    pub fn hl7_version(&self) -> &str {
        &self.hl7_version
    }

    pub fn enhancement_timeout(&self) -> Duration {
        self.enhancement_timeout
    }

    /// Returns a copy with a different enhancement budget.
    pub fn with_enhancement_timeout(mut self, timeout: Duration) -> GenerationResult<Self> {
        if timeout.is_zero() {
            return Err(GenerationError::InvalidInput(
                "enhancement timeout must be greater than zero".into(),
            ));
        }
        self.enhancement_timeout = timeout;
        Ok(self)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            sending_application_prefix: DEFAULT_SENDING_APPLICATION_PREFIX.into(),
            receiving_application: DEFAULT_RECEIVING_APPLICATION.into(),
            receiving_facility: DEFAULT_RECEIVING_FACILITY.into(),
            hl7_version: DEFAULT_HL7_VERSION.into(),
            enhancement_timeout: Duration::from_millis(DEFAULT_ENHANCEMENT_TIMEOUT_MS),
        }
    }
}

/// Environment variable for the MSH.3 prefix.
pub const SENDING_APPLICATION_ENV: &str = "SYNTGEN_SENDING_APPLICATION";
/// Environment variable for MSH.5.
pub const RECEIVING_APPLICATION_ENV: &str = "SYNTGEN_RECEIVING_APPLICATION";
/// Environment variable for MSH.6.
pub const RECEIVING_FACILITY_ENV: &str = "SYNTGEN_RECEIVING_FACILITY";
/// Environment variable for the per-message enhancement budget, in milliseconds.
pub const ENHANCEMENT_TIMEOUT_ENV: &str = "SYNTGEN_ENHANCEMENT_TIMEOUT_MS";

impl CoreConfig {
    /// Resolve a config from `lookup`, usually `|key| std::env::var(key).ok()`.
    ///
    /// Every front end builds its config here so they all produce the same MSH header.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidInput`] if the timeout value is not a positive
    /// whole number of milliseconds.
    pub fn from_env_values(lookup: impl Fn(&str) -> Option<String>) -> GenerationResult<Self> {
        Self::new(
            identifier_from_env_value(
                lookup(SENDING_APPLICATION_ENV),
                DEFAULT_SENDING_APPLICATION_PREFIX,
            ),
            identifier_from_env_value(
                lookup(RECEIVING_APPLICATION_ENV),
                DEFAULT_RECEIVING_APPLICATION,
            ),
            identifier_from_env_value(lookup(RECEIVING_FACILITY_ENV), DEFAULT_RECEIVING_FACILITY),
            DEFAULT_HL7_VERSION.into(),
            enhancement_timeout_from_env_value(lookup(ENHANCEMENT_TIMEOUT_ENV))?,
        )
    }
}

/// Parse the enhancement timeout (milliseconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default budget.
pub fn enhancement_timeout_from_env_value(value: Option<String>) -> GenerationResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let millis = match value {
        Some(v) => v.parse::<u64>().map_err(|_| {
            GenerationError::InvalidInput(format!(
                "enhancement timeout must be a whole number of milliseconds, got '{v}'"
            ))
        })?,
        None => DEFAULT_ENHANCEMENT_TIMEOUT_MS,
    };

    if millis == 0 {
        return Err(GenerationError::InvalidInput(
            "enhancement timeout must be greater than zero".into(),
        ));
    }

    Ok(Duration::from_millis(millis))
}

/// Parse an optional identifier value, falling back to `default` when absent or blank.
pub fn identifier_from_env_value(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
