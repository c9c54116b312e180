//! Runtime configuration.
//!
//! Every field has a default. [`Config::from_env`] overrides fields from
//! `MATCHTAG_*` environment variables; [`Config::from_lookup`] does the same
//! from any key lookup, which keeps tests away from the process environment.
//!
//! # Example
//!
//! ```
//! use matchtag::config::Config;
//!
//! let config = Config::from_lookup(|key| match key {
//!     "MATCHTAG_COACH_ID" => Some("coach-7".to_string()),
//!     "MATCHTAG_RECOVERY_MAX_SECS" => Some("1800".to_string()),
//!     _ => None,
//! })
//! .unwrap_or_default();
//!
//! assert_eq!(config.coach_id, "coach-7");
//! assert_eq!(config.pairing.max_recovery_secs, 1800.0);
//! assert_eq!(config.suggestions.min_confidence, 0.7);
//! ```

use crate::analytics::temporal::PairingConfig;
use crate::suggestions::SuggestionConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Complete configuration for a coach or viewer process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Key of the coach's document
    pub coach_id: String,
    /// Fallback `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Rows per page when loading history
    pub history_page_size: usize,
    /// Temporal pairing tunables
    pub pairing: PairingConfig,
    /// Suggestion pipeline tunables
    pub suggestions: SuggestionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coach_id: "coach".to_string(),
            log_filter: "info,matchtag=debug".to_string(),
            history_page_size: 1000,
            pairing: PairingConfig::default(),
            suggestions: SuggestionConfig::default(),
        }
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

impl Config {
    /// Load from `MATCHTAG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable does not parse or the result
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value does not parse or the result
    /// fails validation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        parsed(&lookup, "MATCHTAG_COACH_ID", &mut config.coach_id)?;
        parsed(&lookup, "MATCHTAG_LOG", &mut config.log_filter)?;
        parsed(&lookup, "MATCHTAG_HISTORY_PAGE_SIZE", &mut config.history_page_size)?;

        let pairing = &mut config.pairing;
        parsed(&lookup, "MATCHTAG_RECOVERY_MIN_SECS", &mut pairing.min_recovery_secs)?;
        parsed(&lookup, "MATCHTAG_RECOVERY_MAX_SECS", &mut pairing.max_recovery_secs)?;
        parsed(&lookup, "MATCHTAG_JITTER_SPREAD", &mut pairing.jitter_spread)?;
        parsed(&lookup, "MATCHTAG_MILLIS_THRESHOLD", &mut pairing.millis_threshold)?;

        let suggestions = &mut config.suggestions;
        parsed(&lookup, "MATCHTAG_MIN_CONFIDENCE", &mut suggestions.min_confidence)?;
        parsed(&lookup, "MATCHTAG_FOLLOW_UP_WINDOW_SECS", &mut suggestions.follow_up_window_secs)?;
        parsed(&lookup, "MATCHTAG_FEEDBACK_WINDOW", &mut suggestions.feedback_window)?;
        parsed(&lookup, "MATCHTAG_RECENT_TAGS", &mut suggestions.recent_tag_limit)?;
        parsed(&lookup, "MATCHTAG_DEDUP_WINDOW_SECS", &mut suggestions.dedup_window_secs)?;
        parsed(&lookup, "MATCHTAG_MODEL", &mut suggestions.model)?;
        parsed(&lookup, "MATCHTAG_MAX_TOKENS", &mut suggestions.max_tokens)?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.to_string()));

        if self.coach_id.trim().is_empty() {
            return fail("coach_id cannot be empty");
        }
        if self.history_page_size == 0 {
            return fail("history_page_size must be > 0");
        }
        if self.pairing.min_recovery_secs < 0.0
            || self.pairing.min_recovery_secs > self.pairing.max_recovery_secs
        {
            return fail("recovery bounds must satisfy 0 <= min <= max");
        }
        if self.pairing.jitter_spread < 0.0 {
            return fail("jitter_spread must be >= 0");
        }
        if !(0.0..=1.0).contains(&self.suggestions.min_confidence) {
            return fail("min_confidence must be between 0 and 1");
        }
        if self.suggestions.model.is_empty() {
            return fail("model cannot be empty");
        }
        if self.suggestions.max_tokens == 0 {
            return fail("max_tokens must be > 0");
        }
        Ok(())
    }
}
