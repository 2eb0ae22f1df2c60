// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde attributes cannot express: non-zero
//! ceilings and durations, tier ordering, and value ranges.

use crate::diagnostic::ConfigError;
use crate::model::QuillConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &QuillConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.app.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "app.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.app.log_level
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    let quota = &config.quota;
    if quota.free_limit == 0 {
        errors.push(ConfigError::validation("quota.free_limit must be at least 1"));
    }
    if quota.premium_limit < quota.free_limit {
        errors.push(ConfigError::validation(format!(
            "quota.premium_limit ({}) must not be lower than quota.free_limit ({})",
            quota.premium_limit, quota.free_limit
        )));
    }
    if quota.window_secs == 0 {
        errors.push(ConfigError::validation("quota.window_secs must be at least 1"));
    }

    let completion = &config.completion;
    if completion.model.trim().is_empty() {
        errors.push(ConfigError::validation("completion.model must not be empty"));
    }
    if completion.max_tokens == 0 {
        errors.push(ConfigError::validation("completion.max_tokens must be at least 1"));
    }
    if !(0.0..=1.0).contains(&completion.temperature) {
        errors.push(ConfigError::validation(format!(
            "completion.temperature must be between 0.0 and 1.0, got {}",
            completion.temperature
        )));
    }
    if completion.timeout_secs == 0 {
        errors.push(ConfigError::validation("completion.timeout_secs must be at least 1"));
    }
    if let Some(url) = &completion.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ConfigError::validation(format!(
            "completion.base_url must be an http(s) URL, got `{url}`"
        )));
    }

    if config.enhance.max_content_chars == 0 {
        errors.push(ConfigError::validation("enhance.max_content_chars must be at least 1"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
