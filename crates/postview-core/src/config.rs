use std::env;

use crate::error::ConfigError;

pub const API_URL_ENV: &str = "POSTVIEW_API_URL";
pub const IMAGE_SIZE_ENV: &str = "POSTVIEW_IMAGE_SIZE";

pub const DEFAULT_API_BASE: &str = "https://tron-legacy-api.onrender.com";
pub const DEFAULT_IMAGE_SIZE: &str = "card";
pub const DEFAULT_MAX_INPUT_BYTES: usize = 2_000_000;
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Settings threaded through every pipeline stage.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PipelineConfig {
    api_base: String,
    image_size: String,
    limits: RepairLimits,
}

/// Bounds on what the repair stage is willing to parse.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RepairLimits {
    pub max_input_bytes: usize,
    pub max_depth: usize,
}

impl Default for RepairLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl PipelineConfig {
    pub fn new(api_base: &str) -> Result<Self, ConfigError> {
        Self::default().with_api_base(api_base)
    }

    /// Reads `POSTVIEW_API_URL` and `POSTVIEW_IMAGE_SIZE`, keeping defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(base) = env::var(API_URL_ENV) {
            config = config.with_api_base(&base)?;
        }
        if let Ok(size) = env::var(IMAGE_SIZE_ENV) {
            config = config.with_image_size(&size)?;
        }
        Ok(config)
    }

    pub fn with_api_base(mut self, api_base: &str) -> Result<Self, ConfigError> {
        let trimmed = api_base.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidApiBase(api_base.to_string()));
        }
        self.api_base = trimmed.to_string();
        Ok(self)
    }

    pub fn with_image_size(mut self, size: &str) -> Result<Self, ConfigError> {
        let valid = !size.is_empty()
            && size
                .bytes()
                .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_');
        if !valid {
            return Err(ConfigError::InvalidImageSize(size.to_string()));
        }
        self.image_size = size.to_string();
        Ok(self)
    }

    pub fn with_limits(mut self, limits: RepairLimits) -> Self {
        self.limits = limits;
        self
    }

    /// API origin without a trailing slash.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn image_size(&self) -> &str {
        &self.image_size
    }

    pub fn limits(&self) -> RepairLimits {
        self.limits
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            limits: RepairLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_drops_trailing_slash() {
        let config = PipelineConfig::new("https://api.example.com/").expect("valid base");
        assert_eq!(config.api_base(), "https://api.example.com");
    }

    #[test]
    fn api_base_rejects_relative_urls() {
        let err = PipelineConfig::new("/api").expect_err("relative base");
        assert_eq!(err, ConfigError::InvalidApiBase("/api".to_string()));
    }

    #[test]
    fn image_size_rejects_query_characters() {
        let err = PipelineConfig::default()
            .with_image_size("card&x=1")
            .expect_err("bad size");
        assert!(matches!(err, ConfigError::InvalidImageSize(_)));
    }
}
