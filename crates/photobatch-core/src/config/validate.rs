//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

/// Check a JPEG quality value is in 1..=100.
pub(crate) fn check_quality(quality: u8) -> Result<(), ConfigError> {
    if !(1..=100).contains(&quality) {
        return Err(ConfigError::ValidationError(format!(
            "quality must be between 1 and 100 (got {quality})"
        )));
    }
    Ok(())
}

/// Check both bounding-box sides are positive.
pub(crate) fn check_bounding_box(width: u32, height: u32) -> Result<(), ConfigError> {
    if width == 0 || height == 0 {
        return Err(ConfigError::ValidationError(format!(
            "bounding box must be positive (got {width}x{height})"
        )));
    }
    Ok(())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.supported_formats must not be empty".into(),
            ));
        }
        check_bounding_box(self.resize.max_width, self.resize.max_height)?;
        check_quality(self.output.quality)?;
        if self.output.dir_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "output.dir_name must not be empty".into(),
            ));
        }
        if !self.output.extension.starts_with('.') || self.output.extension.len() < 2 {
            return Err(ConfigError::ValidationError(
                "output.extension must look like \".jpg\"".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.pipeline.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.buffer_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_quality() {
        let mut config = Config::default();
        config.output.quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn test_validate_rejects_quality_above_100() {
        let mut config = Config::default();
        config.output.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_box_side() {
        let mut config = Config::default();
        config.resize.max_height = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bounding box"));
    }

    #[test]
    fn test_validate_rejects_bad_extension() {
        let mut config = Config::default();
        config.output.extension = "jpg".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output.extension"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.decode_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decode_timeout_ms"));
    }

    #[test]
    fn test_quality_bounds_are_inclusive() {
        assert!(check_quality(1).is_ok());
        assert!(check_quality(100).is_ok());
        assert!(check_quality(0).is_err());
    }
}
