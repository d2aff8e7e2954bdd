use super::{types::Config, ConfigError};

/// Sanity-check a loaded configuration before wiring anything up.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.pipeline.input_extension.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "pipeline.input_extension must not be empty".to_string(),
        ));
    }
    if config.pipeline.segment_duration_ms == 0 {
        return Err(ConfigError::Invalid(
            "pipeline.segment_duration_ms must be greater than zero".to_string(),
        ));
    }
    if config.pipeline.keyframe_interval == 0 {
        return Err(ConfigError::Invalid(
            "pipeline.keyframe_interval must be greater than zero".to_string(),
        ));
    }
    if config.paths.source_root == config.paths.dest_root {
        return Err(ConfigError::Invalid(
            "paths.source_root and paths.dest_root must differ".to_string(),
        ));
    }
    if config.paths.processed_root.starts_with(&config.paths.source_root) {
        return Err(ConfigError::Invalid(
            "paths.processed_root must be outside paths.source_root, \
             or relocated files would be re-detected"
                .to_string(),
        ));
    }
    Ok(())
}
