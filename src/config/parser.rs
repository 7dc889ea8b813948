use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::ProbeError;
use super::paths::{ensure_outputs, PathResolver};
use super::schema::CONFIG_SCHEMA;
use super::types::{OutputPaths, ProbeConfig, RuntimePolicy};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

pub async fn parse_config(path: &Path) -> Result<ProbeConfig, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(ProbeError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

/// Parse JSON or YAML config text. YAML is a superset of JSON, so one
/// parser handles both.
pub fn parse_config_str(content: &str) -> Result<ProbeConfig, ProbeError> {
    let yaml: serde_yaml::Value = if content.trim().is_empty() {
        serde_yaml::Value::Mapping(Default::default())
    } else {
        serde_yaml::from_str(content)?
    };

    // JSON Schema validation
    validate_schema(&yaml)?;

    // Parse into typed config
    let config: ProbeConfig = serde_yaml::from_value(yaml)?;

    config.policy.validate()?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), ProbeError> {
    // Convert YAML value to JSON for schema validation
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| ProbeError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| ProbeError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| ProbeError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        let messages: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        // Advisory: typed parsing and policy validation are authoritative
        for msg in &messages {
            warn!(validation_error = %msg, "Config schema warning");
        }
    }

    Ok(())
}

/// Policy and resolved output paths ready for a scan.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub policy: RuntimePolicy,
    pub paths: OutputPaths,
    pub source: Option<PathBuf>,
}

/// Load the config (explicit path, else `config.json` in the working
/// directory if present, else built-in defaults), resolve output paths and
/// make sure the output files exist.
///
/// Relative output names resolve against `output_dir` when given, otherwise
/// against the config file's directory.
pub async fn load_config(
    config_path: Option<&Path>,
    output_dir: Option<&Path>,
) -> Result<LoadedConfig, ProbeError> {
    let source = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            fallback.exists().then_some(fallback)
        }
    };

    let config = match &source {
        Some(path) => parse_config(path).await?,
        None => {
            debug!("No config file found, using defaults");
            ProbeConfig::default()
        }
    };

    let base_dir = match (output_dir, &source) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(path)) => path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        (None, None) => PathBuf::from("."),
    };

    let resolver = PathResolver::new(&base_dir)?;
    let paths = resolver.resolve_outputs(&config);
    ensure_outputs(&paths).await?;

    for (key, path) in [
        ("output_log_file", &paths.output_log_file),
        ("output_json_file", &paths.output_json_file),
        ("output_html_file", &paths.output_html_file),
        ("resume_file", &paths.resume_file),
    ] {
        debug!(key, path = %path.display(), "Resolved output path");
    }

    Ok(LoadedConfig { policy: config.policy, paths, source })
}
