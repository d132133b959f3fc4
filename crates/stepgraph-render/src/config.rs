// Copyright 2025 DataStax Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::path::Path;

use error_stack::{Report, ResultExt as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file")]
    Read,
    #[error("Invalid configuration")]
    Invalid,
}

type Result<T> = std::result::Result<T, Report<ConfigError>>;

/// Serialization format of the rendered step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Settings for rendering a flow into a step list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RenderConfig {
    /// Language tag attached to every rendered step.
    pub language: String,
    /// Name the engine calls in each step's source. When unset, functions
    /// keep their own names. Only the definition is renamed; a function that
    /// refers to its own name gets a trailing `<name> = <entrypoint>` alias.
    pub entrypoint: Option<String>,
    pub format: OutputFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            language: "python3".to_string(),
            entrypoint: Some("main".to_string()),
            format: OutputFormat::Yaml,
        }
    }
}

impl RenderConfig {
    /// Load a configuration from a YAML file, or JSON if the extension is `.json`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .change_context(ConfigError::Read)
            .attach_printable_lazy(|| format!("path: {}", path.display()))?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents).change_context(ConfigError::Invalid),
            _ => serde_yaml_ng::from_str(&contents).change_context(ConfigError::Invalid),
        }
        .attach_printable_lazy(|| format!("path: {}", path.display()))?;

        log::debug!("Loaded render configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.language, "python3");
        assert_eq!(config.entrypoint.as_deref(), Some("main"));
        assert_eq!(config.format, OutputFormat::Yaml);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: RenderConfig = serde_yaml_ng::from_str("format: json\nentrypoint: null").unwrap();
        assert_eq!(config.language, "python3");
        assert_eq!(config.entrypoint, None);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "language: python3.11\nentrypoint: run").unwrap();

        let config = RenderConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.language, "python3.11");
        assert_eq!(config.entrypoint.as_deref(), Some("run"));
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"format": "json"}}"#).unwrap();

        let config = RenderConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_errors() {
        let err = RenderConfig::load_from_file(Path::new("/nonexistent/render.yaml")).unwrap_err();
        assert!(matches!(err.current_context(), ConfigError::Read));

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "language: [unclosed").unwrap();
        let err = RenderConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err.current_context(), ConfigError::Invalid));

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "lang: python3").unwrap();
        let err = RenderConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err.current_context(), ConfigError::Invalid));
    }
}
