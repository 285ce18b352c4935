//! Generator configuration loaded from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::emitter::LineEnding;
use crate::error::ScriptContextError;
use crate::manifest::DEFAULT_MANIFEST_NAMESPACE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Namespace URI of `ScriptParameter` elements; empty for unqualified manifests.
    pub manifest_namespace: String,
    /// One level of indentation in the generated code.
    pub indent: String,
    pub line_ending: LineEnding,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            manifest_namespace: DEFAULT_MANIFEST_NAMESPACE.to_string(),
            indent: "\t".to_string(),
            line_ending: LineEnding::Lf,
        }
    }
}

impl GeneratorConfig {
    /// Parses and validates a JSON config. Missing keys keep their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, ScriptContextError> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ScriptContextError::ConfigError(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScriptContextError> {
        let path = path.as_ref();
        let input = fs::read_to_string(path).map_err(|e| {
            ScriptContextError::ConfigError(format!(
                "failed to read config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&input)
    }

    pub fn validate(&self) -> Result<(), ScriptContextError> {
        if self.indent.is_empty() || !self.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(ScriptContextError::ConfigError(format!(
                "indent must be one or more spaces or tabs, found {:?}",
                self.indent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::GeneratorConfig;
    use crate::emitter::LineEnding;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = GeneratorConfig::from_json_str(r#"{ "line_ending": "crlf" }"#).unwrap();
        assert_eq!(config.line_ending, LineEnding::CrLf);
        assert_eq!(config.indent, "\t");
        assert_eq!(
            config.manifest_namespace,
            "http://www.skyline.be/automation"
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = GeneratorConfig::from_json_str(r#"{ "indentation": "  " }"#).unwrap_err();
        assert!(err.to_string().contains("unknown field `indentation`"));
    }

    #[test]
    fn rejects_non_whitespace_indent() {
        let err = GeneratorConfig::from_json_str(r#"{ "indent": "--" }"#).unwrap_err();
        assert!(err
            .to_string()
            .contains("indent must be one or more spaces or tabs"));

        let err = GeneratorConfig::from_json_str(r#"{ "indent": "" }"#).unwrap_err();
        assert!(err.to_string().starts_with("config error:"));
    }

    #[test]
    fn reports_unreadable_config_path() {
        let err = GeneratorConfig::from_path("/nonexistent/script-context.json").unwrap_err();
        assert!(err
            .to_string()
            .contains("failed to read config '/nonexistent/script-context.json'"));
    }
}
