pub mod config;
pub mod csharp_codegen;
pub mod emitter;
pub mod error;
pub mod manifest;
pub mod mini_xml;
pub mod naming;
pub mod template;

use std::fs;
use std::path::Path;

pub use config::GeneratorConfig;
pub use csharp_codegen::generate_csharp;
pub use emitter::LineEnding;
pub use error::ScriptContextError;
pub use manifest::ParameterRecord;

/// Extracts `ScriptParameter` declarations using the default manifest namespace.
pub fn extract_parameters(input: &str) -> Result<Vec<ParameterRecord>, ScriptContextError> {
    extract_parameters_with_config(input, &GeneratorConfig::default())
}

pub fn extract_parameters_with_config(
    input: &str,
    config: &GeneratorConfig,
) -> Result<Vec<ParameterRecord>, ScriptContextError> {
    manifest::extract_parameters(input, &config.manifest_namespace)
}

/// Generates the C# `ScriptContext` class for a manifest with default settings.
pub fn generate_script_context(input: &str) -> Result<String, ScriptContextError> {
    generate_script_context_with_config(input, &GeneratorConfig::default())
}

pub fn generate_script_context_with_config(
    input: &str,
    config: &GeneratorConfig,
) -> Result<String, ScriptContextError> {
    config.validate()?;
    let params = extract_parameters_with_config(input, config)?;
    generate_csharp(&params, config)
}

/// Generates the C# `ScriptContext` class from a manifest file.
pub fn generate_script_context_from_path(
    path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<String, ScriptContextError> {
    let input = fs::read_to_string(path)?;
    generate_script_context_with_config(&input, config)
}

#[cfg(test)]
mod tests {
    use crate::{
        extract_parameters, generate_script_context, generate_script_context_from_path,
        generate_script_context_with_config, GeneratorConfig, LineEnding, ScriptContextError,
    };

    const MANIFEST: &str = r#"<DMSScript xmlns="http://www.skyline.be/automation">
  <Params>
    <ScriptParameter id="1" type="string"><Description>Element Name</Description></ScriptParameter>
    <ScriptParameter id="2" type="string"><Description>booking-id</Description></ScriptParameter>
  </Params>
</DMSScript>"#;

    #[test]
    fn extracts_in_document_order() {
        let params = extract_parameters(MANIFEST).unwrap();
        let ids: Vec<_> = params.iter().map(|p| p.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("1"), Some("2")]);
    }

    #[test]
    fn generates_members_for_every_parameter() {
        let rendered = generate_script_context(MANIFEST).unwrap();
        assert!(rendered.contains("ElementName = GetScriptParam(\"Element Name\").Single();"));
        assert!(rendered.contains("Booking_id = GetScriptParam(\"booking-id\").Single();"));
        assert!(rendered.contains("public string ElementName { get; }"));
        assert!(rendered.contains("public string Booking_id { get; }"));
    }

    #[test]
    fn config_controls_indent_and_line_endings() {
        let config = GeneratorConfig {
            indent: "  ".to_string(),
            line_ending: LineEnding::CrLf,
            ..GeneratorConfig::default()
        };
        let rendered = generate_script_context_with_config(MANIFEST, &config).unwrap();
        assert!(rendered.starts_with("namespace Skyline.DataMiner.Automation\r\n{\r\n  using System;\r\n"));
        assert!(!rendered.replace("\r\n", "").contains('\n'));
        assert!(!rendered.contains('\t'));
    }

    #[test]
    fn invalid_config_is_rejected_before_parsing() {
        let config = GeneratorConfig {
            indent: "x".to_string(),
            ..GeneratorConfig::default()
        };
        let err = generate_script_context_with_config("not xml <", &config).unwrap_err();
        assert!(matches!(err, ScriptContextError::ConfigError(_)));
    }

    #[test]
    fn generates_from_path_and_reports_missing_files() {
        let path = std::env::temp_dir().join(format!(
            "script_context_gen_lib_{}.xml",
            std::process::id()
        ));
        std::fs::write(&path, MANIFEST).unwrap();
        let from_path = generate_script_context_from_path(&path, &GeneratorConfig::default());
        let _ = std::fs::remove_file(&path);
        assert_eq!(from_path.unwrap(), generate_script_context(MANIFEST).unwrap());

        let err = generate_script_context_from_path(&path, &GeneratorConfig::default())
            .unwrap_err();
        assert!(matches!(err, ScriptContextError::Io(_)));
    }

    #[test]
    fn malformed_input_errors() {
        let err = generate_script_context("<ScriptParameter>").unwrap_err();
        assert!(err.to_string().starts_with("malformed input:"));
    }
}
