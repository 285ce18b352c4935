//! Script parameter extraction from automation script manifests.

use serde::Serialize;
use tracing::debug;

use crate::error::ScriptContextError;
use crate::mini_xml::{self, Document, Element};

/// Namespace of `ScriptParameter` elements in automation script files.
pub const DEFAULT_MANIFEST_NAMESPACE: &str = "http://www.skyline.be/automation";

const SYNTHETIC_ROOT: &str = "TempRoot";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// One `<ScriptParameter>` declaration.
pub struct ParameterRecord {
    pub id: Option<String>,
    /// Declared value type. Generated properties are always `string`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Raw `values` constraint, kept for downstream tooling.
    #[serde(rename = "values")]
    pub allowed_values: Option<String>,
    /// Text of the `<Description>` child: the lookup key and identifier source.
    pub description: Option<String>,
}

/// Extracts parameter declarations in document order.
///
/// `namespace` is the URI `ScriptParameter` and `Description` must be
/// qualified with; an empty string matches unqualified elements.
pub fn extract_parameters(
    input: &str,
    namespace: &str,
) -> Result<Vec<ParameterRecord>, ScriptContextError> {
    let document = parse_manifest(input)?;
    let namespace = (!namespace.is_empty()).then_some(namespace);

    let records: Vec<ParameterRecord> = document
        .descendants()
        .into_iter()
        .filter(|el| el.is(namespace, "ScriptParameter"))
        .map(|el| to_record(el, namespace))
        .collect();

    debug!(count = records.len(), "extracted script parameters");
    Ok(records)
}

/// Parses `input` as a document, retrying once inside a synthetic root element
/// so that fragments with several top-level elements are accepted.
pub fn parse_manifest(input: &str) -> Result<Document, ScriptContextError> {
    match mini_xml::parse_document(input) {
        Ok(document) => Ok(document),
        Err(first) => {
            debug!(error = %first, "manifest is not a single document; retrying with synthetic root");
            let wrapped = format!("<{SYNTHETIC_ROOT}>{input}</{SYNTHETIC_ROOT}>");
            mini_xml::parse_document(&wrapped).map_err(|second| {
                ScriptContextError::MalformedInput(format!(
                    "{first}; with synthetic root: {second}"
                ))
            })
        }
    }
}

fn to_record(element: &Element, namespace: Option<&str>) -> ParameterRecord {
    ParameterRecord {
        id: element.attribute("id").map(str::to_string),
        kind: element.attribute("type").map(str::to_string),
        allowed_values: element.attribute("values").map(str::to_string),
        description: element.child(namespace, "Description").map(Element::text),
    }
}
