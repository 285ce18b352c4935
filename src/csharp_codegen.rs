//! C# `ScriptContext` generation from extracted script parameters.
//!
//! Every parameter is validated and given its identifier before anything is
//! emitted, so a failure never leaves a partial artifact behind.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::config::GeneratorConfig;
use crate::emitter::EmissionBuffer;
use crate::error::ScriptContextError;
use crate::manifest::ParameterRecord;
use crate::naming::sanitize;
use crate::template::{self, Slot, SlotRenderer, SCRIPT_CONTEXT};

const LOOKUP_HELPER: &str = "GetScriptParam";

/// Members the skeleton already declares on `ScriptContext`.
const RESERVED_MEMBERS: &[&str] = &["ScriptContext", "Engine", "GetScriptParam", "IsJsonArray"];

/// Renders the `ScriptContext` class for `params`, in order.
pub fn generate_csharp(
    params: &[ParameterRecord],
    config: &GeneratorConfig,
) -> Result<String, ScriptContextError> {
    let members = prepare_members(params)?;
    debug!(parameters = members.len(), "rendering ScriptContext");

    let mut buffer = EmissionBuffer::new(config.indent.as_str(), config.line_ending);
    template::render(SCRIPT_CONTEXT, &mut buffer, &ParameterMembers(&members));
    buffer.finish()
}

struct ParameterMember<'a> {
    identifier: String,
    description: &'a str,
}

struct ParameterMembers<'a>(&'a [ParameterMember<'a>]);

impl SlotRenderer for ParameterMembers<'_> {
    fn render_slot(&self, slot: Slot, buffer: &mut EmissionBuffer) {
        match slot {
            Slot::ConstructorAssignments => {
                for member in self.0 {
                    buffer.line(&format!(
                        "{} = {LOOKUP_HELPER}(\"{}\").Single();",
                        member.identifier, member.description
                    ));
                }
            }
            Slot::ParameterProperties => {
                for member in self.0 {
                    buffer.blank();
                    buffer.line(&format!("public string {} {{ get; }}", member.identifier));
                }
            }
        }
    }
}

fn prepare_members(
    params: &[ParameterRecord],
) -> Result<Vec<ParameterMember<'_>>, ScriptContextError> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut members = Vec::with_capacity(params.len());

    for (index, param) in params.iter().enumerate() {
        let position = index + 1;
        let invalid = |reason: String| ScriptContextError::InvalidParameter {
            position,
            id: param.id.clone(),
            reason,
        };

        let description = param
            .description
            .as_deref()
            .ok_or_else(|| invalid("missing <Description> element".to_string()))?;
        let identifier = sanitize(description).ok_or_else(|| {
            invalid(format!(
                "description {description:?} does not yield an identifier"
            ))
        })?;

        if RESERVED_MEMBERS.contains(&identifier.as_str()) {
            return Err(invalid(format!(
                "identifier '{identifier}' collides with a built-in ScriptContext member"
            )));
        }
        if let Some(first) = seen.get(&identifier) {
            return Err(invalid(format!(
                "identifier '{identifier}' duplicates parameter #{first}"
            )));
        }

        trace!(position, identifier = %identifier, "prepared parameter member");
        seen.insert(identifier.clone(), position);
        members.push(ParameterMember {
            identifier,
            description,
        });
    }

    Ok(members)
}
