//! Fixed skeleton of the generated `ScriptContext` class.
//!
//! The skeleton is a tree of literal lines, nested blocks and named slots.
//! Block nesting is structural, so every `{` written by [`render`] has its
//! matching `}`.

use crate::emitter::EmissionBuffer;
use Fragment::{Blank, Block, Line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Insertion point for per-parameter lines.
pub enum Slot {
    /// One assignment per parameter inside the constructor body.
    ConstructorAssignments,
    /// A blank line plus one property declaration per parameter.
    ParameterProperties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Line(&'static str),
    Blank,
    Block(&'static [Fragment]),
    Slot(Slot),
}

/// Supplies the lines for each [`Slot`] while a template renders.
pub trait SlotRenderer {
    fn render_slot(&self, slot: Slot, buffer: &mut EmissionBuffer);
}

pub const SCRIPT_CONTEXT: &[Fragment] = &[
    Line("namespace Skyline.DataMiner.Automation"),
    Block(&[
        Line("using System;"),
        Line("using System.Linq;"),
        Blank,
        Line("using Newtonsoft.Json;"),
        Blank,
        Line("using Skyline.DataMiner.Automation;"),
        Line("using Skyline.DataMiner.Utils.InteractiveAutomationScript;"),
        Blank,
        Line("public class ScriptContext"),
        Block(&[
            Line("public ScriptContext(IEngine engine)"),
            Block(&[
                Line("Engine = engine;"),
                Blank,
                Fragment::Slot(Slot::ConstructorAssignments),
            ]),
            Blank,
            Line("public IEngine Engine { get; }"),
            Fragment::Slot(Slot::ParameterProperties),
            Blank,
            Line("private static string[] GetScriptParam(string name)"),
            Block(&[
                Line("var rawValue = Engine.GetScriptParam(name)?.Value;"),
                Line("if (String.IsNullOrEmpty(rawValue))"),
                Block(&[Line(
                    "throw new ArgumentException($\"Script Param '{name}' cannot be left empty.\");",
                )]),
                Blank,
                Line("if (IsJsonArray(rawValue))"),
                Block(&[Line("return JsonConvert.DeserializeObject<string[]>(rawValue);")]),
                Line("else"),
                Block(&[Line("return new[] { rawValue };")]),
            ]),
            Blank,
            Line("private static bool IsJsonArray(string json)"),
            Block(&[
                Line("try"),
                Block(&[Line("JArray.Parse(json);"), Line("return true;")]),
                Line("catch"),
                Block(&[Line("return false;")]),
            ]),
        ]),
    ]),
];

/// Renders `fragments` into `buffer`, delegating slots to `slots`.
pub fn render(fragments: &[Fragment], buffer: &mut EmissionBuffer, slots: &dyn SlotRenderer) {
    for fragment in fragments {
        match *fragment {
            Line(text) => {
                buffer.line(text);
            }
            Blank => {
                buffer.blank();
            }
            Block(body) => {
                let mut block = buffer.open_block();
                render(body, &mut block, slots);
            }
            Fragment::Slot(slot) => slots.render_slot(slot, buffer),
        }
    }
}
