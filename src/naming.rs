//! Identifier derivation for generated C# members.

/// Derives a member identifier from a parameter description.
///
/// Whitespace is removed, `-` becomes `_` and the first remaining character
/// is upper-cased. Returns `None` when nothing is left to name.
///
/// No further escaping is applied: characters that are invalid in a C#
/// identifier pass through unchanged.
pub fn sanitize(description: &str) -> Option<String> {
    let collapsed: String = description
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '-' { '_' } else { c })
        .collect();
    first_letter_to_upper(&collapsed)
}

/// Upper-cases the first character, `None` on empty input.
pub fn first_letter_to_upper(input: &str) -> Option<String> {
    let mut chars = input.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}
