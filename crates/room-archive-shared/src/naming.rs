//! File name hygiene for names taken from room state and message bodies.

/// Longest component written to disk; leaves room for a `(n)` suffix under
/// the usual 255 byte limit.
pub const MAX_COMPONENT_BYTES: usize = 200;

/// Longest extension kept intact when a name has to be shortened.
const MAX_EXTENSION_BYTES: usize = 16;

/// Turn untrusted text into a single path component.
///
/// Separators and control characters become `_`, leading dots are replaced so
/// the result can neither climb out of its directory nor hide itself, and an
/// empty result falls back to `fallback`.
pub fn sanitize_component(raw: &str, fallback: &str) -> String {
    let mut cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let dots = cleaned.len() - cleaned.trim_start_matches('.').len();
    if dots > 0 {
        cleaned.replace_range(..dots, &"_".repeat(dots));
    }

    if cleaned.is_empty() {
        return fallback.to_string();
    }

    truncate_component(cleaned)
}

fn truncate_component(name: String) -> String {
    if name.len() <= MAX_COMPONENT_BYTES {
        return name;
    }

    let extension = name
        .rfind('.')
        .map(|i| &name[i..])
        .filter(|ext| ext.len() <= MAX_EXTENSION_BYTES)
        .unwrap_or("");

    let mut end = MAX_COMPONENT_BYTES - extension.len();
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &name[..end], extension)
}
