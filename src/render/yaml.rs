use crate::util::flatten_lines;

/// Characters that force a front-matter value into double quotes.
const YAML_SPECIAL: &[char] = &['[', ']', '{', '}', ':', '>', '|', '*', '&', '!', '%', '@', ','];

/// Makes `value` safe to embed as `key: <value>` on a single front-matter line.
///
/// Line breaks become spaces and the result is trimmed. Values containing
/// YAML indicator characters are double-quoted with `\` and `"` escaped;
/// everything else is returned bare. This is not a general YAML emitter.
pub fn escape_yaml(value: &str) -> String {
    let flat = flatten_lines(value);
    if !flat.contains(YAML_SPECIAL) {
        return flat;
    }
    let escaped = flat.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
