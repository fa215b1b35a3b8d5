const METACHARACTERS: &[char] = &['\\', '.', '|', '+', '?', '*', '[', ']', '(', ')', '{', '}', '^', '$'];

/// Escapes `value` so that a regex engine matches it verbatim.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
