//! Shared helpers.

/// Check whether a dotted route name matches an access pattern.
///
/// Patterns are case-insensitive globs:
/// - `*` matches any sequence of characters, dots included (`app.project.*`)
/// - `?` matches a single character
pub fn route_matches(pattern: &str, route: &str) -> bool {
    glob_match(&pattern.to_lowercase(), &route.to_lowercase())
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut pattern_chars = pattern.chars().peekable();
    let mut text_chars = text.chars();

    while let Some(p) = pattern_chars.next() {
        match p {
            '*' => {
                while pattern_chars.peek() == Some(&'*') {
                    pattern_chars.next();
                }
                if pattern_chars.peek().is_none() {
                    return true;
                }

                let remaining_pattern: String = pattern_chars.collect();
                let remaining_text = text_chars.as_str();
                return remaining_text
                    .char_indices()
                    .map(|(i, _)| i)
                    .chain(std::iter::once(remaining_text.len()))
                    .any(|i| glob_match(&remaining_pattern, &remaining_text[i..]));
            }
            '?' => {
                if text_chars.next().is_none() {
                    return false;
                }
            }
            c => {
                if text_chars.next() != Some(c) {
                    return false;
                }
            }
        }
    }

    text_chars.next().is_none()
}
