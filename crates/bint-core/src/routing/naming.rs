//! Identifier → URL path segment conversion.

/// Convert the remainder of an operation name into a path segment.
///
/// Words are split at lower→upper transitions and at the last capital of an
/// acronym run followed by a lowercase letter, then lowercased and joined
/// with `-`:
///
/// ```
/// use bint_core::routing::path_for;
///
/// assert_eq!(path_for("UserProfile"), "/user-profile");
/// assert_eq!(path_for("HTTPCode"), "/http-code");
/// assert_eq!(path_for("UserID"), "/user-id");
/// assert_eq!(path_for(""), "");
/// ```
pub fn path_for(fragment: &str) -> String {
    if fragment.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = fragment.chars().collect();
    let mut buf = String::with_capacity(fragment.len() + 4);
    buf.push('/');

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if !prev.is_uppercase() || next_lower {
                buf.push('-');
            }
        }
        buf.extend(c.to_lowercase());
    }
    buf
}
