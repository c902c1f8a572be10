//! Redis-style key patterns.
//!
//! Key patterns use the Redis `KEYS`/`SCAN MATCH` syntax: `*`, `?`, `[abc]`,
//! `[a-z]`, `[^a]` and backslash escapes. The in-memory store matches with
//! the `glob` crate, so patterns are rewritten into its syntax first.

use glob::Pattern;

/// Characters with a meaning in a key pattern
const SPECIAL: [char; 5] = ['*', '?', '[', ']', '\\'];

/// Escapes `literal` so that it matches only itself in a key pattern.
///
/// ```rust
/// use kvhelper_core::escape_pattern;
///
/// assert_eq!(escape_pattern("app[1]:"), r"app\[1\]:");
/// assert_eq!(escape_pattern("plain:"), "plain:");
/// ```
pub fn escape_pattern(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Rewrites a Redis-style pattern into `glob` syntax.
///
/// - `\x` outside a class becomes a literal `x`
/// - `[^...]` becomes `[!...]`
/// - runs of `*` collapse into one (`glob` reserves `**` for paths)
///
/// Inside a class, `\x` is read as `x`; a `\]` there still closes the class.
pub(crate) fn to_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        if in_class {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                ']' => {
                    in_class = false;
                    out.push(']');
                }
                _ => out.push(c),
            }
            continue;
        }

        match c {
            '\\' => match chars.next() {
                Some(next) => out.push_str(&Pattern::escape(&next.to_string())),
                None => out.push('\\'),
            },
            '*' => {
                while chars.next_if_eq(&'*').is_some() {}
                out.push('*');
            }
            '[' => {
                in_class = true;
                out.push('[');
                if chars.next_if_eq(&'^').is_some() {
                    out.push('!');
                }
                // A leading `]` is a member, not the end of the class
                if chars.next_if_eq(&']').is_some() {
                    out.push(']');
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, key: &str) -> bool {
        Pattern::new(&to_glob(pattern))
            .map(|p| p.matches(key))
            .unwrap_or(false)
    }

    #[test]
    fn test_escape_pattern() {
        assert_eq!(escape_pattern("a*b?c"), r"a\*b\?c");
        assert_eq!(escape_pattern(r"x\y"), r"x\\y");
        assert_eq!(escape_pattern(""), "");
    }

    #[test]
    fn test_escaped_literal_matches_only_itself() {
        let prefix = escape_pattern("app[1]:");

        assert!(matches(&format!("{}*", prefix), "app[1]:mine"));
        assert!(!matches(&format!("{}*", prefix), "app1:theirs"));
    }

    #[test]
    fn test_negated_class() {
        assert_eq!(to_glob("[^a]x"), "[!a]x");
        assert!(matches("[^a]x", "bx"));
        assert!(!matches("[^a]x", "ax"));
    }

    #[test]
    fn test_repeated_stars_collapse() {
        assert_eq!(to_glob("a**"), "a*");
        assert!(matches("a**", "abc"));
        assert!(matches("**:1", "user:1"));
    }

    #[test]
    fn test_backslash_escapes() {
        assert!(matches(r"key\*", "key*"));
        assert!(!matches(r"key\*", "keys"));
        assert!(matches(r"\?", "?"));
        assert!(matches("end\\", "end\\"));
    }

    #[test]
    fn test_plain_classes_pass_through() {
        assert_eq!(to_glob("user:[0-9]"), "user:[0-9]");
        assert_eq!(to_glob("[]a]"), "[]a]");
        assert!(matches("[]a]", "]"));
    }
}
