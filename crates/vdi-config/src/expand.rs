//! Shell-style variable expansion for configured paths.
//!
//! Supports `$NAME` and `${NAME}`. Names are `[A-Za-z0-9_]+`; unset
//! variables expand to nothing. There is no default/alternate syntax:
//! `${A-b}` expands `A` and keeps `-b}` literally.

/// Expand `$VAR` / `${VAR}` against the process environment.
pub fn expand_shell_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand against an arbitrary lookup.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_ascii_alphanumeric() || n == '_' {
                name.push(n);
                chars.next();
            } else {
                break;
            }
        }
        if braced && chars.peek() == Some(&'}') {
            chars.next();
        }

        if name.is_empty() {
            continue;
        }
        if let Some(value) = lookup(&name) {
            out.push_str(&value);
        }
    }

    out
}
