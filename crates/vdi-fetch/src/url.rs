//! URL recognition for path arguments.

/// Remote schemes the layer fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlScheme {
    Https,
    Http,
    Ftp,
}

/// Prefixes checked in order, case-sensitive, at the start of the path.
pub const URL_PREFIXES: [(&str, UrlScheme); 3] = [
    ("https://", UrlScheme::Https),
    ("http://", UrlScheme::Http),
    ("ftp://", UrlScheme::Ftp),
];

impl UrlScheme {
    pub fn prefix(self) -> &'static str {
        match self {
            UrlScheme::Https => "https://",
            UrlScheme::Http => "http://",
            UrlScheme::Ftp => "ftp://",
        }
    }
}

/// First recognised prefix of `path`, if any.
pub fn match_url_prefix(path: &[u8]) -> Option<UrlScheme> {
    URL_PREFIXES
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix.as_bytes()))
        .map(|(_, scheme)| *scheme)
}

/// Last path segment of `url` with query and fragment removed. Empty when
/// the URL has no path or ends in `/`.
pub fn final_segment(url: &str) -> &str {
    let rest = URL_PREFIXES
        .iter()
        .find_map(|(prefix, _)| url.strip_prefix(prefix))
        .unwrap_or(url);
    let rest = match rest.find(|c: char| c == '?' || c == '#') {
        Some(end) => &rest[..end],
        None => rest,
    };
    match rest.find('/') {
        Some(path_start) => {
            let path = &rest[path_start..];
            path.rsplit('/').next().unwrap_or("")
        }
        None => "",
    }
}
