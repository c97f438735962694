use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use sha2::{Digest, Sha256};

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let digest = h.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
];

/// Path segments that are keywords but still legal as the head of a path.
pub(crate) const PATH_ROOTS: &[&str] = &["crate", "self", "super"];

pub(crate) fn is_ident(s: &str) -> bool {
    let s = s.strip_prefix("r#").unwrap_or(s);
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s != "_" && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `a::b::c`, optionally rooted at `::`, `crate`, `self` or `super`.
pub(crate) fn is_path(s: &str) -> bool {
    let body = s.strip_prefix("::").unwrap_or(s);
    if body.is_empty() {
        return false;
    }
    body.split("::").enumerate().all(|(idx, seg)| {
        is_ident(seg)
            && (!KEYWORDS.contains(&seg)
                || (PATH_ROOTS.contains(&seg) && (idx == 0 || seg == "super")))
    })
}

pub(crate) fn make_ident(name: &str) -> Ident {
    match name.strip_prefix("r#") {
        Some(raw) => Ident::new_raw(raw, Span::call_site()),
        None if KEYWORDS.contains(&name) && !PATH_ROOTS.contains(&name) && name != "Self" => {
            Ident::new_raw(name, Span::call_site())
        }
        None => Ident::new(name, Span::call_site()),
    }
}

/// Renders an already validated path (see [`is_path`]) as tokens.
pub(crate) fn path_tokens(path: &str) -> TokenStream {
    let (leading, body) = match path.strip_prefix("::") {
        Some(rest) => (quote!(::), rest),
        None => (TokenStream::new(), path),
    };
    let segments = body.split("::").map(make_ident);
    quote!(#leading #(#segments)::*)
}

/// Field names are displayed without the raw-identifier marker.
pub(crate) fn display_name(name: &str) -> &str {
    name.strip_prefix("r#").unwrap_or(name)
}

/// Upper-case symbol prefix for a source unit, e.g. `user_profile.rs` -> `USER_PROFILE`.
pub fn unit_prefix(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".rs").unwrap_or(file_name);
    let mut stem = stem;
    for suffix in ["_validation", "_validate", "_test"] {
        if let Some(rest) = stem.strip_suffix(suffix) {
            stem = rest;
            break;
        }
    }
    let mut out: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        return "FILE".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "FILE_");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("user.rs", "USER")]
    #[test_case("user_profile.rs", "USER_PROFILE")]
    #[test_case("user_validation.rs", "USER")]
    #[test_case("orders_test.rs", "ORDERS")]
    #[test_case("2fa.rs", "FILE_2FA")]
    #[test_case("my-file.rs", "MY_FILE")]
    #[test_case(".rs", "FILE")]
    fn unit_prefix_sanitizes(file: &str, want: &str) {
        assert_eq!(unit_prefix(file), want);
    }

    #[test]
    fn paths_and_idents() {
        assert!(is_ident("price"));
        assert!(is_ident("r#type"));
        assert!(!is_ident("9lives"));
        assert!(!is_ident("_"));
        assert!(is_path("crate::checks"));
        assert!(is_path("super::super::rules"));
        assert!(is_path("::regex"));
        assert!(!is_path("checks::"));
        assert!(!is_path("a::crate"));
        assert!(!is_path("a-b"));
    }

    #[test]
    fn path_tokens_render_segments() {
        let rendered = path_tokens("crate::checks::RE").to_string();
        assert_eq!(rendered.replace(' ', ""), "crate::checks::RE");
        let rendered = path_tokens("::regex::Regex").to_string();
        assert_eq!(rendered.replace(' ', ""), "::regex::Regex");
    }

    #[test]
    fn keyword_field_names_become_raw() {
        assert_eq!(make_ident("r#type").to_string(), "r#type");
        assert_eq!(make_ident("type").to_string(), "r#type");
        assert_eq!(display_name("r#type"), "type");
    }
}
