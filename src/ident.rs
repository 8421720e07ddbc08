//! Rust identifiers derived from exported names

use inflector::cases::screamingsnakecase::to_screaming_snake_case;
use inflector::cases::snakecase::to_snake_case;

const STRICT_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "static", "struct",
    "trait", "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try", "gen",
];

/// Keywords that cannot be written as raw identifiers
const PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

/// snake_case identifier for a method, parameter or field
pub fn snake_ident(exported: &str) -> String {
    escape(to_snake_case(exported))
}

/// SCREAMING_SNAKE_CASE prefix for constants
pub fn constant_ident(exported: &str) -> String {
    escape(to_screaming_snake_case(exported))
}

pub fn is_keyword(name: &str) -> bool {
    STRICT_KEYWORDS.contains(&name) || PATH_KEYWORDS.contains(&name)
}

/// Usable as a Rust type name without escaping
pub fn is_type_ident(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_keyword(name)
}

/// Usable as a module name: lowercase, digits and underscores
pub fn is_module_ident(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name != "_"
        && !is_keyword(name)
}

fn escape(ident: String) -> String {
    if ident.is_empty() {
        return "_unnamed".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{}", ident);
    }
    if PATH_KEYWORDS.contains(&ident.as_str()) {
        return format!("{}_", ident);
    }
    if STRICT_KEYWORDS.contains(&ident.as_str()) {
        return format!("r#{}", ident);
    }
    ident
}
