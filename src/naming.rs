//! Identifier transforms: JSON keys → Dart field / class / file names.
//!
//! All transforms are pure and deterministic; uniqueness is handled by the
//! callers (per-class for fields, registry-wide for classes).
use once_cell::sync::Lazy;
use regex::Regex;

static RUN_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]+").unwrap());

/// Reserved words, built-in identifiers and contextual keywords that cannot
/// be used as a plain field name.
const DART_KEYWORDS: &[&str] = &[
    "abstract", "as", "assert", "async", "await", "break", "case", "catch", "class",
    "const", "continue", "covariant", "default", "deferred", "do", "dynamic", "else",
    "enum", "export", "extends", "extension", "external", "factory", "false", "final",
    "finally", "for", "Function", "get", "if", "implements", "import", "in", "interface",
    "is", "late", "library", "mixin", "new", "null", "operator", "part", "required",
    "rethrow", "return", "set", "static", "super", "switch", "this", "throw", "true",
    "try", "typedef", "var", "void", "while", "with", "yield",
    // members every generated class declares
    "toJson", "fromJson", "copyWith", "hashCode", "runtimeType", "toString", "noSuchMethod",
];

/// Type names a generated class must never shadow.
pub const DART_CORE_TYPES: &[&str] = &[
    "bool", "int", "double", "num", "dynamic", "void", "Never", "Null", "Object",
    "String", "List", "Map", "Set", "Iterable", "Function", "Type", "Symbol", "Record",
    "Future", "Stream", "DateTime", "Duration", "Uri", "Error", "Exception", "Enum",
    "Pattern", "RegExp", "Comparable", "BigInt", "Iterator", "Runes", "StackTrace",
];

/// Split on non-alphanumerics, then on case boundaries:
/// `userName` → user|Name, `HTTPStatus` → HTTP|Status. Digits stick to the
/// word they follow.
fn words(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    for run in RUN_RX.find_iter(raw) {
        let cs: Vec<char> = run.as_str().chars().collect();
        let mut start = 0;
        for i in 1..cs.len() {
            let prev = cs[i - 1];
            let cur = cs[i];
            let next_lower = cs.get(i + 1).is_some_and(|c| c.is_ascii_lowercase());
            let boundary = cur.is_ascii_uppercase()
                && (prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_lower));
            if boundary {
                out.push(cs[start..i].iter().collect());
                start = i;
            }
        }
        out.push(cs[start..].iter().collect());
    }
    out
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut cs = lower.chars();
    match cs.next() {
        Some(c) => c.to_ascii_uppercase().to_string() + cs.as_str(),
        None => String::new(),
    }
}

/// `user_name` / `UserName` / `user-name` → `userName`.
pub fn field_name(key: &str) -> String {
    let ws = words(key);
    let mut out = String::new();
    for (i, w) in ws.iter().enumerate() {
        if i == 0 { out.push_str(&w.to_ascii_lowercase()); } else { out.push_str(&capitalize(w)); }
    }
    if out.is_empty() {
        return "value".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'n');
    }
    // `int`, `double`, ... would shadow the type inside the class
    if DART_KEYWORDS.contains(&out.as_str()) || DART_CORE_TYPES.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// `user_info` → `UserInfo`. Falls back to `fallback` when the key has no
/// usable characters.
pub fn class_name(key: &str, fallback: &str) -> String {
    let mut out: String = words(key).iter().map(|w| capitalize(w)).collect();
    if out.is_empty() {
        out = fallback.to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'N');
    }
    out
}

/// `UserInfo` → `user_info`, used for output file names.
pub fn snake_case(name: &str) -> String {
    words(name)
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Escape a JSON key for use inside a single-quoted Dart string literal.
pub fn dart_string_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
