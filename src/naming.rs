//! Naming conventions: member identifier to YAML key.

use std::fmt::Debug;

use crate::path::tokenize_identifier;

/// Deterministic transform from a declared member identifier to the key expected in YAML.
///
/// Implementations must be pure: the binder calls `apply` for every member of every mapping
/// it binds, and expects the same answer each time.
pub trait NamingConvention: Debug + Send + Sync {
    fn apply(&self, identifier: &str) -> String;
}

/// `EngineType` → `engineType`. Only the first character changes.
#[derive(Clone, Copy, Debug, Default)]
pub struct CamelCase;

/// `engineType` → `EngineType`. Only the first character changes.
#[derive(Clone, Copy, Debug, Default)]
pub struct PascalCase;

/// `EngineType` → `engine_type`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Underscored;

/// `EngineType` → `engine-type`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Hyphenated;

/// `EngineType` → `enginetype`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LowerCase;

/// Identity: keys must be spelled exactly like the members.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNaming;

impl NamingConvention for CamelCase {
    fn apply(&self, identifier: &str) -> String {
        let mut chars = identifier.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl NamingConvention for PascalCase {
    fn apply(&self, identifier: &str) -> String {
        let mut chars = identifier.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl NamingConvention for Underscored {
    fn apply(&self, identifier: &str) -> String {
        tokenize_identifier(identifier).join("_")
    }
}

impl NamingConvention for Hyphenated {
    fn apply(&self, identifier: &str) -> String {
        tokenize_identifier(identifier).join("-")
    }
}

impl NamingConvention for LowerCase {
    fn apply(&self, identifier: &str) -> String {
        identifier.to_lowercase()
    }
}

impl NamingConvention for NullNaming {
    fn apply(&self, identifier: &str) -> String {
        identifier.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_lowers_first_char_only() {
        assert_eq!(CamelCase.apply("EngineType"), "engineType");
        assert_eq!(CamelCase.apply("HTTPServer"), "hTTPServer");
        assert_eq!(CamelCase.apply("name"), "name");
        assert_eq!(CamelCase.apply(""), "");
    }

    #[test]
    fn pascal_case_uppers_first_char_only() {
        assert_eq!(PascalCase.apply("engineType"), "EngineType");
        assert_eq!(PascalCase.apply("x"), "X");
    }

    #[test]
    fn separated_conventions_split_words() {
        assert_eq!(Underscored.apply("EngineType"), "engine_type");
        assert_eq!(Underscored.apply("HTTPServer"), "http_server");
        assert_eq!(Hyphenated.apply("DriveType"), "drive-type");
        assert_eq!(Hyphenated.apply("sha256Sum"), "sha-256-sum");
    }

    #[test]
    fn lower_and_null() {
        assert_eq!(LowerCase.apply("EngineType"), "enginetype");
        assert_eq!(NullNaming.apply("EngineType"), "EngineType");
    }
}
