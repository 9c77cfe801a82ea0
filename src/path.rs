//! Paths from the document root to the node being bound.
//!
//! Every binding error carries the path of the node where it happened, rendered the way a
//! reader would navigate the document: member keys joined by `.`, sequence indices in `[]`.
//! Keys are recorded with their YAML spelling (after the naming convention was applied),
//! so `cars[0].spec.engineType` points at exactly the text the user wrote.

use std::fmt;

use smallvec::SmallVec;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Mapping key, as spelled in the document.
    Key(String),
    /// Zero-based position within a sequence.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(value.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::Key(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

/// Path from the root of the document. Most documents are shallow, so the segments live
/// inline until the path grows past eight entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: SmallVec<[PathSegment; 8]>,
}

impl Path {
    /// The empty path, pointing at the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builder-style append, mostly useful in tests.
    pub fn join<T: Into<PathSegment>>(mut self, seg: T) -> Self {
        self.segments.push(seg.into());
        self
    }

    pub(crate) fn push<T: Into<PathSegment>>(&mut self, seg: T) {
        self.segments.push(seg.into());
    }

    pub(crate) fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Last segment, if any.
    pub fn leaf(&self) -> Option<&PathSegment> {
        self.segments.last()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (idx, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Key(name) => {
                    if idx > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
            }
        }
        Ok(())
    }
}

/// Split an identifier into lowercase words.
///
/// Splits on any non-alphanumeric separator, then on casing and digit boundaries:
/// `userId` → `user id`, `sha256Sum` → `sha 256 sum`, `HTTPServer` → `http server`.
pub(crate) fn tokenize_identifier(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for piece in s
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
    {
        let chars: Vec<char> = piece.chars().collect();

        let mut start = 0usize;
        for i in 1..chars.len() {
            let prev = classify_ascii(chars[i - 1]);
            let curr = classify_ascii(chars[i]);
            let next = chars.get(i + 1).copied().map(classify_ascii);

            let boundary = match (prev, curr) {
                (CharClass::Lower, CharClass::Upper) => true,
                (CharClass::Digit, CharClass::Lower | CharClass::Upper) => true,
                (CharClass::Lower | CharClass::Upper, CharClass::Digit) => true,
                // HTTPServer: split before the S in Server (acronym + word)
                (CharClass::Upper, CharClass::Upper) if matches!(next, Some(CharClass::Lower)) => {
                    true
                }
                _ => false,
            };

            if boundary {
                tokens.push(lower_token(&chars[start..i]));
                start = i;
            }
        }

        if start < chars.len() {
            tokens.push(lower_token(&chars[start..]));
        }
    }

    tokens
}

fn lower_token(chars: &[char]) -> String {
    chars.iter().map(|c| c.to_ascii_lowercase()).collect()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum CharClass {
    Lower,
    Upper,
    Digit,
    Other,
}

fn classify_ascii(c: char) -> CharClass {
    if c.is_ascii_lowercase() {
        CharClass::Lower
    } else if c.is_ascii_uppercase() {
        CharClass::Upper
    } else if c.is_ascii_digit() {
        CharClass::Digit
    } else {
        CharClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_displays_placeholder() {
        assert_eq!(Path::root().to_string(), "<root>");
    }

    #[test]
    fn keys_and_indices_render_like_navigation() {
        let path = Path::root()
            .join("cars")
            .join(0usize)
            .join("spec")
            .join("engineType");
        assert_eq!(path.to_string(), "cars[0].spec.engineType");
        assert_eq!(path.len(), 4);
        assert_eq!(path.leaf(), Some(&PathSegment::Key("engineType".into())));
    }

    #[test]
    fn leading_index_has_no_dot() {
        let path = Path::root().join(2usize).join("name");
        assert_eq!(path.to_string(), "[2].name");
    }

    #[test]
    fn push_and_pop_mirror_descent() {
        let mut path = Path::root();
        path.push("a");
        path.push(1usize);
        path.pop();
        path.push("b");
        assert_eq!(path.to_string(), "a.b");
    }

    #[test]
    fn tokenize_casing_and_separators() {
        assert_eq!(tokenize_identifier("userId"), vec!["user", "id"]);
        assert_eq!(tokenize_identifier("user_id"), vec!["user", "id"]);
        assert_eq!(tokenize_identifier("user-id"), vec!["user", "id"]);
        assert_eq!(tokenize_identifier("UserID"), vec!["user", "id"]);
    }

    #[test]
    fn tokenize_digits_and_acronyms() {
        assert_eq!(tokenize_identifier("sha256Sum"), vec!["sha", "256", "sum"]);
        assert_eq!(tokenize_identifier("HTTPServer"), vec!["http", "server"]);
        assert_eq!(tokenize_identifier("EngineType"), vec!["engine", "type"]);
    }
}
