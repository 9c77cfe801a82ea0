//! Binding errors, their location and path.
//!
//! Every failure aborts the whole deserialize call: there is no partial graph. The error
//! names the failing node by its path from the root (member keys and sequence indices) and,
//! when the node came from text, by its line and column.

use std::fmt;

use saphyr_parser::ScanError;

use crate::budget::BudgetBreach;
use crate::location::Location;
use crate::node::Shape;
use crate::path::Path;

/// Error returned by composing and binding.
#[derive(Debug)]
pub enum Error {
    /// Free-form error with optional source location (parser failures, invalid documents).
    Message { msg: String, location: Location },
    /// Alias references an anchor that was never defined in this document.
    UnknownAnchor { id: usize, location: Location },
    /// A YAML budget limit was exceeded while composing.
    Budget {
        breach: BudgetBreach,
        location: Location,
    },
    /// Single-document entry point received a stream with more than one document.
    MultipleDocuments { documents: usize },
    /// An abstract (capability) type was requested with no registered concrete type.
    UnresolvedTypeMapping {
        type_name: String,
        path: Path,
        location: Location,
    },
    /// A concrete object or enum type was requested that has no registered descriptor.
    UnknownType {
        type_name: String,
        path: Path,
        location: Location,
    },
    /// Node shape is incompatible with the shape the target type expects.
    TypeMismatch {
        expected: Shape,
        actual: Shape,
        path: Path,
        location: Location,
    },
    /// Scalar text could not be converted to the target kind.
    ScalarConversion {
        text: String,
        kind: String,
        path: Path,
        location: Location,
    },
    /// Mapping key does not correspond to any member (strict mode only).
    UnknownMember {
        key: String,
        type_name: String,
        path: Path,
        location: Location,
    },
    /// Two keys of one mapping bind the same member and the policy is `Error`.
    DuplicateKey {
        key: String,
        path: Path,
        location: Location,
    },
    /// The graph is deeper than the configured maximum.
    DepthExceeded {
        max_depth: usize,
        path: Path,
        location: Location,
    },
    /// An alias refers to a value still under construction that cannot be referenced
    /// before it is complete (sequences, dictionaries, value objects).
    CyclicReferenceUnsupported {
        type_name: String,
        path: Path,
        location: Location,
    },
    /// Wraps an error with a pre-rendered source snippet.
    WithSnippet {
        /// Rendered output. The full input is intentionally not retained.
        text: String,
        crop_radius: usize,
        error: Box<Error>,
    },
}

impl Error {
    /// Construct a `Message` error with no known location.
    pub(crate) fn msg<S: Into<String>>(s: S) -> Self {
        Error::Message {
            msg: s.into(),
            location: Location::UNKNOWN,
        }
    }

    /// Free-form error, for [`crate::FromValue`] implementations and custom converters.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::msg(msg.to_string())
    }

    pub(crate) fn unknown_anchor(id: usize) -> Self {
        Error::UnknownAnchor {
            id,
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn budget(breach: BudgetBreach) -> Self {
        Error::Budget {
            breach,
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn unresolved_type_mapping(type_name: &str) -> Self {
        Error::UnresolvedTypeMapping {
            type_name: type_name.to_owned(),
            path: Path::root(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn unknown_type(type_name: &str) -> Self {
        Error::UnknownType {
            type_name: type_name.to_owned(),
            path: Path::root(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn type_mismatch(expected: Shape, actual: Shape) -> Self {
        Error::TypeMismatch {
            expected,
            actual,
            path: Path::root(),
            location: Location::UNKNOWN,
        }
    }

    /// Conversion failure for use by [`ScalarConverter`](crate::ScalarConverter)
    /// implementations. The binder fills in the path and location.
    pub fn scalar_conversion(text: &str, kind: impl fmt::Display) -> Self {
        Error::ScalarConversion {
            text: text.to_owned(),
            kind: kind.to_string(),
            path: Path::root(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn unknown_member(key: &str, type_name: &str) -> Self {
        Error::UnknownMember {
            key: key.to_owned(),
            type_name: type_name.to_owned(),
            path: Path::root(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn duplicate_key(key: &str) -> Self {
        Error::DuplicateKey {
            key: key.to_owned(),
            path: Path::root(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn depth_exceeded(max_depth: usize) -> Self {
        Error::DepthExceeded {
            max_depth,
            path: Path::root(),
            location: Location::UNKNOWN,
        }
    }

    pub(crate) fn cyclic_reference(type_name: &str) -> Self {
        Error::CyclicReferenceUnsupported {
            type_name: type_name.to_owned(),
            path: Path::root(),
            location: Location::UNKNOWN,
        }
    }

    /// Attach/override a concrete location to this error and return it.
    pub(crate) fn with_location(mut self, set_location: Location) -> Self {
        match &mut self {
            Error::Message { location, .. }
            | Error::UnknownAnchor { location, .. }
            | Error::Budget { location, .. }
            | Error::UnresolvedTypeMapping { location, .. }
            | Error::UnknownType { location, .. }
            | Error::TypeMismatch { location, .. }
            | Error::ScalarConversion { location, .. }
            | Error::UnknownMember { location, .. }
            | Error::DuplicateKey { location, .. }
            | Error::DepthExceeded { location, .. }
            | Error::CyclicReferenceUnsupported { location, .. } => {
                *location = set_location;
            }
            Error::MultipleDocuments { .. } => {}
            Error::WithSnippet { error, .. } => {
                let inner = std::mem::replace(error.as_mut(), Error::msg(""));
                **error = inner.with_location(set_location);
            }
        }
        self
    }

    /// Attach the path of the failing node. Errors that are not tied to a node keep none.
    pub(crate) fn with_path(mut self, set_path: &Path) -> Self {
        match &mut self {
            Error::UnresolvedTypeMapping { path, .. }
            | Error::UnknownType { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::ScalarConversion { path, .. }
            | Error::UnknownMember { path, .. }
            | Error::DuplicateKey { path, .. }
            | Error::DepthExceeded { path, .. }
            | Error::CyclicReferenceUnsupported { path, .. } => {
                *path = set_path.clone();
            }
            Error::Message { .. }
            | Error::UnknownAnchor { .. }
            | Error::Budget { .. }
            | Error::MultipleDocuments { .. } => {}
            Error::WithSnippet { error, .. } => {
                let inner = std::mem::replace(error.as_mut(), Error::msg(""));
                **error = inner.with_path(set_path);
            }
        }
        self
    }

    /// Wrap this error with a snippet of `text` around its location.
    ///
    /// A `crop_radius` of zero disables the snippet and returns the error unchanged.
    pub(crate) fn with_snippet(self, text: &str, crop_radius: usize) -> Self {
        if crop_radius == 0 {
            return self;
        }
        let inner = match self {
            Error::WithSnippet { error, .. } => *error,
            other => other,
        };
        let Some(location) = inner.location() else {
            return inner;
        };
        let rendered = crate::snippet::render(&inner.to_string(), &location, text, crop_radius);
        Error::WithSnippet {
            text: rendered,
            crop_radius,
            error: Box::new(inner),
        }
    }

    /// The error without any snippet wrapper.
    pub fn without_snippet(&self) -> &Error {
        match self {
            Error::WithSnippet { error, .. } => error.without_snippet(),
            other => other,
        }
    }

    /// If the error has a known location, return it.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Message { location, .. }
            | Error::UnknownAnchor { location, .. }
            | Error::Budget { location, .. }
            | Error::UnresolvedTypeMapping { location, .. }
            | Error::UnknownType { location, .. }
            | Error::TypeMismatch { location, .. }
            | Error::ScalarConversion { location, .. }
            | Error::UnknownMember { location, .. }
            | Error::DuplicateKey { location, .. }
            | Error::DepthExceeded { location, .. }
            | Error::CyclicReferenceUnsupported { location, .. } => {
                location.is_known().then_some(*location)
            }
            Error::MultipleDocuments { .. } => None,
            Error::WithSnippet { error, .. } => error.location(),
        }
    }

    /// Path of the failing node, for errors raised while binding.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::UnresolvedTypeMapping { path, .. }
            | Error::UnknownType { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::ScalarConversion { path, .. }
            | Error::UnknownMember { path, .. }
            | Error::DuplicateKey { path, .. }
            | Error::DepthExceeded { path, .. }
            | Error::CyclicReferenceUnsupported { path, .. } => Some(path),
            Error::WithSnippet { error, .. } => error.path(),
            _ => None,
        }
    }

    /// Map a `saphyr_parser::ScanError` into our error type with location.
    pub(crate) fn from_scan_error(err: ScanError) -> Self {
        let mark = err.marker();
        Error::Message {
            msg: err.info().to_owned(),
            location: Location::new(mark.line(), mark.col() + 1),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::WithSnippet {
                text,
                crop_radius,
                error,
            } => {
                if *crop_radius == 0 {
                    return write!(f, "{error}");
                }
                write!(f, "{text}")
            }
            Error::Message { msg, location } => fmt_with_location(f, msg, location),
            Error::UnknownAnchor { id, location } => fmt_with_location(
                f,
                &format!("alias references unknown anchor id {id}"),
                location,
            ),
            Error::Budget { breach, location } => {
                fmt_with_location(f, &format!("YAML budget breached: {breach:?}"), location)
            }
            Error::MultipleDocuments { documents } => write!(
                f,
                "expected a single YAML document, found {documents}"
            ),
            Error::UnresolvedTypeMapping {
                type_name,
                path,
                location,
            } => fmt_with_location(
                f,
                &format!("no type mapping registered for abstract type `{type_name}` at {path}"),
                location,
            ),
            Error::UnknownType {
                type_name,
                path,
                location,
            } => fmt_with_location(
                f,
                &format!("no descriptor registered for type `{type_name}` at {path}"),
                location,
            ),
            Error::TypeMismatch {
                expected,
                actual,
                path,
                location,
            } => fmt_with_location(
                f,
                &format!("expected a {expected}, found a {actual} at {path}"),
                location,
            ),
            Error::ScalarConversion {
                text,
                kind,
                path,
                location,
            } => fmt_with_location(
                f,
                &format!("cannot convert `{text}` to {kind} at {path}"),
                location,
            ),
            Error::UnknownMember {
                key,
                type_name,
                path,
                location,
            } => fmt_with_location(
                f,
                &format!("unknown member `{key}` for type `{type_name}` at {path}"),
                location,
            ),
            Error::DuplicateKey {
                key,
                path,
                location,
            } => fmt_with_location(f, &format!("duplicate key `{key}` at {path}"), location),
            Error::DepthExceeded {
                max_depth,
                path,
                location,
            } => fmt_with_location(
                f,
                &format!("maximum binding depth {max_depth} exceeded at {path}"),
                location,
            ),
            Error::CyclicReferenceUnsupported {
                type_name,
                path,
                location,
            } => fmt_with_location(
                f,
                &format!(
                    "`{type_name}` is referenced before it is complete \
                     and cannot form a cycle at {path}"
                ),
                location,
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Print a message optionally suffixed with "at line X, column Y".
fn fmt_with_location(f: &mut fmt::Formatter<'_>, msg: &str, location: &Location) -> fmt::Result {
    if location.is_known() {
        write!(
            f,
            "{msg} at line {}, column {}",
            location.line, location.column
        )
    } else {
        write!(f, "{msg}")
    }
}
