//! `miette` integration.
//!
//! This module is feature-gated behind the `miette` feature.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};

use crate::error::Error;
use crate::location::Location;

/// Convert a binding [`Error`] into a `miette::Report` over `source`.
///
/// ```rust,no_run
/// use saphyr_bind::{Deserializer, TypeDescriptor};
///
/// let yaml = "definitely\n";
/// let err = Deserializer::default()
///     .deserialize(yaml, &TypeDescriptor::bool())
///     .expect_err("bool conversion error expected");
/// let report = saphyr_bind::diagnostic::to_miette_report(&err, yaml, "config.yaml");
/// eprintln!("{report:?}");
/// ```
///
/// The error does not retain the input, so the report owns a copy of `source`. Errors
/// without a known location produce a report without labels.
pub fn to_miette_report(err: &Error, source: &str, file: &str) -> miette::Report {
    let err = err.without_snippet();
    let src = Arc::new(NamedSource::new(file, source.to_owned()));
    let message = err.to_string();
    let labels = err
        .location()
        .and_then(|loc| to_source_span(source, &loc))
        .map(|span| vec![LabeledSpan::new_with_span(Some(short_label(err)), span)])
        .unwrap_or_default();
    miette::Report::new(ErrorDiagnostic {
        message,
        code: code_of(err),
        src,
        labels,
    })
}

#[derive(Clone, Debug)]
struct ErrorDiagnostic {
    message: String,
    code: &'static str,
    src: Arc<NamedSource<String>>,
    labels: Vec<LabeledSpan>,
}

impl fmt::Display for ErrorDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorDiagnostic {}

impl Diagnostic for ErrorDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.labels.is_empty() {
            None
        } else {
            Some(Box::new(self.labels.clone().into_iter()))
        }
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(code_of(self.without_snippet())))
    }
}

fn code_of(err: &Error) -> &'static str {
    match err {
        Error::Message { .. } => "saphyr_bind::message",
        Error::UnknownAnchor { .. } => "saphyr_bind::unknown_anchor",
        Error::Budget { .. } => "saphyr_bind::budget",
        Error::MultipleDocuments { .. } => "saphyr_bind::multiple_documents",
        Error::UnresolvedTypeMapping { .. } => "saphyr_bind::unresolved_type_mapping",
        Error::UnknownType { .. } => "saphyr_bind::unknown_type",
        Error::TypeMismatch { .. } => "saphyr_bind::type_mismatch",
        Error::ScalarConversion { .. } => "saphyr_bind::scalar_conversion",
        Error::UnknownMember { .. } => "saphyr_bind::unknown_member",
        Error::DuplicateKey { .. } => "saphyr_bind::duplicate_key",
        Error::DepthExceeded { .. } => "saphyr_bind::depth_exceeded",
        Error::CyclicReferenceUnsupported { .. } => "saphyr_bind::cyclic_reference",
        Error::WithSnippet { error, .. } => code_of(error),
    }
}

/// Label text under the caret: the message without the trailing location.
fn short_label(err: &Error) -> String {
    let full = err.to_string();
    match err.location() {
        Some(loc) => {
            let suffix = format!(" at line {}, column {}", loc.line(), loc.column());
            full.strip_suffix(&suffix).map(str::to_owned).unwrap_or(full)
        }
        None => full,
    }
}

/// Byte span of the character at `location`, as miette expects byte offsets.
fn to_source_span(source: &str, location: &Location) -> Option<SourceSpan> {
    let line = usize::try_from(location.line()).ok()?.checked_sub(1)?;
    let column = usize::try_from(location.column()).ok()?.checked_sub(1)?;
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line)
        .map(str::len)
        .sum();
    let rest = source.get(line_start..)?;
    let (offset, ch) = rest.char_indices().nth(column)?;
    let len = if ch == '\n' { 0 } else { ch.len_utf8() };
    Some(SourceSpan::new((line_start + offset).into(), len))
}
