use crate::budget::Budget;
use serde::{Deserialize, Serialize};

/// How to treat two keys of one mapping that bind the same member.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateKeyPolicy {
    /// Fail with [`crate::Error::DuplicateKey`].
    Error,
    /// Keep the first value; later duplicates are skipped without being bound.
    FirstWins,
    /// Later values overwrite earlier ones.
    #[default]
    LastWins,
}

/// Deserializer configuration.
///
/// Prefer [`crate::options!`] over struct literal syntax so that new fields can be added
/// without breaking callers:
///
/// ```rust
/// use saphyr_bind::options::DuplicateKeyPolicy;
///
/// let options = saphyr_bind::options! {
///     max_depth: 32,
///     duplicate_keys: DuplicateKeyPolicy::Error,
/// };
/// assert!(!options.strict_members);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Resource budget enforced while composing text. `None` disables it.
    pub budget: Option<Budget>,
    /// Maximum binding depth, counted in nested members and elements from the root.
    /// Protects against structural cycles as well as deeply nested input. Default: 128.
    pub max_depth: usize,
    /// Reject mapping keys that match no member of the target type. Default: false.
    pub strict_members: bool,
    /// Policy for duplicate keys within one mapping.
    pub duplicate_keys: DuplicateKeyPolicy,
    /// If true, interpret only `true` and `false` (any case) as booleans.
    /// YAML 1.1 forms like `yes`/`no`/`on`/`off` are rejected. Default: false.
    pub strict_booleans: bool,
    /// Enable legacy octal parsing where values starting with `00` are treated as base-8.
    /// They are deprecated in YAML 1.2. Default: false.
    pub legacy_octal_numbers: bool,
    /// If true (default), errors from text entry points are wrapped with a rendered
    /// snippet of the input around the error location.
    pub with_snippet: bool,
    /// Horizontal crop radius (in character columns) when rendering snippets.
    /// If set to `0`, snippet wrapping is disabled.
    pub crop_radius: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            budget: Some(Budget::default()),
            max_depth: 128,
            strict_members: false,
            duplicate_keys: DuplicateKeyPolicy::default(),
            strict_booleans: false,
            legacy_octal_numbers: false,
            with_snippet: true,
            crop_radius: 64,
        }
    }
}
