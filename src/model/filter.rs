/*!
Provide `AnnotationFilter`, the predicate that excludes uninteresting annotation type names (the
standard "documentation-only" meta-annotations and the like) from a meta-annotation closure walk.

Modelled as a closed enum rather than a trait object: it must be cheap to compare and hash, since
it is half of the `AnnotationTypeMappings` cache key.
*/

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

/// Excludes annotation type names from participating in a meta-annotation closure.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum AnnotationFilter {
    /// Excludes nothing; every reachable meta-annotation is followed.
    None,
    /// Excludes the small set of meta-annotations every platform ships that carry no attribute
    /// data worth merging (documentation/retention-policy markers and the like).
    Plain,
    /// Excludes every type whose name starts with one of the given package prefixes.
    Packages(Vec<String>),
    /// Excludes exactly the named types.
    Names(BTreeSet<String>),
}

impl AnnotationFilter {
    /// The conventional "uninteresting" prefixes: platform bookkeeping annotations that are
    /// never meaningful as a merge target.
    const PLAIN_PREFIXES: &'static [&'static str] = &[
        "java.lang.annotation.",
        "kotlin.",
        "kotlin.annotation.",
        "core.annotation.",
    ];

    /// `true` if `type_name` should be excluded from the closure walk.
    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            Self::None => false,
            Self::Plain => Self::PLAIN_PREFIXES
                .iter()
                .any(|prefix| type_name.starts_with(prefix)),
            Self::Packages(prefixes) => prefixes.iter().any(|p| type_name.starts_with(p.as_str())),
            Self::Names(names) => names.contains(type_name),
        }
    }
}

impl Default for AnnotationFilter {
    fn default() -> Self {
        Self::Plain
    }
}
