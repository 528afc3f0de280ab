/*!
Provides the crate's `Error` and `Result` types as well as helper constructor functions.
*/

use std::fmt::{Debug, Display};
use tracing::error;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

/// The Error type for this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An alias, mirror set, or convention override refers to an attribute, annotation type, or
    /// value that does not exist, or whose kinds are incompatible.
    ConfigurationError {
        annotation_type: String,
        attribute_name: String,
        /// `root -> intermediate -> offending`
        path: Vec<String>,
        reason: String,
    },
    /// Two or more members of a mirror set resolved to different, non-default values and no
    /// shadow exception applied.
    MirrorConflict {
        annotation_type: String,
        members: Vec<String>,
        values: Vec<String>,
    },
    /// A typed getter was invoked for an attribute the annotation type does not declare.
    MissingAttribute {
        annotation_type: String,
        attribute_name: String,
    },
    /// Any getter, including `annotation_type()`, was invoked on a missing `MergedAnnotation`.
    MissingAnnotation,
    /// An attribute's resolved value could not be converted to the kind requested by a typed
    /// getter.
    AttributeKindMismatch {
        annotation_type: String,
        attribute_name: String,
        expected: String,
        found: String,
    },
    /// A stateful, single-use predicate (`first_run_of`, `unique`) was invoked a second time.
    PredicateAlreadyConsumed,
}

/// A `Result` type that specifically uses this crate's `Error`.
pub type Result<T> = std::result::Result<T, Error>;

// ------------------------------------------------------------------------------------------------
// Public Functions
// ------------------------------------------------------------------------------------------------

macro_rules! report_and_return {
    ($err: expr) => {{
        let err = $err;
        error!("{}", err);
        return Err(err);
    }};
}

/// Construct and log a configuration error naming the offending annotation, attribute, and the
/// chain path from the root to the offending mapping.
#[inline]
pub fn configuration_error<S1, S2, S3>(
    annotation_type: S1,
    attribute_name: S2,
    path: Vec<String>,
    reason: S3,
) -> Result<std::convert::Infallible>
where
    S1: Into<String>,
    S2: Into<String>,
    S3: Into<String>,
{
    report_and_return!(Error::ConfigurationError {
        annotation_type: annotation_type.into(),
        attribute_name: attribute_name.into(),
        path,
        reason: reason.into(),
    });
}

/// Construct and log a mirror-set conflict error.
#[inline]
pub fn mirror_conflict<S>(
    annotation_type: S,
    members: Vec<String>,
    values: Vec<String>,
) -> Result<std::convert::Infallible>
where
    S: Into<String>,
{
    report_and_return!(Error::MirrorConflict {
        annotation_type: annotation_type.into(),
        members,
        values,
    });
}

/// Construct a missing-attribute error (not logged; this is a routine caller mistake, not a
/// configuration defect).
#[inline]
pub fn missing_attribute<S1, S2>(annotation_type: S1, attribute_name: S2) -> Error
where
    S1: Into<String>,
    S2: Into<String>,
{
    Error::MissingAttribute {
        annotation_type: annotation_type.into(),
        attribute_name: attribute_name.into(),
    }
}

// ------------------------------------------------------------------------------------------------
// Implementations
// ------------------------------------------------------------------------------------------------

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigurationError {
                annotation_type,
                attribute_name,
                path,
                reason,
            } => write!(
                f,
                "configuration error on {annotation_type}#{attribute_name}: {reason} (path: {})",
                path.join(" -> ")
            ),
            Self::MirrorConflict {
                annotation_type,
                members,
                values,
            } => write!(
                f,
                "mirror members {:?} of {annotation_type} disagree: {:?}",
                members, values
            ),
            Self::MissingAttribute {
                annotation_type,
                attribute_name,
            } => write!(
                f,
                "{annotation_type} declares no attribute named {attribute_name:?}"
            ),
            Self::MissingAnnotation => write!(f, "no such annotation is present"),
            Self::AttributeKindMismatch {
                annotation_type,
                attribute_name,
                expected,
                found,
            } => write!(
                f,
                "{annotation_type}#{attribute_name} expected kind {expected} but found {found}"
            ),
            Self::PredicateAlreadyConsumed => {
                write!(f, "this predicate is single-use and has already been consumed")
            }
        }
    }
}

impl std::error::Error for Error {}
