/*!
The `TypeResolver` contract: the sole way this crate learns what an annotation type looks like.

This crate does not implement a resolver — that means walking a real type system (reflection,
a compiler's symbol table, …) and is necessarily platform-specific. Callers provide one.
*/

use crate::model::types::AnnotationType;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

/// Maps an annotation type name to its metadata, or reports that the name does not resolve to a
/// known annotation type.
///
/// A resolver miss during closure construction is not an error: the branch of the walk that
/// depends on it is silently pruned (see the crate's error-handling design).
pub trait TypeResolver {
    fn resolve(&self, name: &str) -> Option<AnnotationType>;
}

impl<F> TypeResolver for F
where
    F: Fn(&str) -> Option<AnnotationType>,
{
    fn resolve(&self, name: &str) -> Option<AnnotationType> {
        self(name)
    }
}
