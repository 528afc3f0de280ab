/*!
The `Scanner` contract: walks a program element's class hierarchy to collect the annotation
instances directly declared at each level.

This crate does not implement a scanner — that means walking a real class hierarchy, which is
necessarily platform-specific. Callers provide one. `MergedAnnotations::from` consumes it; the
`MergedAnnotations::from_instances` factory bypasses it entirely for callers who already have
their aggregates in hand.
*/

use crate::model::types::AnnotationInstance;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

/// How far to walk a program element's hierarchy when collecting directly-declared annotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
    /// The element itself only.
    Direct,
    /// The element plus superclasses and interfaces, in walk order. For methods, bridged methods
    /// and same-signature overrides are expected to already be folded into the element's own
    /// direct set by the scanner — this crate does not re-derive that folding.
    Exhaustive,
}

/// One level of directly-declared annotations, in declaration order.
pub type Aggregate = Vec<AnnotationInstance>;

/// Walks an element's hierarchy and reports the annotations directly declared at each level.
pub trait Scanner<E> {
    /// The directly declared annotations on `element` alone, ignoring hierarchy.
    fn directly_present(&self, element: &E, strategy: SearchStrategy) -> Aggregate;

    /// One aggregate per hierarchy level reached by `strategy`; aggregate `0` is `element` itself.
    fn aggregates(&self, element: &E, strategy: SearchStrategy) -> Vec<Aggregate>;
}
