/*!
Provide `AnnotationTypeMapping`, one node in a root annotation type's meta-annotation closure.
*/

use std::collections::HashMap;

use super::types::{AliasRef, AnnotationType};
use super::value::AttributeValue;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

/// One node in a root's meta-annotation closure: the plan for merging attribute values of
/// `annotation_type` from the root downward.
///
/// `parent` and any ancestor references inside `aliases`/`convention_overrides` are indices into
/// the `Vec<AnnotationTypeMapping>` owned by the enclosing `AnnotationTypeMappings` — not
/// pointers — so that the whole structure stays plain data with no reference counting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationTypeMapping {
    pub(crate) annotation_type: AnnotationType,
    pub(crate) depth: i32,
    pub(crate) parent: Option<usize>,
    /// The raw attributes passed where this annotation type was declared as a meta-annotation on
    /// its parent; empty (and conceptually replaced by the per-query root bundle) for the root
    /// mapping.
    pub(crate) declared_attributes: HashMap<String, AttributeValue>,
    /// attribute name -> alias target, resolved to an ancestor mapping index once the whole
    /// closure is known.
    pub(crate) aliases: HashMap<String, (AliasRef, usize)>,
    /// Disjoint groups of this annotation's own attributes, mutually declared as aliases of one
    /// another.
    pub(crate) mirror_sets: Vec<Vec<String>>,
    /// attribute name -> the nearest strict ancestor mapping index that declares an
    /// identically-named, kind-compatible attribute, for attributes not explicitly aliased.
    pub(crate) convention_overrides: HashMap<String, usize>,
}

impl AnnotationTypeMapping {
    pub(crate) fn root(annotation_type: AnnotationType) -> Self {
        Self {
            annotation_type,
            depth: 0,
            parent: None,
            declared_attributes: HashMap::new(),
            aliases: HashMap::new(),
            mirror_sets: Vec::new(),
            convention_overrides: HashMap::new(),
        }
    }

    pub(crate) fn child(
        annotation_type: AnnotationType,
        depth: i32,
        parent: usize,
        declared_attributes: HashMap<String, AttributeValue>,
    ) -> Self {
        Self {
            annotation_type,
            depth,
            parent: Some(parent),
            declared_attributes,
            aliases: HashMap::new(),
            mirror_sets: Vec::new(),
            convention_overrides: HashMap::new(),
        }
    }

    pub fn annotation_type(&self) -> &AnnotationType {
        &self.annotation_type
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The mirror set containing `attribute_name`, if any. Sets of size one (a self-alias that
    /// targets the same attribute) never require enforcement and are still reported here so
    /// callers can observe the trivial case described in the boundary behaviours.
    pub fn mirror_set_for(&self, attribute_name: &str) -> Option<&[String]> {
        self.mirror_sets
            .iter()
            .find(|set| set.iter().any(|name| name == attribute_name))
            .map(|set| set.as_slice())
    }
}
