/*!
Provide `RepeatableContainers`, the policy object that transparently expands a "container"
annotation holding an array of a repeatable inner annotation into its elements.
*/

use std::collections::HashMap;

use crate::model::types::AnnotationInstance;
use crate::model::value::{AttributeValue, ValueKind};
use crate::resolver::TypeResolver;

/// The well-known name of the meta-annotation that marks an annotation type repeatable and names
/// its container, and the attribute on it that carries the container type name.
const REPEATABLE_META_ANNOTATION: &str = "Repeatable";
const REPEATABLE_CONTAINER_ATTRIBUTE: &str = "value";

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

/// How repeatable container annotations are discovered and unwrapped.
#[derive(Clone, Debug)]
pub enum RepeatableContainers {
    /// No annotation is ever treated as a container.
    None,
    /// A container is discovered reflectively: `C` has exactly one attribute named `value` whose
    /// kind is `Array<Nested(A)>`, and `A` declares a `Repeatable` meta-annotation naming `C`.
    Standard,
    /// The caller supplies the container → contained type name pairs explicitly, skipping
    /// reflective discovery.
    Explicit(HashMap<String, String>),
}

impl RepeatableContainers {
    /// If `instance` is a repeatable container, return its unwrapped elements; else `None`.
    /// An empty `value` array unwraps to zero elements, per the boundary behaviour in §8.
    pub fn unwrap(
        &self,
        instance: &AnnotationInstance,
        resolver: &dyn TypeResolver,
    ) -> Option<Vec<AnnotationInstance>> {
        match self {
            Self::None => None,
            Self::Standard => self.unwrap_standard(instance, resolver),
            Self::Explicit(pairs) => {
                let _contained_type = pairs.get(&instance.type_name)?;
                self.unwrap_value_array(instance)
            }
        }
    }

    fn unwrap_standard(
        &self,
        instance: &AnnotationInstance,
        resolver: &dyn TypeResolver,
    ) -> Option<Vec<AnnotationInstance>> {
        let container_type = resolver.resolve(&instance.type_name)?;
        if container_type.attributes().len() != 1 {
            return None;
        }
        let value_attr = container_type.attribute(REPEATABLE_CONTAINER_ATTRIBUTE)?;
        let ValueKind::Array(element_kind) = value_attr.value_kind() else {
            return None;
        };
        let ValueKind::Nested(contained_type_name) = element_kind.as_ref() else {
            return None;
        };

        let contained_type = resolver.resolve(contained_type_name)?;
        let repeatable = contained_type.meta_annotation(REPEATABLE_META_ANNOTATION)?;
        let names_this_container = matches!(
            repeatable.get(REPEATABLE_CONTAINER_ATTRIBUTE),
            Some(AttributeValue::ClassRef(name)) if name == &instance.type_name
        );
        if !names_this_container {
            return None;
        }

        self.unwrap_value_array(instance)
    }

    fn unwrap_value_array(&self, instance: &AnnotationInstance) -> Option<Vec<AnnotationInstance>> {
        match instance.get(REPEATABLE_CONTAINER_ATTRIBUTE) {
            Some(AttributeValue::Array(ValueKind::Nested(_), elements)) => Some(
                elements
                    .iter()
                    .filter_map(|element| match element {
                        AttributeValue::Nested(nested) => Some(nested.as_ref().clone()),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl Default for RepeatableContainers {
    fn default() -> Self {
        Self::Standard
    }
}
