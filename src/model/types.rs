/*!
Provide the raw, un-merged metadata types: the descriptor of an annotation type as reported by a
`TypeResolver`, and the bundle of values actually found on a program element.
*/

use std::collections::HashMap;
use std::fmt::{self, Debug};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::value::{AttributeValue, ValueKind};

// ------------------------------------------------------------------------------------------------
// Public Types ❱ AttributeDescriptor
// ------------------------------------------------------------------------------------------------

/// Metadata for one attribute declared by an annotation type: its name, declared kind, and
/// default value (absent if the attribute is mandatory).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct AttributeDescriptor {
    name: String,
    value_kind: ValueKind,
    default_value: Option<AttributeValue>,
    alias_for: Option<AliasDeclaration>,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, value_kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            value_kind,
            default_value: None,
            alias_for: None,
        }
    }

    pub fn with_default(self, default_value: AttributeValue) -> Self {
        Self {
            default_value: Some(default_value),
            ..self
        }
    }

    pub fn with_alias_for(self, alias_for: AliasDeclaration) -> Self {
        Self {
            alias_for: Some(alias_for),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_kind(&self) -> &ValueKind {
        &self.value_kind
    }

    pub fn default_value(&self) -> Option<&AttributeValue> {
        self.default_value.as_ref()
    }

    pub fn is_mandatory(&self) -> bool {
        self.default_value.is_none()
    }

    pub fn alias_for(&self) -> Option<&AliasDeclaration> {
        self.alias_for.as_ref()
    }
}

/// The declaration site form of `@AliasFor`, attached to an `AttributeDescriptor`. Both fields
/// are optional: an omitted `annotation` defaults to the declaring attribute's own annotation type
/// (a same-annotation mirror) whenever `attribute` names something explicitly — and only falls
/// back further, to the immediate meta-annotation parent (or, at the root, to the attribute's own
/// annotation type again), when `attribute` is *also* omitted, i.e. the fully-defaulted
/// `AliasFor()` shorthand for "same name, parent annotation". An omitted `attribute` defaults to
/// the declaring attribute's own name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct AliasDeclaration {
    pub annotation: Option<String>,
    pub attribute: Option<String>,
}

impl AliasDeclaration {
    pub fn new() -> Self {
        Self {
            annotation: None,
            attribute: None,
        }
    }

    pub fn annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

impl Default for AliasDeclaration {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------------------------------
// Public Types ❱ AnnotationInstance
// ------------------------------------------------------------------------------------------------

/// A raw bundle of attribute values as found directly on some declaration site: a program
/// element, or the declaration of a meta-annotation on another annotation type. Values that were
/// not explicitly given are simply absent here; their default lives on the `AnnotationType`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct AnnotationInstance {
    pub type_name: String,
    pub values: HashMap<String, AttributeValue>,
}

impl AnnotationInstance {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    /// Render the way `@Type(attr1 = v1, attr2 = v2, …)` synthesis does, in attribute-name sorted
    /// order so that output is deterministic.
    pub fn render(&self) -> String {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        let rendered: Vec<String> = names
            .into_iter()
            .map(|name| format!("{name} = {}", self.values[name].render()))
            .collect();
        format!("@{}({})", self.type_name, rendered.join(", "))
    }
}

// ------------------------------------------------------------------------------------------------
// Public Types ❱ AnnotationType
// ------------------------------------------------------------------------------------------------

/// Metadata for an annotation type as reported by a `TypeResolver`: its name, the attributes it
/// declares, and the meta-annotations declared on the annotation type itself.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct AnnotationType {
    name: String,
    attributes: Vec<AttributeDescriptor>,
    meta_annotations: Vec<AnnotationInstance>,
}

impl AnnotationType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            meta_annotations: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_meta_annotation(mut self, meta_annotation: AnnotationInstance) -> Self {
        self.meta_annotations.push(meta_annotation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    pub fn meta_annotations(&self) -> &[AnnotationInstance] {
        &self.meta_annotations
    }

    pub fn meta_annotation(&self, type_name: &str) -> Option<&AnnotationInstance> {
        self.meta_annotations
            .iter()
            .find(|ma| ma.type_name == type_name)
    }
}

// ------------------------------------------------------------------------------------------------
// Public Types ❱ AliasRef
// ------------------------------------------------------------------------------------------------

/// Points to an attribute in some annotation in the closure, usually an ancestor: the target the
/// `@AliasFor` meta-annotation on an attribute names, explicitly or by convention.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct AliasRef {
    pub target_type: String,
    pub attribute_name: String,
}

impl AliasRef {
    pub fn new(target_type: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            attribute_name: attribute_name.into(),
        }
    }
}

impl fmt::Display for AliasRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.target_type, self.attribute_name)
    }
}
