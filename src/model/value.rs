/*!
Provide the tagged value type that every annotation attribute resolves to, along with the
matching kind descriptor used to validate and coerce those values.
*/

use ordered_float::OrderedFloat;
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::AnnotationInstance;

// ------------------------------------------------------------------------------------------------
// Public Types ❱ ValueKind
// ------------------------------------------------------------------------------------------------

/// The declared kind of an attribute, precise enough to distinguish a scalar from an array of
/// the same element kind, and to name the nested annotation type for `Nested`/`Array<Nested>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ValueKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    ClassRef,
    EnumRef,
    /// Nested annotation of the named type.
    Nested(String),
    Array(Box<ValueKind>),
}

impl ValueKind {
    /// `true` if this kind is an array of some element kind.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// The element kind of an array, or `self` if this is already scalar.
    pub fn element_kind(&self) -> &ValueKind {
        match self {
            Self::Array(inner) => inner.element_kind(),
            other => other,
        }
    }

    /// Two kinds are compatible for alias/mirror/convention purposes if they are structurally
    /// equal, or if one is a scalar and the other is an array of that same scalar kind (array
    /// coercion applies at read time, not at kind-compatibility time).
    pub fn is_compatible_with(&self, other: &ValueKind) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Self::Array(a), b) => a.as_ref() == b,
            (a, Self::Array(b)) => a == b.as_ref(),
            _ => false,
        }
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Byte => write!(f, "byte"),
            Self::Char => write!(f, "char"),
            Self::Short => write!(f, "short"),
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "String"),
            Self::ClassRef => write!(f, "Class"),
            Self::EnumRef => write!(f, "Enum"),
            Self::Nested(type_name) => write!(f, "{type_name}"),
            Self::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Public Types ❱ AttributeValue
// ------------------------------------------------------------------------------------------------

/// A tagged union of every legal annotation attribute value. Deliberately closed: every consumer
/// of attribute values is expected to match exhaustively rather than carry an "any" escape hatch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum AttributeValue {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    String(String),
    /// The canonical form of a class-valued attribute: a fully qualified type name. Conversion to
    /// and from a loaded class handle happens only at the synthesis/adapter boundary.
    ClassRef(String),
    /// `(type name, constant name)`.
    EnumRef(String, String),
    Nested(Box<AnnotationInstance>),
    Array(ValueKind, Vec<AttributeValue>),
}

impl AttributeValue {
    /// The kind of this value, as it would be declared.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Byte(_) => ValueKind::Byte,
            Self::Char(_) => ValueKind::Char,
            Self::Short(_) => ValueKind::Short,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::String(_) => ValueKind::String,
            Self::ClassRef(_) => ValueKind::ClassRef,
            Self::EnumRef(_, _) => ValueKind::EnumRef,
            Self::Nested(inst) => ValueKind::Nested(inst.type_name.clone()),
            Self::Array(element_kind, _) => ValueKind::Array(Box::new(element_kind.clone())),
        }
    }

    /// `true` if this value is an array with no elements.
    pub fn is_empty_array(&self) -> bool {
        matches!(self, Self::Array(_, elements) if elements.is_empty())
    }

    /// Coerce a scalar value into a single-element array of the given element kind, if the
    /// target kind calls for an array and this value is not already one. Mirrors §4.3's array
    /// coercion post-condition.
    pub fn coerce_to(self, target_kind: &ValueKind) -> Self {
        match (target_kind, &self) {
            (ValueKind::Array(element_kind), Self::Array(_, _)) => {
                let _ = element_kind;
                self
            }
            (ValueKind::Array(element_kind), _) => {
                Self::Array(element_kind.as_ref().clone(), vec![self])
            }
            _ => self,
        }
    }

    /// Render this value the way the synthesized `to_string` adapter does: strings quoted,
    /// classes as `Name.class`, arrays braced.
    pub fn render(&self) -> String {
        match self {
            Self::Boolean(v) => v.to_string(),
            Self::Byte(v) => v.to_string(),
            Self::Char(v) => char::from_u32(*v as u32)
                .map(|c| format!("'{c}'"))
                .unwrap_or_else(|| v.to_string()),
            Self::Short(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::String(v) => format!("{v:?}"),
            Self::ClassRef(name) => format!("{name}.class"),
            Self::EnumRef(type_name, constant) => format!("{type_name}.{constant}"),
            Self::Nested(inst) => inst.render(),
            Self::Array(_, elements) => {
                let rendered: Vec<String> = elements.iter().map(AttributeValue::render).collect();
                format!("{{{}}}", rendered.join(", "))
            }
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_coerce_scalar_to_array() {
        let value = AttributeValue::Int(7);
        let coerced = value.coerce_to(&ValueKind::Array(Box::new(ValueKind::Int)));
        assert_eq!(
            coerced,
            AttributeValue::Array(ValueKind::Int, vec![AttributeValue::Int(7)])
        );
    }

    #[test]
    fn test_coerce_array_is_identity() {
        let value = AttributeValue::Array(ValueKind::Int, vec![AttributeValue::Int(1)]);
        let coerced = value.clone().coerce_to(&ValueKind::Array(Box::new(ValueKind::Int)));
        assert_eq!(coerced, value);
    }

    #[test]
    fn test_class_ref_equality_is_by_name() {
        assert_eq!(
            AttributeValue::ClassRef("com.example.Foo".to_string()),
            AttributeValue::ClassRef("com.example.Foo".to_string())
        );
    }

    #[test]
    fn test_kind_compatibility_allows_scalar_vs_array() {
        let scalar = ValueKind::String;
        let array = ValueKind::Array(Box::new(ValueKind::String));
        assert!(scalar.is_compatible_with(&array));
        assert!(array.is_compatible_with(&scalar));
        assert!(!scalar.is_compatible_with(&ValueKind::Int));
    }

    #[test]
    fn test_render_omits_nothing_but_formats_kinds() {
        assert_eq!(AttributeValue::String("x".into()).render(), "\"x\"");
        assert_eq!(
            AttributeValue::ClassRef("a.B".into()).render(),
            "a.B.class"
        );
        assert_eq!(
            AttributeValue::Array(ValueKind::Int, vec![AttributeValue::Int(1), AttributeValue::Int(2)])
                .render(),
            "{1, 2}"
        );
    }
}
