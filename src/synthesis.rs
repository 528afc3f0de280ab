/*!
Provide the fallback structural value produced by [`MergedAnnotation::synthesize`](crate::model::merged::MergedAnnotation::synthesize),
and a trait seam for callers who want their own proxy type handed back instead.

This crate does not build a runtime-generated proxy against some native annotation interface — it
has no such interface to generate against. [`SynthesizedAnnotation`] carries exactly the resolved
attribute bundle and implements equality, hashing, and display the way a synthesized annotation
conventionally does: two synthesized annotations of the same type are equal iff every attribute
value agrees, and the hash is the per-member `(127 * name.hash) XOR value.hash`, summed, so that
equal instances always hash equally regardless of attribute declaration order.
*/

use std::collections::HashMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::model::value::AttributeValue;

// ------------------------------------------------------------------------------------------------
// Public Types ❱ SynthesizedAnnotation
// ------------------------------------------------------------------------------------------------

/// A structural stand-in for a native annotation instance: the resolved value of every attribute
/// declared by the annotation's type, plus the declared defaults needed to omit default-valued
/// attributes from [`Display`].
#[derive(Clone, Debug)]
pub struct SynthesizedAnnotation {
    type_name: String,
    values: HashMap<String, AttributeValue>,
    defaults: HashMap<String, AttributeValue>,
}

impl SynthesizedAnnotation {
    pub fn new(
        type_name: String,
        values: HashMap<String, AttributeValue>,
        defaults: HashMap<String, AttributeValue>,
    ) -> Self {
        Self {
            type_name,
            values,
            defaults,
        }
    }

    pub fn annotation_type(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, attribute_name: &str) -> Option<&AttributeValue> {
        self.values.get(attribute_name)
    }

    pub fn values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    fn is_default(&self, name: &str) -> bool {
        self.defaults.get(name) == self.values.get(name)
    }
}

impl PartialEq for SynthesizedAnnotation {
    /// Two synthesized annotations are equal iff they share a type and every attribute value
    /// agrees. `ClassRef` compares by name and `EnumRef` by `(type, constant)`, since
    /// `AttributeValue`'s own `PartialEq` already does that; nested annotations compare by their
    /// raw resolved bundle rather than a recursively synthesized view — see DESIGN.md.
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.values == other.values
    }
}

impl Eq for SynthesizedAnnotation {}

impl Hash for SynthesizedAnnotation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);

        let mut member_sum: u64 = 0;
        for (name, value) in &self.values {
            let mut name_hasher = DefaultHasher::new();
            name.hash(&mut name_hasher);
            let name_hash = name_hasher.finish();

            let mut value_hasher = DefaultHasher::new();
            value.hash(&mut value_hasher);
            let value_hash = value_hasher.finish();

            member_sum = member_sum.wrapping_add(127u64.wrapping_mul(name_hash) ^ value_hash);
        }
        member_sum.hash(state);
    }
}

impl fmt::Display for SynthesizedAnnotation {
    /// `@Type(attr1 = v1, attr2 = v2, …)`, attributes sorted by name, default-valued attributes
    /// omitted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().filter(|n| !self.is_default(n)).collect();
        names.sort();
        let rendered: Vec<String> = names
            .into_iter()
            .map(|name| format!("{name} = {}", self.values[name].render()))
            .collect();
        write!(f, "@{}({})", self.type_name, rendered.join(", "))
    }
}

// ------------------------------------------------------------------------------------------------
// Public Types ❱ Synthesize
// ------------------------------------------------------------------------------------------------

/// Implemented by callers with a richer native annotation-proxy mechanism who want
/// `MergedAnnotation::synthesize` to hand back their own type rather than [`SynthesizedAnnotation`].
pub trait Synthesize: Sized {
    fn from_synthesized(synthesized: SynthesizedAnnotation) -> Self;
}

impl Synthesize for SynthesizedAnnotation {
    fn from_synthesized(synthesized: SynthesizedAnnotation) -> Self {
        synthesized
    }
}
