/*!
Provide [`MergedAnnotation`], the read-only query surface over one node of an
[`AnnotationTypeMappings`] closure plus the root attribute bundle found on an element.
*/

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::mappings::AnnotationTypeMappings;
use super::types::AnnotationInstance;
use super::value::AttributeValue;
use crate::error::{Error, Result};
use crate::synthesis::SynthesizedAnnotation;

// ------------------------------------------------------------------------------------------------
// Public Types ❱ AsMapOptions
// ------------------------------------------------------------------------------------------------

/// Controls how [`MergedAnnotation::as_map`] renders class references and nested annotations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AsMapOptions {
    class_to_string: bool,
    annotation_to_map: bool,
}

impl AsMapOptions {
    pub fn class_to_string(mut self) -> Self {
        self.class_to_string = true;
        self
    }

    pub fn annotation_to_map(mut self) -> Self {
        self.annotation_to_map = true;
        self
    }
}

/// The value type of the map produced by [`MergedAnnotation::as_map`]: every `AttributeValue`
/// shape, with `ClassRef`/`Nested` rendered according to `AsMapOptions`.
#[derive(Clone, Debug, PartialEq)]
pub enum MapValue {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// A class reference, unless `class_to_string` was set, in which case it renders as `String`.
    Class(String),
    Enum(String, String),
    /// A nested annotation left as its raw bundle because `annotation_to_map` was not set.
    ///
    /// The spec's "leave nested annotations as merged views" option is approximated here: turning
    /// an arbitrary nested `AttributeValue::Nested` into a full `MergedAnnotation` would require
    /// re-resolving its type against a `TypeResolver`, which `as_map` does not have in hand (the
    /// resolver is only needed at mapping-build time, not at read time). The raw bundle is
    /// returned instead; see DESIGN.md.
    Nested(AnnotationInstance),
    NestedMap(HashMap<String, MapValue>),
    Array(Vec<MapValue>),
}

fn to_map_value(value: &AttributeValue, options: AsMapOptions) -> MapValue {
    match value {
        AttributeValue::Boolean(v) => MapValue::Boolean(*v),
        AttributeValue::Byte(v) => MapValue::Byte(*v),
        AttributeValue::Char(v) => MapValue::Char(*v),
        AttributeValue::Short(v) => MapValue::Short(*v),
        AttributeValue::Int(v) => MapValue::Int(*v),
        AttributeValue::Long(v) => MapValue::Long(*v),
        AttributeValue::Float(v) => MapValue::Float(v.into_inner()),
        AttributeValue::Double(v) => MapValue::Double(v.into_inner()),
        AttributeValue::String(v) => MapValue::String(v.clone()),
        AttributeValue::ClassRef(name) => {
            if options.class_to_string {
                MapValue::String(name.clone())
            } else {
                MapValue::Class(name.clone())
            }
        }
        AttributeValue::EnumRef(type_name, constant) => {
            MapValue::Enum(type_name.clone(), constant.clone())
        }
        AttributeValue::Nested(instance) => {
            if options.annotation_to_map {
                let map = instance
                    .values
                    .iter()
                    .map(|(k, v)| (k.clone(), to_map_value(v, options)))
                    .collect();
                MapValue::NestedMap(map)
            } else {
                MapValue::Nested((**instance).clone())
            }
        }
        AttributeValue::Array(_, elements) => {
            MapValue::Array(elements.iter().map(|e| to_map_value(e, options)).collect())
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Public Types ❱ MergedAnnotation
// ------------------------------------------------------------------------------------------------

/// A read-only view over a merged annotation: either [`Repr::Mapped`] (the annotation is present,
/// directly or through a meta-annotation chain) or [`Repr::Missing`] (a singleton-shaped variant
/// whose every getter but `is_present`/`depth`/`aggregate_index`/`as_map` fails).
#[derive(Clone)]
pub struct MergedAnnotation(Repr);

#[derive(Clone)]
enum Repr {
    Mapped {
        mappings: Arc<AnnotationTypeMappings>,
        index: usize,
        root: Arc<HashMap<String, AttributeValue>>,
        aggregate_index: i32,
        non_merged: bool,
        #[allow(clippy::type_complexity)]
        attribute_filter: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
    },
    Missing,
}

impl fmt::Debug for MergedAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Mapped {
                index,
                aggregate_index,
                non_merged,
                mappings,
                ..
            } => f
                .debug_struct("MergedAnnotation")
                .field("annotation_type", &mappings.mapping(*index).annotation_type().name())
                .field("depth", &mappings.mapping(*index).depth())
                .field("aggregate_index", aggregate_index)
                .field("non_merged", non_merged)
                .finish(),
            Repr::Missing => f.debug_struct("MergedAnnotation::Missing").finish(),
        }
    }
}

macro_rules! typed_getter {
    ($name:ident, $variant:ident, $ty:ty) => {
        ::paste::paste! {
            /// Typed accessor for a
            #[doc = concat!("`", stringify!($variant), "`")]
            /// attribute. Fails with `MissingAttribute` if the annotation does not declare
            /// `attribute_name`, or `AttributeKindMismatch` if it is declared with a different kind.
            pub fn [< get_ $name >](&self, attribute_name: &str) -> Result<$ty> {
                match self.attribute_value(attribute_name)? {
                    AttributeValue::$variant(v) => Ok(v),
                    other => Err(self.kind_mismatch(attribute_name, stringify!($variant), &other)),
                }
            }

            #[doc = concat!("Array-valued counterpart of [`Self::get_", stringify!($name), "`].")]
            /// A scalar resolved value is coerced into a single-element array per the array
            /// coercion post-condition.
            pub fn [< get_ $name _array >](&self, attribute_name: &str) -> Result<Vec<$ty>> {
                match self.attribute_value(attribute_name)? {
                    AttributeValue::Array(_, elements) => elements
                        .into_iter()
                        .map(|e| match e {
                            AttributeValue::$variant(v) => Ok(v),
                            other => Err(self.kind_mismatch(attribute_name, stringify!($variant), &other)),
                        })
                        .collect(),
                    AttributeValue::$variant(v) => Ok(vec![v]),
                    other => Err(self.kind_mismatch(attribute_name, stringify!($variant), &other)),
                }
            }
        }
    };
}

impl MergedAnnotation {
    pub(crate) fn mapped(
        mappings: Arc<AnnotationTypeMappings>,
        index: usize,
        root: Arc<HashMap<String, AttributeValue>>,
        aggregate_index: i32,
    ) -> Self {
        Self(Repr::Mapped {
            mappings,
            index,
            root,
            aggregate_index,
            non_merged: false,
            attribute_filter: None,
        })
    }

    /// The singleton-shaped missing view.
    pub fn missing() -> Self {
        Self(Repr::Missing)
    }

    pub fn is_present(&self) -> bool {
        matches!(self.0, Repr::Mapped { .. })
    }

    pub fn is_directly_present(&self) -> bool {
        self.depth() == 0
    }

    pub fn is_meta_present(&self) -> bool {
        self.is_present() && self.depth() > 0
    }

    pub fn depth(&self) -> i32 {
        match &self.0 {
            Repr::Mapped { mappings, index, .. } => mappings.mapping(*index).depth(),
            Repr::Missing => -1,
        }
    }

    pub fn aggregate_index(&self) -> i32 {
        match &self.0 {
            Repr::Mapped { aggregate_index, .. } => *aggregate_index,
            Repr::Missing => -1,
        }
    }

    pub fn annotation_type(&self) -> Result<String> {
        match &self.0 {
            Repr::Mapped { mappings, index, .. } => {
                Ok(mappings.mapping(*index).annotation_type().name().to_string())
            }
            Repr::Missing => Err(Error::MissingAnnotation),
        }
    }

    /// The mapping's parent, carrying the same root bundle — `None` at the root mapping or on a
    /// missing view.
    pub fn parent(&self) -> Option<MergedAnnotation> {
        match &self.0 {
            Repr::Mapped {
                mappings,
                index,
                root,
                aggregate_index,
                non_merged,
                attribute_filter,
            } => {
                let parent_index = mappings.mapping(*index).parent()?;
                Some(Self(Repr::Mapped {
                    mappings: mappings.clone(),
                    index: parent_index,
                    root: root.clone(),
                    aggregate_index: *aggregate_index,
                    non_merged: *non_merged,
                    attribute_filter: attribute_filter.clone(),
                }))
            }
            Repr::Missing => None,
        }
    }

    /// A view that disables explicit-alias and convention-override resolution, keeping only
    /// mirror enforcement and declared-site/default fall-throughs.
    pub fn with_non_merged_attributes(&self) -> Self {
        match &self.0 {
            Repr::Mapped {
                mappings,
                index,
                root,
                aggregate_index,
                attribute_filter,
                ..
            } => Self(Repr::Mapped {
                mappings: mappings.clone(),
                index: *index,
                root: root.clone(),
                aggregate_index: *aggregate_index,
                non_merged: true,
                attribute_filter: attribute_filter.clone(),
            }),
            Repr::Missing => Self::missing(),
        }
    }

    /// A derived view whose `as_map` omits attributes for which `predicate` returns `false`.
    /// Typed getters are unaffected — the filter applies only to `as_map`.
    pub fn filter_attributes(&self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        match &self.0 {
            Repr::Mapped {
                mappings,
                index,
                root,
                aggregate_index,
                non_merged,
                ..
            } => Self(Repr::Mapped {
                mappings: mappings.clone(),
                index: *index,
                root: root.clone(),
                aggregate_index: *aggregate_index,
                non_merged: *non_merged,
                attribute_filter: Some(Arc::new(predicate)),
            }),
            Repr::Missing => Self::missing(),
        }
    }

    /// A derived view whose `as_map` omits attributes currently holding their declared default.
    pub fn filter_default_values(&self) -> Self {
        let base = self.clone();
        self.filter_attributes(move |name| base.has_non_default_value(name).unwrap_or(true))
    }

    /// Total accessor: `None` if the attribute is unknown or the view is missing, never an error.
    pub fn get_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.attribute_value(name).ok()
    }

    pub fn has_default_value(&self, name: &str) -> Result<bool> {
        let resolved = self.attribute_value(name)?;
        if resolved.is_empty_array() {
            return Ok(true);
        }
        let default = match &self.0 {
            Repr::Mapped { mappings, index, .. } => mappings
                .mapping(*index)
                .annotation_type()
                .attribute(name)
                .and_then(|d| d.default_value())
                .cloned(),
            Repr::Missing => return Err(Error::MissingAnnotation),
        };
        Ok(default.as_ref() == Some(&resolved))
    }

    pub fn has_non_default_value(&self, name: &str) -> Result<bool> {
        self.has_default_value(name).map(|v| !v)
    }

    pub fn get_class(&self, attribute_name: &str) -> Result<String> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::ClassRef(name) => Ok(name),
            other => Err(self.kind_mismatch(attribute_name, "ClassRef", &other)),
        }
    }

    pub fn get_class_array(&self, attribute_name: &str) -> Result<Vec<String>> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::Array(_, elements) => elements
                .into_iter()
                .map(|e| match e {
                    AttributeValue::ClassRef(name) => Ok(name),
                    other => Err(self.kind_mismatch(attribute_name, "ClassRef", &other)),
                })
                .collect(),
            AttributeValue::ClassRef(name) => Ok(vec![name]),
            other => Err(self.kind_mismatch(attribute_name, "ClassRef", &other)),
        }
    }

    pub fn get_enum(&self, attribute_name: &str) -> Result<(String, String)> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::EnumRef(type_name, constant) => Ok((type_name, constant)),
            other => Err(self.kind_mismatch(attribute_name, "EnumRef", &other)),
        }
    }

    pub fn get_nested(&self, attribute_name: &str) -> Result<AnnotationInstance> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::Nested(instance) => Ok(*instance),
            other => Err(self.kind_mismatch(attribute_name, "Nested", &other)),
        }
    }

    pub fn get_nested_array(&self, attribute_name: &str) -> Result<Vec<AnnotationInstance>> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::Array(_, elements) => elements
                .into_iter()
                .map(|e| match e {
                    AttributeValue::Nested(instance) => Ok(*instance),
                    other => Err(self.kind_mismatch(attribute_name, "Nested", &other)),
                })
                .collect(),
            AttributeValue::Nested(instance) => Ok(vec![*instance]),
            other => Err(self.kind_mismatch(attribute_name, "Nested", &other)),
        }
    }

    pub fn get_float(&self, attribute_name: &str) -> Result<f32> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::Float(v) => Ok(v.into_inner()),
            other => Err(self.kind_mismatch(attribute_name, "Float", &other)),
        }
    }

    pub fn get_float_array(&self, attribute_name: &str) -> Result<Vec<f32>> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::Array(_, elements) => elements
                .into_iter()
                .map(|e| match e {
                    AttributeValue::Float(v) => Ok(v.into_inner()),
                    other => Err(self.kind_mismatch(attribute_name, "Float", &other)),
                })
                .collect(),
            AttributeValue::Float(v) => Ok(vec![v.into_inner()]),
            other => Err(self.kind_mismatch(attribute_name, "Float", &other)),
        }
    }

    pub fn get_double(&self, attribute_name: &str) -> Result<f64> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::Double(v) => Ok(v.into_inner()),
            other => Err(self.kind_mismatch(attribute_name, "Double", &other)),
        }
    }

    pub fn get_double_array(&self, attribute_name: &str) -> Result<Vec<f64>> {
        match self.attribute_value(attribute_name)? {
            AttributeValue::Array(_, elements) => elements
                .into_iter()
                .map(|e| match e {
                    AttributeValue::Double(v) => Ok(v.into_inner()),
                    other => Err(self.kind_mismatch(attribute_name, "Double", &other)),
                })
                .collect(),
            AttributeValue::Double(v) => Ok(vec![v.into_inner()]),
            other => Err(self.kind_mismatch(attribute_name, "Double", &other)),
        }
    }

    typed_getter!(bool, Boolean, bool);
    typed_getter!(byte, Byte, i8);
    typed_getter!(char, Char, u16);
    typed_getter!(short, Short, i16);
    typed_getter!(int, Int, i32);
    typed_getter!(long, Long, i64);
    typed_getter!(string, String, String);

    /// Renders every declared attribute of this view's annotation type (after the attribute
    /// filter, if any) into a structural map. See [`AsMapOptions`] for how class references and
    /// nested annotations are rendered.
    pub fn as_map(&self, options: AsMapOptions) -> HashMap<String, MapValue> {
        match &self.0 {
            Repr::Mapped {
                mappings,
                index,
                attribute_filter,
                ..
            } => {
                let annotation_type = mappings.mapping(*index).annotation_type();
                annotation_type
                    .attributes()
                    .iter()
                    .filter(|attr| attribute_filter.as_ref().map_or(true, |f| f(attr.name())))
                    .filter_map(|attr| {
                        self.attribute_value(attr.name())
                            .ok()
                            .map(|v| (attr.name().to_string(), to_map_value(&v, options)))
                    })
                    .collect()
            }
            Repr::Missing => HashMap::new(),
        }
    }

    /// Materialise the crate's fallback structural value. Callers with a richer native proxy
    /// mechanism implement their own adapter against the same accessors instead.
    pub fn synthesize(&self) -> Result<SynthesizedAnnotation> {
        match &self.0 {
            Repr::Mapped { mappings, index, .. } => {
                let annotation_type = mappings.mapping(*index).annotation_type();
                let mut values = HashMap::with_capacity(annotation_type.attributes().len());
                for attr in annotation_type.attributes() {
                    values.insert(attr.name().to_string(), self.attribute_value(attr.name())?);
                }
                Ok(SynthesizedAnnotation::new(annotation_type.name().to_string(), values, {
                    let mut defaults = HashMap::with_capacity(annotation_type.attributes().len());
                    for attr in annotation_type.attributes() {
                        if let Some(default) = attr.default_value() {
                            defaults.insert(attr.name().to_string(), default.clone());
                        }
                    }
                    defaults
                }))
            }
            Repr::Missing => Err(Error::MissingAnnotation),
        }
    }

    /// `synthesize()`, but only if `condition` accepts this view.
    pub fn synthesize_if(&self, condition: impl Fn(&Self) -> bool) -> Option<SynthesizedAnnotation> {
        if condition(self) {
            self.synthesize().ok()
        } else {
            None
        }
    }

    // --------------------------------------------------------------------------------------
    // Private
    // --------------------------------------------------------------------------------------

    fn attribute_value(&self, name: &str) -> Result<AttributeValue> {
        match &self.0 {
            Repr::Missing => Err(Error::MissingAnnotation),
            Repr::Mapped {
                mappings,
                index,
                root,
                non_merged,
                ..
            } => mappings.resolve_attribute(*index, name, root, *non_merged),
        }
    }

    fn kind_mismatch(&self, name: &str, expected: &str, found: &AttributeValue) -> Error {
        let annotation_type = self.annotation_type().unwrap_or_else(|_| "?".to_string());
        Error::AttributeKindMismatch {
            annotation_type,
            attribute_name: name.to_string(),
            expected: expected.to_string(),
            found: found.kind().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::filter::AnnotationFilter;
    use crate::model::repeatable::RepeatableContainers;
    use crate::model::types::{AnnotationType, AttributeDescriptor};
    use crate::model::value::ValueKind;
    use crate::resolver::TypeResolver;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap as StdHashMap;

    struct MapResolver(StdHashMap<String, AnnotationType>);

    impl TypeResolver for MapResolver {
        fn resolve(&self, name: &str) -> Option<AnnotationType> {
            self.0.get(name).cloned()
        }
    }

    fn simple_view() -> MergedAnnotation {
        let outer = AnnotationType::new("Outer").with_attribute(
            AttributeDescriptor::new("name", ValueKind::String)
                .with_default(AttributeValue::String(String::new())),
        );
        let mut types = StdHashMap::new();
        types.insert("Outer".to_string(), outer);
        let resolver = MapResolver(types);

        let mappings = Arc::new(
            AnnotationTypeMappings::build(
                AnnotationFilter::None,
                "Outer",
                &resolver,
                &RepeatableContainers::None,
            )
            .unwrap()
            .unwrap(),
        );
        let mut root = StdHashMap::new();
        root.insert("name".to_string(), AttributeValue::String("x".to_string()));
        MergedAnnotation::mapped(mappings, 0, Arc::new(root), 0)
    }

    #[test]
    fn test_missing_view_fails_every_getter_but_is_present() {
        let missing = MergedAnnotation::missing();
        assert!(!missing.is_present());
        assert_eq!(missing.depth(), -1);
        assert_eq!(missing.aggregate_index(), -1);
        assert!(missing.annotation_type().is_err());
        assert!(missing.get_string("name").is_err());
        assert!(missing.as_map(AsMapOptions::default()).is_empty());
    }

    #[test]
    fn test_typed_getter_roundtrip() {
        let view = simple_view();
        assert!(view.is_present());
        assert!(view.is_directly_present());
        assert_eq!(view.get_string("name").unwrap(), "x");
        assert!(view.get_bool("name").is_err());
    }

    #[test]
    fn test_missing_attribute_name_errors() {
        let view = simple_view();
        assert!(matches!(
            view.get_string("nope").unwrap_err(),
            Error::MissingAttribute { .. }
        ));
    }

    #[test]
    fn test_as_map_respects_filter() {
        let view = simple_view();
        let filtered = view.filter_attributes(|name| name != "name");
        assert!(filtered.as_map(AsMapOptions::default()).is_empty());
        assert_eq!(view.as_map(AsMapOptions::default()).len(), 1);
    }
}
