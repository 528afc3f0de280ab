//! End-to-end scenarios exercising the engine through its public API only: simple alias,
//! convention override, mirror set accept/reject/shadow, repeatable expansion, inheritance
//! selectors, and synthesis equality/hash/`to_string`.

use std::collections::HashMap;

use merge_annotations::model::collection::{MergedAnnotations, Predicate, Selector};
use merge_annotations::model::filter::AnnotationFilter;
use merge_annotations::model::mappings::AnnotationTypeMappings;
use merge_annotations::model::repeatable::RepeatableContainers;
use merge_annotations::model::types::{AliasDeclaration, AnnotationInstance, AnnotationType, AttributeDescriptor};
use merge_annotations::model::value::{AttributeValue, ValueKind};
use merge_annotations::resolver::TypeResolver;

struct MapResolver(HashMap<String, AnnotationType>);

impl MapResolver {
    fn new(types: Vec<AnnotationType>) -> Self {
        let mut map = HashMap::new();
        for t in types {
            map.insert(t.name().to_string(), t);
        }
        Self(map)
    }
}

impl TypeResolver for MapResolver {
    fn resolve(&self, name: &str) -> Option<AnnotationType> {
        self.0.get(name).cloned()
    }
}

#[test]
fn test_simple_alias_reads_through_to_meta_annotation_default() {
    AnnotationTypeMappings::clear_cache();

    let outer = AnnotationType::new("Outer").with_attribute(
        AttributeDescriptor::new("name", ValueKind::String)
            .with_default(AttributeValue::String(String::new())),
    );
    let inner = AnnotationType::new("Inner")
        .with_attribute(
            AttributeDescriptor::new("label", ValueKind::String)
                .with_default(AttributeValue::String(String::new()))
                .with_alias_for(AliasDeclaration::new().annotation("Outer").attribute("name")),
        )
        .with_meta_annotation(AnnotationInstance::new("Outer"));
    let resolver = MapResolver::new(vec![outer, inner]);

    let instance = AnnotationInstance::new("Inner").with_value("label", AttributeValue::String("x".into()));
    let merged = MergedAnnotations::from_instances(
        "element",
        vec![instance],
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );

    let outer_view = merged.get("Outer", None, None).unwrap();
    assert!(outer_view.is_present());
    assert_eq!(outer_view.get_string("name").unwrap(), "x");
}

#[test]
fn test_convention_override_matches_identically_named_compatible_attribute() {
    AnnotationTypeMappings::clear_cache();

    // "value" is deliberately excluded from convention-based override matching (see
    // `build_convention_overrides`), so this uses an unrelated attribute name instead.
    let outer = AnnotationType::new("Outer").with_attribute(
        AttributeDescriptor::new("timeout", ValueKind::Int).with_default(AttributeValue::Int(30)),
    );
    let inner = AnnotationType::new("Inner")
        .with_attribute(AttributeDescriptor::new("timeout", ValueKind::Int).with_default(AttributeValue::Int(0)))
        .with_meta_annotation(AnnotationInstance::new("Outer"));
    let resolver = MapResolver::new(vec![outer, inner]);

    let instance = AnnotationInstance::new("Inner").with_value("timeout", AttributeValue::Int(99));
    let merged = MergedAnnotations::from_instances(
        "element",
        vec![instance],
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );

    let outer_view = merged.get("Outer", None, None).unwrap();
    assert_eq!(outer_view.get_int("timeout").unwrap(), 99);
}

fn mirror_type() -> AnnotationType {
    AnnotationType::new("Mirrored")
        .with_attribute(
            AttributeDescriptor::new("path", ValueKind::String)
                .with_default(AttributeValue::String(String::new()))
                .with_alias_for(AliasDeclaration::new().attribute("value")),
        )
        .with_attribute(
            AttributeDescriptor::new("value", ValueKind::String)
                .with_default(AttributeValue::String(String::new()))
                .with_alias_for(AliasDeclaration::new().attribute("path")),
        )
}

#[test]
fn test_mirror_set_accepts_when_agreeing() {
    AnnotationTypeMappings::clear_cache();
    let resolver = MapResolver::new(vec![mirror_type()]);

    let instance = AnnotationInstance::new("Mirrored")
        .with_value("path", AttributeValue::String("/a".into()))
        .with_value("value", AttributeValue::String("/a".into()));
    let merged = MergedAnnotations::from_instances(
        "element",
        vec![instance],
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );

    let view = merged.get("Mirrored", None, None).unwrap();
    assert_eq!(view.get_string("path").unwrap(), "/a");
    assert_eq!(view.get_string("value").unwrap(), "/a");
}

#[test]
fn test_mirror_set_rejects_when_disagreeing() {
    AnnotationTypeMappings::clear_cache();
    let resolver = MapResolver::new(vec![mirror_type()]);

    let instance = AnnotationInstance::new("Mirrored")
        .with_value("path", AttributeValue::String("/a".into()))
        .with_value("value", AttributeValue::String("/b".into()));
    let merged = MergedAnnotations::from_instances(
        "element",
        vec![instance],
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );

    let view = merged.get("Mirrored", None, None).unwrap();
    assert!(view.get_string("path").is_err());
}

#[test]
fn test_mirror_set_shadow_exception_ignores_local_only_disagreement() {
    AnnotationTypeMappings::clear_cache();

    // "path" mirrors "value" on Inner (a same-annotation self-alias). "value" is itself explicitly
    // aliased up to Outer#token, so it always resolves from the element's own bundle. The
    // meta-annotation declaration site on Outer additionally supplies a *local* override for
    // Inner's "path" that disagrees with whatever Outer#token resolves to. That disagreement
    // originates solely in this mapping's own declared-attributes override (step 3 of the
    // resolution order), so it must not count against the otherwise unanimous rest of the mirror
    // set — the resolved value should win with "value"'s (non-local) reading, not raise a conflict.
    let inner = AnnotationType::new("Inner")
        .with_attribute(
            AttributeDescriptor::new("path", ValueKind::String)
                .with_default(AttributeValue::String(String::new()))
                .with_alias_for(AliasDeclaration::new().attribute("value")),
        )
        .with_attribute(
            AttributeDescriptor::new("value", ValueKind::String)
                .with_default(AttributeValue::String(String::new()))
                .with_alias_for(AliasDeclaration::new().annotation("Outer").attribute("token")),
        );
    let outer = AnnotationType::new("Outer")
        .with_attribute(
            AttributeDescriptor::new("token", ValueKind::String)
                .with_default(AttributeValue::String(String::new())),
        )
        .with_meta_annotation(
            AnnotationInstance::new("Inner").with_value("path", AttributeValue::String("/meta".into())),
        );
    let resolver = MapResolver::new(vec![inner, outer]);

    let instance =
        AnnotationInstance::new("Outer").with_value("token", AttributeValue::String("/real".into()));
    let merged = MergedAnnotations::from_instances(
        "element",
        vec![instance],
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );

    let view = merged.get("Inner", None, None).unwrap();
    assert_eq!(view.get_string("path").unwrap(), "/real");
}

#[test]
fn test_repeatable_container_expands_transparently() {
    AnnotationTypeMappings::clear_cache();

    let item = AnnotationType::new("Tag")
        .with_attribute(AttributeDescriptor::new("name", ValueKind::String))
        .with_meta_annotation(
            AnnotationInstance::new("Repeatable").with_value("value", AttributeValue::ClassRef("Tags".into())),
        );
    let container = AnnotationType::new("Tags").with_attribute(AttributeDescriptor::new(
        "value",
        ValueKind::Array(Box::new(ValueKind::Nested("Tag".to_string()))),
    ));
    let resolver = MapResolver::new(vec![item, container]);

    let tags = AnnotationInstance::new("Tags").with_value(
        "value",
        AttributeValue::Array(
            ValueKind::Nested("Tag".to_string()),
            vec![
                AttributeValue::Nested(Box::new(
                    AnnotationInstance::new("Tag").with_value("name", AttributeValue::String("a".into())),
                )),
                AttributeValue::Nested(Box::new(
                    AnnotationInstance::new("Tag").with_value("name", AttributeValue::String("b".into())),
                )),
            ],
        ),
    );
    let merged = MergedAnnotations::from_instances(
        "element",
        vec![tags],
        RepeatableContainers::Standard,
        AnnotationFilter::None,
        &resolver,
    );

    assert!(!merged.is_present("Tags").unwrap());
    let seen = merged.stream(None).unwrap();
    let names: Vec<String> = seen
        .iter()
        .filter(|v| v.annotation_type().as_deref() == Ok("Tag"))
        .map(|v| v.get_string("name").unwrap())
        .collect();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_inheritance_selector_nearest_vs_highest_aggregate_index() {
    AnnotationTypeMappings::clear_cache();

    let marker = AnnotationType::new("Marker")
        .with_attribute(AttributeDescriptor::new("source", ValueKind::String));
    let resolver = MapResolver::new(vec![marker]);

    let element_level = AnnotationInstance::new("Marker").with_value("source", AttributeValue::String("element".into()));
    let superclass_level =
        AnnotationInstance::new("Marker").with_value("source", AttributeValue::String("superclass".into()));

    let merged = MergedAnnotations::from(
        &(),
        merge_annotations::SearchStrategy::Exhaustive,
        &FixedScanner {
            aggregates: vec![vec![element_level], vec![superclass_level]],
        },
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );

    let nearest = merged.get("Marker", None, Some(Selector::nearest())).unwrap();
    assert_eq!(nearest.get_string("source").unwrap(), "element");

    let highest = merged
        .get("Marker", None, Some(Selector::highest_aggregate_index()))
        .unwrap();
    assert_eq!(highest.get_string("source").unwrap(), "superclass");
}

struct FixedScanner {
    aggregates: Vec<Vec<AnnotationInstance>>,
}

impl merge_annotations::Scanner<()> for FixedScanner {
    fn directly_present(
        &self,
        _element: &(),
        _strategy: merge_annotations::SearchStrategy,
    ) -> merge_annotations::scanner::Aggregate {
        self.aggregates.first().cloned().unwrap_or_default()
    }

    fn aggregates(
        &self,
        _element: &(),
        _strategy: merge_annotations::SearchStrategy,
    ) -> Vec<merge_annotations::scanner::Aggregate> {
        self.aggregates.clone()
    }
}

#[test]
fn test_type_in_predicate_filters_stream() {
    AnnotationTypeMappings::clear_cache();

    let a = AnnotationType::new("A");
    let b = AnnotationType::new("B");
    let resolver = MapResolver::new(vec![a, b]);

    let merged = MergedAnnotations::from_instances(
        "element",
        vec![AnnotationInstance::new("A"), AnnotationInstance::new("B")],
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );

    let predicate = Predicate::type_in(["A"]);
    let found = merged.stream(Some(&predicate)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].annotation_type().unwrap(), "A");
}

#[test]
fn test_synthesis_equality_hash_and_display() {
    AnnotationTypeMappings::clear_cache();

    let sample = AnnotationType::new("Sample")
        .with_attribute(
            AttributeDescriptor::new("count", ValueKind::Int).with_default(AttributeValue::Int(0)),
        )
        .with_attribute(AttributeDescriptor::new("label", ValueKind::String));
    let resolver = MapResolver::new(vec![sample]);

    let one = AnnotationInstance::new("Sample").with_value("label", AttributeValue::String("x".into()));
    let two = AnnotationInstance::new("Sample").with_value("label", AttributeValue::String("x".into()));

    let merged_one = MergedAnnotations::from_instances(
        "one",
        vec![one],
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );
    let merged_two = MergedAnnotations::from_instances(
        "two",
        vec![two],
        RepeatableContainers::None,
        AnnotationFilter::None,
        &resolver,
    );

    let synth_one = merged_one.get("Sample", None, None).unwrap().synthesize().unwrap();
    let synth_two = merged_two.get("Sample", None, None).unwrap().synthesize().unwrap();

    assert_eq!(synth_one, synth_two);
    assert_eq!(synth_one.to_string(), "@Sample(label = \"x\")");

    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut h1 = DefaultHasher::new();
    synth_one.hash(&mut h1);
    let mut h2 = DefaultHasher::new();
    synth_two.hash(&mut h2);
    assert_eq!(h1.finish(), h2.finish());
}
