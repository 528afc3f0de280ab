/*!
Merges chains of meta-annotations into a single, aliased, canonicalised view.

A program element (a class, method, or field, in the caller's domain model) carries directly
declared annotations. Each annotation's type may itself be annotated with further annotations —
its *meta-annotations* — and so on, transitively. This crate pre-computes that transitive closure
for a chosen root annotation type and exposes a [`MergedAnnotation`](model::merged::MergedAnnotation)
view over it: attribute reads are resolved through explicit aliases (`@AliasFor`), convention-based
name matching, mirror sets, and repeatable-container unwrapping, all without the caller ever
walking the meta-annotation graph themselves.

This crate does not walk a class hierarchy or resolve annotation type metadata itself — those are
supplied by the caller through the [`Scanner`] and [`TypeResolver`] traits. Nor does it build
runtime annotation proxies for a native type system; it ships one concrete fallback
([`synthesis::SynthesizedAnnotation`]) and a trait seam for callers with a richer native adapter.

# Features

## serde

Derives `Serialize`/`Deserialize` for the data-model types (`AttributeValue`, `AnnotationType`,
`AnnotationInstance`, …) so embedders can snapshot or transmit raw annotation bundles. The mapping
closure and cache are never serialized.

# Example

```
use merge_annotations::model::filter::AnnotationFilter;
use merge_annotations::model::repeatable::RepeatableContainers;
use merge_annotations::model::types::{AnnotationInstance, AnnotationType, AttributeDescriptor};
use merge_annotations::model::value::{AttributeValue, ValueKind};
use merge_annotations::model::collection::MergedAnnotations;
use merge_annotations::resolver::TypeResolver;

struct FixedResolver;

impl TypeResolver for FixedResolver {
    fn resolve(&self, name: &str) -> Option<AnnotationType> {
        match name {
            "Outer" => Some(AnnotationType::new("Outer").with_attribute(
                AttributeDescriptor::new("name", ValueKind::String)
                    .with_default(AttributeValue::String(String::new())),
            )),
            _ => None,
        }
    }
}

let instance = AnnotationInstance::new("Outer").with_value("name", AttributeValue::String("x".into()));
let merged = MergedAnnotations::from_instances(
    "test",
    vec![instance],
    RepeatableContainers::default(),
    AnnotationFilter::default(),
    &FixedResolver,
);
let found = merged.get("Outer", None, None).unwrap();
assert!(found.is_present());
assert_eq!(found.get_string("name").unwrap(), "x");
```
*/

#![warn(
    unknown_lints,
    // ---------- Stylistic
    absolute_paths_not_starting_with_crate,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    macro_use_extern_crate,
    nonstandard_style, /* group */
    noop_method_call,
    rust_2018_idioms,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    // ---------- Future
    future_incompatible, /* group */
    rust_2021_compatibility, /* group */
    // ---------- Public
    missing_debug_implementations,
    // missing_docs,
    unreachable_pub,
    // ---------- Unsafe
    unsafe_code,
    unsafe_op_in_unsafe_fn,
    // ---------- Unused
    unused, /* group */
)]
#![deny(
    // ---------- Public
    exported_private_dependencies,
    // ---------- Deprecated
    anonymous_parameters,
    bare_trait_objects,
    ellipsis_inclusive_range_patterns,
    // ---------- Unsafe
    deref_nullptr,
    drop_bounds,
    dyn_drop,
)]

// ------------------------------------------------------------------------------------------------
// Modules
// ------------------------------------------------------------------------------------------------

pub mod error;
pub use error::{Error, Result};

pub mod cache;

pub mod model;

pub mod resolver;
pub use resolver::TypeResolver;

pub mod scanner;
pub use scanner::{Scanner, SearchStrategy};

pub mod synthesis;
