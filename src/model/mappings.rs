/*!
Provide `AnnotationTypeMappings`, the BFS closure of a root annotation type's meta-annotation
graph, and the attribute-mapping plan (§4.2–§4.3 of the design) that reads through it.
*/

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::trace;

use super::filter::AnnotationFilter;
use super::mapping::AnnotationTypeMapping;
use super::repeatable::RepeatableContainers;
use super::types::{AliasRef, AnnotationInstance, AnnotationType, AttributeDescriptor};
use super::value::AttributeValue;
use crate::error::{self, Result};
use crate::resolver::TypeResolver;

// ------------------------------------------------------------------------------------------------
// Public Types
// ------------------------------------------------------------------------------------------------

/// The BFS closure of a root annotation type's meta-annotation graph: one [`AnnotationTypeMapping`]
/// per reachable type, index `0` always the root. Built lazily and cached process-wide by
/// `(filter, root type name)`; see [`crate::cache`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationTypeMappings {
    filter: AnnotationFilter,
    root_type_name: String,
    mappings: Vec<AnnotationTypeMapping>,
}

impl AnnotationTypeMappings {
    /// Build the closure for `root_type_name`, or `Ok(None)` if the resolver cannot resolve the
    /// root type itself (nothing to build; distinct from a resolver miss on a meta-annotation deep
    /// in the graph, which merely prunes that branch).
    pub fn build(
        filter: AnnotationFilter,
        root_type_name: &str,
        resolver: &dyn TypeResolver,
        repeatables: &RepeatableContainers,
    ) -> Result<Option<Self>> {
        let Some(root_type) = resolver.resolve(root_type_name) else {
            trace!(root_type_name, "root annotation type did not resolve");
            return Ok(None);
        };

        let mut mappings = vec![AnnotationTypeMapping::root(root_type)];
        let mut queue: VecDeque<usize> = VecDeque::new();
        queue.push_back(0);

        while let Some(idx) = queue.pop_front() {
            let depth = mappings[idx].depth();
            let meta_annotations = mappings[idx].annotation_type().meta_annotations().to_vec();
            let own_name = mappings[idx].annotation_type().name().to_string();

            for ma in &meta_annotations {
                if filter.matches(&ma.type_name) {
                    continue;
                }
                if Self::ancestor_has_type(&mappings, idx, &ma.type_name) {
                    continue;
                }

                let elements: Vec<AnnotationInstance> = match repeatables.unwrap(ma, resolver) {
                    Some(elements) => elements,
                    None => vec![ma.clone()],
                };

                for element in elements {
                    let Some(element_type) = resolver.resolve(&element.type_name) else {
                        trace!(
                            meta_annotation = element.type_name,
                            on = own_name,
                            "meta-annotation did not resolve; pruning branch"
                        );
                        continue;
                    };
                    let child_idx = mappings.len();
                    mappings.push(AnnotationTypeMapping::child(
                        element_type,
                        depth + 1,
                        idx,
                        element.values.clone(),
                    ));
                    queue.push_back(child_idx);
                }
            }
        }

        Self::after_all_mappings_set(&mut mappings)?;

        Ok(Some(Self {
            filter,
            root_type_name: root_type_name.to_string(),
            mappings,
        }))
    }

    pub fn filter(&self) -> &AnnotationFilter {
        &self.filter
    }

    pub fn root_type_name(&self) -> &str {
        &self.root_type_name
    }

    pub fn mappings(&self) -> &[AnnotationTypeMapping] {
        &self.mappings
    }

    pub fn mapping(&self, idx: usize) -> &AnnotationTypeMapping {
        &self.mappings[idx]
    }

    /// The index of the mapping for `type_name`, if that type is reachable (and not filtered) in
    /// this closure. Unique by invariant 1.
    pub fn index_of(&self, type_name: &str) -> Option<usize> {
        self.mappings
            .iter()
            .position(|m| m.annotation_type().name() == type_name)
    }

    /// Look up (and build, through the process-wide cache) the closure for `root_type_name`.
    pub fn of(
        filter: AnnotationFilter,
        root_type_name: &str,
        resolver: &dyn TypeResolver,
        repeatables: &RepeatableContainers,
    ) -> Result<Option<Arc<Self>>> {
        crate::cache::mappings_for(filter, root_type_name, resolver, repeatables)
    }

    /// Drop every cached closure. Intended for tests and embedders tearing down a type system; see
    /// §5's discussion of why this crate uses an explicit clear rather than weak-keyed eviction.
    pub fn clear_cache() {
        crate::cache::clear_cache();
    }

    /// Resolve attribute `name` of the mapping at `idx` against root bundle `root`, per §4.3.
    /// `non_merged` disables explicit-alias and convention-override steps, per
    /// `with_non_merged_attributes()`.
    pub fn resolve_attribute(
        &self,
        idx: usize,
        name: &str,
        root: &HashMap<String, AttributeValue>,
        non_merged: bool,
    ) -> Result<AttributeValue> {
        let descriptor = self.mappings[idx]
            .annotation_type()
            .attribute(name)
            .ok_or_else(|| error::missing_attribute(self.mappings[idx].annotation_type().name(), name))?
            .clone();

        let (raw, _local) = self.resolve_raw(idx, name, root, non_merged)?;
        let coerced = raw.coerce_to(descriptor.value_kind());
        self.enforce_mirror(idx, name, coerced, &descriptor, root, non_merged)
    }

    // --------------------------------------------------------------------------------------
    // Private ❱ closure construction
    // --------------------------------------------------------------------------------------

    fn ancestor_has_type(mappings: &[AnnotationTypeMapping], idx: usize, type_name: &str) -> bool {
        let mut current = Some(idx);
        while let Some(i) = current {
            if mappings[i].annotation_type().name() == type_name {
                return true;
            }
            current = mappings[i].parent();
        }
        false
    }

    fn path_to(mappings: &[AnnotationTypeMapping], idx: usize) -> Vec<String> {
        let mut path = vec![mappings[idx].annotation_type().name().to_string()];
        let mut current = mappings[idx].parent();
        while let Some(p) = current {
            path.push(mappings[p].annotation_type().name().to_string());
            current = mappings[p].parent();
        }
        path.reverse();
        path
    }

    fn after_all_mappings_set(mappings: &mut [AnnotationTypeMapping]) -> Result<()> {
        for idx in 0..mappings.len() {
            let (aliases, mirror_sets) = Self::build_aliases_and_mirrors(mappings, idx)?;
            mappings[idx].aliases = aliases;
            mappings[idx].mirror_sets = mirror_sets;
        }
        for idx in 0..mappings.len() {
            mappings[idx].convention_overrides = Self::build_convention_overrides(mappings, idx);
        }
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn build_aliases_and_mirrors(
        mappings: &[AnnotationTypeMapping],
        idx: usize,
    ) -> Result<(HashMap<String, (AliasRef, usize)>, Vec<Vec<String>>)> {
        let annotation_type = mappings[idx].annotation_type().clone();
        let own_name = annotation_type.name().to_string();
        let parent_idx = mappings[idx].parent();
        let parent_name = parent_idx.map(|p| mappings[p].annotation_type().name().to_string());

        let mut aliases = HashMap::new();
        let mut self_alias_pairs: Vec<(String, String)> = Vec::new();

        for attr in annotation_type.attributes() {
            let Some(alias_decl) = attr.alias_for() else {
                continue;
            };
            let target_annotation = match &alias_decl.annotation {
                Some(annotation) => annotation.clone(),
                // An omitted `annotation` with an explicit `attribute` is a same-annotation
                // mirror declaration regardless of depth; it only falls through to the immediate
                // parent when `attribute` is also omitted (the fully-defaulted `AliasFor()`
                // shorthand for "same name, parent annotation").
                None if alias_decl.attribute.is_some() => own_name.clone(),
                None => parent_name.clone().unwrap_or_else(|| own_name.clone()),
            };
            let target_attribute = alias_decl
                .attribute
                .clone()
                .unwrap_or_else(|| attr.name().to_string());

            if target_annotation == own_name {
                if annotation_type.attribute(&target_attribute).is_none() {
                    return Self::cfg_err(
                        &own_name,
                        attr.name(),
                        Self::path_to(mappings, idx),
                        format!("self-alias target attribute {target_attribute} does not exist on {own_name}"),
                    );
                }
                self_alias_pairs.push((attr.name().to_string(), target_attribute));
                continue;
            }

            let mut ancestor = parent_idx;
            let mut target_idx = None;
            while let Some(a) = ancestor {
                if mappings[a].annotation_type().name() == target_annotation {
                    target_idx = Some(a);
                    break;
                }
                ancestor = mappings[a].parent();
            }
            let Some(target_idx) = target_idx else {
                return Self::cfg_err(
                    &own_name,
                    attr.name(),
                    Self::path_to(mappings, idx),
                    format!("@AliasFor target annotation {target_annotation} is not an ancestor of {own_name}"),
                );
            };

            let Some(target_descriptor) = mappings[target_idx].annotation_type().attribute(&target_attribute) else {
                return Self::cfg_err(
                    &own_name,
                    attr.name(),
                    Self::path_to(mappings, idx),
                    format!("{target_annotation} declares no attribute named {target_attribute}"),
                );
            };
            if !attr.value_kind().is_compatible_with(target_descriptor.value_kind()) {
                return Self::cfg_err(
                    &own_name,
                    attr.name(),
                    Self::path_to(mappings, idx),
                    format!(
                        "{own_name}#{} has kind {} incompatible with {target_annotation}#{target_attribute} kind {}",
                        attr.name(),
                        attr.value_kind(),
                        target_descriptor.value_kind()
                    ),
                );
            }

            aliases.insert(
                attr.name().to_string(),
                (AliasRef::new(target_annotation, target_attribute), target_idx),
            );
        }

        let mirror_sets = Self::close_mirror_sets(&annotation_type, self_alias_pairs, mappings, idx)?;

        Ok((aliases, mirror_sets))
    }

    fn close_mirror_sets(
        annotation_type: &AnnotationType,
        pairs: Vec<(String, String)>,
        mappings: &[AnnotationTypeMapping],
        idx: usize,
    ) -> Result<Vec<Vec<String>>> {
        let mut sets: Vec<Vec<String>> = Vec::new();
        for (a, b) in pairs {
            let ia = sets.iter().position(|s| s.contains(&a));
            let ib = sets.iter().position(|s| s.contains(&b));
            match (ia, ib) {
                (None, None) => {
                    let mut new_set = vec![a];
                    if new_set[0] != b {
                        new_set.push(b);
                    }
                    sets.push(new_set);
                }
                (Some(i), None) => {
                    if !sets[i].contains(&b) {
                        sets[i].push(b);
                    }
                }
                (None, Some(j)) => {
                    if !sets[j].contains(&a) {
                        sets[j].push(a);
                    }
                }
                (Some(i), Some(j)) if i == j => {}
                (Some(i), Some(j)) => {
                    let (lo, hi) = if i < j { (i, j) } else { (j, i) };
                    let removed = sets.remove(hi);
                    for member in removed {
                        if !sets[lo].contains(&member) {
                            sets[lo].push(member);
                        }
                    }
                }
            }
        }

        for set in &sets {
            if set.len() < 2 {
                continue;
            }
            let first = annotation_type
                .attribute(&set[0])
                .expect("mirror member must be declared on its own annotation");
            for name in &set[1..] {
                let attr = annotation_type
                    .attribute(name)
                    .expect("mirror member must be declared on its own annotation");
                if !attr.value_kind().is_compatible_with(first.value_kind()) {
                    return Self::cfg_err(
                        annotation_type.name(),
                        name,
                        Self::path_to(mappings, idx),
                        format!(
                            "mirror members {} and {name} have incompatible kinds",
                            set[0]
                        ),
                    );
                }
                if attr.default_value() != first.default_value() {
                    return Self::cfg_err(
                        annotation_type.name(),
                        name,
                        Self::path_to(mappings, idx),
                        format!(
                            "mirror members {} and {name} declare different default values",
                            set[0]
                        ),
                    );
                }
            }
        }

        Ok(sets)
    }

    fn build_convention_overrides(
        mappings: &[AnnotationTypeMapping],
        idx: usize,
    ) -> HashMap<String, usize> {
        let mut result = HashMap::new();
        let annotation_type = mappings[idx].annotation_type();

        for attr in annotation_type.attributes() {
            if attr.name() == "value" {
                continue;
            }
            if mappings[idx].aliases.contains_key(attr.name()) {
                continue;
            }

            let mut ancestor = mappings[idx].parent();
            let mut found = None;
            while let Some(a) = ancestor {
                if let Some(anc_attr) = mappings[a].annotation_type().attribute(attr.name()) {
                    if anc_attr.value_kind().is_compatible_with(attr.value_kind()) {
                        found = Some(a);
                        break;
                    }
                }
                ancestor = mappings[a].parent();
            }
            if let Some(a) = found {
                result.insert(attr.name().to_string(), a);
            }
        }

        result
    }

    #[allow(clippy::type_complexity)]
    fn cfg_err<T>(
        annotation_type: &str,
        attribute_name: &str,
        path: Vec<String>,
        reason: String,
    ) -> Result<T> {
        match error::configuration_error(annotation_type, attribute_name, path, reason) {
            Err(e) => Err(e),
            Ok(_) => unreachable!("configuration_error always reports an error"),
        }
    }

    // --------------------------------------------------------------------------------------
    // Private ❱ attribute resolution
    // --------------------------------------------------------------------------------------

    /// Steps 1–4 of §4.3, before array coercion or mirror enforcement. The returned `bool` is
    /// `true` iff the value came from step 3 — this mapping's own declared-at-use-site override —
    /// used to evaluate the mirror "shadow" exception.
    fn resolve_raw(
        &self,
        idx: usize,
        name: &str,
        root: &HashMap<String, AttributeValue>,
        non_merged: bool,
    ) -> Result<(AttributeValue, bool)> {
        let mapping = &self.mappings[idx];

        if !non_merged {
            if let Some((alias_ref, target_idx)) = mapping.aliases.get(name) {
                let value = self.resolve_attribute(*target_idx, &alias_ref.attribute_name, root, non_merged)?;
                return Ok((value, false));
            }
            if let Some(&target_idx) = mapping.convention_overrides.get(name) {
                let value = self.resolve_attribute(target_idx, name, root, non_merged)?;
                return Ok((value, false));
            }
        }

        if mapping.is_root() {
            if let Some(v) = root.get(name) {
                return Ok((v.clone(), false));
            }
        } else if let Some(v) = mapping.declared_attributes.get(name) {
            return Ok((v.clone(), true));
        }

        let descriptor = mapping
            .annotation_type()
            .attribute(name)
            .ok_or_else(|| error::missing_attribute(mapping.annotation_type().name(), name))?;
        match descriptor.default_value() {
            Some(default) => Ok((default.clone(), false)),
            None => Err(error::missing_attribute(mapping.annotation_type().name(), name)),
        }
    }

    /// The mirror-enforcement post-condition of §4.3, applied once per call to
    /// [`Self::resolve_attribute`].
    fn enforce_mirror(
        &self,
        idx: usize,
        name: &str,
        value: AttributeValue,
        descriptor: &AttributeDescriptor,
        root: &HashMap<String, AttributeValue>,
        non_merged: bool,
    ) -> Result<AttributeValue> {
        let mapping = &self.mappings[idx];
        let Some(set) = mapping.mirror_set_for(name).map(|s| s.to_vec()) else {
            return Ok(value);
        };
        if set.len() <= 1 {
            return Ok(value);
        }

        let mut members = Vec::with_capacity(set.len());
        for member_name in &set {
            let member_descriptor = mapping
                .annotation_type()
                .attribute(member_name)
                .expect("mirror member must be declared on its own annotation");
            let (raw, local) = self.resolve_raw(idx, member_name, root, non_merged)?;
            let coerced = raw.coerce_to(member_descriptor.value_kind());
            let is_default = coerced.is_empty_array()
                || member_descriptor
                    .default_value()
                    .is_some_and(|default| default == &coerced);
            members.push((member_name.clone(), coerced, local, is_default));
        }

        let non_default: Vec<&(String, AttributeValue, bool, bool)> = members
            .iter()
            .filter(|(_, _, _, is_default)| !is_default)
            .collect();

        if non_default.is_empty() {
            return Ok(descriptor.default_value().cloned().unwrap_or(value));
        }
        if non_default.len() == 1 {
            return Ok(non_default[0].1.clone());
        }

        let first = &non_default[0].1;
        if non_default.iter().all(|(_, v, _, _)| v == first) {
            return Ok(first.clone());
        }

        // Shadow exception: a disagreement whose only source is this mapping's own
        // declared-at-use-site override does not count against the rest of the mirror set.
        let without_local: Vec<&&(String, AttributeValue, bool, bool)> =
            non_default.iter().filter(|(_, _, local, _)| !local).collect();
        if !without_local.is_empty() {
            let candidate = &without_local[0].1;
            if without_local.iter().all(|(_, v, _, _)| v == candidate) {
                return Ok(candidate.clone());
            }
        }

        let member_names: Vec<String> = non_default.iter().map(|(n, _, _, _)| n.clone()).collect();
        let values: Vec<String> = non_default.iter().map(|(_, v, _, _)| v.render()).collect();
        Err(
            match error::mirror_conflict(mapping.annotation_type().name(), member_names, values) {
                Err(e) => e,
                Ok(_) => unreachable!("mirror_conflict always reports an error"),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{AliasDeclaration, AnnotationType, AttributeDescriptor};
    use crate::model::value::ValueKind;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap as StdHashMap;

    struct MapResolver(StdHashMap<String, AnnotationType>);

    impl TypeResolver for MapResolver {
        fn resolve(&self, name: &str) -> Option<AnnotationType> {
            self.0.get(name).cloned()
        }
    }

    fn resolver_with(types: Vec<AnnotationType>) -> MapResolver {
        let mut map = StdHashMap::new();
        for t in types {
            map.insert(t.name().to_string(), t);
        }
        MapResolver(map)
    }

    #[test]
    fn test_simple_alias_closure() {
        let inner = AnnotationType::new("Inner").with_attribute(
            AttributeDescriptor::new("name", ValueKind::String)
                .with_default(AttributeValue::String(String::new()))
                .with_alias_for(AliasDeclaration::new().annotation("Outer").attribute("name")),
        );
        let outer = AnnotationType::new("Outer")
            .with_attribute(
                AttributeDescriptor::new("name", ValueKind::String)
                    .with_default(AttributeValue::String(String::new())),
            )
            .with_meta_annotation(AnnotationInstance::new("Inner"));
        let resolver = resolver_with(vec![outer, inner]);

        let mappings = AnnotationTypeMappings::build(
            AnnotationFilter::None,
            "Outer",
            &resolver,
            &RepeatableContainers::None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(mappings.mappings().len(), 2);
        let inner_idx = mappings.index_of("Inner").unwrap();
        assert_eq!(mappings.mapping(inner_idx).depth(), 1);

        let mut root = StdHashMap::new();
        root.insert("name".to_string(), AttributeValue::String("x".to_string()));
        let resolved = mappings.resolve_attribute(inner_idx, "name", &root, false).unwrap();
        assert_eq!(resolved, AttributeValue::String("x".to_string()));
    }

    #[test]
    fn test_convention_override_does_not_apply_to_value() {
        let inner = AnnotationType::new("Inner")
            .with_attribute(
                AttributeDescriptor::new("path", ValueKind::String)
                    .with_default(AttributeValue::String(String::new())),
            )
            .with_attribute(
                AttributeDescriptor::new("value", ValueKind::String)
                    .with_default(AttributeValue::String("default".to_string())),
            );
        let outer = AnnotationType::new("Outer")
            .with_attribute(
                AttributeDescriptor::new("path", ValueKind::String)
                    .with_default(AttributeValue::String(String::new())),
            )
            .with_meta_annotation(AnnotationInstance::new("Inner"));
        let resolver = resolver_with(vec![outer, inner]);

        let mappings = AnnotationTypeMappings::build(
            AnnotationFilter::None,
            "Outer",
            &resolver,
            &RepeatableContainers::None,
        )
        .unwrap()
        .unwrap();

        let inner_idx = mappings.index_of("Inner").unwrap();
        let mut root = StdHashMap::new();
        root.insert("path".to_string(), AttributeValue::String("/a".to_string()));

        let path = mappings.resolve_attribute(inner_idx, "path", &root, false).unwrap();
        assert_eq!(path, AttributeValue::String("/a".to_string()));

        let value = mappings.resolve_attribute(inner_idx, "value", &root, false).unwrap();
        assert_eq!(value, AttributeValue::String("default".to_string()));
    }

    #[test]
    fn test_mirror_set_mirrors_single_non_default() {
        let a = AnnotationType::new("A")
            .with_attribute(
                AttributeDescriptor::new("value", ValueKind::String)
                    .with_default(AttributeValue::String(String::new()))
                    .with_alias_for(AliasDeclaration::new().attribute("path")),
            )
            .with_attribute(
                AttributeDescriptor::new("path", ValueKind::String)
                    .with_default(AttributeValue::String(String::new()))
                    .with_alias_for(AliasDeclaration::new().attribute("value")),
            );
        let resolver = resolver_with(vec![a]);

        let mappings =
            AnnotationTypeMappings::build(AnnotationFilter::None, "A", &resolver, &RepeatableContainers::None)
                .unwrap()
                .unwrap();

        let mut root = StdHashMap::new();
        root.insert("value".to_string(), AttributeValue::String("x".to_string()));

        let value = mappings.resolve_attribute(0, "value", &root, false).unwrap();
        let path = mappings.resolve_attribute(0, "path", &root, false).unwrap();
        assert_eq!(value, AttributeValue::String("x".to_string()));
        assert_eq!(path, AttributeValue::String("x".to_string()));
    }

    #[test]
    fn test_mirror_set_conflict_errors() {
        let a = AnnotationType::new("A")
            .with_attribute(
                AttributeDescriptor::new("value", ValueKind::String)
                    .with_default(AttributeValue::String(String::new()))
                    .with_alias_for(AliasDeclaration::new().attribute("path")),
            )
            .with_attribute(
                AttributeDescriptor::new("path", ValueKind::String)
                    .with_default(AttributeValue::String(String::new()))
                    .with_alias_for(AliasDeclaration::new().attribute("value")),
            );
        let resolver = resolver_with(vec![a]);

        let mappings =
            AnnotationTypeMappings::build(AnnotationFilter::None, "A", &resolver, &RepeatableContainers::None)
                .unwrap()
                .unwrap();

        let mut root = StdHashMap::new();
        root.insert("value".to_string(), AttributeValue::String("x".to_string()));
        root.insert("path".to_string(), AttributeValue::String("y".to_string()));

        let err = mappings.resolve_attribute(0, "value", &root, false).unwrap_err();
        assert!(matches!(err, crate::Error::MirrorConflict { .. }));
    }

    #[test]
    fn test_meta_annotation_cycle_produces_one_mapping_each() {
        let a = AnnotationType::new("A").with_meta_annotation(AnnotationInstance::new("B"));
        let b = AnnotationType::new("B").with_meta_annotation(AnnotationInstance::new("A"));
        let resolver = resolver_with(vec![a, b]);

        let mappings =
            AnnotationTypeMappings::build(AnnotationFilter::None, "A", &resolver, &RepeatableContainers::None)
                .unwrap()
                .unwrap();

        assert_eq!(mappings.mappings().len(), 2);
        assert!(mappings.index_of("A").is_some());
        assert!(mappings.index_of("B").is_some());
    }

    #[test]
    fn test_resolver_miss_prunes_branch_without_error() {
        let outer = AnnotationType::new("Outer").with_meta_annotation(AnnotationInstance::new("Unresolvable"));
        let resolver = resolver_with(vec![outer]);

        let mappings =
            AnnotationTypeMappings::build(AnnotationFilter::None, "Outer", &resolver, &RepeatableContainers::None)
                .unwrap()
                .unwrap();

        assert_eq!(mappings.mappings().len(), 1);
    }

    #[test]
    fn test_missing_root_type_returns_none() {
        let resolver = resolver_with(vec![]);
        let mappings =
            AnnotationTypeMappings::build(AnnotationFilter::None, "Missing", &resolver, &RepeatableContainers::None)
                .unwrap();
        assert!(mappings.is_none());
    }
}
