/*!
Provide `MergedAnnotations`, the query surface over every annotation found on a program element
(directly declared, or inherited per a [`Scanner`]), each expanded through its own
[`AnnotationTypeMappings`] closure.
*/

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::filter::AnnotationFilter;
use super::mappings::AnnotationTypeMappings;
use super::merged::MergedAnnotation;
use super::repeatable::RepeatableContainers;
use super::types::AnnotationInstance;
use crate::error::{Error, Result};
use crate::resolver::TypeResolver;
use crate::scanner::{Scanner, SearchStrategy};

// ------------------------------------------------------------------------------------------------
// Public Types ❱ Selector
// ------------------------------------------------------------------------------------------------

/// Chooses one candidate among several matches for the same annotation type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selector {
    /// Minimise `(depth, aggregate_index)` lexicographically — the closest declaration wins.
    #[default]
    Nearest,
    /// Prefer the highest aggregate index (superclasses/interfaces before the element itself),
    /// breaking ties by shallowest depth.
    HighestAggregateIndex,
}

impl Selector {
    pub fn nearest() -> Self {
        Self::Nearest
    }

    pub fn highest_aggregate_index() -> Self {
        Self::HighestAggregateIndex
    }

    fn prefers(&self, candidate: &MergedAnnotation, current: &MergedAnnotation) -> bool {
        match self {
            Self::Nearest => {
                (candidate.depth(), candidate.aggregate_index()) < (current.depth(), current.aggregate_index())
            }
            Self::HighestAggregateIndex => {
                candidate.aggregate_index() > current.aggregate_index()
                    || (candidate.aggregate_index() == current.aggregate_index()
                        && candidate.depth() < current.depth())
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Public Types ❱ Predicate
// ------------------------------------------------------------------------------------------------

/// A candidate filter for [`MergedAnnotations::get`]/[`MergedAnnotations::stream`].
///
/// `first_run_of`/`unique` carry internal state across one traversal and are single-use by
/// contract: a second traversal attempted against the same `Predicate` fails with
/// [`Error::PredicateAlreadyConsumed`] rather than silently starting over.
pub struct Predicate {
    #[allow(clippy::type_complexity)]
    inner: RefCell<Option<Box<dyn FnMut(&MergedAnnotation) -> bool>>>,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}

impl Predicate {
    pub fn custom(f: impl FnMut(&MergedAnnotation) -> bool + 'static) -> Self {
        Self {
            inner: RefCell::new(Some(Box::new(f))),
        }
    }

    /// Accepts candidates whose annotation type is one of `names`.
    pub fn type_in<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: HashSet<String> = names.into_iter().map(Into::into).collect();
        Self::custom(move |view| view.annotation_type().map(|t| names.contains(&t)).unwrap_or(false))
    }

    /// Accepts candidates while `key_fn` keeps returning the key it returned for the first
    /// candidate; rejects everything once the key changes.
    pub fn first_run_of<K, F>(mut key_fn: F) -> Self
    where
        K: PartialEq + 'static,
        F: FnMut(&MergedAnnotation) -> K + 'static,
    {
        let mut first: Option<K> = None;
        let mut done = false;
        Self::custom(move |view| {
            if done {
                return false;
            }
            let key = key_fn(view);
            match &first {
                None => {
                    first = Some(key);
                    true
                }
                Some(seen) if *seen == key => true,
                _ => {
                    done = true;
                    false
                }
            }
        })
    }

    /// Accepts only the first candidate seen for each distinct key.
    pub fn unique<K, F>(mut key_fn: F) -> Self
    where
        K: Eq + std::hash::Hash + 'static,
        F: FnMut(&MergedAnnotation) -> K + 'static,
    {
        let mut seen: HashSet<K> = HashSet::new();
        Self::custom(move |view| seen.insert(key_fn(view)))
    }

    fn take(&self) -> Result<Box<dyn FnMut(&MergedAnnotation) -> bool>> {
        self.inner.borrow_mut().take().ok_or(Error::PredicateAlreadyConsumed)
    }
}

// ------------------------------------------------------------------------------------------------
// Public Types ❱ MergedAnnotations
// ------------------------------------------------------------------------------------------------

/// Every annotation found on a program element, each view expanded through its own meta-annotation
/// closure. Built either from a scanner walk ([`Self::from`]) or an explicit, already-collected
/// instance list ([`Self::from_instances`]).
pub struct MergedAnnotations<'r> {
    source: String,
    aggregates: Vec<Vec<AnnotationInstance>>,
    repeatables: RepeatableContainers,
    filter: AnnotationFilter,
    resolver: &'r dyn TypeResolver,
}

impl fmt::Debug for MergedAnnotations<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedAnnotations")
            .field("source", &self.source)
            .field("aggregates", &self.aggregates.len())
            .finish()
    }
}

impl<'r> MergedAnnotations<'r> {
    /// Build from a scanner walk of `element`'s hierarchy; aggregate `0` is the element itself.
    pub fn from<E>(
        element: &E,
        strategy: SearchStrategy,
        scanner: &dyn Scanner<E>,
        repeatables: RepeatableContainers,
        filter: AnnotationFilter,
        resolver: &'r dyn TypeResolver,
    ) -> Self {
        Self {
            source: format!("{strategy:?} scan"),
            aggregates: scanner.aggregates(element, strategy),
            repeatables,
            filter,
            resolver,
        }
    }

    /// Build from a single, already-collected list of directly declared annotations, tagged with
    /// `source` for diagnostics. Equivalent to a single-aggregate scan.
    pub fn from_instances(
        source: impl Into<String>,
        instances: Vec<AnnotationInstance>,
        repeatables: RepeatableContainers,
        filter: AnnotationFilter,
        resolver: &'r dyn TypeResolver,
    ) -> Self {
        Self {
            source: source.into(),
            aggregates: vec![instances],
            repeatables,
            filter,
            resolver,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// `true` iff some annotation in some aggregate, after meta-expansion, contains a mapping for
    /// `type_name` that was not filtered out.
    pub fn is_present(&self, type_name: &str) -> Result<bool> {
        for candidate in self.candidates()? {
            if candidate.annotation_type().ok().as_deref() == Some(type_name) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The best candidate for `type_name`, or a missing view if none match. `predicate` filters
    /// candidates before selection; `selector` defaults to [`Selector::Nearest`].
    pub fn get(
        &self,
        type_name: &str,
        predicate: Option<&Predicate>,
        selector: Option<Selector>,
    ) -> Result<MergedAnnotation> {
        let mut predicate_fn = predicate.map(Predicate::take).transpose()?;
        let selector = selector.unwrap_or_default();

        let mut best: Option<MergedAnnotation> = None;
        for candidate in self.candidates()? {
            if candidate.annotation_type().ok().as_deref() != Some(type_name) {
                continue;
            }
            if let Some(f) = predicate_fn.as_mut() {
                if !f(&candidate) {
                    continue;
                }
            }
            best = Some(match best {
                None => candidate,
                Some(current) => {
                    if selector.prefers(&candidate, &current) {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }
        Ok(best.unwrap_or_else(MergedAnnotation::missing))
    }

    /// The flat sequence of every mapped view: aggregate order, then declaration order within an
    /// aggregate, then BFS order (root first) within one annotation's closure.
    pub fn stream(&self, predicate: Option<&Predicate>) -> Result<Vec<MergedAnnotation>> {
        let mut predicate_fn = predicate.map(Predicate::take).transpose()?;
        let mut result = Vec::new();
        for candidate in self.candidates()? {
            if let Some(f) = predicate_fn.as_mut() {
                if !f(&candidate) {
                    continue;
                }
            }
            result.push(candidate);
        }
        Ok(result)
    }

    /// Alias for [`Self::stream`], returning an owned iterator.
    pub fn iter(&self, predicate: Option<&Predicate>) -> Result<std::vec::IntoIter<MergedAnnotation>> {
        Ok(self.stream(predicate)?.into_iter())
    }

    // --------------------------------------------------------------------------------------
    // Private
    // --------------------------------------------------------------------------------------

    fn candidates(&self) -> Result<Vec<MergedAnnotation>> {
        let mut result = Vec::new();
        for (aggregate_index, aggregate) in self.aggregates.iter().enumerate() {
            for instance in aggregate {
                for element in self.expand_repeatable(instance) {
                    let Some(mappings) = AnnotationTypeMappings::of(
                        self.filter.clone(),
                        &element.type_name,
                        self.resolver,
                        &self.repeatables,
                    )?
                    else {
                        continue;
                    };
                    let root = Arc::new(element.values.clone());
                    for idx in 0..mappings.mappings().len() {
                        result.push(MergedAnnotation::mapped(
                            mappings.clone(),
                            idx,
                            root.clone(),
                            aggregate_index as i32,
                        ));
                    }
                }
            }
        }
        Ok(result)
    }

    fn expand_repeatable(&self, instance: &AnnotationInstance) -> Vec<AnnotationInstance> {
        match self.repeatables.unwrap(instance, self.resolver) {
            Some(elements) => elements,
            None => vec![instance.clone()],
        }
    }
}
