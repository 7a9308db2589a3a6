//! Build sessions

use crate::cache::TypeCache;
use crate::descriptor::QualifiedName;
use crate::synth::SynthesizedType;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Context shared by every synthesizer call of one build
///
/// Owns the type cache. Independent sessions share nothing, so builds in
/// different sessions may run concurrently.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    cache: TypeCache,
}

impl Session {
    /// Create a session whose cache waits are bounded by `wait_timeout`
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            cache: TypeCache::new(wait_timeout),
        }
    }

    /// Unique session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The session's type cache
    pub fn cache(&self) -> &TypeCache {
        &self.cache
    }

    /// Cancel the session, releasing every cache waiter
    pub fn cancel(&self) {
        self.cache.cancel();
    }

    /// Check if the session was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cache.is_cancelled()
    }

    /// Types completed so far, dependencies first
    pub fn types(&self) -> Vec<Arc<SynthesizedType>> {
        self.cache.types()
    }

    /// `roots` and every completed type they depend on, in completion order
    ///
    /// Types left behind by a failed synthesis are complete in the cache but
    /// unreachable from any produced wrapper, so they are not returned.
    pub fn closure<'a, I>(&self, roots: I) -> Vec<Arc<SynthesizedType>>
    where
        I: IntoIterator<Item = &'a QualifiedName>,
    {
        let types = self.types();
        let by_name: FxHashMap<QualifiedName, &Arc<SynthesizedType>> =
            types.iter().map(|t| (t.name.clone(), t)).collect();

        let mut reached: FxHashSet<QualifiedName> = FxHashSet::default();
        let mut pending: Vec<QualifiedName> = roots.into_iter().cloned().collect();
        while let Some(name) = pending.pop() {
            let Some(ty) = by_name.get(&name) else {
                continue;
            };
            if reached.insert(name) {
                pending.extend(ty.dependencies());
            }
        }

        types.into_iter().filter(|t| reached.contains(&t.name)).collect()
    }
}
