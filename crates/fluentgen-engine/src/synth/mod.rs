//! Interface, proxy and fluent wrapper synthesis
//!
//! A [`Synthesizer`] borrows the source catalog, the engine options and the
//! build session for the duration of one build. Every type it produces goes
//! through the session's [`TypeCache`](crate::cache::TypeCache), so each
//! canonical name is synthesized at most once per session.
//!
//! Member types are rewritten by the dereference resolver (see `deref.rs`),
//! which recursively synthesizes interfaces and proxies for the types those
//! members point at. A [`ResolutionScope`] records the cache keys being
//! produced on the current call chain; re-entering one of them yields a
//! forward reference to the type's canonical name instead of recursing, which
//! breaks cycles such as `Person.Home: Address` / `Address.Owner: Person`.

mod deref;
mod fluent;
mod interface;
mod model;
pub mod naming;
mod proxy;

pub use model::{
    EnumSpec, FieldSpec, MethodBinding, MethodKind, MethodSpec, ParamSpec, PropertySpec, SynthKind,
    SynthesizedType,
};

use crate::cache::{CacheKey, CachedType};
use crate::config::EngineOptions;
use crate::descriptor::{MemberDescriptor, SourceCatalog, TypeDescriptor};
use crate::error::{SynthesisError, SynthesisResult};
use crate::extract::extract;
use crate::session::Session;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache keys being produced on the current call chain
#[derive(Debug, Default)]
pub struct ResolutionScope {
    stack: Vec<CacheKey>,
}

impl ResolutionScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `key` is being produced further up the call chain
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.stack.contains(key)
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// The three types produced for one source type
#[derive(Debug, Clone)]
pub struct Synthesized {
    /// Abstract accessor contract
    pub interface: Arc<SynthesizedType>,
    /// Sealed implementation of the interface
    pub proxy: Arc<SynthesizedType>,
    /// Chainable wrapper around the proxy
    pub fluent: Arc<SynthesizedType>,
}

/// Synthesizes types for one build session
pub struct Synthesizer<'a> {
    catalog: &'a SourceCatalog,
    options: &'a EngineOptions,
    session: &'a Session,
}

impl<'a> Synthesizer<'a> {
    /// Create a synthesizer over a catalog and session
    pub fn new(catalog: &'a SourceCatalog, options: &'a EngineOptions, session: &'a Session) -> Self {
        Self {
            catalog,
            options,
            session,
        }
    }

    /// Engine options in effect
    pub fn options(&self) -> &EngineOptions {
        self.options
    }

    /// Produce the interface, proxy and fluent wrapper for a source type
    ///
    /// Returns `Ok(None)` when the type has no eligible members.
    pub fn synthesize(&self, source: &TypeDescriptor) -> SynthesisResult<Option<Synthesized>> {
        let mut scope = ResolutionScope::new();

        let Some(interface) = self.interface(source, &mut scope)? else {
            debug!(source = %source.name, "no eligible members; nothing synthesized");
            return Ok(None);
        };
        let Some(proxy) = self.proxy(source, Some(&interface.name), &mut scope)? else {
            return Ok(None);
        };
        let Some(fluent) = self.fluent(&proxy, &interface, &source.options, &mut scope)? else {
            return Ok(None);
        };

        Ok(Some(Synthesized {
            interface,
            proxy,
            fluent,
        }))
    }

    /// Run `produce` through the session cache with `key` pushed on the scope
    fn memoize<F>(&self, key: CacheKey, scope: &mut ResolutionScope, produce: F) -> SynthesisResult<CachedType>
    where
        F: FnOnce(&mut ResolutionScope) -> SynthesisResult<Option<SynthesizedType>>,
    {
        if self.session.is_cancelled() {
            return Err(SynthesisError::Cancelled);
        }
        scope.stack.push(key.clone());
        let result = self.session.cache().get_or_create(&key, || {
            let produced = produce(scope)?;
            if let Some(ty) = &produced {
                debug!(kind = %ty.kind, name = %ty.name, "synthesized type");
            }
            Ok(produced)
        });
        scope.stack.pop();
        result
    }

    /// Extract a source type's members and dereference their types
    ///
    /// Returns `Ok(None)` when the type has no eligible members. In fail-fast
    /// mode the first member that cannot be dereferenced aborts with
    /// [`SynthesisError::Dereference`] naming it; otherwise the member keeps
    /// its original type and a warning is logged.
    fn resolve_members(
        &self,
        source: &TypeDescriptor,
        scope: &mut ResolutionScope,
    ) -> SynthesisResult<Option<Vec<MemberDescriptor>>> {
        let mut members = extract(self.catalog, source)?;
        if members.is_empty() {
            return Ok(None);
        }
        if !self.options.dereference {
            return Ok(Some(members));
        }

        for member in &mut members {
            match self.dereference(&member.ty, scope) {
                Ok(ty) => member.ty = ty,
                Err(SynthesisError::Cancelled) => return Err(SynthesisError::Cancelled),
                Err(err) if self.options.fail_fast => {
                    return Err(match err {
                        nested @ SynthesisError::Dereference { .. } => nested,
                        other => SynthesisError::Dereference {
                            owner: source.canonical(),
                            member: member.name.clone(),
                            ty: member.ty.to_string(),
                            reason: other.to_string(),
                        },
                    });
                }
                Err(err) => {
                    warn!(
                        owner = %source.name,
                        member = %member.name,
                        ty = %member.ty,
                        error = %err,
                        "keeping foreign member type"
                    );
                }
            }
        }
        Ok(Some(members))
    }
}
