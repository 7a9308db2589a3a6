//! Dereference resolver
//!
//! Rewrites a member type so it no longer points into the source artifact:
//!
//! | member type                      | result                                   |
//! |----------------------------------|------------------------------------------|
//! | primitive, string, object        | unchanged                                |
//! | already synthesized              | unchanged                                |
//! | enum                             | enum clone under the same name           |
//! | struct from an external artifact | interface + proxy, then a struct clone   |
//! | class from an external artifact  | interface + proxy, member typed as the interface |
//! | struct or class from the runtime | unchanged                                |
//! | array                            | element dereferenced                     |
//! | runtime generic                  | each argument dereferenced               |

use super::naming;
use super::proxy::backed_type;
use super::{EnumSpec, ResolutionScope, SynthKind, SynthesizedType, Synthesizer};
use crate::cache::{CacheKey, CachedType};
use crate::descriptor::{DescriptorKind, QualifiedName, TypeDescriptor, TypeRef, Visibility};
use crate::error::{SynthesisError, SynthesisResult};
use tracing::debug;

impl Synthesizer<'_> {
    /// Self-contained equivalent of a member type
    pub fn dereference(&self, ty: &TypeRef, scope: &mut ResolutionScope) -> SynthesisResult<TypeRef> {
        match ty {
            TypeRef::Primitive(_) | TypeRef::String | TypeRef::Object | TypeRef::Synthesized(_) => Ok(ty.clone()),
            TypeRef::Array(elem) => Ok(self.dereference(elem, scope)?.array_of()),
            TypeRef::Generic { definition, args } => {
                if !self.catalog.is_runtime_generic(definition) {
                    return Err(SynthesisError::UnknownType(definition.canonical()));
                }
                let args = args
                    .iter()
                    .map(|arg| self.dereference(arg, scope))
                    .collect::<SynthesisResult<Vec<_>>>()?;
                Ok(TypeRef::Generic {
                    definition: definition.clone(),
                    args,
                })
            }
            TypeRef::Named(name) => {
                let source = self.catalog.require(name)?;
                match &source.kind {
                    DescriptorKind::Enum { .. } => self.clone_enum(source, scope),
                    _ if source.is_runtime() => Ok(ty.clone()),
                    DescriptorKind::Struct => self.clone_struct(source, scope),
                    DescriptorKind::Class | DescriptorKind::Interface => self.reference_interface(source, scope),
                }
            }
        }
    }

    /// Interface and proxy for a reference type; the member becomes the interface
    fn reference_interface(&self, source: &TypeDescriptor, scope: &mut ResolutionScope) -> SynthesisResult<TypeRef> {
        let iface = self.ensure_interface(source, scope)?;
        self.ensure_proxy(source, &iface, scope)?;
        Ok(TypeRef::Synthesized(iface))
    }

    /// Interface and proxy for a value type, then a sealed struct clone
    fn clone_struct(&self, source: &TypeDescriptor, scope: &mut ResolutionScope) -> SynthesisResult<TypeRef> {
        let iface = self.ensure_interface(source, scope)?;
        self.ensure_proxy(source, &iface, scope)?;

        let key = CacheKey::new(SynthKind::StructClone, source.canonical());
        if scope.contains(&key) {
            debug!(key = %key, "forward reference");
            return Ok(TypeRef::Synthesized(source.name.clone()));
        }
        let clone = self.memoize(key, scope, |scope| {
            let Some(members) = self.resolve_members(source, scope)? else {
                return Ok(None);
            };
            let mut ty = backed_type(source.name.clone(), SynthKind::StructClone, source, members, None)?;
            ty.visibility = source.visibility;
            ty.sealed = true;
            Ok(Some(ty))
        })?;
        handle_of(clone, source)
    }

    /// Enum with the source's underlying type and literals, under the same name
    fn clone_enum(&self, source: &TypeDescriptor, scope: &mut ResolutionScope) -> SynthesisResult<TypeRef> {
        let DescriptorKind::Enum { underlying, literals } = &source.kind else {
            return Err(SynthesisError::Configuration(format!("{} is not an enum", source.name)));
        };
        let key = CacheKey::new(SynthKind::EnumClone, source.canonical());
        let clone = self.memoize(key, scope, |_| {
            let mut ty = SynthesizedType::new(source.name.clone(), SynthKind::EnumClone, source.name.clone());
            ty.visibility = Visibility::Public;
            ty.sealed = true;
            ty.enum_spec = Some(EnumSpec {
                underlying: *underlying,
                literals: literals.clone(),
            });
            Ok(Some(ty))
        })?;
        handle_of(clone, source)
    }

    /// Canonical name of the source's interface, synthesizing it unless it is
    /// already being produced up the call chain
    fn ensure_interface(&self, source: &TypeDescriptor, scope: &mut ResolutionScope) -> SynthesisResult<QualifiedName> {
        let name = naming::interface_name(&source.name, self.options);
        if scope.contains(&CacheKey::new(SynthKind::Interface, name.canonical())) {
            debug!(interface = %name, "forward reference");
            return Ok(name);
        }
        match self.interface(source, scope)? {
            Some(iface) => Ok(iface.name.clone()),
            None => Err(no_members(source)),
        }
    }

    fn ensure_proxy(
        &self,
        source: &TypeDescriptor,
        interface: &QualifiedName,
        scope: &mut ResolutionScope,
    ) -> SynthesisResult<()> {
        let name = naming::proxy_name(&source.name, self.options);
        if scope.contains(&CacheKey::new(SynthKind::Proxy, name.canonical())) {
            debug!(proxy = %name, "forward reference");
            return Ok(());
        }
        self.proxy(source, Some(interface), scope)?;
        Ok(())
    }
}

fn handle_of(ty: CachedType, source: &TypeDescriptor) -> SynthesisResult<TypeRef> {
    ty.map(|t| t.handle()).ok_or_else(|| no_members(source))
}

fn no_members(source: &TypeDescriptor) -> SynthesisError {
    SynthesisError::DependencyFailed {
        name: source.canonical(),
        reason: "no eligible members".to_string(),
    }
}
