//! Interface synthesis

use super::naming;
use super::{MethodKind, MethodSpec, ParamSpec, PropertySpec, ResolutionScope, SynthKind, SynthesizedType, Synthesizer};
use crate::cache::{CacheKey, CachedType};
use crate::descriptor::{MemberDescriptor, TypeDescriptor, Visibility};
use crate::error::SynthesisResult;

impl Synthesizer<'_> {
    /// Abstract type with a get/set pair per eligible member
    ///
    /// Cached under the interface's canonical name. Returns `Ok(None)` when
    /// the source has no eligible members.
    pub fn interface(&self, source: &TypeDescriptor, scope: &mut ResolutionScope) -> SynthesisResult<CachedType> {
        let name = naming::interface_name(&source.name, self.options);
        let key = CacheKey::new(SynthKind::Interface, name.canonical());

        self.memoize(key, scope, |scope| {
            let Some(members) = self.resolve_members(source, scope)? else {
                return Ok(None);
            };

            let mut ty = SynthesizedType::new(name, SynthKind::Interface, source.name.clone());
            for member in &members {
                declare_accessors(&mut ty, member);
            }
            ty.members = members;
            Ok(Some(ty))
        })
    }
}

fn declare_accessors(ty: &mut SynthesizedType, member: &MemberDescriptor) {
    let getter = member.readable.then(|| naming::getter(&member.name));
    let setter = member.writable.then(|| naming::setter(&member.name));

    if let Some(getter) = &getter {
        ty.methods.push(MethodSpec {
            name: getter.clone(),
            visibility: Visibility::Public,
            kind: MethodKind::Abstract,
            params: Vec::new(),
            returns: Some(member.ty.clone()),
            implements: None,
            special_name: true,
            body: None,
        });
    }
    if let Some(setter) = &setter {
        ty.methods.push(MethodSpec {
            name: setter.clone(),
            visibility: Visibility::Public,
            kind: MethodKind::Abstract,
            params: vec![ParamSpec::new("value", member.ty.clone())],
            returns: None,
            implements: None,
            special_name: true,
            body: None,
        });
    }
    ty.properties.push(PropertySpec {
        name: member.name.clone(),
        ty: member.ty.clone(),
        getter,
        setter,
    });
}
