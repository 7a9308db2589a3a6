//! Proxy synthesis

use super::naming;
use super::{
    FieldSpec, MethodBinding, MethodKind, MethodSpec, ParamSpec, PropertySpec, ResolutionScope, SynthKind,
    SynthesizedType, Synthesizer,
};
use crate::cache::{CacheKey, CachedType};
use crate::descriptor::{MemberDescriptor, QualifiedName, TypeDescriptor, Visibility};
use crate::emit::{BodyBuilder, FieldRef, MethodRef, CONSTRUCTOR};
use crate::error::SynthesisResult;

impl Synthesizer<'_> {
    /// Sealed class storing each member in a private backing field
    ///
    /// Each accessor is bound to the matching method of `interface`. Cached
    /// under the proxy's canonical name; returns `Ok(None)` when the source
    /// has no eligible members.
    pub fn proxy(
        &self,
        source: &TypeDescriptor,
        interface: Option<&QualifiedName>,
        scope: &mut ResolutionScope,
    ) -> SynthesisResult<CachedType> {
        let name = naming::proxy_name(&source.name, self.options);
        let key = CacheKey::new(SynthKind::Proxy, name.canonical());

        self.memoize(key, scope, |scope| {
            let Some(members) = self.resolve_members(source, scope)? else {
                return Ok(None);
            };

            let mut ty = backed_type(name, SynthKind::Proxy, source, members, interface)?;
            ty.visibility = Visibility::Internal;
            ty.sealed = true;

            let mut ctor = BodyBuilder::new();
            ctor.load_this()?.call(MethodRef::root_constructor())?.ret()?;
            ty.methods.insert(
                0,
                MethodSpec {
                    name: CONSTRUCTOR.to_string(),
                    visibility: Visibility::Public,
                    kind: MethodKind::Constructor,
                    params: Vec::new(),
                    returns: None,
                    implements: None,
                    special_name: true,
                    body: Some(ctor.finish(false)?),
                },
            );
            Ok(Some(ty))
        })
    }
}

/// Type holding one backing field and one property per member
///
/// When `interface` is absent and the source is not public, the accessors
/// are internal.
pub(super) fn backed_type(
    name: QualifiedName,
    kind: SynthKind,
    source: &TypeDescriptor,
    members: Vec<MemberDescriptor>,
    interface: Option<&QualifiedName>,
) -> SynthesisResult<SynthesizedType> {
    let accessor_visibility = match interface {
        None if source.visibility != Visibility::Public => Visibility::Internal,
        _ => Visibility::Public,
    };

    let mut ty = SynthesizedType::new(name, kind, source.name.clone());
    if let Some(interface) = interface {
        ty.interfaces.push(interface.clone());
    }

    for member in &members {
        let field = FieldRef::new(&ty.name, naming::backing_field(&member.name));
        ty.fields.push(FieldSpec {
            name: field.name.clone(),
            ty: member.ty.clone(),
            visibility: Visibility::Private,
        });

        let binding = |method: &str| {
            interface.map(|iface| MethodBinding {
                interface: iface.clone(),
                method: method.to_string(),
            })
        };

        let getter = naming::getter(&member.name);
        let mut body = BodyBuilder::new();
        body.load_this()?.load_field(&field)?.ret()?;
        ty.methods.push(MethodSpec {
            name: getter.clone(),
            visibility: accessor_visibility,
            kind: MethodKind::Instance,
            params: Vec::new(),
            returns: Some(member.ty.clone()),
            implements: binding(&getter),
            special_name: true,
            body: Some(body.finish(true)?),
        });

        let setter = naming::setter(&member.name);
        let mut body = BodyBuilder::new();
        body.load_this()?.load_arg(1)?.store_field(&field)?.ret()?;
        ty.methods.push(MethodSpec {
            name: setter.clone(),
            visibility: accessor_visibility,
            kind: MethodKind::Instance,
            params: vec![ParamSpec::new("value", member.ty.clone())],
            returns: None,
            implements: binding(&setter),
            special_name: true,
            body: Some(body.finish(false)?),
        });

        ty.properties.push(PropertySpec {
            name: member.name.clone(),
            ty: member.ty.clone(),
            getter: Some(getter),
            setter: Some(setter),
        });
    }

    ty.members = members;
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use crate::descriptor::{PrimitiveType, SourceCatalog, TypeRef};
    use crate::emit::Instr;
    use crate::session::Session;
    use std::time::Duration;

    fn point() -> TypeDescriptor {
        TypeDescriptor::class("Acme.Point")
            .with_member(MemberDescriptor::new("X", PrimitiveType::I32))
            .with_member(MemberDescriptor::new("Label", TypeRef::String))
    }

    #[test]
    fn test_proxy_shape() {
        let catalog = SourceCatalog::from_types(vec![point()]).unwrap();
        let options = EngineOptions::default();
        let session = Session::new(Duration::from_secs(1));
        let synth = Synthesizer::new(&catalog, &options, &session);
        let iface = QualifiedName::parse("Acme.IPoint");

        let proxy = synth
            .proxy(&point(), Some(&iface), &mut ResolutionScope::new())
            .unwrap()
            .unwrap();
        assert_eq!(proxy.canonical(), "Acme.PointProxy");
        assert!(proxy.sealed);
        assert_eq!(proxy.visibility, Visibility::Internal);
        assert_eq!(proxy.interfaces, vec![iface.clone()]);
        assert_eq!(proxy.fields.len(), 2);
        assert_eq!(proxy.fields[1].name, "_label");

        let ctor = proxy.find_method(".ctor", 0).unwrap();
        assert_eq!(ctor.kind, MethodKind::Constructor);

        let get_x = proxy.find_method("get_X", 0).unwrap();
        assert_eq!(
            get_x.implements,
            Some(MethodBinding {
                interface: iface,
                method: "get_X".to_string()
            })
        );
        let body = get_x.body.as_ref().unwrap();
        assert_eq!(body.instrs[0], Instr::LoadThis);
        assert!(matches!(&body.instrs[1], Instr::LoadField(f) if f.name == "_x"));
        assert_eq!(body.instrs[2], Instr::Return);

        let set_x = proxy.find_method("set_X", 1).unwrap();
        let body = set_x.body.as_ref().unwrap();
        assert_eq!(body.instrs[1], Instr::LoadArg(1));
        assert_eq!(body.max_stack, 2);
    }

    #[test]
    fn test_internal_source_without_interface() {
        let source = point().internal();
        let ty = backed_type(
            QualifiedName::parse("Acme.Point"),
            SynthKind::StructClone,
            &source,
            source.members.clone(),
            None,
        )
        .unwrap();
        assert!(ty.interfaces.is_empty());
        assert!(ty
            .methods
            .iter()
            .all(|m| m.visibility == Visibility::Internal && m.implements.is_none()));

        let public = backed_type(
            QualifiedName::parse("Acme.PointProxy"),
            SynthKind::Proxy,
            &source,
            source.members.clone(),
            Some(&QualifiedName::parse("Acme.IPoint")),
        )
        .unwrap();
        assert!(public.methods.iter().all(|m| m.visibility == Visibility::Public));
    }
}
