//! Fluent wrapper synthesis

use super::naming;
use super::{FieldSpec, MethodKind, MethodSpec, ParamSpec, PropertySpec, ResolutionScope, SynthKind, SynthesizedType, Synthesizer};
use crate::cache::{CacheKey, CachedType};
use crate::descriptor::{TypeOptions, Visibility};
use crate::emit::{Body, BodyBuilder, FieldRef, MethodRef, CONSTRUCTOR};
use crate::error::{SynthesisError, SynthesisResult};

impl Synthesizer<'_> {
    /// Chainable wrapper holding a reference typed as `interface`
    ///
    /// The wrapper has two constructors, one setter per member returning the
    /// wrapper, a getter per member unless suppressed, a read-only accessor
    /// for the wrapped reference and an optional static factory. Cached under
    /// the wrapper's canonical name; returns `Ok(None)` when the proxy has no
    /// members.
    pub fn fluent(
        &self,
        proxy: &SynthesizedType,
        interface: &SynthesizedType,
        type_options: &TypeOptions,
        scope: &mut ResolutionScope,
    ) -> SynthesisResult<CachedType> {
        let name = naming::fluent_name(&proxy.name, self.options);
        let key = CacheKey::new(SynthKind::Fluent, name.canonical());

        self.memoize(key, scope, |_| {
            if proxy.members.is_empty() {
                return Ok(None);
            }

            let mut ty = SynthesizedType::new(name, SynthKind::Fluent, proxy.source.clone());
            let self_ty = ty.handle();
            let iface_ty = interface.handle();
            let object = FieldRef::new(&ty.name, naming::backing_field(&self.options.object_property));
            ty.fields.push(FieldSpec {
                name: object.name.clone(),
                ty: iface_ty.clone(),
                visibility: Visibility::Private,
            });

            // new() wraps a fresh proxy; new(obj) wraps an existing instance
            let mut body = BodyBuilder::new();
            body.load_this()?.call(MethodRef::root_constructor())?;
            body.load_this()?.new_obj(MethodRef::constructor(&proxy.name, 0))?;
            body.store_field(&object)?.ret()?;
            push(&mut ty, constructor(Vec::new(), body.finish(false)?))?;

            let mut body = BodyBuilder::new();
            body.load_this()?.call(MethodRef::root_constructor())?;
            body.load_this()?.load_arg(1)?.store_field(&object)?.ret()?;
            push(
                &mut ty,
                constructor(vec![ParamSpec::new("value", iface_ty.clone())], body.finish(false)?),
            )?;

            for member in &proxy.members {
                let set = MethodRef::instance(&interface.name, naming::setter(&member.name), 1, false);
                let mut body = BodyBuilder::new();
                body.load_this()?.load_field(&object)?.load_arg(1)?.call_virt(set)?;
                body.load_this()?.ret()?;
                push(
                    &mut ty,
                    MethodSpec {
                        name: member.fluent_setter().to_string(),
                        visibility: Visibility::Public,
                        kind: MethodKind::Instance,
                        params: vec![ParamSpec::new("value", member.ty.clone())],
                        returns: Some(self_ty.clone()),
                        implements: None,
                        special_name: false,
                        body: Some(body.finish(true)?),
                    },
                )?;

                if member.has_fluent_getter(type_options.setters_only) {
                    let get = MethodRef::instance(&interface.name, naming::getter(&member.name), 0, true);
                    let mut body = BodyBuilder::new();
                    body.load_this()?.load_field(&object)?.call_virt(get)?.ret()?;
                    push(
                        &mut ty,
                        MethodSpec {
                            name: member.fluent_getter().to_string(),
                            visibility: Visibility::Public,
                            kind: MethodKind::Instance,
                            params: Vec::new(),
                            returns: Some(member.ty.clone()),
                            implements: None,
                            special_name: false,
                            body: Some(body.finish(true)?),
                        },
                    )?;
                }
            }

            let accessor = naming::getter(&self.options.object_property);
            let mut body = BodyBuilder::new();
            body.load_this()?.load_field(&object)?.ret()?;
            push(
                &mut ty,
                MethodSpec {
                    name: accessor.clone(),
                    visibility: Visibility::Public,
                    kind: MethodKind::Instance,
                    params: Vec::new(),
                    returns: Some(iface_ty.clone()),
                    implements: None,
                    special_name: true,
                    body: Some(body.finish(true)?),
                },
            )?;
            ty.properties.push(PropertySpec {
                name: self.options.object_property.clone(),
                ty: iface_ty,
                getter: Some(accessor),
                setter: None,
            });

            if let Some(factory) = type_options.static_factory.as_deref().filter(|f| !f.trim().is_empty()) {
                let mut body = BodyBuilder::new();
                body.new_obj(MethodRef::constructor(&ty.name, 0))?.ret()?;
                push(
                    &mut ty,
                    MethodSpec {
                        name: factory.to_string(),
                        visibility: Visibility::Public,
                        kind: MethodKind::Static,
                        params: Vec::new(),
                        returns: Some(self_ty),
                        implements: None,
                        special_name: false,
                        body: Some(body.finish(true)?),
                    },
                )?;
            }

            ty.members = proxy.members.clone();
            Ok(Some(ty))
        })
    }
}

fn constructor(params: Vec<ParamSpec>, body: Body) -> MethodSpec {
    MethodSpec {
        name: CONSTRUCTOR.to_string(),
        visibility: Visibility::Public,
        kind: MethodKind::Constructor,
        params,
        returns: None,
        implements: None,
        special_name: true,
        body: Some(body),
    }
}

/// Add a method, rejecting a second method with the same name and arity
fn push(ty: &mut SynthesizedType, method: MethodSpec) -> SynthesisResult<()> {
    if ty.find_method(&method.name, method.arity()).is_some() {
        return Err(SynthesisError::Configuration(format!(
            "{} would declare {}/{} twice",
            ty.name,
            method.name,
            method.arity()
        )));
    }
    ty.methods.push(method);
    Ok(())
}
