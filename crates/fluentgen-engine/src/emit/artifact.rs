//! Lowering to the binary artifact format

use super::backend::{ArtifactMetadata, Backend};
use super::instr::{Body, Instr};
use crate::descriptor::{TypeRef, Visibility};
use crate::error::{SynthesisError, SynthesisResult};
use crate::synth::{MethodKind, MethodSpec, SynthKind, SynthesizedType};
use fluentgen_artifact::{
    flags, method_flags, type_flags, verify_artifact, Artifact, BytecodeWriter, EnumLiteral, FieldDef,
    MemberRef, MethodDef, MethodImpl, Param, PropertyDef, TypeDef, TypeKind, TypeSig,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Produces a verified [`Artifact`]
///
/// Member references are deduplicated into a single table. The artifact is
/// flagged standalone when every type it mentions is lowered into it or is a
/// registered base-runtime type or generic definition. The runtime names in
/// use are recorded in the artifact's runtime-reference table.
#[derive(Debug, Clone, Default)]
pub struct ArtifactBackend {
    runtime_types: FxHashSet<String>,
    runtime_generics: FxHashSet<String>,
}

impl ArtifactBackend {
    /// Create a backend with no known runtime types
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to register base-runtime types by canonical name
    pub fn with_runtime_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_types.extend(names.into_iter().map(Into::into));
        self
    }

    /// Builder-style method to register base-runtime generic definitions
    pub fn with_runtime_generics<I, S>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_generics.extend(definitions.into_iter().map(Into::into));
        self
    }
}

/// Standalone check over one lowering, collecting the runtime names it relies on
struct Closure<'a> {
    backend: &'a ArtifactBackend,
    lowered: FxHashSet<String>,
    runtime_refs: BTreeSet<String>,
}

impl Closure<'_> {
    fn runtime(&mut self, known: bool, name: String) -> bool {
        if known {
            self.runtime_refs.insert(name);
        }
        known
    }

    fn resolves(&mut self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Synthesized(name) => self.lowered.contains(&name.canonical()),
            TypeRef::Named(name) => {
                let name = name.canonical();
                if self.lowered.contains(&name) {
                    return true;
                }
                let known = self.backend.runtime_types.contains(&name);
                self.runtime(known, name)
            }
            TypeRef::Array(elem) => self.resolves(elem),
            TypeRef::Generic { definition, args } => {
                let definition = definition.canonical();
                let known = self.backend.runtime_generics.contains(&definition);
                self.runtime(known, definition) && args.iter().all(|a| self.resolves(a))
            }
            TypeRef::Primitive(_) | TypeRef::String | TypeRef::Object => true,
        }
    }

    fn type_resolves(&mut self, ty: &SynthesizedType) -> bool {
        ty.interfaces.iter().all(|i| self.lowered.contains(&i.canonical()))
            && ty.fields.iter().all(|f| self.resolves(&f.ty))
            && ty.properties.iter().all(|p| self.resolves(&p.ty))
            && ty.methods.iter().all(|m| {
                m.params.iter().all(|p| self.resolves(&p.ty))
                    && m.returns.as_ref().map_or(true, |r| self.resolves(r))
            })
    }
}

impl Backend for ArtifactBackend {
    type Output = Artifact;

    fn lower(&self, metadata: &ArtifactMetadata, types: &[Arc<SynthesizedType>]) -> SynthesisResult<Artifact> {
        let mut artifact = Artifact::new(metadata.name.clone());
        artifact.metadata = metadata.clone();

        let mut lowering = Lowering::default();
        let mut seen = FxHashSet::default();
        for ty in types {
            let name = ty.canonical();
            if !seen.insert(name.clone()) {
                return Err(SynthesisError::Lowering(format!("type {} is emitted twice", name)));
            }
            artifact.types.push(lowering.type_def(ty)?);
        }
        artifact.member_refs = lowering.member_refs;

        let mut closure = Closure {
            backend: self,
            lowered: seen,
            runtime_refs: BTreeSet::new(),
        };
        let standalone = types.iter().all(|t| closure.type_resolves(t));
        artifact.flags = if standalone { flags::STANDALONE } else { flags::LENIENT };
        artifact.runtime_refs = closure.runtime_refs.into_iter().collect();

        verify_artifact(&artifact).map_err(|e| SynthesisError::Lowering(e.to_string()))?;
        debug!(
            types = artifact.types.len(),
            member_refs = artifact.member_refs.len(),
            runtime_refs = artifact.runtime_refs.len(),
            standalone,
            "lowered artifact"
        );
        Ok(artifact)
    }
}

/// Member-reference table under construction
#[derive(Debug, Default)]
struct Lowering {
    member_refs: Vec<MemberRef>,
    index: FxHashMap<MemberRef, u32>,
}

impl Lowering {
    fn intern(&mut self, member: MemberRef) -> u32 {
        if let Some(&idx) = self.index.get(&member) {
            return idx;
        }
        let idx = self.member_refs.len() as u32;
        self.member_refs.push(member.clone());
        self.index.insert(member, idx);
        idx
    }

    fn type_def(&mut self, ty: &SynthesizedType) -> SynthesisResult<TypeDef> {
        let kind = match ty.kind {
            SynthKind::Interface => TypeKind::Interface,
            SynthKind::Proxy | SynthKind::Fluent => TypeKind::Class,
            SynthKind::StructClone => TypeKind::Struct,
            SynthKind::EnumClone => TypeKind::Enum,
        };

        let mut def = TypeDef::new(ty.canonical(), kind);
        def.visibility = visibility(ty.visibility);
        if ty.kind == SynthKind::Interface {
            def.flags |= type_flags::ABSTRACT;
        }
        if ty.sealed {
            def.flags |= type_flags::SEALED;
        }
        if kind == TypeKind::Class {
            def.base = Some(fluentgen_artifact::ROOT_OBJECT.to_string());
        }
        def.interfaces = ty.interfaces.iter().map(|i| i.canonical()).collect();

        def.fields = ty
            .fields
            .iter()
            .map(|f| FieldDef {
                name: f.name.clone(),
                ty: signature(&f.ty),
                visibility: visibility(f.visibility),
            })
            .collect();

        for method in &ty.methods {
            def.methods.push(self.method_def(ty, method)?);
        }

        def.properties = ty
            .properties
            .iter()
            .map(|p| PropertyDef {
                name: p.name.clone(),
                ty: signature(&p.ty),
                getter: p.getter.clone(),
                setter: p.setter.clone(),
            })
            .collect();

        if let Some(spec) = &ty.enum_spec {
            def.underlying = Some(spec.underlying);
            def.literals = spec
                .literals
                .iter()
                .map(|l| EnumLiteral {
                    name: l.name.clone(),
                    value: l.value,
                })
                .collect();
        }
        Ok(def)
    }

    fn method_def(&mut self, owner: &SynthesizedType, method: &MethodSpec) -> SynthesisResult<MethodDef> {
        let mut flags = match method.kind {
            MethodKind::Abstract => method_flags::ABSTRACT | method_flags::VIRTUAL,
            MethodKind::Instance if method.implements.is_some() => method_flags::VIRTUAL | method_flags::FINAL,
            MethodKind::Instance => 0,
            MethodKind::Constructor => method_flags::CONSTRUCTOR,
            MethodKind::Static => method_flags::STATIC,
        };
        if method.special_name {
            flags |= method_flags::SPECIAL_NAME;
        }

        let (code, max_stack) = match (&method.body, method.kind) {
            (None, MethodKind::Abstract) => (Vec::new(), 0),
            (Some(body), kind) if kind != MethodKind::Abstract => (self.encode(body), body.max_stack),
            _ => {
                return Err(SynthesisError::Lowering(format!(
                    "{}::{} has a body that does not match its kind",
                    owner.name, method.name
                )))
            }
        };

        Ok(MethodDef {
            name: method.name.clone(),
            visibility: visibility(method.visibility),
            flags,
            params: method
                .params
                .iter()
                .map(|p| Param {
                    name: p.name.clone(),
                    ty: signature(&p.ty),
                })
                .collect(),
            return_type: method.returns.as_ref().map_or(TypeSig::Void, signature),
            overrides: method.implements.as_ref().map(|b| MethodImpl {
                interface: b.interface.canonical(),
                method: b.method.clone(),
            }),
            max_stack,
            code,
        })
    }

    fn encode(&mut self, body: &Body) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();
        for instr in &body.instrs {
            match instr {
                Instr::LoadThis => writer.emit_load_arg(0),
                Instr::LoadArg(slot) => writer.emit_load_arg(*slot),
                Instr::LoadField(field) => {
                    let idx = self.intern(MemberRef::field(field.owner.canonical(), field.name.clone()));
                    writer.emit_load_field(idx);
                }
                Instr::StoreField(field) => {
                    let idx = self.intern(MemberRef::field(field.owner.canonical(), field.name.clone()));
                    writer.emit_store_field(idx);
                }
                Instr::Call(m) => {
                    let idx = self.intern(method_ref(m));
                    writer.emit_call(idx);
                }
                Instr::CallVirt(m) => {
                    let idx = self.intern(method_ref(m));
                    writer.emit_call_virt(idx);
                }
                Instr::NewObj(m) => {
                    let idx = self.intern(method_ref(m));
                    writer.emit_new_obj(idx);
                }
                Instr::Return => writer.emit_return(),
            }
        }
        writer.into_bytes()
    }
}

fn method_ref(m: &super::instr::MethodRef) -> MemberRef {
    let member = MemberRef::method(m.owner.canonical(), m.name.clone(), m.params, m.returns);
    if m.is_static {
        member.as_static()
    } else {
        member
    }
}

fn visibility(v: Visibility) -> fluentgen_artifact::Visibility {
    match v {
        Visibility::Public => fluentgen_artifact::Visibility::Public,
        Visibility::Internal => fluentgen_artifact::Visibility::Internal,
        Visibility::Private => fluentgen_artifact::Visibility::Private,
    }
}

/// Artifact signature of a member type
pub(crate) fn signature(ty: &TypeRef) -> TypeSig {
    match ty {
        TypeRef::Primitive(p) => TypeSig::Primitive(*p),
        TypeRef::String => TypeSig::String,
        TypeRef::Object => TypeSig::Object,
        TypeRef::Named(name) | TypeRef::Synthesized(name) => TypeSig::Named(name.canonical()),
        TypeRef::Array(elem) => TypeSig::Array(Box::new(signature(elem))),
        TypeRef::Generic { definition, args } => TypeSig::Generic {
            definition: definition.canonical(),
            args: args.iter().map(signature).collect(),
        },
    }
}
