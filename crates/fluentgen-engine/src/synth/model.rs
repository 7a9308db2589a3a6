//! Synthesized type model

use crate::descriptor::{Literal, MemberDescriptor, PrimitiveType, QualifiedName, TypeRef, Visibility};
use crate::emit::{Body, Instr, ROOT_OBJECT};
use std::fmt;

/// What a synthesized type was produced as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SynthKind {
    /// Abstract accessor contract
    Interface,
    /// Sealed backing implementation of an interface
    Proxy,
    /// Chainable wrapper around a proxy
    Fluent,
    /// Enum clone made during dereferencing
    EnumClone,
    /// Value-type clone made during dereferencing
    StructClone,
}

impl SynthKind {
    /// Lowercase label for logs and listings
    pub fn label(self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Proxy => "proxy",
            Self::Fluent => "fluent",
            Self::EnumClone => "enum",
            Self::StructClone => "struct",
        }
    }
}

impl fmt::Display for SynthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Backing field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeRef,
    /// Field visibility
    pub visibility: Visibility,
}

/// Method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: TypeRef,
}

impl ParamSpec {
    /// Create a parameter
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty }
    }
}

/// How a method is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Declared without a body
    Abstract,
    /// Instance method with a body
    Instance,
    /// Instance constructor
    Constructor,
    /// Method without a receiver
    Static,
}

/// Interface method a method implements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    /// Interface declaring the method
    pub interface: QualifiedName,
    /// Interface method name
    pub method: String,
}

/// Method or constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpec {
    /// Method name
    pub name: String,
    /// Method visibility
    pub visibility: Visibility,
    /// Dispatch kind
    pub kind: MethodKind,
    /// Explicit parameters
    pub params: Vec<ParamSpec>,
    /// Return type; `None` for void
    pub returns: Option<TypeRef>,
    /// Interface method implemented by this one
    pub implements: Option<MethodBinding>,
    /// Accessor of a property
    pub special_name: bool,
    /// Body; `None` only for abstract methods
    pub body: Option<Body>,
}

impl MethodSpec {
    /// Number of explicit parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Property linking accessor methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    /// Property name
    pub name: String,
    /// Property type
    pub ty: TypeRef,
    /// Getter method name
    pub getter: Option<String>,
    /// Setter method name
    pub setter: Option<String>,
}

/// Underlying primitive and literals of an enum clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSpec {
    /// Underlying integral primitive
    pub underlying: PrimitiveType,
    /// Literals in declaration order
    pub literals: Vec<Literal>,
}

/// A complete type produced by the engine
///
/// Values are immutable once published to the session cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedType {
    /// Canonical name
    pub name: QualifiedName,
    /// What the type was produced as
    pub kind: SynthKind,
    /// Type visibility
    pub visibility: Visibility,
    /// Whether the type can be derived from
    pub sealed: bool,
    /// Source type this was synthesized from
    pub source: QualifiedName,
    /// Implemented interfaces
    pub interfaces: Vec<QualifiedName>,
    /// Source members with dereferenced types, in extraction order
    pub members: Vec<MemberDescriptor>,
    /// Backing fields
    pub fields: Vec<FieldSpec>,
    /// Methods and constructors
    pub methods: Vec<MethodSpec>,
    /// Properties
    pub properties: Vec<PropertySpec>,
    /// Enum data (enum clones only)
    pub enum_spec: Option<EnumSpec>,
}

impl SynthesizedType {
    /// Create an empty type
    pub fn new(name: QualifiedName, kind: SynthKind, source: QualifiedName) -> Self {
        Self {
            name,
            kind,
            visibility: Visibility::Public,
            sealed: false,
            source,
            interfaces: Vec::new(),
            members: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            enum_spec: None,
        }
    }

    /// Reference usable as a member, parameter or element type
    pub fn handle(&self) -> TypeRef {
        TypeRef::Synthesized(self.name.clone())
    }

    /// Canonical name as a string
    pub fn canonical(&self) -> String {
        self.name.canonical()
    }

    /// Find a method by name and arity
    pub fn find_method(&self, name: &str, arity: usize) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name && m.arity() == arity)
    }

    /// Find a property by name
    pub fn find_property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Names of the other types this one needs at load time
    ///
    /// Covers implemented interfaces, member signatures, interface bindings
    /// and the owners of fields and methods used in bodies. The root object
    /// and the type itself are left out.
    pub fn dependencies(&self) -> Vec<QualifiedName> {
        let mut names: Vec<QualifiedName> = Vec::new();
        let mut add = |name: &QualifiedName| {
            if *name != self.name && name.canonical() != ROOT_OBJECT && !names.contains(name) {
                names.push(name.clone());
            }
        };

        self.interfaces.iter().for_each(&mut add);
        for field in &self.fields {
            field.ty.for_each_synthesized(&mut add);
        }
        for property in &self.properties {
            property.ty.for_each_synthesized(&mut add);
        }
        for method in &self.methods {
            for param in &method.params {
                param.ty.for_each_synthesized(&mut add);
            }
            if let Some(ret) = &method.returns {
                ret.for_each_synthesized(&mut add);
            }
            if let Some(binding) = &method.implements {
                add(&binding.interface);
            }
            for instr in method.body.iter().flat_map(|b| b.instrs.iter()) {
                match instr {
                    Instr::LoadField(field) | Instr::StoreField(field) => add(&field.owner),
                    Instr::Call(m) | Instr::CallVirt(m) | Instr::NewObj(m) => add(&m.owner),
                    Instr::LoadThis | Instr::LoadArg(_) | Instr::Return => {}
                }
            }
        }
        names
    }

    /// Check if every field, parameter and return type is free of catalog references
    pub fn is_self_contained(&self) -> bool {
        self.fields.iter().all(|f| f.ty.is_self_contained())
            && self.properties.iter().all(|p| p.ty.is_self_contained())
            && self.methods.iter().all(|m| {
                m.params.iter().all(|p| p.ty.is_self_contained())
                    && m.returns.as_ref().map_or(true, TypeRef::is_self_contained)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_and_lookup() {
        let mut ty = SynthesizedType::new(
            QualifiedName::parse("Acme.IPoint"),
            SynthKind::Interface,
            QualifiedName::parse("Acme.Point"),
        );
        ty.methods.push(MethodSpec {
            name: "set_X".to_string(),
            visibility: Visibility::Public,
            kind: MethodKind::Abstract,
            params: vec![ParamSpec::new("value", TypeRef::Primitive(PrimitiveType::I32))],
            returns: None,
            implements: None,
            special_name: true,
            body: None,
        });
        assert_eq!(ty.handle(), TypeRef::Synthesized(QualifiedName::parse("Acme.IPoint")));
        assert!(ty.find_method("set_X", 1).is_some());
        assert!(ty.find_method("set_X", 0).is_none());
        assert!(ty.is_self_contained());

        ty.fields.push(FieldSpec {
            name: "_home".to_string(),
            ty: TypeRef::named("Other.Address"),
            visibility: Visibility::Private,
        });
        assert!(!ty.is_self_contained());
    }

    #[test]
    fn test_dependencies() {
        use crate::emit::{BodyBuilder, FieldRef, MethodRef};

        let proxy = QualifiedName::parse("Acme.PointProxy");
        let iface = QualifiedName::parse("Acme.IPoint");
        let mut ty = SynthesizedType::new(
            QualifiedName::parse("Acme.FluentPoint"),
            SynthKind::Fluent,
            QualifiedName::parse("Acme.Point"),
        );
        ty.fields.push(FieldSpec {
            name: "_object".to_string(),
            ty: TypeRef::Synthesized(iface.clone()),
            visibility: Visibility::Private,
        });
        ty.fields.push(FieldSpec {
            name: "_tags".to_string(),
            ty: TypeRef::Synthesized(QualifiedName::parse("Acme.Tag")).array_of(),
            visibility: Visibility::Private,
        });

        let object = FieldRef::new(&ty.name, "_object");
        let mut body = BodyBuilder::new();
        body.load_this().unwrap();
        body.call(MethodRef::root_constructor()).unwrap();
        body.load_this().unwrap();
        body.new_obj(MethodRef::constructor(&proxy, 0)).unwrap();
        body.store_field(&object).unwrap();
        body.ret().unwrap();
        ty.methods.push(MethodSpec {
            name: crate::emit::CONSTRUCTOR.to_string(),
            visibility: Visibility::Public,
            kind: MethodKind::Constructor,
            params: Vec::new(),
            returns: None,
            implements: None,
            special_name: true,
            body: None,
        });
        ty.methods[0].body = Some(body.finish(false).unwrap());

        let deps: Vec<String> = ty.dependencies().iter().map(|n| n.canonical()).collect();
        assert_eq!(deps, vec!["Acme.IPoint", "Acme.Tag", "Acme.PointProxy"]);
    }
}
