//! Source type descriptors supplied by an external scanner

mod catalog;
mod member;
mod types;

pub use catalog::{SourceCatalog, DEFAULT_RUNTIME_GENERICS};
pub use member::MemberDescriptor;
pub use types::{
    DescriptorKind, Literal, Origin, PrimitiveType, QualifiedName, TypeRef, Visibility,
};

use serde::{Deserialize, Serialize};

/// Per-type build options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeOptions {
    /// Omit fluent getters unless a member overrides it
    pub setters_only: bool,
    /// Name of a static method on the fluent wrapper returning a new instance
    pub static_factory: Option<String>,
}

/// Description of one source type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Canonical name
    pub name: QualifiedName,
    /// Structural kind
    #[serde(default)]
    pub kind: DescriptorKind,
    /// Type visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Base type whose members are inherited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<QualifiedName>,
    /// Where the type was loaded from
    #[serde(default)]
    pub origin: Origin,
    /// Declared members in declaration order
    #[serde(default)]
    pub members: Vec<MemberDescriptor>,
    /// Build options
    #[serde(default)]
    pub options: TypeOptions,
}

impl TypeDescriptor {
    /// Create a descriptor with no members
    ///
    /// The origin defaults to an artifact named after the namespace.
    pub fn new(name: impl Into<QualifiedName>, kind: DescriptorKind) -> Self {
        let name = name.into();
        let origin = Origin::Artifact(name.namespace.clone());
        Self {
            name,
            kind,
            visibility: Visibility::Public,
            base: None,
            origin,
            members: Vec::new(),
            options: TypeOptions::default(),
        }
    }

    /// Reference type
    pub fn class(name: &str) -> Self {
        Self::new(name, DescriptorKind::Class)
    }

    /// Value type
    pub fn structure(name: &str) -> Self {
        Self::new(name, DescriptorKind::Struct)
    }

    /// Enum with the given underlying primitive and literals
    pub fn enumeration(name: &str, underlying: PrimitiveType, literals: Vec<Literal>) -> Self {
        Self::new(name, DescriptorKind::Enum { underlying, literals })
    }

    /// Builder-style method to add a member
    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Builder-style method to set the base type
    pub fn with_base(mut self, base: &str) -> Self {
        self.base = Some(QualifiedName::parse(base));
        self
    }

    /// Builder-style method to set the origin
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Builder-style method to set the per-type options
    pub fn with_options(mut self, options: TypeOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder-style method to mark the type internal
    pub fn internal(mut self) -> Self {
        self.visibility = Visibility::Internal;
        self
    }

    /// Canonical name as a string
    pub fn canonical(&self) -> String {
        self.name.canonical()
    }

    /// Check if the type ships with the base runtime
    pub fn is_runtime(&self) -> bool {
        self.origin == Origin::Runtime
    }

    /// Name of the artifact the type was loaded from, falling back to its namespace
    pub fn origin_name(&self) -> String {
        match &self.origin {
            Origin::Artifact(name) if !name.is_empty() => name.clone(),
            _ if !self.name.namespace.is_empty() => self.name.namespace.clone(),
            _ => self.name.name.clone(),
        }
    }
}
