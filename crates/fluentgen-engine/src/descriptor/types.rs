//! Names and type references

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive types provided by the base runtime
pub use fluentgen_artifact::Primitive as PrimitiveType;

/// Fully qualified type name
///
/// Serialized as its canonical string, `namespace.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct QualifiedName {
    /// Dotted namespace, possibly empty
    pub namespace: String,
    /// Simple name
    pub name: String,
}

impl QualifiedName {
    /// Create a name from its parts
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Split a canonical name at its last dot
    pub fn parse(canonical: &str) -> Self {
        match canonical.rsplit_once('.') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new("", canonical),
        }
    }

    /// Canonical form: `namespace.name`, or `name` when the namespace is empty
    pub fn canonical(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Same namespace, different simple name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self::new(self.namespace.clone(), name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace, self.name)
        }
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<QualifiedName> for String {
    fn from(q: QualifiedName) -> Self {
        q.canonical()
    }
}

/// Declared type of a member
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// Base-runtime primitive
    Primitive(PrimitiveType),
    /// String
    String,
    /// Root object type
    Object,
    /// Type in the source catalog
    Named(QualifiedName),
    /// Single-dimension array
    Array(Box<TypeRef>),
    /// Open generic definition applied to arguments
    Generic {
        /// Open definition
        definition: QualifiedName,
        /// Type arguments
        args: Vec<TypeRef>,
    },
    /// Type produced by the engine
    Synthesized(QualifiedName),
}

impl TypeRef {
    /// Reference a catalog type by canonical name
    pub fn named(canonical: &str) -> Self {
        Self::Named(QualifiedName::parse(canonical))
    }

    /// Array of this type
    pub fn array_of(self) -> Self {
        Self::Array(Box::new(self))
    }

    /// Check if nothing in this reference points into the source catalog
    pub fn is_self_contained(&self) -> bool {
        match self {
            Self::Primitive(_) | Self::String | Self::Object | Self::Synthesized(_) => true,
            Self::Named(_) => false,
            Self::Array(elem) => elem.is_self_contained(),
            Self::Generic { args, .. } => args.iter().all(Self::is_self_contained),
        }
    }

    /// Call `f` with every engine-produced type this reference mentions
    pub fn for_each_synthesized<'a>(&'a self, f: &mut impl FnMut(&'a QualifiedName)) {
        match self {
            Self::Synthesized(name) => f(name),
            Self::Array(elem) => elem.for_each_synthesized(f),
            Self::Generic { args, .. } => args.iter().for_each(|a| a.for_each_synthesized(f)),
            Self::Primitive(_) | Self::String | Self::Object | Self::Named(_) => {}
        }
    }
}

impl From<PrimitiveType> for TypeRef {
    fn from(p: PrimitiveType) -> Self {
        Self::Primitive(p)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{}", p),
            Self::String => write!(f, "string"),
            Self::Object => write!(f, "object"),
            Self::Named(name) | Self::Synthesized(name) => write!(f, "{}", name),
            Self::Array(elem) => write!(f, "{}[]", elem),
            Self::Generic { definition, args } => {
                write!(f, "{}<", definition)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Type or member visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible outside the declaring artifact
    #[default]
    Public,
    /// Visible inside the declaring artifact only
    Internal,
    /// Visible inside the declaring type only
    Private,
}

/// Where a source type was loaded from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The base runtime (never synthesized, except enums)
    Runtime,
    /// A named external artifact
    Artifact(String),
}

impl Default for Origin {
    fn default() -> Self {
        Self::Artifact(String::new())
    }
}

/// Enum literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// Literal name
    pub name: String,
    /// Literal value
    pub value: i64,
}

impl Literal {
    /// Create a literal
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Structural kind of a source type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    /// Reference type
    #[default]
    Class,
    /// Abstract contract
    Interface,
    /// Value type
    Struct,
    /// Named integral constants
    Enum {
        /// Underlying integral primitive
        underlying: PrimitiveType,
        /// Literals in declaration order
        literals: Vec<Literal>,
    },
}

impl DescriptorKind {
    /// Check if this is a value type (struct or enum)
    pub fn is_value_type(&self) -> bool {
        matches!(self, Self::Struct | Self::Enum { .. })
    }
}
