//! Artifact container format
//!
//! One artifact holds every type synthesized in a build, the member-reference
//! table their bodies point into, and descriptive metadata.

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::types::{Primitive, TypeSig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic number for artifact files: "FGNA"
pub const MAGIC: [u8; 4] = *b"FGNA";

/// Current artifact version
pub const VERSION: u32 = 1;

/// Header size: magic + version + flags + crc32 + sha256
pub const HEADER_SIZE: usize = 48;

/// File extension used for persisted artifacts
pub const FILE_EXTENSION: &str = "fga";

/// Artifact encoding/decoding errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected FGNA, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// CRC32 mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Stored checksum
        expected: u32,
        /// Checksum of the payload as read
        actual: u32,
    },

    /// SHA-256 mismatch
    #[error("Payload hash mismatch")]
    HashMismatch,

    /// Bytes left over after the metadata section
    #[error("{0} trailing bytes after artifact payload")]
    TrailingBytes(usize),
}

/// Artifact flags
pub mod flags {
    /// Every named type referenced by a signature is defined in the artifact
    pub const STANDALONE: u32 = 1 << 0;
    /// Built without fail-fast dereferencing; foreign types may remain
    pub const LENIENT: u32 = 1 << 1;
}

/// Type definition flags
pub mod type_flags {
    /// Cannot be derived from
    pub const SEALED: u32 = 1 << 0;
    /// Cannot be instantiated
    pub const ABSTRACT: u32 = 1 << 1;
}

/// Method definition flags
pub mod method_flags {
    /// No body; implemented by derived types
    pub const ABSTRACT: u32 = 1 << 0;
    /// Dispatched on the receiver's runtime type
    pub const VIRTUAL: u32 = 1 << 1;
    /// No receiver
    pub const STATIC: u32 = 1 << 2;
    /// Instance constructor
    pub const CONSTRUCTOR: u32 = 1 << 3;
    /// Cannot be overridden further
    pub const FINAL: u32 = 1 << 4;
    /// Accessor or constructor, not a user-visible method
    pub const SPECIAL_NAME: u32 = 1 << 5;
}

/// Structural kind of a type definition
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Abstract contract
    Interface = 0,
    /// Reference type
    Class = 1,
    /// Value type
    Struct = 2,
    /// Named integral constants
    Enum = 3,
}

impl TypeKind {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Interface),
            1 => Some(Self::Class),
            2 => Some(Self::Struct),
            3 => Some(Self::Enum),
            _ => None,
        }
    }

    /// Lowercase keyword used in listings
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
        }
    }
}

/// Member or type visibility
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Visible to every consumer of the artifact
    Public = 0,
    /// Visible inside the artifact only
    Internal = 1,
    /// Visible inside the declaring type only
    Private = 2,
}

impl Visibility {
    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Public),
            1 => Some(Self::Internal),
            2 => Some(Self::Private),
            _ => None,
        }
    }

    /// Lowercase keyword used in listings
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Private => "private",
        }
    }
}

fn read_tag<T>(
    reader: &mut BytecodeReader<'_>,
    what: &'static str,
    convert: impl Fn(u8) -> Option<T>,
) -> Result<T, DecodeError> {
    let offset = reader.position();
    let tag = reader.read_u8()?;
    convert(tag).ok_or(DecodeError::InvalidTag { what, tag, offset })
}

/// Kind of member a reference points at
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Field
    Field = 0,
    /// Method or constructor
    Method = 1,
}

/// Symbolic reference to a field or method, shared by all bodies in an artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    /// Field or method
    pub kind: MemberKind,
    /// Canonical name of the declaring type
    pub owner: String,
    /// Member name
    pub name: String,
    /// Number of explicit parameters (methods only)
    pub param_count: u16,
    /// Whether a call leaves a value on the stack (methods only)
    pub returns_value: bool,
    /// Whether a call takes no receiver (methods only)
    pub is_static: bool,
}

impl MemberRef {
    /// Reference to an instance field
    pub fn field(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: MemberKind::Field,
            owner: owner.into(),
            name: name.into(),
            param_count: 0,
            returns_value: false,
            is_static: false,
        }
    }

    /// Reference to an instance method
    pub fn method(
        owner: impl Into<String>,
        name: impl Into<String>,
        param_count: u16,
        returns_value: bool,
    ) -> Self {
        Self {
            kind: MemberKind::Method,
            owner: owner.into(),
            name: name.into(),
            param_count,
            returns_value,
            is_static: false,
        }
    }

    /// Builder-style method to mark as static
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_u8(self.kind as u8);
        writer.emit_string(&self.owner);
        writer.emit_string(&self.name);
        writer.emit_u16(self.param_count);
        writer.emit_bool(self.returns_value);
        writer.emit_bool(self.is_static);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let kind = read_tag(reader, "member kind", |b| match b {
            0 => Some(MemberKind::Field),
            1 => Some(MemberKind::Method),
            _ => None,
        })?;
        Ok(Self {
            kind,
            owner: reader.read_string()?,
            name: reader.read_string()?,
            param_count: reader.read_u16()?,
            returns_value: reader.read_bool()?,
            is_static: reader.read_bool()?,
        })
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeSig,
    /// Field visibility
    pub visibility: Visibility,
}

impl FieldDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        self.ty.encode(writer);
        writer.emit_u8(self.visibility as u8);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: reader.read_string()?,
            ty: TypeSig::decode(reader)?,
            visibility: read_tag(reader, "visibility", Visibility::from_u8)?,
        })
    }
}

/// Explicit binding of a method to the interface method it implements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodImpl {
    /// Canonical name of the interface
    pub interface: String,
    /// Name of the interface method
    pub method: String,
}

/// Method parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: TypeSig,
}

/// Method definition
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Method name
    pub name: String,
    /// Method visibility
    pub visibility: Visibility,
    /// Method flags (see [`method_flags`])
    pub flags: u32,
    /// Explicit parameters
    pub params: Vec<Param>,
    /// Return type
    pub return_type: TypeSig,
    /// Interface method this implements, if any
    pub overrides: Option<MethodImpl>,
    /// Maximum operand stack depth of the body
    pub max_stack: u16,
    /// Encoded body (empty for abstract methods)
    pub code: Vec<u8>,
}

impl MethodDef {
    /// Check if the method has no body
    pub fn is_abstract(&self) -> bool {
        self.flags & method_flags::ABSTRACT != 0
    }

    /// Check if the method takes no receiver
    pub fn is_static(&self) -> bool {
        self.flags & method_flags::STATIC != 0
    }

    /// Check if the method is an instance constructor
    pub fn is_constructor(&self) -> bool {
        self.flags & method_flags::CONSTRUCTOR != 0
    }

    /// Check if a call leaves a value on the stack
    pub fn returns_value(&self) -> bool {
        !self.return_type.is_void()
    }

    /// Number of explicit parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Number of argument slots, including the receiver
    pub fn arg_slots(&self) -> usize {
        self.params.len() + if self.is_static() { 0 } else { 1 }
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u8(self.visibility as u8);
        writer.emit_u32(self.flags);

        writer.emit_u32(self.params.len() as u32);
        for param in &self.params {
            writer.emit_string(&param.name);
            param.ty.encode(writer);
        }
        self.return_type.encode(writer);

        match &self.overrides {
            Some(binding) => {
                writer.emit_u8(1);
                writer.emit_string(&binding.interface);
                writer.emit_string(&binding.method);
            }
            None => writer.emit_u8(0),
        }

        writer.emit_u16(self.max_stack);
        writer.emit_u32(self.code.len() as u32);
        writer.emit_bytes(&self.code);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let visibility = read_tag(reader, "visibility", Visibility::from_u8)?;
        let flags = reader.read_u32()?;

        let param_count = reader.read_u32()? as usize;
        let mut params = Vec::with_capacity(param_count.min(64));
        for _ in 0..param_count {
            params.push(Param {
                name: reader.read_string()?,
                ty: TypeSig::decode(reader)?,
            });
        }
        let return_type = TypeSig::decode(reader)?;

        let overrides = if reader.read_bool()? {
            Some(MethodImpl {
                interface: reader.read_string()?,
                method: reader.read_string()?,
            })
        } else {
            None
        };

        let max_stack = reader.read_u16()?;
        let code_len = reader.read_u32()? as usize;
        let code = reader.read_bytes(code_len)?;

        Ok(Self {
            name,
            visibility,
            flags,
            params,
            return_type,
            overrides,
            max_stack,
            code,
        })
    }
}

/// Property definition linking accessor methods under one name
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// Property type
    pub ty: TypeSig,
    /// Getter method name
    pub getter: Option<String>,
    /// Setter method name
    pub setter: Option<String>,
}

impl PropertyDef {
    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        self.ty.encode(writer);
        writer.emit_opt_string(self.getter.as_deref());
        writer.emit_opt_string(self.setter.as_deref());
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: reader.read_string()?,
            ty: TypeSig::decode(reader)?,
            getter: reader.read_opt_string()?,
            setter: reader.read_opt_string()?,
        })
    }
}

/// Enum literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumLiteral {
    /// Literal name
    pub name: String,
    /// Literal value
    pub value: i64,
}

/// Type definition
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    /// Canonical name
    pub name: String,
    /// Structural kind
    pub kind: TypeKind,
    /// Type visibility
    pub visibility: Visibility,
    /// Type flags (see [`type_flags`])
    pub flags: u32,
    /// Base class, if any
    pub base: Option<String>,
    /// Implemented interfaces
    pub interfaces: Vec<String>,
    /// Instance fields
    pub fields: Vec<FieldDef>,
    /// Methods and constructors
    pub methods: Vec<MethodDef>,
    /// Properties
    pub properties: Vec<PropertyDef>,
    /// Underlying primitive (enums only)
    pub underlying: Option<Primitive>,
    /// Literals (enums only)
    pub literals: Vec<EnumLiteral>,
}

impl TypeDef {
    /// Create an empty type definition
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            flags: 0,
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            underlying: None,
            literals: Vec::new(),
        }
    }

    /// Check if the type is sealed
    pub fn is_sealed(&self) -> bool {
        self.flags & type_flags::SEALED != 0
    }

    /// Find a method by name and explicit arity
    pub fn find_method(&self, name: &str, arity: usize) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.arity() == arity)
    }

    /// Find the method bound to an interface method
    pub fn find_implementation(&self, interface: &str, method: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| {
            m.overrides
                .as_ref()
                .is_some_and(|b| b.interface == interface && b.method == method)
        })
    }

    /// Find a field by name
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find a property by name
    pub fn find_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        writer.emit_u8(self.kind as u8);
        writer.emit_u8(self.visibility as u8);
        writer.emit_u32(self.flags);
        writer.emit_opt_string(self.base.as_deref());

        writer.emit_u32(self.interfaces.len() as u32);
        for iface in &self.interfaces {
            writer.emit_string(iface);
        }

        writer.emit_u32(self.fields.len() as u32);
        for field in &self.fields {
            field.encode(writer);
        }

        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            method.encode(writer);
        }

        writer.emit_u32(self.properties.len() as u32);
        for prop in &self.properties {
            prop.encode(writer);
        }

        match self.underlying {
            Some(p) => {
                writer.emit_u8(1);
                writer.emit_u8(p.to_u8());
            }
            None => writer.emit_u8(0),
        }
        writer.emit_u32(self.literals.len() as u32);
        for literal in &self.literals {
            writer.emit_string(&literal.name);
            writer.emit_i64(literal.value);
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let name = reader.read_string()?;
        let kind = read_tag(reader, "type kind", TypeKind::from_u8)?;
        let visibility = read_tag(reader, "visibility", Visibility::from_u8)?;
        let flags = reader.read_u32()?;
        let base = reader.read_opt_string()?;

        let count = reader.read_u32()? as usize;
        let mut interfaces = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            interfaces.push(reader.read_string()?);
        }

        let count = reader.read_u32()? as usize;
        let mut fields = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            fields.push(FieldDef::decode(reader)?);
        }

        let count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            methods.push(MethodDef::decode(reader)?);
        }

        let count = reader.read_u32()? as usize;
        let mut properties = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            properties.push(PropertyDef::decode(reader)?);
        }

        let underlying = if reader.read_bool()? {
            Some(read_tag(reader, "primitive", Primitive::from_u8)?)
        } else {
            None
        };
        let count = reader.read_u32()? as usize;
        let mut literals = Vec::with_capacity(count.min(256));
        for _ in 0..count {
            literals.push(EnumLiteral {
                name: reader.read_string()?,
                value: reader.read_i64()?,
            });
        }

        Ok(Self {
            name,
            kind,
            visibility,
            flags,
            base,
            interfaces,
            fields,
            methods,
            properties,
            underlying,
            literals,
        })
    }
}

/// Descriptive metadata attached once per artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Artifact name
    pub name: String,
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Build configuration (e.g. "Release")
    pub configuration: Option<String>,
    /// Product name
    pub product: Option<String>,
    /// Product version
    pub version: Option<String>,
    /// File version
    pub file_version: Option<String>,
    /// Company
    pub company: Option<String>,
    /// Copyright notice
    pub copyright: Option<String>,
    /// Trademark notice
    pub trademark: Option<String>,
    /// Culture
    pub culture: Option<String>,
    /// Neutral resources language
    pub neutral_language: Option<String>,
    /// Unique identifier
    pub guid: Option<String>,
    /// Whether the artifact's types are visible to foreign component models
    pub visible: bool,
}

impl Metadata {
    /// Create metadata carrying only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_string(&self.name);
        for field in self.optional_fields() {
            writer.emit_opt_string(field.as_deref());
        }
        writer.emit_bool(self.visible);
    }

    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let mut metadata = Metadata::named(reader.read_string()?);
        for field in metadata.optional_fields_mut() {
            *field = reader.read_opt_string()?;
        }
        metadata.visible = reader.read_bool()?;
        Ok(metadata)
    }

    // Encoding order of the optional fields
    fn optional_fields(&self) -> [&Option<String>; 12] {
        [
            &self.title,
            &self.description,
            &self.configuration,
            &self.product,
            &self.version,
            &self.file_version,
            &self.company,
            &self.copyright,
            &self.trademark,
            &self.culture,
            &self.neutral_language,
            &self.guid,
        ]
    }

    fn optional_fields_mut(&mut self) -> [&mut Option<String>; 12] {
        [
            &mut self.title,
            &mut self.description,
            &mut self.configuration,
            &mut self.product,
            &mut self.version,
            &mut self.file_version,
            &mut self.company,
            &mut self.copyright,
            &mut self.trademark,
            &mut self.culture,
            &mut self.neutral_language,
            &mut self.guid,
        ]
    }
}

/// A persisted set of synthesized types
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Magic number (must be "FGNA")
    pub magic: [u8; 4],
    /// Format version
    pub version: u32,
    /// Artifact flags (see [`flags`])
    pub flags: u32,
    /// Member references used by method bodies
    pub member_refs: Vec<MemberRef>,
    /// Type definitions
    pub types: Vec<TypeDef>,
    /// Base-runtime types and generic definitions the artifact may name
    pub runtime_refs: Vec<String>,
    /// Artifact metadata
    pub metadata: Metadata,
}

impl Artifact {
    /// Create a new empty artifact
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            member_refs: Vec::new(),
            types: Vec::new(),
            runtime_refs: Vec::new(),
            metadata: Metadata::named(name),
        }
    }

    /// Validate header fields
    pub fn validate(&self) -> Result<(), String> {
        if self.magic != MAGIC {
            return Err("Invalid magic number".to_string());
        }
        if self.version != VERSION {
            return Err(format!("Unsupported version: {}", self.version));
        }
        Ok(())
    }

    /// Find a type definition by canonical name
    pub fn find_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Check if a type name is defined here or provided by the base runtime
    pub fn resolves(&self, name: &str) -> bool {
        self.find_type(name).is_some() || self.runtime_refs.iter().any(|r| r == name)
    }

    /// Encode the artifact to binary format
    ///
    /// Format:
    /// - Header: magic (4) + version (u32) + flags (u32) + crc32 (u32) + sha256 (32)
    /// - Member-reference table
    /// - Type table
    /// - Runtime references
    /// - Metadata
    pub fn encode(&self) -> Vec<u8> {
        use sha2::{Digest, Sha256};

        let mut writer = BytecodeWriter::new();

        writer.emit_bytes(&self.magic);
        writer.emit_u32(self.version);
        writer.emit_u32(self.flags);
        let crc32_offset = writer.reserve_u32();
        let sha256_offset = writer.offset();
        writer.emit_bytes(&[0u8; 32]);

        writer.emit_u32(self.member_refs.len() as u32);
        for member in &self.member_refs {
            member.encode(&mut writer);
        }

        writer.emit_u32(self.types.len() as u32);
        for ty in &self.types {
            ty.encode(&mut writer);
        }

        writer.emit_u32(self.runtime_refs.len() as u32);
        for name in &self.runtime_refs {
            writer.emit_string(name);
        }

        self.metadata.encode(&mut writer);

        let payload = &writer.buffer()[HEADER_SIZE..];
        let crc32 = crc32fast::hash(payload);
        let hash: [u8; 32] = Sha256::digest(payload).into();

        writer.patch_u32(crc32_offset, crc32);
        writer.patch_bytes(sha256_offset, &hash);

        writer.into_bytes()
    }

    /// Decode an artifact from binary format
    pub fn decode(data: &[u8]) -> Result<Self, ArtifactError> {
        use sha2::{Digest, Sha256};

        let mut reader = BytecodeReader::new(data);

        let magic_bytes = reader.read_bytes(4)?;
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&magic_bytes);
        if magic != MAGIC {
            return Err(ArtifactError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ArtifactError::UnsupportedVersion(version));
        }

        let flags = reader.read_u32()?;
        let stored_crc32 = reader.read_u32()?;
        let stored_hash = reader.read_bytes(32)?;

        let payload = &data[HEADER_SIZE..];
        let actual_crc32 = crc32fast::hash(payload);
        if stored_crc32 != actual_crc32 {
            return Err(ArtifactError::ChecksumMismatch {
                expected: stored_crc32,
                actual: actual_crc32,
            });
        }
        if Sha256::digest(payload).as_slice() != stored_hash.as_slice() {
            return Err(ArtifactError::HashMismatch);
        }

        let count = reader.read_u32()? as usize;
        let mut member_refs = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            member_refs.push(MemberRef::decode(&mut reader)?);
        }

        let count = reader.read_u32()? as usize;
        let mut types = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            types.push(TypeDef::decode(&mut reader)?);
        }

        let count = reader.read_u32()? as usize;
        let mut runtime_refs = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            runtime_refs.push(reader.read_string()?);
        }

        let metadata = Metadata::decode(&mut reader)?;

        if reader.has_more() {
            return Err(ArtifactError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            magic,
            version,
            flags,
            member_refs,
            types,
            runtime_refs,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CONSTRUCTOR;

    fn point_interface() -> TypeDef {
        let mut iface = TypeDef::new("Acme.IPoint", TypeKind::Interface);
        iface.flags = type_flags::ABSTRACT;
        iface.methods.push(MethodDef {
            name: "get_X".to_string(),
            visibility: Visibility::Public,
            flags: method_flags::ABSTRACT | method_flags::VIRTUAL | method_flags::SPECIAL_NAME,
            params: vec![],
            return_type: TypeSig::Primitive(Primitive::I32),
            overrides: None,
            max_stack: 0,
            code: vec![],
        });
        iface.properties.push(PropertyDef {
            name: "X".to_string(),
            ty: TypeSig::Primitive(Primitive::I32),
            getter: Some("get_X".to_string()),
            setter: None,
        });
        iface
    }

    #[test]
    fn test_artifact_creation() {
        let artifact = Artifact::new("test");
        assert_eq!(artifact.magic, MAGIC);
        assert_eq!(artifact.version, VERSION);
        assert_eq!(artifact.flags, 0);
        assert!(artifact.validate().is_ok());
    }

    #[test]
    fn test_empty_artifact_encoding() {
        let artifact = Artifact::new("Acme.Fluent");
        let bytes = artifact.encode();
        assert_eq!(&bytes[..4], b"FGNA");

        let decoded = Artifact::decode(&bytes).unwrap();
        assert_eq!(decoded.metadata.name, "Acme.Fluent");
        assert!(decoded.types.is_empty());
        assert!(decoded.member_refs.is_empty());
    }

    #[test]
    fn test_artifact_with_types_and_refs() {
        let mut artifact = Artifact::new("Acme.Fluent");
        artifact.flags = flags::STANDALONE;
        artifact.types.push(point_interface());
        artifact
            .member_refs
            .push(MemberRef::method("Acme.PointProxy", CONSTRUCTOR, 0, false));
        artifact.member_refs.push(MemberRef::field("Acme.PointProxy", "_x"));
        artifact.runtime_refs.push("System.Uri".to_string());

        let decoded = Artifact::decode(&artifact.encode()).unwrap();
        assert_eq!(decoded, artifact);
        assert!(decoded.resolves("System.Uri"));
        assert!(decoded.resolves("Acme.IPoint"));
        assert!(!decoded.resolves("Acme.Missing"));

        let iface = decoded.find_type("Acme.IPoint").unwrap();
        assert!(iface.find_method("get_X", 0).unwrap().is_abstract());
        assert_eq!(iface.find_property("X").unwrap().setter, None);
    }

    #[test]
    fn test_metadata_fields_survive() {
        let mut artifact = Artifact::new("Hr.Fluent");
        artifact.metadata.title = Some("Human resources".to_string());
        artifact.metadata.company = Some("Acme".to_string());
        artifact.metadata.guid = Some("2b1e3f1c-0000-4000-8000-000000000000".to_string());
        artifact.metadata.visible = true;

        let decoded = Artifact::decode(&artifact.encode()).unwrap();
        assert_eq!(decoded.metadata, artifact.metadata);
        assert_eq!(decoded.metadata.trademark, None);
    }

    #[test]
    fn test_enum_definition() {
        let mut artifact = Artifact::new("e");
        let mut color = TypeDef::new("Acme.Color", TypeKind::Enum);
        color.underlying = Some(Primitive::U8);
        color.literals = vec![
            EnumLiteral { name: "Red".to_string(), value: 1 },
            EnumLiteral { name: "Blue".to_string(), value: 4 },
        ];
        artifact.types.push(color.clone());

        let decoded = Artifact::decode(&artifact.encode()).unwrap();
        assert_eq!(decoded.types[0], color);
    }

    #[test]
    fn test_checksum_validation() {
        let mut artifact = Artifact::new("test");
        artifact.types.push(point_interface());
        let mut bytes = artifact.encode();

        bytes[HEADER_SIZE + 2] ^= 0xFF;
        let result = Artifact::decode(&bytes);
        assert!(matches!(result, Err(ArtifactError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_hash_validation() {
        let mut bytes = Artifact::new("test").encode();
        bytes[20] ^= 0xFF; // inside the stored SHA-256

        let result = Artifact::decode(&bytes);
        assert!(matches!(result, Err(ArtifactError::HashMismatch)));
    }

    #[test]
    fn test_invalid_magic_number() {
        let mut bytes = Artifact::new("test").encode();
        bytes[..4].copy_from_slice(b"NOPE");
        let result = Artifact::decode(&bytes);
        assert!(matches!(result, Err(ArtifactError::InvalidMagic(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = Artifact::new("test").encode();
        bytes[4..8].copy_from_slice(&999u32.to_le_bytes());
        let result = Artifact::decode(&bytes);
        assert!(matches!(result, Err(ArtifactError::UnsupportedVersion(999))));
    }

    #[test]
    fn test_truncated_header() {
        let result = Artifact::decode(b"FGNA");
        assert!(matches!(result, Err(ArtifactError::DecodeError(_))));
    }
}
