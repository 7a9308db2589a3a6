//! Type signatures stored in artifacts

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical name of the root object type
///
/// Classes without an explicit base derive from it; its constructor does nothing.
pub const ROOT_OBJECT: &str = "object";

/// Name given to instance constructors
pub const CONSTRUCTOR: &str = ".ctor";

/// Primitive types provided by the base runtime
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    /// Boolean
    Bool = 0,
    /// UTF-16 code unit
    Char = 1,
    /// 8-bit signed integer
    I8 = 2,
    /// 16-bit signed integer
    I16 = 3,
    /// 32-bit signed integer
    I32 = 4,
    /// 64-bit signed integer
    I64 = 5,
    /// 8-bit unsigned integer
    U8 = 6,
    /// 16-bit unsigned integer
    U16 = 7,
    /// 32-bit unsigned integer
    U32 = 8,
    /// 64-bit unsigned integer
    U64 = 9,
    /// 32-bit float
    F32 = 10,
    /// 64-bit float
    F64 = 11,
    /// 128-bit decimal
    Decimal = 12,
    /// Point in time
    DateTime = 13,
    /// Time interval
    TimeSpan = 14,
    /// 128-bit identifier
    Guid = 15,
}

impl Primitive {
    /// Every primitive, in tag order
    pub const ALL: [Primitive; 16] = [
        Self::Bool,
        Self::Char,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Decimal,
        Self::DateTime,
        Self::TimeSpan,
        Self::Guid,
    ];

    /// Convert byte to primitive
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Convert primitive to byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Lowercase name used in listings and manifests
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Decimal => "decimal",
            Self::DateTime => "datetime",
            Self::TimeSpan => "timespan",
            Self::Guid => "guid",
        }
    }

    /// Check if this primitive can back an enum
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::U64
        )
    }

    /// Check if values of this primitive are floating point
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64 | Self::Decimal)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type signature of a field, parameter, property or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    /// No value (method returns only)
    Void,
    /// Base-runtime primitive
    Primitive(Primitive),
    /// String
    String,
    /// Root object type
    Object,
    /// Type referenced by canonical name
    Named(String),
    /// Single-dimension array
    Array(Box<TypeSig>),
    /// Closed generic: definition applied to arguments
    Generic {
        /// Canonical name of the open definition
        definition: String,
        /// Type arguments
        args: Vec<TypeSig>,
    },
}

mod tag {
    pub const VOID: u8 = 0;
    pub const PRIMITIVE: u8 = 1;
    pub const STRING: u8 = 2;
    pub const OBJECT: u8 = 3;
    pub const NAMED: u8 = 4;
    pub const ARRAY: u8 = 5;
    pub const GENERIC: u8 = 6;
}

impl TypeSig {
    /// Check if this is the void signature
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Visit every type name this signature mentions, generic definitions included
    pub fn for_each_named<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Self::Named(name) => f(name),
            Self::Array(elem) => elem.for_each_named(f),
            Self::Generic { definition, args } => {
                f(definition);
                for arg in args {
                    arg.for_each_named(f);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn encode(&self, writer: &mut BytecodeWriter) {
        match self {
            Self::Void => writer.emit_u8(tag::VOID),
            Self::Primitive(p) => {
                writer.emit_u8(tag::PRIMITIVE);
                writer.emit_u8(p.to_u8());
            }
            Self::String => writer.emit_u8(tag::STRING),
            Self::Object => writer.emit_u8(tag::OBJECT),
            Self::Named(name) => {
                writer.emit_u8(tag::NAMED);
                writer.emit_string(name);
            }
            Self::Array(elem) => {
                writer.emit_u8(tag::ARRAY);
                elem.encode(writer);
            }
            Self::Generic { definition, args } => {
                writer.emit_u8(tag::GENERIC);
                writer.emit_string(definition);
                writer.emit_u32(args.len() as u32);
                for arg in args {
                    arg.encode(writer);
                }
            }
        }
    }

    pub(crate) fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let offset = reader.position();
        let t = reader.read_u8()?;
        Ok(match t {
            tag::VOID => Self::Void,
            tag::PRIMITIVE => {
                let offset = reader.position();
                let byte = reader.read_u8()?;
                let p = Primitive::from_u8(byte).ok_or(DecodeError::InvalidTag {
                    what: "primitive",
                    tag: byte,
                    offset,
                })?;
                Self::Primitive(p)
            }
            tag::STRING => Self::String,
            tag::OBJECT => Self::Object,
            tag::NAMED => Self::Named(reader.read_string()?),
            tag::ARRAY => Self::Array(Box::new(Self::decode(reader)?)),
            tag::GENERIC => {
                let definition = reader.read_string()?;
                let count = reader.read_u32()? as usize;
                let mut args = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    args.push(Self::decode(reader)?);
                }
                Self::Generic { definition, args }
            }
            other => {
                return Err(DecodeError::InvalidTag {
                    what: "type signature",
                    tag: other,
                    offset,
                })
            }
        })
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Primitive(p) => write!(f, "{}", p),
            Self::String => write!(f, "string"),
            Self::Object => write!(f, "object"),
            Self::Named(name) => write!(f, "{}", name),
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
