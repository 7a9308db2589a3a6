//! Fluentgen Artifact Format
//!
//! This crate provides the instruction set, type-definition tables and
//! binary container for synthesized types, together with a verifier, a
//! disassembler and a small interpreter that loads artifacts and runs their
//! accessor bodies.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod artifact;
pub mod encoder;
pub mod opcode;
pub mod pretty;
pub mod types;
pub mod verify;
pub mod vm;

pub use artifact::{
    flags, method_flags, type_flags, Artifact, ArtifactError, EnumLiteral, FieldDef, MemberKind,
    MemberRef, Metadata, MethodDef, MethodImpl, Param, PropertyDef, TypeDef, TypeKind, Visibility,
};
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use opcode::Opcode;
pub use pretty::PrettyPrint;
pub use types::{Primitive, TypeSig, CONSTRUCTOR, ROOT_OBJECT};
pub use verify::{verify_artifact, VerifyError};
pub use vm::{DynamicFluent, Value, Vm, VmError, VmResult};
