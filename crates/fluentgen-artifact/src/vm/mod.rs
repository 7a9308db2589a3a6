//! Loader and interpreter for persisted artifacts
//!
//! Value-type instances are heap objects here, like every other instance;
//! copies made by the base runtime's value semantics are not modelled.

mod dynamic;
mod interpreter;
mod value;

pub use dynamic::DynamicFluent;
pub use interpreter::{Vm, MAX_CALL_DEPTH};
pub use value::{Instance, ObjectRef, Value};

use crate::artifact::ArtifactError;
use crate::encoder::DecodeError;
use crate::verify::VerifyError;
use thiserror::Error;

/// Interpreter errors
#[derive(Debug, Error)]
pub enum VmError {
    /// Artifact failed to decode
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Artifact failed verification
    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// Method body failed to decode
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Type not defined in the artifact
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Interface, enum or abstract type passed to `new_object`
    #[error("Type {0} cannot be instantiated")]
    NotInstantiable(String),

    /// No method with the given name and arity
    #[error("Method {type_name}::{method}/{arity} not found")]
    MethodNotFound {
        /// Type searched
        type_name: String,
        /// Method name
        method: String,
        /// Argument count
        arity: usize,
    },

    /// No field with the given name
    #[error("Field {type_name}::{field} not found")]
    FieldNotFound {
        /// Type searched
        type_name: String,
        /// Field name
        field: String,
    },

    /// No property with the given name
    #[error("Property {type_name}::{property} not found")]
    PropertyNotFound {
        /// Type searched
        type_name: String,
        /// Property name
        property: String,
    },

    /// Property exists but lacks the requested accessor
    #[error("Property {property} has no {accessor}")]
    AccessorMissing {
        /// Property name
        property: String,
        /// "getter" or "setter"
        accessor: &'static str,
    },

    /// Member access on null
    #[error("Null reference")]
    NullReference,

    /// Operand of the wrong kind
    #[error("Type error: {0}")]
    TypeError(String),

    /// Operand stack exhausted
    #[error("Stack underflow")]
    StackUnderflow,

    /// Nested calls exceeded [`MAX_CALL_DEPTH`]
    #[error("Call depth {0} exceeded")]
    CallDepthExceeded(usize),

    /// Argument or member-ref index out of range
    #[error("Invalid operand {0}")]
    InvalidOperand(u32),
}

/// Interpreter result
pub type VmResult<T> = Result<T, VmError>;
