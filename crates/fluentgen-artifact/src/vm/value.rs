//! Runtime values for the artifact interpreter

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// An instance of a type defined in a loaded artifact
#[derive(Debug)]
pub struct Instance {
    /// Canonical name of the runtime type
    pub type_name: String,
    /// Field values by field name
    pub fields: FxHashMap<String, Value>,
}

/// Shared reference to an instance
///
/// Equality is reference identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<Mutex<Instance>>);

impl ObjectRef {
    /// Allocate a new instance
    pub fn new(instance: Instance) -> Self {
        Self(Arc::new(Mutex::new(instance)))
    }

    /// Canonical name of the runtime type
    pub fn type_name(&self) -> String {
        self.0.lock().type_name.clone()
    }

    /// Read a field
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.0.lock().fields.get(name).cloned()
    }

    /// Write a field, returning false if the instance has no such field
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        match self.0.lock().fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Check if two references point at the same instance
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} @ {:p}>", self.type_name(), Arc::as_ptr(&self.0))
    }
}

/// Interpreter value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null reference
    Null,
    /// Boolean
    Bool(bool),
    /// Any integral primitive, enum value, char, date/time tick count
    Int(i64),
    /// Any floating primitive or decimal
    Float(f64),
    /// String
    Str(Arc<str>),
    /// Object reference
    Object(ObjectRef),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the object payload
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Name of the value's kind, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}
