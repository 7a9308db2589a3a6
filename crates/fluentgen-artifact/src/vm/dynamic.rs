//! Late-bound chaining wrapper

use super::{Value, Vm, VmError, VmResult};

/// Sets properties by name on a wrapped object and returns itself for chaining
///
/// ```ignore
/// let mut fluent = DynamicFluent::new(&vm, point)?;
/// fluent.set("X", 1)?.set("Y", 2)?;
/// ```
pub struct DynamicFluent<'vm> {
    vm: &'vm Vm,
    object: Value,
}

impl<'vm> DynamicFluent<'vm> {
    /// Wrap an existing object
    pub fn new(vm: &'vm Vm, object: Value) -> VmResult<Self> {
        if object.as_object().is_none() {
            return Err(VmError::NullReference);
        }
        Ok(Self { vm, object })
    }

    /// Instantiate a type with its parameterless constructor and wrap it
    pub fn create(vm: &'vm Vm, type_name: &str) -> VmResult<Self> {
        let object = vm.new_object(type_name, &[])?;
        Ok(Self { vm, object })
    }

    /// Set a property and return the wrapper
    pub fn set(&mut self, property: &str, value: impl Into<Value>) -> VmResult<&mut Self> {
        self.vm.set_property(&self.object, property, value.into())?;
        Ok(self)
    }

    /// Read a property
    pub fn get(&self, property: &str) -> VmResult<Value> {
        self.vm.get_property(&self.object, property)
    }

    /// The wrapped object
    pub fn object(&self) -> &Value {
        &self.object
    }

    /// Unwrap the object
    pub fn into_object(self) -> Value {
        self.object
    }
}
