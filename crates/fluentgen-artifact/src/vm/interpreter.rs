//! Artifact interpreter

use super::value::{Instance, ObjectRef, Value};
use super::{VmError, VmResult};
use crate::artifact::{type_flags, Artifact, MemberRef, MethodDef, PropertyDef, TypeDef, TypeKind};
use crate::encoder::BytecodeReader;
use crate::opcode::Opcode;
use crate::types::{Primitive, TypeSig, CONSTRUCTOR, ROOT_OBJECT};
use crate::verify::verify_artifact;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Maximum nested call depth before execution is aborted
pub const MAX_CALL_DEPTH: usize = 256;

/// Loads a verified artifact and executes its types
pub struct Vm {
    artifact: Arc<Artifact>,
    types: FxHashMap<String, usize>,
}

impl Vm {
    /// Verify and load a decoded artifact
    pub fn load(artifact: Artifact) -> VmResult<Self> {
        verify_artifact(&artifact)?;
        let types = artifact
            .types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Ok(Self {
            artifact: Arc::new(artifact),
            types,
        })
    }

    /// Decode, verify and load an artifact from bytes
    pub fn from_bytes(bytes: &[u8]) -> VmResult<Self> {
        Self::load(Artifact::decode(bytes)?)
    }

    /// The loaded artifact
    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// Look up a type definition by canonical name
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name).map(|&i| &self.artifact.types[i])
    }

    fn lookup(&self, name: &str) -> VmResult<&TypeDef> {
        self.type_def(name)
            .ok_or_else(|| VmError::UnknownType(name.to_string()))
    }

    /// Walk a type and its bases defined in this artifact
    fn hierarchy<'a>(&'a self, ty: &'a TypeDef) -> impl Iterator<Item = &'a TypeDef> + 'a {
        std::iter::successors(Some(ty), move |t| {
            t.base
                .as_deref()
                .filter(|b| *b != ROOT_OBJECT)
                .and_then(|b| self.type_def(b))
        })
    }

    // ===== Public API =====

    /// Instantiate a type, running the constructor matching the argument count
    pub fn new_object(&self, type_name: &str, args: &[Value]) -> VmResult<Value> {
        let ty = self.lookup(type_name)?;
        self.construct(ty, args.to_vec(), 0)
    }

    /// Invoke an instance method by name, dispatching on the receiver's runtime type
    pub fn invoke(&self, receiver: &Value, method: &str, args: &[Value]) -> VmResult<Value> {
        let obj = receiver.as_object().ok_or(VmError::NullReference)?;
        let runtime = self.lookup(&obj.type_name())?;
        let (owner, def) = self
            .hierarchy(runtime)
            .find_map(|t| {
                t.find_method(method, args.len())
                    .filter(|m| !m.is_abstract() && !m.is_static() && !m.is_constructor())
                    .map(|m| (t, m))
            })
            .ok_or_else(|| VmError::MethodNotFound {
                type_name: runtime.name.clone(),
                method: method.to_string(),
                arity: args.len(),
            })?;

        let mut frame = Vec::with_capacity(args.len() + 1);
        frame.push(receiver.clone());
        frame.extend_from_slice(args);
        self.execute(owner, def, frame, 0)
    }

    /// Invoke a static method by name
    pub fn invoke_static(&self, type_name: &str, method: &str, args: &[Value]) -> VmResult<Value> {
        let ty = self.lookup(type_name)?;
        let def = ty
            .find_method(method, args.len())
            .filter(|m| m.is_static())
            .ok_or_else(|| VmError::MethodNotFound {
                type_name: type_name.to_string(),
                method: method.to_string(),
                arity: args.len(),
            })?;
        self.execute(ty, def, args.to_vec(), 0)
    }

    /// Read a property through its getter
    pub fn get_property(&self, receiver: &Value, property: &str) -> VmResult<Value> {
        let getter = self.accessor(receiver, property, |p| p.getter.clone(), "getter")?;
        self.invoke(receiver, &getter, &[])
    }

    /// Write a property through its setter
    pub fn set_property(&self, receiver: &Value, property: &str, value: Value) -> VmResult<()> {
        let setter = self.accessor(receiver, property, |p| p.setter.clone(), "setter")?;
        self.invoke(receiver, &setter, &[value])?;
        Ok(())
    }

    /// Value of an enum literal
    pub fn enum_value(&self, type_name: &str, literal: &str) -> VmResult<Value> {
        let ty = self.lookup(type_name)?;
        ty.literals
            .iter()
            .find(|l| l.name == literal)
            .map(|l| Value::Int(l.value))
            .ok_or_else(|| VmError::FieldNotFound {
                type_name: type_name.to_string(),
                field: literal.to_string(),
            })
    }

    fn accessor(
        &self,
        receiver: &Value,
        property: &str,
        pick: impl Fn(&PropertyDef) -> Option<String>,
        accessor: &'static str,
    ) -> VmResult<String> {
        let obj = receiver.as_object().ok_or(VmError::NullReference)?;
        let runtime = self.lookup(&obj.type_name())?;
        let prop = self
            .hierarchy(runtime)
            .find_map(|t| t.find_property(property))
            .ok_or_else(|| VmError::PropertyNotFound {
                type_name: runtime.name.clone(),
                property: property.to_string(),
            })?;
        pick(prop).ok_or_else(|| VmError::AccessorMissing {
            property: property.to_string(),
            accessor,
        })
    }

    // ===== Allocation =====

    fn default_value(&self, sig: &TypeSig, depth: usize) -> VmResult<Value> {
        Ok(match sig {
            TypeSig::Primitive(Primitive::Bool) => Value::Bool(false),
            TypeSig::Primitive(p) if p.is_float() => Value::Float(0.0),
            TypeSig::Primitive(_) => Value::Int(0),
            TypeSig::Named(name) => match self.type_def(name) {
                Some(t) if t.kind == TypeKind::Enum => Value::Int(0),
                Some(t) if t.kind == TypeKind::Struct => Value::Object(self.allocate(t, depth + 1)?),
                _ => Value::Null,
            },
            _ => Value::Null,
        })
    }

    fn allocate(&self, ty: &TypeDef, depth: usize) -> VmResult<ObjectRef> {
        if depth > MAX_CALL_DEPTH {
            return Err(VmError::CallDepthExceeded(depth));
        }
        let mut fields = FxHashMap::default();
        for t in self.hierarchy(ty) {
            for field in &t.fields {
                if !fields.contains_key(&field.name) {
                    fields.insert(field.name.clone(), self.default_value(&field.ty, depth)?);
                }
            }
        }
        Ok(ObjectRef::new(Instance {
            type_name: ty.name.clone(),
            fields,
        }))
    }

    fn construct(&self, ty: &TypeDef, args: Vec<Value>, depth: usize) -> VmResult<Value> {
        let instantiable = matches!(ty.kind, TypeKind::Class | TypeKind::Struct)
            && ty.flags & type_flags::ABSTRACT == 0;
        if !instantiable {
            return Err(VmError::NotInstantiable(ty.name.clone()));
        }

        let obj = Value::Object(self.allocate(ty, depth)?);
        match ty
            .find_method(CONSTRUCTOR, args.len())
            .filter(|m| m.is_constructor())
        {
            Some(ctor) => {
                let mut frame = Vec::with_capacity(args.len() + 1);
                frame.push(obj.clone());
                frame.extend(args);
                self.execute(ty, ctor, frame, depth + 1)?;
            }
            // Value types are usable without a declared constructor
            None if args.is_empty() && ty.kind == TypeKind::Struct => {}
            None => {
                return Err(VmError::MethodNotFound {
                    type_name: ty.name.clone(),
                    method: CONSTRUCTOR.to_string(),
                    arity: args.len(),
                })
            }
        }
        Ok(obj)
    }

    // ===== Execution =====

    fn member(&self, index: u32) -> VmResult<&MemberRef> {
        self.artifact
            .member_refs
            .get(index as usize)
            .ok_or(VmError::InvalidOperand(index))
    }

    fn resolve_virtual<'a>(
        &'a self,
        runtime: &'a TypeDef,
        member: &MemberRef,
    ) -> VmResult<(&'a TypeDef, &'a MethodDef)> {
        let arity = member.param_count as usize;
        self.hierarchy(runtime)
            .find_map(|t| {
                t.find_implementation(&member.owner, &member.name)
                    .or_else(|| t.find_method(&member.name, arity).filter(|m| !m.is_abstract()))
                    .map(|m| (t, m))
            })
            .ok_or_else(|| VmError::MethodNotFound {
                type_name: runtime.name.clone(),
                method: member.name.clone(),
                arity,
            })
    }

    /// Execute a method body with the given argument slots
    fn execute(&self, ty: &TypeDef, method: &MethodDef, args: Vec<Value>, depth: usize) -> VmResult<Value> {
        if depth > MAX_CALL_DEPTH {
            return Err(VmError::CallDepthExceeded(depth));
        }
        if method.is_abstract() {
            return Err(VmError::TypeError(format!(
                "cannot execute abstract method {}::{}",
                ty.name, method.name
            )));
        }

        let mut stack: Vec<Value> = Vec::with_capacity(method.max_stack as usize);
        let mut reader = BytecodeReader::new(&method.code);

        let pop = |stack: &mut Vec<Value>| stack.pop().ok_or(VmError::StackUnderflow);
        let pop_n = |stack: &mut Vec<Value>, n: usize| {
            let at = stack.len().checked_sub(n).ok_or(VmError::StackUnderflow)?;
            Ok::<_, VmError>(stack.split_off(at))
        };
        let arg = |index: usize| args.get(index).cloned().ok_or(VmError::InvalidOperand(index as u32));

        loop {
            let opcode = reader.read_opcode()?;

            match opcode {
                Opcode::LoadArg0 => stack.push(arg(0)?),
                Opcode::LoadArg1 => stack.push(arg(1)?),
                Opcode::LoadArg => {
                    let index = reader.read_u16()? as usize;
                    stack.push(arg(index)?);
                }

                Opcode::LoadField => {
                    let field = self.member(reader.read_u32()?)?;
                    let target = pop(&mut stack)?;
                    let obj = target.as_object().ok_or(VmError::NullReference)?;
                    let value = obj.get_field(&field.name).ok_or_else(|| VmError::FieldNotFound {
                        type_name: obj.type_name(),
                        field: field.name.clone(),
                    })?;
                    stack.push(value);
                }
                Opcode::StoreField => {
                    let field = self.member(reader.read_u32()?)?;
                    let value = pop(&mut stack)?;
                    let target = pop(&mut stack)?;
                    let obj = target.as_object().ok_or(VmError::NullReference)?;
                    if !obj.set_field(&field.name, value) {
                        return Err(VmError::FieldNotFound {
                            type_name: obj.type_name(),
                            field: field.name.clone(),
                        });
                    }
                }

                Opcode::Call => {
                    let callee = self.member(reader.read_u32()?)?;
                    let call_args = pop_n(&mut stack, callee.param_count as usize)?;

                    if callee.owner == ROOT_OBJECT && callee.name == CONSTRUCTOR {
                        pop(&mut stack)?;
                        continue;
                    }

                    let mut frame = Vec::with_capacity(call_args.len() + 1);
                    if !callee.is_static {
                        frame.push(pop(&mut stack)?);
                    }
                    frame.extend(call_args);

                    let owner = self.lookup(&callee.owner)?;
                    let target = owner
                        .find_method(&callee.name, callee.param_count as usize)
                        .ok_or_else(|| VmError::MethodNotFound {
                            type_name: owner.name.clone(),
                            method: callee.name.clone(),
                            arity: callee.param_count as usize,
                        })?;
                    let result = self.execute(owner, target, frame, depth + 1)?;
                    if callee.returns_value {
                        stack.push(result);
                    }
                }
                Opcode::CallVirt => {
                    let callee = self.member(reader.read_u32()?)?;
                    let call_args = pop_n(&mut stack, callee.param_count as usize)?;
                    let receiver = pop(&mut stack)?;
                    let obj = receiver.as_object().ok_or(VmError::NullReference)?;
                    let runtime = self.lookup(&obj.type_name())?;
                    let (owner, target) = self.resolve_virtual(runtime, callee)?;

                    let mut frame = Vec::with_capacity(call_args.len() + 1);
                    frame.push(receiver.clone());
                    frame.extend(call_args);
                    let result = self.execute(owner, target, frame, depth + 1)?;
                    if callee.returns_value {
                        stack.push(result);
                    }
                }
                Opcode::NewObj => {
                    let ctor = self.member(reader.read_u32()?)?;
                    let ctor_args = pop_n(&mut stack, ctor.param_count as usize)?;
                    let owner = self.lookup(&ctor.owner)?;
                    let obj = self.construct(owner, ctor_args, depth + 1)?;
                    stack.push(obj);
                }

                Opcode::Return => {
                    return if method.returns_value() {
                        pop(&mut stack)
                    } else {
                        Ok(Value::Null)
                    };
                }
            }
        }
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("artifact", &self.artifact.metadata.name)
            .field("types", &self.types.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{method_flags, FieldDef, MethodImpl, Param, Visibility};
    use crate::encoder::BytecodeWriter;

    fn i32_sig() -> TypeSig {
        TypeSig::Primitive(Primitive::I32)
    }

    fn body(build: impl FnOnce(&mut BytecodeWriter)) -> Vec<u8> {
        let mut w = BytecodeWriter::new();
        build(&mut w);
        w.emit_return();
        w.into_bytes()
    }

    fn method(name: &str, flags: u32, params: Vec<Param>, ret: TypeSig, max_stack: u16, code: Vec<u8>) -> MethodDef {
        MethodDef {
            name: name.to_string(),
            visibility: Visibility::Public,
            flags,
            params,
            return_type: ret,
            overrides: None,
            max_stack,
            code,
        }
    }

    /// Counter class: field `_count`, default ctor, get_Count / set_Count
    fn counter_artifact() -> Artifact {
        let mut artifact = Artifact::new("test");
        artifact.member_refs = vec![
            MemberRef::method(ROOT_OBJECT, CONSTRUCTOR, 0, false),
            MemberRef::field("Acme.Counter", "_count"),
        ];

        let mut iface = TypeDef::new("Acme.ICounter", TypeKind::Interface);
        iface.flags = type_flags::ABSTRACT;
        iface.methods.push(method(
            "get_Count",
            method_flags::ABSTRACT | method_flags::VIRTUAL,
            vec![],
            i32_sig(),
            0,
            vec![],
        ));

        let mut class = TypeDef::new("Acme.Counter", TypeKind::Class);
        class.interfaces.push("Acme.ICounter".to_string());
        class.fields.push(FieldDef {
            name: "_count".to_string(),
            ty: i32_sig(),
            visibility: Visibility::Private,
        });
        class.methods.push(method(
            CONSTRUCTOR,
            method_flags::CONSTRUCTOR | method_flags::SPECIAL_NAME,
            vec![],
            TypeSig::Void,
            1,
            body(|w| {
                w.emit_load_arg(0);
                w.emit_call(0);
            }),
        ));
        let mut getter = method(
            "get_Count",
            method_flags::VIRTUAL,
            vec![],
            i32_sig(),
            1,
            body(|w| {
                w.emit_load_arg(0);
                w.emit_load_field(1);
            }),
        );
        getter.overrides = Some(MethodImpl {
            interface: "Acme.ICounter".to_string(),
            method: "get_Count".to_string(),
        });
        class.methods.push(getter);
        class.methods.push(method(
            "set_Count",
            method_flags::VIRTUAL,
            vec![Param {
                name: "value".to_string(),
                ty: i32_sig(),
            }],
            TypeSig::Void,
            2,
            body(|w| {
                w.emit_load_arg(0);
                w.emit_load_arg(1);
                w.emit_store_field(1);
            }),
        ));
        class.properties.push(PropertyDef {
            name: "Count".to_string(),
            ty: i32_sig(),
            getter: Some("get_Count".to_string()),
            setter: Some("set_Count".to_string()),
        });

        artifact.types.push(iface);
        artifact.types.push(class);
        artifact
    }

    #[test]
    fn test_field_defaults_and_properties() {
        let vm = Vm::load(counter_artifact()).unwrap();
        let obj = vm.new_object("Acme.Counter", &[]).unwrap();
        assert_eq!(vm.get_property(&obj, "Count").unwrap(), Value::Int(0));

        vm.set_property(&obj, "Count", Value::Int(5)).unwrap();
        assert_eq!(vm.get_property(&obj, "Count").unwrap(), Value::Int(5));
        assert_eq!(vm.invoke(&obj, "get_Count", &[]).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_interface_not_instantiable() {
        let vm = Vm::load(counter_artifact()).unwrap();
        assert!(matches!(
            vm.new_object("Acme.ICounter", &[]),
            Err(VmError::NotInstantiable(_))
        ));
    }

    #[test]
    fn test_unknown_type_and_property() {
        let vm = Vm::load(counter_artifact()).unwrap();
        assert!(matches!(vm.new_object("Acme.Nope", &[]), Err(VmError::UnknownType(_))));

        let obj = vm.new_object("Acme.Counter", &[]).unwrap();
        assert!(matches!(
            vm.get_property(&obj, "Total"),
            Err(VmError::PropertyNotFound { .. })
        ));
        assert!(matches!(
            vm.get_property(&Value::Null, "Count"),
            Err(VmError::NullReference)
        ));
    }

    #[test]
    fn test_missing_constructor_arity() {
        let vm = Vm::load(counter_artifact()).unwrap();
        assert!(matches!(
            vm.new_object("Acme.Counter", &[Value::Int(1)]),
            Err(VmError::MethodNotFound { arity: 1, .. })
        ));
    }

    #[test]
    fn test_load_rejects_unverifiable_artifact() {
        let mut artifact = counter_artifact();
        artifact.member_refs.push(MemberRef::field("Acme.Counter", "_missing"));
        assert!(matches!(Vm::load(artifact), Err(VmError::Verify(_))));
    }

    #[test]
    fn test_virtual_dispatch_through_interface_ref() {
        let mut artifact = counter_artifact();
        artifact
            .member_refs
            .push(MemberRef::method("Acme.ICounter", "get_Count", 0, true));
        let mut reader_ty = TypeDef::new("Acme.Reader", TypeKind::Class);
        reader_ty.methods.push(method(
            "Read",
            method_flags::STATIC,
            vec![Param {
                name: "counter".to_string(),
                ty: TypeSig::Named("Acme.ICounter".to_string()),
            }],
            i32_sig(),
            1,
            body(|w| {
                w.emit_load_arg(0);
                w.emit_call_virt(2);
            }),
        ));
        artifact.types.push(reader_ty);

        let vm = Vm::load(artifact).unwrap();
        let obj = vm.new_object("Acme.Counter", &[]).unwrap();
        vm.set_property(&obj, "Count", Value::Int(9)).unwrap();
        assert_eq!(
            vm.invoke_static("Acme.Reader", "Read", &[obj]).unwrap(),
            Value::Int(9)
        );
    }

    #[test]
    fn test_enum_values() {
        let mut artifact = Artifact::new("test");
        let mut color = TypeDef::new("Acme.Color", TypeKind::Enum);
        color.underlying = Some(Primitive::I32);
        color.literals.push(crate::artifact::EnumLiteral {
            name: "Blue".to_string(),
            value: 4,
        });
        artifact.types.push(color);

        let vm = Vm::load(artifact).unwrap();
        assert_eq!(vm.enum_value("Acme.Color", "Blue").unwrap(), Value::Int(4));
        assert!(vm.enum_value("Acme.Color", "Green").is_err());
    }
}
