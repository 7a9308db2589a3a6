//! Backend-independent instruction model

use crate::descriptor::QualifiedName;
use crate::error::{SynthesisError, SynthesisResult};
use std::fmt;

/// Canonical name of the root object type
pub const ROOT_OBJECT: &str = fluentgen_artifact::ROOT_OBJECT;

/// Name given to instance constructors
pub const CONSTRUCTOR: &str = fluentgen_artifact::CONSTRUCTOR;

/// Reference to an instance field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Declaring type
    pub owner: QualifiedName,
    /// Field name
    pub name: String,
}

impl FieldRef {
    /// Create a field reference
    pub fn new(owner: &QualifiedName, name: impl Into<String>) -> Self {
        Self {
            owner: owner.clone(),
            name: name.into(),
        }
    }
}

/// Reference to a method or constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Declaring type
    pub owner: QualifiedName,
    /// Method name
    pub name: String,
    /// Number of explicit parameters
    pub params: u16,
    /// Whether a call leaves a value on the stack
    pub returns: bool,
    /// Whether the method takes no receiver
    pub is_static: bool,
}

impl MethodRef {
    /// Instance method reference
    pub fn instance(owner: &QualifiedName, name: impl Into<String>, params: u16, returns: bool) -> Self {
        Self {
            owner: owner.clone(),
            name: name.into(),
            params,
            returns,
            is_static: false,
        }
    }

    /// Constructor reference
    pub fn constructor(owner: &QualifiedName, params: u16) -> Self {
        Self::instance(owner, CONSTRUCTOR, params, false)
    }

    /// The root object's parameterless constructor
    pub fn root_constructor() -> Self {
        Self::constructor(&QualifiedName::new("", ROOT_OBJECT), 0)
    }

    /// Builder-style method to mark as static
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}/{}", self.owner, self.name, self.params)
    }
}

/// One abstract instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// Push the receiver (argument slot 0)
    LoadThis,
    /// Push an argument slot; slot 0 is the receiver for instance methods
    LoadArg(u16),
    /// Pop an object, push one of its fields
    LoadField(FieldRef),
    /// Pop a value and an object, store the value in the object's field
    StoreField(FieldRef),
    /// Non-virtual call
    Call(MethodRef),
    /// Call dispatched on the receiver's runtime type
    CallVirt(MethodRef),
    /// Allocate and construct an object, push it
    NewObj(MethodRef),
    /// Return from the method
    Return,
}

impl Instr {
    /// Values popped and pushed by this instruction
    pub fn stack_effect(&self) -> (usize, usize) {
        match self {
            Self::LoadThis | Self::LoadArg(_) => (0, 1),
            Self::LoadField(_) => (1, 1),
            Self::StoreField(_) => (2, 0),
            Self::Call(m) | Self::CallVirt(m) => {
                let receiver = usize::from(!m.is_static);
                (m.params as usize + receiver, usize::from(m.returns))
            }
            Self::NewObj(m) => (m.params as usize, 1),
            Self::Return => (0, 0),
        }
    }

    /// Mnemonic used in listings
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::LoadThis => "ldthis",
            Self::LoadArg(_) => "ldarg",
            Self::LoadField(_) => "ldfld",
            Self::StoreField(_) => "stfld",
            Self::Call(_) => "call",
            Self::CallVirt(_) => "callvirt",
            Self::NewObj(_) => "newobj",
            Self::Return => "ret",
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadThis | Self::Return => write!(f, "{}", self.mnemonic()),
            Self::LoadArg(n) => write!(f, "{} {}", self.mnemonic(), n),
            Self::LoadField(field) | Self::StoreField(field) => {
                write!(f, "{} {}::{}", self.mnemonic(), field.owner, field.name)
            }
            Self::Call(m) | Self::CallVirt(m) | Self::NewObj(m) => write!(f, "{} {}", self.mnemonic(), m),
        }
    }
}

/// A finished method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Instructions, ending with [`Instr::Return`]
    pub instrs: Vec<Instr>,
    /// Maximum operand stack depth
    pub max_stack: u16,
}

/// Builds a method body while tracking stack depth
#[derive(Debug, Default)]
pub struct BodyBuilder {
    instrs: Vec<Instr>,
    depth: usize,
    max_depth: usize,
    returned: bool,
}

impl BodyBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction
    pub fn emit(&mut self, instr: Instr) -> SynthesisResult<&mut Self> {
        if self.returned {
            return Err(SynthesisError::Lowering(format!(
                "instruction {} emitted after return",
                instr
            )));
        }
        let (pops, pushes) = instr.stack_effect();
        if self.depth < pops {
            return Err(SynthesisError::Lowering(format!(
                "stack underflow at {} (depth {})",
                instr, self.depth
            )));
        }
        self.depth = self.depth - pops + pushes;
        self.max_depth = self.max_depth.max(self.depth);
        if instr == Instr::Return {
            self.returned = true;
        }
        self.instrs.push(instr);
        Ok(self)
    }

    /// Push the receiver
    pub fn load_this(&mut self) -> SynthesisResult<&mut Self> {
        self.emit(Instr::LoadThis)
    }

    /// Push an argument slot
    pub fn load_arg(&mut self, slot: u16) -> SynthesisResult<&mut Self> {
        self.emit(Instr::LoadArg(slot))
    }

    /// Load a field from the object on the stack
    pub fn load_field(&mut self, field: &FieldRef) -> SynthesisResult<&mut Self> {
        self.emit(Instr::LoadField(field.clone()))
    }

    /// Store the top value into a field of the object below it
    pub fn store_field(&mut self, field: &FieldRef) -> SynthesisResult<&mut Self> {
        self.emit(Instr::StoreField(field.clone()))
    }

    /// Non-virtual call
    pub fn call(&mut self, method: MethodRef) -> SynthesisResult<&mut Self> {
        self.emit(Instr::Call(method))
    }

    /// Virtual call
    pub fn call_virt(&mut self, method: MethodRef) -> SynthesisResult<&mut Self> {
        self.emit(Instr::CallVirt(method))
    }

    /// Construct an object
    pub fn new_obj(&mut self, ctor: MethodRef) -> SynthesisResult<&mut Self> {
        self.emit(Instr::NewObj(ctor))
    }

    /// Return
    pub fn ret(&mut self) -> SynthesisResult<&mut Self> {
        self.emit(Instr::Return)
    }

    /// Current stack depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Finish the body, checking it returned with the expected stack depth
    pub fn finish(self, returns_value: bool) -> SynthesisResult<Body> {
        if !self.returned {
            return Err(SynthesisError::Lowering("body does not end with return".to_string()));
        }
        let expected = usize::from(returns_value);
        // Return itself does not pop; the depth at return is the final depth
        if self.depth != expected {
            return Err(SynthesisError::Lowering(format!(
                "return with stack depth {} (expected {})",
                self.depth, expected
            )));
        }
        Ok(Body {
            instrs: self.instrs,
            max_stack: self.max_depth as u16,
        })
    }
}
