//! Artifact verification

use crate::artifact::{flags, Artifact, MemberKind, MemberRef, MethodDef, TypeDef, TypeKind};
use crate::encoder::BytecodeReader;
use crate::opcode::Opcode;
use crate::types::{TypeSig, CONSTRUCTOR, ROOT_OBJECT};
use rustc_hash::FxHashSet;

/// Artifact verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Invalid opcode
    #[error("Invalid opcode {opcode:#x} at offset {offset} in {method}")]
    InvalidOpcode {
        /// Offending byte
        opcode: u8,
        /// Offset within the body
        offset: usize,
        /// Qualified method name
        method: String,
    },

    /// Stack underflow
    #[error("Stack underflow at offset {offset} in {method}")]
    StackUnderflow {
        /// Offset within the body
        offset: usize,
        /// Qualified method name
        method: String,
    },

    /// Declared maximum stack depth exceeded
    #[error("Stack depth {depth} exceeds declared maximum {max} in {method}")]
    StackOverflow {
        /// Depth reached
        depth: usize,
        /// Declared maximum
        max: u16,
        /// Qualified method name
        method: String,
    },

    /// Stack depth at RETURN does not match the return type
    #[error("Return with stack depth {depth} (expected {expected}) in {method}")]
    BadReturn {
        /// Depth at return
        depth: usize,
        /// Expected depth
        expected: usize,
        /// Qualified method name
        method: String,
    },

    /// Invalid member-ref index or kind
    #[error("Invalid member reference {index} at offset {offset} in {method}")]
    InvalidMemberRef {
        /// Member-ref index
        index: u32,
        /// Offset within the body
        offset: usize,
        /// Qualified method name
        method: String,
    },

    /// Invalid argument index
    #[error("Invalid argument index {index} (max {max}) at offset {offset} in {method}")]
    InvalidArgRef {
        /// Argument index
        index: usize,
        /// Number of argument slots
        max: usize,
        /// Offset within the body
        offset: usize,
        /// Qualified method name
        method: String,
    },

    /// Execution falls off the end, or code follows a RETURN
    #[error("Body of {0} does not end with a single RETURN")]
    FallOffEnd(String),

    /// Abstract method with a body, or concrete method without one
    #[error("Method {0} body does not match its abstract flag")]
    BodyMismatch(String),

    /// Two types share a canonical name
    #[error("Duplicate type definition: {0}")]
    DuplicateType(String),

    /// A member reference names a type or member that does not exist
    #[error("Unresolved member reference {owner}::{name}")]
    UnresolvedMember {
        /// Declaring type
        owner: String,
        /// Member name
        name: String,
    },

    /// A listed interface is not an interface defined in the artifact
    #[error("Type {ty} implements unresolved interface {interface}")]
    UnresolvedInterface {
        /// Implementing type
        ty: String,
        /// Interface name as listed
        interface: String,
    },

    /// An abstract interface method has no bound implementation
    #[error("Type {ty} does not implement {interface}::{method}")]
    MissingImplementation {
        /// Implementing type
        ty: String,
        /// Interface declaring the method
        interface: String,
        /// Abstract method name
        method: String,
    },

    /// A method binds to an interface method that does not exist
    #[error("Method {method} overrides unknown {interface}::{target}")]
    UnresolvedOverride {
        /// Qualified overriding method
        method: String,
        /// Interface named by the binding
        interface: String,
        /// Interface method named by the binding
        target: String,
    },

    /// A standalone artifact names a type it neither defines nor lists as a runtime reference
    #[error("Standalone artifact references foreign type {name} from {owner}")]
    ForeignReference {
        /// Type whose signature mentions the name
        owner: String,
        /// Foreign type name
        name: String,
    },

    /// Enum without an integral underlying type
    #[error("Enum {0} has no integral underlying type")]
    InvalidEnum(String),

    /// Artifact validation error
    #[error("Artifact validation error: {0}")]
    ArtifactValidation(String),

    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(String),
}

/// Verify an artifact's type table and every method body
pub fn verify_artifact(artifact: &Artifact) -> Result<(), VerifyError> {
    artifact.validate().map_err(VerifyError::ArtifactValidation)?;

    let mut seen = FxHashSet::default();
    for ty in &artifact.types {
        if !seen.insert(ty.name.as_str()) {
            return Err(VerifyError::DuplicateType(ty.name.clone()));
        }
    }

    for member in &artifact.member_refs {
        verify_member_ref(member, artifact)?;
    }

    let standalone = artifact.flags & flags::STANDALONE != 0;
    for ty in &artifact.types {
        if ty.kind == TypeKind::Enum && !ty.underlying.is_some_and(|p| p.is_integral()) {
            return Err(VerifyError::InvalidEnum(ty.name.clone()));
        }
        verify_interfaces(ty, artifact)?;
        if standalone {
            verify_standalone(ty, artifact)?;
        }
        for method in &ty.methods {
            verify_method(ty, method, artifact)?;
        }
    }

    Ok(())
}

/// Listed interfaces resolve, concrete types implement every abstract
/// interface method, and every binding names a real interface method
fn verify_interfaces(ty: &TypeDef, artifact: &Artifact) -> Result<(), VerifyError> {
    for name in &ty.interfaces {
        let iface = artifact
            .find_type(name)
            .filter(|t| t.kind == TypeKind::Interface)
            .ok_or_else(|| VerifyError::UnresolvedInterface {
                ty: ty.name.clone(),
                interface: name.clone(),
            })?;
        if ty.kind == TypeKind::Interface {
            continue;
        }
        for method in iface.methods.iter().filter(|m| m.is_abstract()) {
            if ty.find_implementation(name, &method.name).is_none() {
                return Err(VerifyError::MissingImplementation {
                    ty: ty.name.clone(),
                    interface: name.clone(),
                    method: method.name.clone(),
                });
            }
        }
    }

    for method in &ty.methods {
        let Some(binding) = &method.overrides else {
            continue;
        };
        let bound = ty.interfaces.contains(&binding.interface)
            && artifact
                .find_type(&binding.interface)
                .and_then(|iface| iface.find_method(&binding.method, method.arity()))
                .is_some_and(|m| m.is_abstract());
        if !bound {
            return Err(VerifyError::UnresolvedOverride {
                method: format!("{}::{}", ty.name, method.name),
                interface: binding.interface.clone(),
                target: binding.method.clone(),
            });
        }
    }

    Ok(())
}

/// Every type name in a standalone artifact's signatures resolves
fn verify_standalone(ty: &TypeDef, artifact: &Artifact) -> Result<(), VerifyError> {
    let mut sigs: Vec<&TypeSig> = Vec::new();
    sigs.extend(ty.fields.iter().map(|f| &f.ty));
    sigs.extend(ty.properties.iter().map(|p| &p.ty));
    for method in &ty.methods {
        sigs.extend(method.params.iter().map(|p| &p.ty));
        sigs.push(&method.return_type);
    }

    let mut foreign = None;
    for sig in sigs {
        sig.for_each_named(&mut |name| {
            if foreign.is_none() && !artifact.resolves(name) {
                foreign = Some(name);
            }
        });
    }
    if let Some(base) = ty.base.as_deref() {
        if foreign.is_none() && base != ROOT_OBJECT && !artifact.resolves(base) {
            foreign = Some(base);
        }
    }

    match foreign {
        Some(name) => Err(VerifyError::ForeignReference {
            owner: ty.name.clone(),
            name: name.to_string(),
        }),
        None => Ok(()),
    }
}

/// Member references must resolve inside the artifact, except the root constructor
fn verify_member_ref(member: &MemberRef, artifact: &Artifact) -> Result<(), VerifyError> {
    if member.owner == ROOT_OBJECT && member.name == CONSTRUCTOR {
        return Ok(());
    }
    let unresolved = || VerifyError::UnresolvedMember {
        owner: member.owner.clone(),
        name: member.name.clone(),
    };
    let owner = artifact.find_type(&member.owner).ok_or_else(unresolved)?;
    let found = match member.kind {
        MemberKind::Field => owner.find_field(&member.name).is_some(),
        MemberKind::Method => owner
            .find_method(&member.name, member.param_count as usize)
            .is_some_and(|m| m.is_static() == member.is_static && m.returns_value() == member.returns_value),
    };
    if found {
        Ok(())
    } else {
        Err(unresolved())
    }
}

/// Parsed instruction
#[derive(Debug, Clone)]
struct Instruction {
    offset: usize,
    opcode: Opcode,
    operand: u32,
}

fn verify_method(ty: &TypeDef, method: &MethodDef, artifact: &Artifact) -> Result<(), VerifyError> {
    let qualified = format!("{}::{}", ty.name, method.name);

    if method.is_abstract() != method.code.is_empty() {
        return Err(VerifyError::BodyMismatch(qualified));
    }
    if method.is_abstract() {
        return Ok(());
    }

    let instructions = parse_instructions(&method.code, &qualified)?;

    match instructions.iter().position(|i| i.opcode.is_terminator()) {
        Some(pos) if pos == instructions.len() - 1 => {}
        _ => return Err(VerifyError::FallOffEnd(qualified)),
    }

    let slots = method.arg_slots();
    let mut depth = 0usize;

    for instr in &instructions {
        if instr.opcode == Opcode::Return {
            let expected = usize::from(method.returns_value());
            if depth != expected {
                return Err(VerifyError::BadReturn {
                    depth,
                    expected,
                    method: qualified,
                });
            }
            break;
        }

        let (pops, pushes) = stack_effect(instr, artifact, &qualified, slots)?;
        if depth < pops {
            return Err(VerifyError::StackUnderflow {
                offset: instr.offset,
                method: qualified,
            });
        }
        depth = depth - pops + pushes;
        if depth > method.max_stack as usize {
            return Err(VerifyError::StackOverflow {
                depth,
                max: method.max_stack,
                method: qualified,
            });
        }
    }

    Ok(())
}

/// Parse all instructions from a body
fn parse_instructions(code: &[u8], method: &str) -> Result<Vec<Instruction>, VerifyError> {
    let mut instructions = Vec::new();
    let mut reader = BytecodeReader::new(code);

    while reader.has_more() {
        let offset = reader.position();
        let byte = reader
            .read_u8()
            .map_err(|e| VerifyError::DecodeError(e.to_string()))?;

        let opcode = Opcode::from_u8(byte).ok_or_else(|| VerifyError::InvalidOpcode {
            opcode: byte,
            offset,
            method: method.to_string(),
        })?;

        let operand = match opcode.operand_size() {
            0 => 0,
            2 => reader
                .read_u16()
                .map(u32::from)
                .map_err(|e| VerifyError::DecodeError(e.to_string()))?,
            _ => reader
                .read_u32()
                .map_err(|e| VerifyError::DecodeError(e.to_string()))?,
        };

        instructions.push(Instruction {
            offset,
            opcode,
            operand,
        });
    }

    Ok(instructions)
}

/// Get the stack effect of an instruction (pops, pushes)
fn stack_effect(
    instr: &Instruction,
    artifact: &Artifact,
    method: &str,
    slots: usize,
) -> Result<(usize, usize), VerifyError> {
    let check_arg = |index: usize| {
        if index >= slots {
            Err(VerifyError::InvalidArgRef {
                index,
                max: slots,
                offset: instr.offset,
                method: method.to_string(),
            })
        } else {
            Ok((0, 1))
        }
    };

    let member = |kind: MemberKind| {
        artifact
            .member_refs
            .get(instr.operand as usize)
            .filter(|m| m.kind == kind)
            .ok_or_else(|| VerifyError::InvalidMemberRef {
                index: instr.operand,
                offset: instr.offset,
                method: method.to_string(),
            })
    };

    Ok(match instr.opcode {
        Opcode::LoadArg0 => check_arg(0)?,
        Opcode::LoadArg1 => check_arg(1)?,
        Opcode::LoadArg => check_arg(instr.operand as usize)?,
        Opcode::LoadField => {
            member(MemberKind::Field)?;
            (1, 1)
        }
        Opcode::StoreField => {
            member(MemberKind::Field)?;
            (2, 0)
        }
        Opcode::Call | Opcode::CallVirt => {
            let m = member(MemberKind::Method)?;
            let receiver = usize::from(!m.is_static);
            (m.param_count as usize + receiver, usize::from(m.returns_value))
        }
        Opcode::NewObj => {
            let m = member(MemberKind::Method)?;
            (m.param_count as usize, 1)
        }
        Opcode::Return => (0, 0),
    })
}
