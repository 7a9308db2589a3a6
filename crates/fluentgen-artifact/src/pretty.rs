//! Pretty-printing for decoded artifacts
//!
//! Produces a declaration listing with disassembled method bodies.

use crate::artifact::{flags, Artifact, MemberKind, MemberRef, MethodDef, TypeDef, TypeKind};
use crate::encoder::BytecodeReader;
use crate::opcode::Opcode;
use std::fmt::{self, Write};

/// Trait for pretty-printing artifact constructs
pub trait PrettyPrint {
    /// Render as text
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Artifact {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        let _ = write_artifact(&mut output, self);
        output
    }
}

impl PrettyPrint for MemberRef {
    fn pretty_print(&self) -> String {
        match self.kind {
            MemberKind::Field => format!("{}::{}", self.owner, self.name),
            MemberKind::Method => format!(
                "{}{}::{}/{}",
                if self.is_static { "static " } else { "" },
                self.owner,
                self.name,
                self.param_count
            ),
        }
    }
}

fn write_artifact(out: &mut String, artifact: &Artifact) -> fmt::Result {
    writeln!(out, "; artifact {} (format v{})", artifact.metadata.name, artifact.version)?;
    let mut mode = Vec::new();
    if artifact.flags & flags::STANDALONE != 0 {
        mode.push("standalone");
    }
    if artifact.flags & flags::LENIENT != 0 {
        mode.push("lenient");
    }
    if !mode.is_empty() {
        writeln!(out, "; flags: {}", mode.join(", "))?;
    }
    if let Some(guid) = &artifact.metadata.guid {
        writeln!(out, "; guid: {}", guid)?;
    }
    writeln!(out, "; {} types, {} member refs", artifact.types.len(), artifact.member_refs.len())?;
    if !artifact.runtime_refs.is_empty() {
        writeln!(out, "; runtime: {}", artifact.runtime_refs.join(", "))?;
    }

    for ty in &artifact.types {
        writeln!(out)?;
        write_type(out, ty, artifact)?;
    }
    Ok(())
}

fn write_type(out: &mut String, ty: &TypeDef, artifact: &Artifact) -> fmt::Result {
    write!(out, "{} ", ty.visibility.keyword())?;
    if ty.is_sealed() && ty.kind == TypeKind::Class {
        write!(out, "sealed ")?;
    }
    write!(out, "{} {}", ty.kind.keyword(), ty.name)?;

    let mut supertypes: Vec<&str> = Vec::new();
    if let Some(underlying) = ty.underlying {
        supertypes.push(underlying.name());
    }
    if let Some(base) = &ty.base {
        supertypes.push(base);
    }
    supertypes.extend(ty.interfaces.iter().map(String::as_str));
    if !supertypes.is_empty() {
        write!(out, " : {}", supertypes.join(", "))?;
    }
    writeln!(out, " {{")?;

    for literal in &ty.literals {
        writeln!(out, "    {} = {}", literal.name, literal.value)?;
    }
    for field in &ty.fields {
        writeln!(out, "    {} field {}: {}", field.visibility.keyword(), field.name, field.ty)?;
    }
    for prop in &ty.properties {
        write!(out, "    property {}: {}", prop.name, prop.ty)?;
        if let Some(getter) = &prop.getter {
            write!(out, " get={}", getter)?;
        }
        if let Some(setter) = &prop.setter {
            write!(out, " set={}", setter)?;
        }
        writeln!(out)?;
    }
    for method in &ty.methods {
        write_method(out, method, artifact)?;
    }
    writeln!(out, "}}")
}

fn write_method(out: &mut String, method: &MethodDef, artifact: &Artifact) -> fmt::Result {
    let params: Vec<String> = method.params.iter().map(|p| format!("{}: {}", p.name, p.ty)).collect();
    let mut modifiers = String::new();
    if method.is_static() {
        modifiers.push_str(" static");
    }
    if method.is_abstract() {
        modifiers.push_str(" abstract");
    }
    write!(
        out,
        "    {}{} {}({}) -> {}",
        method.visibility.keyword(),
        modifiers,
        method.name,
        params.join(", "),
        method.return_type
    )?;
    if let Some(binding) = &method.overrides {
        write!(out, " implements {}::{}", binding.interface, binding.method)?;
    }
    if method.is_abstract() {
        return writeln!(out, ";");
    }

    writeln!(out, " {{")?;
    writeln!(out, "        ; max_stack {}", method.max_stack)?;
    write_code(out, &method.code, artifact)?;
    writeln!(out, "    }}")
}

fn write_code(out: &mut String, code: &[u8], artifact: &Artifact) -> fmt::Result {
    let mut reader = BytecodeReader::new(code);
    while reader.has_more() {
        let offset = reader.position();
        let Ok(byte) = reader.read_u8() else {
            return writeln!(out, "        {:04}  <truncated>", offset);
        };
        let Some(opcode) = Opcode::from_u8(byte) else {
            return writeln!(out, "        {:04}  <invalid 0x{:02x}>", offset, byte);
        };

        let operand = match opcode.operand_size() {
            0 => None,
            2 => reader.read_u16().ok().map(u32::from),
            _ => reader.read_u32().ok(),
        };
        match (opcode.operand_size(), operand) {
            (0, _) => writeln!(out, "        {:04}  {}", offset, opcode.name())?,
            (_, None) => return writeln!(out, "        {:04}  {} <truncated>", offset, opcode.name()),
            (_, Some(index)) if opcode.references_member() => {
                let target = artifact
                    .member_refs
                    .get(index as usize)
                    .map(|m| m.pretty_print())
                    .unwrap_or_else(|| "<invalid ref>".to_string());
                writeln!(out, "        {:04}  {} #{} {}", offset, opcode.name(), index, target)?
            }
            (_, Some(value)) => writeln!(out, "        {:04}  {} {}", offset, opcode.name(), value)?,
        }
    }
    Ok(())
}
