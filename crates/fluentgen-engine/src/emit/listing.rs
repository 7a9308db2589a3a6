//! Source-style text listing
//!
//! Renders synthesized types as readable declarations with their
//! instruction bodies, for `--listing` output and debugging.

use super::backend::{ArtifactMetadata, Backend};
use crate::descriptor::Visibility;
use crate::error::{SynthesisError, SynthesisResult};
use crate::synth::{MethodKind, MethodSpec, SynthKind, SynthesizedType};
use std::fmt::{self, Write};
use std::sync::Arc;

/// Produces a text listing
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingBackend {
    bodies: bool,
}

impl ListingBackend {
    /// Listing with declarations only
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to include instruction bodies
    pub fn with_bodies(mut self, bodies: bool) -> Self {
        self.bodies = bodies;
        self
    }

    fn write_metadata(&self, out: &mut String, metadata: &ArtifactMetadata) -> fmt::Result {
        writeln!(out, "// artifact {}", metadata.name)?;
        let described = [
            ("title", &metadata.title),
            ("version", &metadata.version),
            ("company", &metadata.company),
            ("copyright", &metadata.copyright),
            ("guid", &metadata.guid),
        ];
        for (label, value) in described {
            if let Some(value) = value {
                writeln!(out, "// {}: {}", label, value)?;
            }
        }
        writeln!(out)
    }

    fn write_type(&self, out: &mut String, ty: &SynthesizedType) -> fmt::Result {
        let keyword = match ty.kind {
            SynthKind::Interface => "interface",
            SynthKind::Proxy | SynthKind::Fluent => "class",
            SynthKind::StructClone => "struct",
            SynthKind::EnumClone => "enum",
        };
        write!(out, "{} ", keyword_of(ty.visibility))?;
        if ty.sealed && matches!(ty.kind, SynthKind::Proxy | SynthKind::Fluent) {
            write!(out, "sealed ")?;
        }
        write!(out, "{} {}", keyword, ty.name)?;
        if let Some(spec) = &ty.enum_spec {
            write!(out, " : {}", spec.underlying)?;
        } else if !ty.interfaces.is_empty() {
            let names: Vec<String> = ty.interfaces.iter().map(|i| i.canonical()).collect();
            write!(out, " : {}", names.join(", "))?;
        }
        writeln!(out, " {{")?;

        if let Some(spec) = &ty.enum_spec {
            for literal in &spec.literals {
                writeln!(out, "    {} = {},", literal.name, literal.value)?;
            }
        }
        for field in &ty.fields {
            writeln!(out, "    {} {}: {};", keyword_of(field.visibility), field.name, field.ty)?;
        }
        for prop in &ty.properties {
            let mut accessors = Vec::new();
            if prop.getter.is_some() {
                accessors.push("get;");
            }
            if prop.setter.is_some() {
                accessors.push("set;");
            }
            writeln!(out, "    {}: {} {{ {} }}", prop.name, prop.ty, accessors.join(" "))?;
        }
        for method in &ty.methods {
            self.write_method(out, method)?;
        }
        writeln!(out, "}}")
    }

    fn write_method(&self, out: &mut String, method: &MethodSpec) -> fmt::Result {
        let modifier = match method.kind {
            MethodKind::Abstract => " abstract",
            MethodKind::Static => " static",
            MethodKind::Instance | MethodKind::Constructor => "",
        };
        let params: Vec<String> = method.params.iter().map(|p| format!("{}: {}", p.name, p.ty)).collect();
        write!(
            out,
            "    {}{} {}({})",
            keyword_of(method.visibility),
            modifier,
            method.name,
            params.join(", ")
        )?;
        if let Some(returns) = &method.returns {
            write!(out, " -> {}", returns)?;
        }
        if let Some(binding) = &method.implements {
            write!(out, " implements {}::{}", binding.interface, binding.method)?;
        }

        match (&method.body, self.bodies) {
            (Some(body), true) => {
                writeln!(out, " {{")?;
                writeln!(out, "        ; max_stack {}", body.max_stack)?;
                for instr in &body.instrs {
                    writeln!(out, "        {}", instr)?;
                }
                writeln!(out, "    }}")
            }
            _ => writeln!(out, ";"),
        }
    }
}

impl Backend for ListingBackend {
    type Output = String;

    fn lower(&self, metadata: &ArtifactMetadata, types: &[Arc<SynthesizedType>]) -> SynthesisResult<String> {
        let mut out = String::new();
        let render = |out: &mut String| -> fmt::Result {
            self.write_metadata(out, metadata)?;
            for (i, ty) in types.iter().enumerate() {
                if i > 0 {
                    writeln!(out)?;
                }
                self.write_type(out, ty)?;
            }
            Ok(())
        };
        render(&mut out).map_err(|e| SynthesisError::Lowering(e.to_string()))?;
        Ok(out)
    }
}

fn keyword_of(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "public",
        Visibility::Internal => "internal",
        Visibility::Private => "private",
    }
}
