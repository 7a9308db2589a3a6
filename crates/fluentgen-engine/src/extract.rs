//! Member extraction
//!
//! Flattens a source type's inheritance chain into the ordered list of
//! members the synthesizers work from.

use crate::descriptor::{MemberDescriptor, SourceCatalog, TypeDescriptor};
use crate::error::{SynthesisError, SynthesisResult};
use rustc_hash::FxHashSet;

/// Eligible members of a source type
///
/// Base members come first (recursively), then declared members, each in
/// declaration order. A member redeclared in a derived type replaces the
/// inherited one at the inherited position. Only public, readable, writable
/// and non-ignored members are returned.
pub fn extract(catalog: &SourceCatalog, ty: &TypeDescriptor) -> SynthesisResult<Vec<MemberDescriptor>> {
    let mut visited = FxHashSet::default();
    let mut members = Vec::new();
    collect(catalog, ty, &mut visited, &mut members)?;
    members.retain(MemberDescriptor::is_eligible);
    Ok(members)
}

fn collect(
    catalog: &SourceCatalog,
    ty: &TypeDescriptor,
    visited: &mut FxHashSet<String>,
    out: &mut Vec<MemberDescriptor>,
) -> SynthesisResult<()> {
    if !visited.insert(ty.canonical()) {
        return Err(SynthesisError::Configuration(format!(
            "inheritance cycle through {}",
            ty.canonical()
        )));
    }

    if let Some(base) = &ty.base {
        // Bases outside the catalog (runtime roots) contribute nothing
        if let Some(base_ty) = catalog.get(base) {
            collect(catalog, base_ty, visited, out)?;
        }
    }

    for member in &ty.members {
        match out.iter_mut().find(|m| m.name == member.name) {
            Some(slot) => *slot = member.clone(),
            None => out.push(member.clone()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{PrimitiveType, TypeRef, Visibility};

    fn names(members: &[MemberDescriptor]) -> Vec<&str> {
        members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_declaration_order_and_filtering() {
        let ty = TypeDescriptor::class("Acme.Person")
            .with_member(MemberDescriptor::new("Name", TypeRef::String))
            .with_member(MemberDescriptor::new("Id", PrimitiveType::Guid).read_only())
            .with_member(MemberDescriptor::new("Secret", TypeRef::String).with_visibility(Visibility::Private))
            .with_member(MemberDescriptor::new("Cache", TypeRef::Object).ignored())
            .with_member(MemberDescriptor::new("Age", PrimitiveType::I32));
        let catalog = SourceCatalog::from_types(vec![ty.clone()]).unwrap();

        let members = extract(&catalog, &ty).unwrap();
        assert_eq!(names(&members), vec!["Name", "Age"]);
    }

    #[test]
    fn test_base_members_first() {
        let base = TypeDescriptor::class("Acme.Entity")
            .with_member(MemberDescriptor::new("Id", PrimitiveType::I64))
            .with_member(MemberDescriptor::new("Label", TypeRef::String));
        let derived = TypeDescriptor::class("Acme.Customer")
            .with_base("Acme.Entity")
            .with_member(MemberDescriptor::new("Email", TypeRef::String))
            .with_member(MemberDescriptor::new("Label", TypeRef::String).ignored());
        let catalog = SourceCatalog::from_types(vec![base, derived.clone()]).unwrap();

        // The ignored redeclaration hides the inherited Label
        let members = extract(&catalog, &derived).unwrap();
        assert_eq!(names(&members), vec!["Id", "Email"]);
    }

    #[test]
    fn test_redeclared_member_keeps_base_position() {
        let base = TypeDescriptor::class("Acme.Shape")
            .with_member(MemberDescriptor::new("Width", PrimitiveType::I32))
            .with_member(MemberDescriptor::new("Height", PrimitiveType::I32));
        let derived = TypeDescriptor::class("Acme.Square")
            .with_base("Acme.Shape")
            .with_member(MemberDescriptor::new("Color", TypeRef::String))
            .with_member(MemberDescriptor::new("Width", PrimitiveType::I64));
        let catalog = SourceCatalog::from_types(vec![base, derived.clone()]).unwrap();

        let members = extract(&catalog, &derived).unwrap();
        assert_eq!(names(&members), vec!["Width", "Height", "Color"]);
        assert_eq!(members[0].ty, TypeRef::Primitive(PrimitiveType::I64));
    }

    #[test]
    fn test_unknown_base_is_skipped() {
        let ty = TypeDescriptor::class("Acme.Widget")
            .with_base("System.Object")
            .with_member(MemberDescriptor::new("Size", PrimitiveType::I32));
        let catalog = SourceCatalog::from_types(vec![ty.clone()]).unwrap();
        assert_eq!(extract(&catalog, &ty).unwrap().len(), 1);
    }

    #[test]
    fn test_inheritance_cycle_rejected() {
        let a = TypeDescriptor::class("Acme.A").with_base("Acme.B");
        let b = TypeDescriptor::class("Acme.B").with_base("Acme.A");
        let catalog = SourceCatalog::from_types(vec![a.clone(), b]).unwrap();
        assert!(matches!(extract(&catalog, &a), Err(SynthesisError::Configuration(_))));
    }
}
