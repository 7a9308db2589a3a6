//! Source type catalog

use super::{QualifiedName, TypeDescriptor};
use crate::error::{SynthesisError, SynthesisResult};
use rustc_hash::{FxHashMap, FxHashSet};

/// Base-runtime open generic definitions that may be rebuilt over synthesized arguments
pub const DEFAULT_RUNTIME_GENERICS: &[&str] = &[
    "System.Collections.Generic.List",
    "System.Collections.Generic.Dictionary",
    "System.Collections.Generic.HashSet",
    "System.Collections.Generic.IEnumerable",
    "System.Nullable",
];

/// Every type the scanner knows about, indexed by canonical name
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    types: Vec<TypeDescriptor>,
    index: FxHashMap<String, usize>,
    runtime_generics: FxHashSet<String>,
}

impl SourceCatalog {
    /// Create an empty catalog with the default runtime generics
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            index: FxHashMap::default(),
            runtime_generics: DEFAULT_RUNTIME_GENERICS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build a catalog from descriptors
    pub fn from_types(types: impl IntoIterator<Item = TypeDescriptor>) -> SynthesisResult<Self> {
        let mut catalog = Self::new();
        for ty in types {
            catalog.insert(ty)?;
        }
        Ok(catalog)
    }

    /// Add a descriptor
    ///
    /// Rejects duplicate canonical names and duplicate member names.
    pub fn insert(&mut self, ty: TypeDescriptor) -> SynthesisResult<()> {
        let canonical = ty.canonical();
        if self.index.contains_key(&canonical) {
            return Err(SynthesisError::Configuration(format!(
                "type {} is registered twice",
                canonical
            )));
        }

        let mut seen = FxHashSet::default();
        for member in &ty.members {
            if !seen.insert(member.name.as_str()) {
                return Err(SynthesisError::Configuration(format!(
                    "member {} is declared twice in {}",
                    member.name, canonical
                )));
            }
        }

        self.index.insert(canonical, self.types.len());
        self.types.push(ty);
        Ok(())
    }

    /// Register an additional base-runtime generic definition
    pub fn register_runtime_generic(&mut self, definition: &str) {
        self.runtime_generics.insert(definition.to_string());
    }

    /// Check if a generic definition may be rebuilt
    pub fn is_runtime_generic(&self, definition: &QualifiedName) -> bool {
        self.runtime_generics.contains(&definition.canonical())
    }

    /// Registered base-runtime generic definitions
    pub fn runtime_generics(&self) -> impl Iterator<Item = &str> {
        self.runtime_generics.iter().map(String::as_str)
    }

    /// Look up a descriptor
    pub fn get(&self, name: &QualifiedName) -> Option<&TypeDescriptor> {
        self.get_by_name(&name.canonical())
    }

    /// Look up a descriptor by canonical name
    pub fn get_by_name(&self, canonical: &str) -> Option<&TypeDescriptor> {
        self.index.get(canonical).map(|&i| &self.types[i])
    }

    /// Look up a descriptor, failing with [`SynthesisError::UnknownType`]
    pub fn require(&self, name: &QualifiedName) -> SynthesisResult<&TypeDescriptor> {
        self.get(name)
            .ok_or_else(|| SynthesisError::UnknownType(name.canonical()))
    }

    /// Check if a canonical name is registered
    pub fn contains(&self, canonical: &str) -> bool {
        self.index.contains_key(canonical)
    }

    /// Number of descriptors
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Descriptors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MemberDescriptor, PrimitiveType};

    #[test]
    fn test_insert_and_lookup() {
        let mut catalog = SourceCatalog::new();
        catalog
            .insert(TypeDescriptor::class("Acme.Point").with_member(MemberDescriptor::new("X", PrimitiveType::I32)))
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("Acme.Point"));
        assert!(catalog.get(&QualifiedName::parse("Acme.Point")).is_some());
        assert!(matches!(
            catalog.require(&QualifiedName::parse("Acme.Line")),
            Err(SynthesisError::UnknownType(_))
        ));
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let ty = TypeDescriptor::class("Acme.Point")
            .with_member(MemberDescriptor::new("X", PrimitiveType::I32))
            .with_member(MemberDescriptor::new("X", PrimitiveType::I64));
        let mut catalog = SourceCatalog::new();
        assert!(matches!(catalog.insert(ty), Err(SynthesisError::Configuration(_))));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let result = SourceCatalog::from_types(vec![
            TypeDescriptor::class("Acme.Point"),
            TypeDescriptor::class("Acme.Point"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_runtime_generics() {
        let mut catalog = SourceCatalog::new();
        let list = QualifiedName::parse("System.Collections.Generic.List");
        let custom = QualifiedName::parse("Acme.Bag");
        assert!(catalog.is_runtime_generic(&list));
        assert!(!catalog.is_runtime_generic(&custom));
        catalog.register_runtime_generic("Acme.Bag");
        assert!(catalog.is_runtime_generic(&custom));
        assert_eq!(catalog.runtime_generics().count(), DEFAULT_RUNTIME_GENERICS.len() + 1);
        assert!(catalog.runtime_generics().any(|g| g == "Acme.Bag"));
    }
}
