//! Member descriptors

use super::types::{TypeRef, Visibility};
use serde::{Deserialize, Serialize};

fn yes() -> bool {
    true
}

/// One property of a source type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Member name, unique within its type
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Member visibility
    #[serde(default)]
    pub visibility: Visibility,
    /// Has a getter
    #[serde(default = "yes")]
    pub readable: bool,
    /// Has a setter
    #[serde(default = "yes")]
    pub writable: bool,
    /// Excluded from synthesis
    #[serde(default)]
    pub ignore: bool,
    /// Fluent getter name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter_name: Option<String>,
    /// Fluent setter name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter_name: Option<String>,
    /// Explicit getter suppression; wins over the type's `setters_only`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_getter: Option<bool>,
}

impl MemberDescriptor {
    /// Public read-write member
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            visibility: Visibility::Public,
            readable: true,
            writable: true,
            ignore: false,
            getter_name: None,
            setter_name: None,
            suppress_getter: None,
        }
    }

    /// Builder-style method to drop the setter
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Builder-style method to drop the getter
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    /// Builder-style method to exclude the member
    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Builder-style method to set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Builder-style method to rename the fluent getter
    pub fn with_getter_name(mut self, name: impl Into<String>) -> Self {
        self.getter_name = Some(name.into());
        self
    }

    /// Builder-style method to rename the fluent setter
    pub fn with_setter_name(mut self, name: impl Into<String>) -> Self {
        self.setter_name = Some(name.into());
        self
    }

    /// Builder-style method to force the fluent getter off or on
    pub fn with_suppress_getter(mut self, suppress: bool) -> Self {
        self.suppress_getter = Some(suppress);
        self
    }

    /// Public, readable, writable and not ignored
    pub fn is_eligible(&self) -> bool {
        self.visibility == Visibility::Public && self.readable && self.writable && !self.ignore
    }

    /// Whether the fluent wrapper gets a getter for this member
    pub fn has_fluent_getter(&self, setters_only: bool) -> bool {
        match self.suppress_getter {
            Some(suppress) => !suppress,
            None => !setters_only,
        }
    }

    /// Fluent setter name
    pub fn fluent_setter(&self) -> &str {
        non_blank(self.setter_name.as_deref()).unwrap_or(&self.name)
    }

    /// Fluent getter name
    pub fn fluent_getter(&self) -> &str {
        non_blank(self.getter_name.as_deref()).unwrap_or(&self.name)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}
