//! Minimal type and method references.
//!
//! The facade only needs a type's namespace and name: to build namespace-qualified resource
//! names, to filter custom attributes and to report exported types. Methods are only ever
//! reported, never invoked, so a [`MethodRef`] is just a declaring type and a name.

use std::fmt;

/// Separator between a namespace and a type name, and between a namespace and a resource name.
pub const DELIMITER: char = '.';

/// Separator between a declaring type and a member name.
pub const MEMBER_DELIMITER: &str = "::";

/// Name of a type as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Namespace, `None` for types in the global namespace
    pub namespace: Option<String>,
    /// Simple type name
    pub name: String,
}

impl TypeRef {
    /// Creates a reference to a type in `namespace`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Creates a reference to a type in the global namespace.
    pub fn global(name: impl Into<String>) -> Self {
        TypeRef {
            namespace: None,
            name: name.into(),
        }
    }

    /// Namespace-qualified name, e.g. `System.Reflection.AssemblyTitleAttribute`.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(namespace) if !namespace.is_empty() => {
                format!("{}{}{}", namespace, DELIMITER, self.name)
            }
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A method as reported by the engine, e.g. an assembly's entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Type declaring the method
    pub declaring_type: TypeRef,
    /// Simple method name
    pub name: String,
}

impl MethodRef {
    /// Creates a reference to method `name` of `declaring_type`.
    pub fn new(declaring_type: TypeRef, name: impl Into<String>) -> Self {
        MethodRef {
            declaring_type,
            name: name.into(),
        }
    }

    /// Type-qualified name, e.g. `App.Program::Main`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "{}{}{}",
            self.declaring_type.full_name(),
            MEMBER_DELIMITER,
            self.name
        )
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
