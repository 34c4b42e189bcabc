//! Custom attribute values as handed out by the engine.

use std::sync::Arc;

use crate::metadata::typesystem::TypeRef;

/// A reference-counted pointer to a `CustomAttributeValue`
pub type CustomAttributeValueRc = Arc<CustomAttributeValue>;

/// A custom attribute instance with its constructor and named arguments
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeValue {
    /// Type of the attribute, e.g. `System.Reflection.AssemblyTitleAttribute`
    pub attribute_type: TypeRef,
    /// Fixed arguments from the constructor signature
    pub fixed_args: Vec<CustomAttributeArgument>,
    /// Named arguments (fields and properties)
    pub named_args: Vec<CustomAttributeNamedArgument>,
}

impl CustomAttributeValue {
    /// An attribute of `attribute_type` without arguments.
    pub fn new(attribute_type: TypeRef) -> Self {
        CustomAttributeValue {
            attribute_type,
            fixed_args: Vec::new(),
            named_args: Vec::new(),
        }
    }

    /// Looks up a named argument by field or property name.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&CustomAttributeArgument> {
        self.named_args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }
}

/// Represents a single custom attribute argument value
#[derive(Debug, Clone, PartialEq)]
pub enum CustomAttributeArgument {
    /// Boolean value
    Bool(bool),
    /// Character value (16-bit Unicode)
    Char(char),
    /// Signed 8-bit integer
    I1(i8),
    /// Unsigned 8-bit integer
    U1(u8),
    /// Signed 16-bit integer
    I2(i16),
    /// Unsigned 16-bit integer
    U2(u16),
    /// Signed 32-bit integer
    I4(i32),
    /// Unsigned 32-bit integer
    U4(u32),
    /// Signed 64-bit integer
    I8(i64),
    /// Unsigned 64-bit integer
    U8(u64),
    /// 32-bit floating point
    R4(f32),
    /// 64-bit floating point
    R8(f64),
    /// UTF-8 string, `None` for a null string
    String(Option<String>),
    /// Type reference
    Type(TypeRef),
    /// Array of arguments
    Array(Vec<CustomAttributeArgument>),
    /// Enum value (enum type + underlying value)
    Enum(TypeRef, Box<CustomAttributeArgument>),
}

/// Represents a named argument (field or property) in a custom attribute
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeNamedArgument {
    /// Whether this is a field (true) or property (false)
    pub is_field: bool,
    /// Name of the field or property
    pub name: String,
    /// Value of the argument
    pub value: CustomAttributeArgument,
}
