//! Custom attribute queries.
//!
//! Attribute blobs are decoded by the engine; this module only forwards the queries and
//! applies the filtering and copying rules the facade exposes:
//!
//! - [`get_custom_attributes`] returns every attribute of a subject, shared with the engine
//! - [`get_custom_attributes_of`] filters by attribute type
//! - [`is_defined`] checks for the presence of an attribute type
//! - [`get_custom_attributes_data`] returns owned copies, never inherited ones
//!
//! Results are not cached. Every call asks the engine again.

mod types;

pub use types::*;

use crate::{
    engine::{AssemblyHandle, Engine},
    metadata::typesystem::TypeRef,
    Result,
};

/// Something custom attributes can be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AttributeSubject {
    /// Attributes applied to the assembly itself
    Assembly(AssemblyHandle),
}

/// All custom attributes of `subject`.
///
/// # Errors
/// Engine errors, e.g. [`crate::Error::StaleHandle`].
pub fn get_custom_attributes(
    engine: &dyn Engine,
    subject: AttributeSubject,
    inherit: bool,
) -> Result<Vec<CustomAttributeValueRc>> {
    engine.custom_attributes(subject, None, inherit)
}

/// Custom attributes of `subject` whose type is `attribute_type`.
///
/// # Errors
/// Engine errors, e.g. [`crate::Error::StaleHandle`].
pub fn get_custom_attributes_of(
    engine: &dyn Engine,
    subject: AttributeSubject,
    attribute_type: &TypeRef,
    inherit: bool,
) -> Result<Vec<CustomAttributeValueRc>> {
    let mut attributes = engine.custom_attributes(subject, Some(attribute_type), inherit)?;
    attributes.retain(|attribute| attribute.attribute_type == *attribute_type);
    Ok(attributes)
}

/// Whether at least one attribute of type `attribute_type` is applied to `subject`.
///
/// # Errors
/// Engine errors, e.g. [`crate::Error::StaleHandle`].
pub fn is_defined(
    engine: &dyn Engine,
    subject: AttributeSubject,
    attribute_type: &TypeRef,
    inherit: bool,
) -> Result<bool> {
    Ok(!get_custom_attributes_of(engine, subject, attribute_type, inherit)?.is_empty())
}

/// Owned copies of the attributes declared directly on `subject`.
///
/// # Errors
/// Engine errors, e.g. [`crate::Error::StaleHandle`].
pub fn get_custom_attributes_data(
    engine: &dyn Engine,
    subject: AttributeSubject,
) -> Result<Vec<CustomAttributeValue>> {
    let attributes = engine.custom_attributes(subject, None, false)?;
    log::trace!("copying {} custom attributes of {:?}", attributes.len(), subject);
    Ok(attributes
        .iter()
        .map(|attribute| CustomAttributeValue::clone(attribute))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{test::MockEngine, Error};

    const SUBJECT: AttributeSubject = AttributeSubject::Assembly(AssemblyHandle::new(1));

    fn title() -> TypeRef {
        TypeRef::new("System.Reflection", "AssemblyTitleAttribute")
    }

    fn engine() -> MockEngine {
        let mut titled = CustomAttributeValue::new(title());
        titled
            .fixed_args
            .push(CustomAttributeArgument::String(Some("Demo".to_string())));

        let mut debuggable =
            CustomAttributeValue::new(TypeRef::new("System.Diagnostics", "DebuggableAttribute"));
        debuggable.named_args.push(CustomAttributeNamedArgument {
            is_field: false,
            name: "IsJITTrackingEnabled".to_string(),
            value: CustomAttributeArgument::Bool(true),
        });

        MockEngine::new()
            .with_attribute(titled)
            .with_attribute(debuggable)
    }

    #[test]
    fn all_attributes() {
        let engine = engine();
        let attributes = get_custom_attributes(&engine, SUBJECT, true).unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(
            attributes[1].named("IsJITTrackingEnabled"),
            Some(&CustomAttributeArgument::Bool(true))
        );
        assert_eq!(attributes[1].named("Missing"), None);
    }

    #[test]
    fn filter_and_is_defined() {
        let engine = engine();
        let titles = get_custom_attributes_of(&engine, SUBJECT, &title(), false).unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].attribute_type, title());

        assert!(is_defined(&engine, SUBJECT, &title(), false).unwrap());
        let missing = TypeRef::new("System", "ObsoleteAttribute");
        assert!(!is_defined(&engine, SUBJECT, &missing, false).unwrap());
    }

    #[test]
    fn data_is_an_owned_copy() {
        let engine = engine();
        let shared = get_custom_attributes(&engine, SUBJECT, false).unwrap();
        let mut owned = get_custom_attributes_data(&engine, SUBJECT).unwrap();

        owned[0].fixed_args.clear();

        assert_eq!(shared[0].fixed_args.len(), 1);
        assert_eq!(Arc::strong_count(&shared[0]), 2);
    }

    #[test]
    fn stale_subject() {
        let engine = engine();
        engine.unload();
        assert!(matches!(
            get_custom_attributes(&engine, SUBJECT, false),
            Err(Error::StaleHandle)
        ));
    }
}
