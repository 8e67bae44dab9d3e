//! Pluggable per-field-name parsers: a small registry mapping a header
//! field name to the function that updates a [`crate::descriptor::BodyDescriptor`]
//! from it, so new field names can be wired in without touching the
//! entity state machine.

mod registry;

pub use registry::FieldRegistry;
