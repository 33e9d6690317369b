pub mod invoice_schema;
pub mod metadata_def;
pub mod validate;

pub use invoice_schema::{InvoiceSchema, ScalarType, SchemaNode};
pub use metadata_def::{MetadataDefEntry, MetadataDefinition};
pub use validate::{validate_invoice, validate_metadata, ValidateOptions};
