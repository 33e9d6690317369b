pub mod description;
pub mod generator;
pub mod magic;
pub mod overwrite;

pub use description::update_description_with_features;
pub use generator::{generate_from_schema, GenerateOptions};
pub use magic::MagicVariableResolver;
pub use overwrite::{
    overwrite_invoice, ColumnPath, InvoicePatch, OverwriteOptions, OverwriteOutcome,
};
