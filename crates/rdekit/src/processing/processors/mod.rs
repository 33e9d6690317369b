pub mod callback;
pub mod descriptions;
pub mod files;
pub mod invoice_init;
pub mod structured;
pub mod thumbnails;
pub mod validation;
pub mod variables;

pub use callback::DatasetCallbackRunner;
pub use descriptions::DescriptionUpdater;
pub use files::{RawFileCopier, RdeFormatStructureCopier};
pub use invoice_init::{
    ExcelRowInvoiceInitializer, NoOpInvoiceInitializer, SmartTableEarlyExit,
    SmartTableInvoiceInitializer, StandardInvoiceInitializer,
};
pub use structured::StructuredInvoiceSaver;
pub use thumbnails::ThumbnailGenerator;
pub use validation::{InvoiceValidator, MetadataValidator};
pub use variables::MagicVariableApplier;
