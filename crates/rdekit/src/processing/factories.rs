//! Mode → processor-sequence dispatch.

use crate::models::tile::Mode;
use crate::processing::pipeline::{Pipeline, Processor};
use crate::processing::processors::{
    DatasetCallbackRunner, DescriptionUpdater, ExcelRowInvoiceInitializer, InvoiceValidator,
    MagicVariableApplier, MetadataValidator, NoOpInvoiceInitializer, RawFileCopier,
    RdeFormatStructureCopier, SmartTableEarlyExit, SmartTableInvoiceInitializer,
    StandardInvoiceInitializer, StructuredInvoiceSaver, ThumbnailGenerator,
};

pub struct PipelineFactory;

impl PipelineFactory {
    /// The fixed processor sequence for a mode. The chains differ only in
    /// their initializer, the SmartTable early-exit step, and RDEFormat's
    /// copy-only file placement.
    pub fn create(mode: Mode) -> Pipeline {
        let initializer: Box<dyn Processor> = match mode {
            Mode::Invoice | Mode::MultiDataTile => Box::new(StandardInvoiceInitializer),
            Mode::ExcelInvoice => Box::new(ExcelRowInvoiceInitializer),
            Mode::SmartTable => Box::new(SmartTableInvoiceInitializer),
            Mode::RdeFormat => Box::new(NoOpInvoiceInitializer),
        };

        let mut processors: Vec<Box<dyn Processor>> = vec![
            initializer,
            Box::new(MagicVariableApplier),
            Box::new(InvoiceValidator),
            Box::new(MetadataValidator),
        ];

        if mode == Mode::SmartTable {
            processors.push(Box::new(SmartTableEarlyExit));
        }

        match mode {
            Mode::RdeFormat => processors.push(Box::new(RdeFormatStructureCopier)),
            _ => processors.push(Box::new(RawFileCopier)),
        }

        processors.push(Box::new(DescriptionUpdater));
        processors.push(Box::new(ThumbnailGenerator));
        processors.push(Box::new(StructuredInvoiceSaver));
        processors.push(Box::new(DatasetCallbackRunner));

        Pipeline::new(processors)
    }
}
