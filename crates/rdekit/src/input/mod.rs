pub mod classifier;
pub mod excel;
pub mod smarttable;

pub use classifier::{classify, ClassifiedInput};
pub use excel::ExcelInvoiceFile;
pub use smarttable::SmartTableFile;
