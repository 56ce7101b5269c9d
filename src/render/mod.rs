//! DANFE rendering: barcode, template binding, PDF generation.

mod barcode;
mod pdf;
mod template;

pub use barcode::*;
pub use pdf::*;
pub use template::*;
