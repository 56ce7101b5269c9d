//! NFe XML extraction.
//!
//! Parses namespace-qualified (or unqualified) fiscal XML into a
//! render-ready [`crate::core::InvoiceRecord`], tolerating malformed input
//! and absent fields.

mod encoding;
mod extract;
mod taxes;

pub use encoding::*;
pub use extract::*;
pub use taxes::*;
