//! # danfe
//!
//! Brazilian NFe (Nota Fiscal Eletrônica) processing library covering the
//! pipeline from fiscal XML to printable DANFE: extraction, field
//! formatting, barcode generation, HTML rendering, PDF generation, and
//! batch processing of whole archives.
//!
//! All monetary values are handled through [`rust_decimal::Decimal`] —
//! never floating point — and rendered in the Brazilian convention
//! (comma decimal separator, dot thousands separator).
//!
//! ## Quick Start
//!
//! ```rust
//! use danfe::core::*;
//!
//! assert_eq!(format_currency("1234.5"), "1.234,50");
//! assert_eq!(format_document("12345678000195"), "12.345.678/0001-95");
//! assert_eq!(format_document("12345678909"), "123.456.789-09");
//!
//! let key = "1234".repeat(11);
//! assert_eq!(format_access_key(&key).split(' ').count(), 11);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice record types, field formatters |
//! | `extract` | NFe XML extraction with encoding detection |
//! | `render` | DANFE HTML template, barcode, PDF generation |
//! | `batch` | Archive-level batch orchestration |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "extract")]
pub mod nfe;

#[cfg(feature = "render")]
pub mod render;

#[cfg(feature = "batch")]
pub mod batch;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
