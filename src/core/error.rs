use thiserror::Error;

/// Errors that can occur while processing NFe documents or batches.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DanfeError {
    /// The input bundle cannot be opened or extracted at all.
    ///
    /// Batch-level fatal: no partial output is produced.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    /// The XML document has no invoice root node (`infNFe`).
    ///
    /// Event envelopes and other fiscal documents fall here; they are
    /// skipped, not counted as errors.
    #[error("document is not an invoice")]
    NotAnInvoice,

    /// Invoice root present but the structure prevents producing a record.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Template binding or PDF subprocess failure for one document.
    #[error("render failed: {0}")]
    Render(String),

    /// The DANFE template resource is unusable.
    ///
    /// This is a configuration error, not a per-document one.
    #[error("template error: {0}")]
    Template(String),

    /// The batch completed but no invoice document was classified.
    #[error("no invoice documents found in batch")]
    ZeroResults,

    /// Filesystem or subprocess I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
