//! Archive-level batch orchestration.
//!
//! Walks the extracted contents of an input bundle, routes every invoice
//! XML through extraction → template binding → PDF generation, files the
//! outputs by emission period and recipient, and repackages the result
//! into a single downloadable archive.
//!
//! Processing is sequential; one bad document records an error outcome and
//! never aborts the walk. Only an unopenable input bundle and a walk that
//! classifies zero invoices fail the whole batch.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::*;
use crate::nfe::{decode_xml_bytes, extract_invoice, is_invoice_document};
use crate::render::{PdfRenderer, render_html};

/// Orchestrator configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Name of the output subtree created inside the work area. Input XML
    /// found under a directory of this name is skipped, so nested runs do
    /// not reprocess generated copies. A legitimately named input folder
    /// collides with this and is skipped too.
    pub output_folder: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_folder: "DANFE-XML".to_string(),
        }
    }
}

/// Per-file outcome kept in the batch summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Outcome {
    Success(String),
    Error(String),
}

/// One walked file with its outcome. Files skipped as non-invoices are
/// logged but not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file: String,
    pub outcome: Outcome,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<FileOutcome>,
}

/// A finished batch: the summary plus the packaged output archive.
#[derive(Debug)]
pub struct BatchOutput {
    pub result: BatchResult,
    pub archive: PathBuf,
}

/// Sequential per-archive processor.
pub struct BatchProcessor<R> {
    config: BatchConfig,
    renderer: R,
}

impl<R: PdfRenderer> BatchProcessor<R> {
    pub fn new(config: BatchConfig, renderer: R) -> Self {
        Self { config, renderer }
    }

    /// Process a ZIP bundle of NFe documents end to end.
    ///
    /// The bundle is extracted into an isolated scratch directory (removed
    /// on success and failure alike), every member is processed, and the
    /// output tree is packaged into `output_archive`. An unopenable bundle
    /// is [`DanfeError::MalformedArchive`]; a walk that classifies no
    /// invoice is [`DanfeError::ZeroResults`] — in both cases no output
    /// archive is written.
    pub fn process_archive(
        &self,
        archive: &Path,
        output_archive: &Path,
    ) -> Result<BatchOutput, DanfeError> {
        info!(archive = %archive.display(), "processing batch");
        let scratch = tempfile::tempdir()?;
        let work = scratch.path().join("work");
        fs::create_dir_all(&work)?;

        let file =
            File::open(archive).map_err(|e| DanfeError::MalformedArchive(e.to_string()))?;
        let mut bundle = zip::ZipArchive::new(file)
            .map_err(|e| DanfeError::MalformedArchive(e.to_string()))?;
        bundle
            .extract(&work)
            .map_err(|e| DanfeError::MalformedArchive(e.to_string()))?;

        let output_root = work.join(&self.config.output_folder);
        fs::create_dir_all(&output_root)?;

        let result = self.process_dir(&work, &output_root)?;
        package_output(&output_root, output_archive)?;

        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            "batch complete"
        );
        Ok(BatchOutput {
            result,
            archive: output_archive.to_path_buf(),
        })
    }

    /// Walk `input_dir` and process every invoice XML into `output_root`.
    ///
    /// Fails with [`DanfeError::ZeroResults`] only after the full walk,
    /// when no file classified as an invoice.
    pub fn process_dir(
        &self,
        input_dir: &Path,
        output_root: &Path,
    ) -> Result<BatchResult, DanfeError> {
        let mut result = BatchResult::default();
        let mut classified = 0usize;

        for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
            {
                continue;
            }
            // Skip our own output subtree on nested runs.
            if path
                .components()
                .any(|c| c.as_os_str() == self.config.output_folder.as_str())
            {
                continue;
            }
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let bytes = match fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    result.failed += 1;
                    result.outcomes.push(FileOutcome {
                        file: file_name,
                        outcome: Outcome::Error(e.to_string()),
                    });
                    continue;
                }
            };
            let (xml, encoding) = decode_xml_bytes(&bytes);
            debug!(file = %file_name, encoding, "decoded XML member");

            if !is_invoice_document(&xml) {
                debug!(file = %file_name, skip = %DanfeError::NotAnInvoice, "skipping member");
                continue;
            }
            classified += 1;

            match self.process_invoice(&xml, path, &file_name, output_root) {
                Ok(message) => {
                    result.succeeded += 1;
                    result.outcomes.push(FileOutcome {
                        file: file_name,
                        outcome: Outcome::Success(message),
                    });
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "invoice failed");
                    result.failed += 1;
                    result.outcomes.push(FileOutcome {
                        file: file_name,
                        outcome: Outcome::Error(e.to_string()),
                    });
                }
            }
        }

        if classified == 0 {
            return Err(DanfeError::ZeroResults);
        }
        Ok(result)
    }

    fn process_invoice(
        &self,
        xml: &str,
        source: &Path,
        file_name: &str,
        output_root: &Path,
    ) -> Result<String, DanfeError> {
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        let record = extract_invoice(xml, &stem)?;
        let (year, month) = record.routing_period();
        let target = output_root
            .join(&year)
            .join(&month)
            .join(recipient_folder(&record));
        fs::create_dir_all(&target)?;

        let base = if record.access_key_raw.len() == 44
            && record.access_key_raw.bytes().all(|b| b.is_ascii_digit())
        {
            record.access_key_raw.clone()
        } else {
            stem
        };
        fs::copy(source, target.join(format!("{base}.xml")))?;

        let html = render_html(&record)?;
        self.renderer
            .render(&html, &target.join(format!("{base}.pdf")))?;

        Ok(format!("processed: {}", record.recipient_name))
    }
}

/// Output folder label for one recipient: first 30 characters of the name,
/// the masked document appended, slashes stripped (the CNPJ mask's slash
/// included), surrounding whitespace trimmed.
fn recipient_folder(record: &InvoiceRecord) -> String {
    let name: String = record.recipient_name.chars().take(30).collect();
    format!("{name} - {}", record.recipient_document)
        .chars()
        .filter(|c| *c != '/' && *c != '\\')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Package the output tree into a single ZIP, paths relative to the root.
fn package_output(output_root: &Path, archive_path: &Path) -> Result<(), DanfeError> {
    let file = File::create(archive_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for entry in WalkDir::new(output_root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        let Ok(rel) = path.strip_prefix(output_root) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = rel.to_string_lossy().replace('\\', "/");
        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(zip_io)?;
        } else {
            zip.start_file(name, options).map_err(zip_io)?;
            let mut f = File::open(path)?;
            std::io::copy(&mut f, &mut zip)?;
        }
    }
    zip.finish().map_err(zip_io)?;
    Ok(())
}

fn zip_io(e: zip::result::ZipError) -> DanfeError {
    DanfeError::Io(std::io::Error::other(e))
}
