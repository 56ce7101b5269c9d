#![cfg(feature = "batch")]

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use danfe::batch::{BatchConfig, BatchProcessor, Outcome};
use danfe::core::DanfeError;
use danfe::render::PdfRenderer;
use zip::write::SimpleFileOptions;

const KEY_A: &str = "35240612345678000195550010000001231123456789";
const KEY_B: &str = "35240612345678000195550010000001231123456780";

/// Renderer that fakes a PDF so batches run without a browser.
struct StubRenderer;

impl PdfRenderer for StubRenderer {
    fn render(&self, _html: &str, output: &Path) -> Result<(), DanfeError> {
        std::fs::write(output, b"%PDF-1.4 stub")?;
        Ok(())
    }
}

/// Renderer that always fails, standing in for a broken browser install.
struct FailingRenderer;

impl PdfRenderer for FailingRenderer {
    fn render(&self, _html: &str, _output: &Path) -> Result<(), DanfeError> {
        Err(DanfeError::Render("boom".into()))
    }
}

fn invoice_xml(key: &str, recipient: &str, cnpj: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe">
  <NFe>
    <infNFe Id="NFe{key}">
      <ide>
        <natOp>VENDA</natOp>
        <mod>55</mod>
        <serie>1</serie>
        <nNF>1</nNF>
        <dhEmi>2024-06-15T10:30:00-03:00</dhEmi>
      </ide>
      <emit><CNPJ>12345678000195</CNPJ><xNome>EMITENTE LTDA</xNome></emit>
      <dest><CNPJ>{cnpj}</CNPJ><xNome>{recipient}</xNome></dest>
      <det nItem="1">
        <prod><cProd>P1</cProd><xProd>Produto</xProd><qCom>1</qCom><vProd>10.00</vProd></prod>
      </det>
      <total><ICMSTot><vProd>10.00</vProd><vNF>10.00</vNF></ICMSTot></total>
    </infNFe>
  </NFe>
</nfeProc>"#
    )
}

fn event_xml() -> &'static str {
    r#"<procEventoNFe xmlns="http://www.portalfiscal.inf.br/nfe">
  <evento><infEvento><tpEvento>210210</tpEvento></infEvento></evento>
</procEventoNFe>"#
}

fn make_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn archive_names(path: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn mixed_archive_processes_invoices_and_skips_events() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let output = dir.path().join("result.zip");
    make_zip(
        &input,
        &[
            ("a.xml", &invoice_xml(KEY_A, "CLIENTE A", "98765432000198")),
            ("b.xml", &invoice_xml(KEY_B, "CLIENTE B", "11222333000181")),
            ("evento.xml", event_xml()),
        ],
    );

    let processor = BatchProcessor::new(BatchConfig::default(), StubRenderer);
    let batch = processor.process_archive(&input, &output).unwrap();

    assert_eq!(batch.result.succeeded, 2);
    assert_eq!(batch.result.failed, 0);
    assert_eq!(batch.result.outcomes.len(), 2);
    assert!(batch
        .result
        .outcomes
        .iter()
        .all(|o| matches!(o.outcome, Outcome::Success(_))));

    // exactly two recipient folders under 2024/06, each with xml + pdf
    let names = archive_names(&output);
    let recipients: BTreeSet<String> = names
        .iter()
        .filter(|n| n.ends_with(".pdf") || n.ends_with(".xml"))
        .map(|n| {
            let mut parts = n.split('/');
            let (y, m, r) = (
                parts.next().unwrap(),
                parts.next().unwrap(),
                parts.next().unwrap(),
            );
            assert_eq!((y, m), ("2024", "06"));
            r.to_string()
        })
        .collect();
    assert_eq!(recipients.len(), 2);
    assert!(names.iter().any(|n| n.ends_with(&format!("{KEY_A}.pdf"))));
    assert!(names.iter().any(|n| n.ends_with(&format!("{KEY_A}.xml"))));
    assert!(names.iter().any(|n| n.ends_with(&format!("{KEY_B}.pdf"))));
}

#[test]
fn recipient_folder_strips_document_slash() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let output = dir.path().join("result.zip");
    make_zip(
        &input,
        &[("a.xml", &invoice_xml(KEY_A, "CLIENTE A", "98765432000198"))],
    );

    let processor = BatchProcessor::new(BatchConfig::default(), StubRenderer);
    processor.process_archive(&input, &output).unwrap();

    let names = archive_names(&output);
    assert!(
        names
            .iter()
            .any(|n| n.contains("CLIENTE A - 98.765.4320001-98")),
        "unexpected layout: {names:?}"
    );
}

#[test]
fn event_only_archive_is_zero_results() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let output = dir.path().join("result.zip");
    make_zip(&input, &[("evento.xml", event_xml())]);

    let processor = BatchProcessor::new(BatchConfig::default(), StubRenderer);
    match processor.process_archive(&input, &output) {
        Err(DanfeError::ZeroResults) => {}
        other => panic!("expected ZeroResults, got {other:?}"),
    }
    // a failed batch leaves no output archive behind
    assert!(!output.exists());
}

#[test]
fn unreadable_bundle_is_malformed_archive() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let output = dir.path().join("result.zip");
    std::fs::write(&input, b"this is not a zip file").unwrap();

    let processor = BatchProcessor::new(BatchConfig::default(), StubRenderer);
    match processor.process_archive(&input, &output) {
        Err(DanfeError::MalformedArchive(_)) => {}
        other => panic!("expected MalformedArchive, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn renderer_failure_is_per_file_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let output = dir.path().join("result.zip");
    make_zip(
        &input,
        &[
            ("a.xml", &invoice_xml(KEY_A, "CLIENTE A", "98765432000198")),
            ("b.xml", &invoice_xml(KEY_B, "CLIENTE B", "11222333000181")),
        ],
    );

    let processor = BatchProcessor::new(BatchConfig::default(), FailingRenderer);
    let batch = processor.process_archive(&input, &output).unwrap();

    assert_eq!(batch.result.succeeded, 0);
    assert_eq!(batch.result.failed, 2);
    assert!(batch
        .result
        .outcomes
        .iter()
        .all(|o| matches!(o.outcome, Outcome::Error(_))));
    // the batch itself still completes and packages what exists
    assert!(output.exists());
}

#[test]
fn generated_copies_are_not_reprocessed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let output = dir.path().join("result.zip");
    // a previous run's output folder travels inside the new bundle
    make_zip(
        &input,
        &[
            ("a.xml", &invoice_xml(KEY_A, "CLIENTE A", "98765432000198")),
            (
                "DANFE-XML/2024/06/old/copy.xml",
                &invoice_xml(KEY_B, "CLIENTE B", "11222333000181"),
            ),
        ],
    );

    let processor = BatchProcessor::new(BatchConfig::default(), StubRenderer);
    let batch = processor.process_archive(&input, &output).unwrap();
    assert_eq!(batch.result.succeeded, 1);
    assert_eq!(batch.result.failed, 0);
}

#[test]
fn non_xml_members_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let output = dir.path().join("result.zip");
    make_zip(
        &input,
        &[
            ("leiame.txt", "notas do mes"),
            ("a.xml", &invoice_xml(KEY_A, "CLIENTE A", "98765432000198")),
        ],
    );

    let processor = BatchProcessor::new(BatchConfig::default(), StubRenderer);
    let batch = processor.process_archive(&input, &output).unwrap();
    assert_eq!(batch.result.succeeded, 1);
    assert_eq!(batch.result.outcomes.len(), 1);
}

// ---------------------------------------------------------------------------
// Directory-level entry point
// ---------------------------------------------------------------------------

#[test]
fn process_dir_works_on_extracted_tree() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    std::fs::create_dir_all(work.join("sub")).unwrap();
    std::fs::write(
        work.join("sub/a.xml"),
        invoice_xml(KEY_A, "CLIENTE A", "98765432000198"),
    )
    .unwrap();
    let out_root = dir.path().join("out");

    let processor = BatchProcessor::new(BatchConfig::default(), StubRenderer);
    let result = processor.process_dir(&work, &out_root).unwrap();
    assert_eq!(result.succeeded, 1);
    assert!(out_root
        .join("2024")
        .join("06")
        .join("CLIENTE A - 98.765.4320001-98")
        .join(format!("{KEY_A}.xml"))
        .exists());
    assert!(out_root
        .join("2024")
        .join("06")
        .join("CLIENTE A - 98.765.4320001-98")
        .join(format!("{KEY_A}.pdf"))
        .exists());
}

#[test]
fn serialized_result_carries_counts_and_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.zip");
    let output = dir.path().join("result.zip");
    make_zip(
        &input,
        &[("a.xml", &invoice_xml(KEY_A, "CLIENTE A", "98765432000198"))],
    );

    let processor = BatchProcessor::new(BatchConfig::default(), StubRenderer);
    let batch = processor.process_archive(&input, &output).unwrap();

    // the service layer serializes the summary as-is
    let json = serde_json::to_string(&batch.result).unwrap();
    assert!(json.contains("\"succeeded\":1"));
    assert!(json.contains("\"failed\":0"));
    assert!(json.contains("processed: CLIENTE A"));
}
