use criterion::{Criterion, black_box, criterion_group, criterion_main};

use danfe::core::*;
use danfe::nfe::extract_invoice;
use danfe::render::{barcode_data_uri, render_html};

const KEY: &str = "35240612345678000195550010000001231123456789";

fn invoice_with_lines(count: usize) -> String {
    let mut dets = String::new();
    for i in 1..=count {
        dets.push_str(&format!(
            r#"<det nItem="{i}">
  <prod><cProd>P{i}</cProd><xProd>Produto {i}</xProd><NCM>73181500</NCM>
  <CFOP>5102</CFOP><uCom>UN</uCom><qCom>2.5</qCom><vUnCom>10.00</vUnCom><vProd>25.00</vProd></prod>
  <imposto><ICMS><ICMS00><CST>00</CST><vBC>25.00</vBC><pICMS>18.00</pICMS><vICMS>4.50</vICMS></ICMS00></ICMS></imposto>
</det>"#
        ));
    }
    format!(
        r#"<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe"><NFe><infNFe Id="NFe{KEY}">
<ide><natOp>VENDA</natOp><mod>55</mod><serie>1</serie><nNF>1</nNF><dhEmi>2024-06-15T10:30:00-03:00</dhEmi></ide>
<emit><CNPJ>12345678000195</CNPJ><xNome>EMITENTE LTDA</xNome></emit>
<dest><CNPJ>98765432000198</CNPJ><xNome>CLIENTE SA</xNome></dest>
{dets}
<total><ICMSTot><vBC>25.00</vBC><vICMS>4.50</vICMS><vProd>25.00</vProd><vNF>29.50</vNF></ICMSTot></total>
</infNFe></NFe></nfeProc>"#
    )
}

fn bench_extract(c: &mut Criterion) {
    let small = invoice_with_lines(5);
    let large = invoice_with_lines(200);

    c.bench_function("extract_5_lines", |b| {
        b.iter(|| extract_invoice(black_box(&small), "bench").unwrap())
    });
    c.bench_function("extract_200_lines", |b| {
        b.iter(|| extract_invoice(black_box(&large), "bench").unwrap())
    });
}

fn bench_render(c: &mut Criterion) {
    let record = extract_invoice(&invoice_with_lines(50), "bench").unwrap();

    c.bench_function("render_html_50_lines", |b| {
        b.iter(|| render_html(black_box(&record)).unwrap())
    });
    c.bench_function("barcode_encode", |b| {
        b.iter(|| barcode_data_uri(black_box(KEY)))
    });
}

fn bench_formatters(c: &mut Criterion) {
    c.bench_function("format_currency", |b| {
        b.iter(|| format_currency(black_box("1234567.89")))
    });
    c.bench_function("format_document", |b| {
        b.iter(|| format_document(black_box("12345678000195")))
    });
}

criterion_group!(benches, bench_extract, bench_render, bench_formatters);
criterion_main!(benches);
