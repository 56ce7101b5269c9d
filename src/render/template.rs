//! DANFE template binding.

use super::barcode::barcode_data_uri;
use crate::core::{DanfeError, InvoiceRecord, ProductLine};

/// The DANFE page template, compiled in from its fixed location.
const TEMPLATE: &str = include_str!("../../templates/danfe.html");

const ROW_BEGIN: &str = "<!-- BEGIN products -->";
const ROW_END: &str = "<!-- END products -->";

/// Bind an [`InvoiceRecord`] into the DANFE template.
///
/// Placeholders are `{{field}}`, named after the record fields; the product
/// row fragment between the BEGIN/END markers repeats once per line item.
/// The `{{barcode}}` placeholder binds to the encoded access key (empty
/// string when the key is not 44 digits). Any placeholder left unbound
/// afterwards is a template configuration error, not a per-document one.
pub fn render_html(record: &InvoiceRecord) -> Result<String, DanfeError> {
    let (head, rest) = TEMPLATE
        .split_once(ROW_BEGIN)
        .ok_or_else(|| DanfeError::Template("product row begin marker missing".into()))?;
    let (row, tail) = rest
        .split_once(ROW_END)
        .ok_or_else(|| DanfeError::Template("product row end marker missing".into()))?;

    let barcode = barcode_data_uri(&record.access_key_raw);

    let mut html = String::with_capacity(TEMPLATE.len() + record.products.len() * row.len());
    html.push_str(&bind(head, &record_pairs(record, &barcode)));
    for product in &record.products {
        html.push_str(&bind(row, &product_pairs(product)));
    }
    html.push_str(&bind(tail, &record_pairs(record, &barcode)));

    if let Some(pos) = html.find("{{") {
        let end = html[pos..]
            .find("}}")
            .map(|e| pos + e + 2)
            .unwrap_or(html.len());
        return Err(DanfeError::Template(format!(
            "unbound placeholder {}",
            &html[pos..end]
        )));
    }
    Ok(html)
}

fn record_pairs<'a>(r: &'a InvoiceRecord, barcode: &'a str) -> Vec<(&'static str, &'a str)> {
    vec![
        ("access_key", &r.access_key),
        ("access_key_raw", &r.access_key_raw),
        ("barcode", barcode),
        ("operation_nature", &r.operation_nature),
        ("model", &r.model),
        ("series", &r.series),
        ("number", &r.number),
        ("operation_type", &r.operation_type),
        ("emission_date", &r.emission_date),
        ("exit_date", &r.exit_date),
        ("exit_time", &r.exit_time),
        ("protocol_number", &r.protocol_number),
        ("protocol_timestamp", &r.protocol_timestamp),
        ("issuer_name", &r.issuer_name),
        ("issuer_cnpj", &r.issuer_cnpj),
        ("issuer_ie", &r.issuer_ie),
        ("issuer_ie_st", &r.issuer_ie_st),
        ("issuer_address", &r.issuer_address),
        ("issuer_postal_code", &r.issuer_postal_code),
        ("issuer_phone", &r.issuer_phone),
        ("recipient_name", &r.recipient_name),
        ("recipient_document", &r.recipient_document),
        ("recipient_ie", &r.recipient_ie),
        ("recipient_street", &r.recipient_street),
        ("recipient_district", &r.recipient_district),
        ("recipient_city", &r.recipient_city),
        ("recipient_state", &r.recipient_state),
        ("recipient_postal_code", &r.recipient_postal_code),
        ("recipient_phone", &r.recipient_phone),
        ("icms_base", &r.icms_base),
        ("icms_value", &r.icms_value),
        ("icms_st_base", &r.icms_st_base),
        ("icms_st_value", &r.icms_st_value),
        ("products_total", &r.products_total),
        ("freight_total", &r.freight_total),
        ("insurance_total", &r.insurance_total),
        ("discount_total", &r.discount_total),
        ("ipi_total", &r.ipi_total),
        ("other_total", &r.other_total),
        ("invoice_total", &r.invoice_total),
        ("carrier_name", &r.carrier_name),
        ("carrier_document", &r.carrier_document),
        ("carrier_address", &r.carrier_address),
        ("carrier_city", &r.carrier_city),
        ("carrier_state", &r.carrier_state),
        ("carrier_ie", &r.carrier_ie),
        ("freight_mode", &r.freight_mode),
        ("volume_count", &r.volume_count),
        ("volume_species", &r.volume_species),
        ("gross_weight", &r.gross_weight),
        ("net_weight", &r.net_weight),
        ("additional_info", &r.additional_info),
    ]
}

fn product_pairs(p: &ProductLine) -> Vec<(&'static str, &str)> {
    vec![
        ("code", &p.code),
        ("description", &p.description),
        ("ncm", &p.ncm),
        ("cst", &p.cst),
        ("cfop", &p.cfop),
        ("unit", &p.unit),
        ("quantity", &p.quantity),
        ("unit_value", &p.unit_value),
        ("total_value", &p.total_value),
        ("icms_base", &p.icms_base),
        ("icms_value", &p.icms_value),
        ("icms_rate", &p.icms_rate),
        ("ipi_value", &p.ipi_value),
        ("ipi_rate", &p.ipi_rate),
    ]
}

fn bind(fragment: &str, pairs: &[(&'static str, &str)]) -> String {
    let mut out = fragment.to_string();
    for (name, value) in pairs {
        let needle = format!("{{{{{name}}}}}");
        if out.contains(&needle) {
            out = out.replace(&needle, &escape_html(value));
        }
    }
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            // braces in field text must not look like placeholders
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}
