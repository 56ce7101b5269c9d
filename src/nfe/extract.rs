use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

use super::taxes::{IcmsVariant, IpiVariant};
use crate::core::*;

/// Check whether an XML document contains the invoice root (`infNFe`).
///
/// Event envelopes (`procEventoNFe`, `resEvento`, …) and any other fiscal
/// XML without the element are not invoices. Tag lookup ignores namespace
/// prefixes. Parse errors end the scan; whatever was seen up to that point
/// decides.
pub fn is_invoice_document(xml: &str) -> bool {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if e.name().local_name().as_ref() == b"infNFe" {
                    return true;
                }
            }
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
    }
}

/// Extract one NFe document into a render-ready [`InvoiceRecord`].
///
/// The parser is lenient: namespace prefixes are stripped before tag
/// lookup, mismatched end tags are tolerated, and a parse error keeps the
/// fragments collected up to that point instead of aborting. Every leaf
/// field is optional — absence yields the formatted default. Only total
/// absence of the `infNFe` root is an error.
///
/// `fallback_key` (usually the source filename stem) substitutes for the
/// access key when the `infNFe` identifier attribute is missing.
pub fn extract_invoice(xml: &str, fallback_key: &str) -> Result<InvoiceRecord, DanfeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut p = NfeParsed::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                p.handle_open(&name, e.attributes().flatten());
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                p.handle_open(&name, e.attributes().flatten());
            }
            Ok(Event::Text(ref e)) => {
                let text = match e.unescape() {
                    Ok(t) => t.into_owned(),
                    // Broken entities: keep the raw bytes.
                    Err(_) => String::from_utf8_lossy(e).into_owned(),
                };
                if !text.is_empty() {
                    p.handle_text(&path, &text);
                }
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).into_owned();
                let text = text.trim();
                if !text.is_empty() {
                    p.handle_text(&path, text);
                }
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().unwrap_or_default();
                if ended == "det" {
                    if let Some(det) = p.current_det.take() {
                        p.dets.push(det);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "NFe parse error, keeping fragments collected so far");
                break;
            }
            _ => {}
        }
    }

    if !p.seen_inf_nfe {
        return Err(DanfeError::Extraction("no invoice node found".into()));
    }
    Ok(p.into_record(fallback_key))
}

/// Accumulator for one NFe document, filled by the event loop.
#[derive(Default)]
struct NfeParsed {
    seen_inf_nfe: bool,
    access_key: Option<String>,

    operation_nature: Option<String>,
    model: Option<String>,
    series: Option<String>,
    number: Option<String>,
    operation_type: Option<String>,
    emitted_at: Option<String>,
    exited_at: Option<String>,
    protocol_number: Option<String>,
    protocol_received_at: Option<String>,

    issuer_name: Option<String>,
    issuer_cnpj: Option<String>,
    issuer_ie: Option<String>,
    issuer_ie_st: Option<String>,
    issuer_street: Option<String>,
    issuer_number: Option<String>,
    issuer_complement: Option<String>,
    issuer_district: Option<String>,
    issuer_city: Option<String>,
    issuer_state: Option<String>,
    issuer_cep: Option<String>,
    issuer_phone: Option<String>,

    recipient_present: bool,
    recipient_name: Option<String>,
    recipient_cnpj: Option<String>,
    recipient_cpf: Option<String>,
    recipient_ie: Option<String>,
    recipient_street: Option<String>,
    recipient_number: Option<String>,
    recipient_district: Option<String>,
    recipient_city: Option<String>,
    recipient_state: Option<String>,
    recipient_cep: Option<String>,
    recipient_phone: Option<String>,

    total_icms_base: Option<String>,
    total_icms: Option<String>,
    total_icms_st_base: Option<String>,
    total_icms_st: Option<String>,
    total_products: Option<String>,
    total_freight: Option<String>,
    total_insurance: Option<String>,
    total_discount: Option<String>,
    total_ipi: Option<String>,
    total_other: Option<String>,
    total_invoice: Option<String>,

    freight_mode: Option<String>,
    carrier_name: Option<String>,
    carrier_cnpj: Option<String>,
    carrier_cpf: Option<String>,
    carrier_address: Option<String>,
    carrier_city: Option<String>,
    carrier_state: Option<String>,
    carrier_ie: Option<String>,
    volume_count: Option<String>,
    volume_species: Option<String>,
    gross_weight: Option<String>,
    net_weight: Option<String>,

    additional_info: Option<String>,

    dets: Vec<DetParsed>,
    current_det: Option<DetParsed>,
}

/// Accumulator for one `det` line item.
#[derive(Default, Clone)]
struct DetParsed {
    code: Option<String>,
    description: Option<String>,
    ncm: Option<String>,
    cfop: Option<String>,
    unit: Option<String>,
    quantity: Option<String>,
    unit_value: Option<String>,
    total_value: Option<String>,

    icms_tag: Option<String>,
    icms_cst: Option<String>,
    icms_csosn: Option<String>,
    icms_base: Option<String>,
    icms_value: Option<String>,
    icms_rate: Option<String>,

    ipi_tag: Option<String>,
    ipi_value: Option<String>,
    ipi_rate: Option<String>,
}

impl NfeParsed {
    /// React to an opening tag: root detection, access key, block markers.
    fn handle_open<'a>(
        &mut self,
        name: &str,
        attrs: impl Iterator<Item = quick_xml::events::attributes::Attribute<'a>>,
    ) {
        match name {
            "infNFe" => {
                self.seen_inf_nfe = true;
                for attr in attrs {
                    if attr.key.local_name().as_ref() == b"Id" {
                        let value = String::from_utf8_lossy(&attr.value).into_owned();
                        // "NFe" prefix before the 44 digits
                        if let Some(key) = value.get(3..).filter(|k| !k.is_empty()) {
                            self.access_key = Some(key.to_string());
                        }
                    }
                }
            }
            "dest" => self.recipient_present = true,
            "det" => self.current_det = Some(DetParsed::default()),
            _ => {}
        }
    }

    fn handle_text(&mut self, path: &[String], text: &str) {
        let leaf = path.last().map(|s| s.as_str()).unwrap_or("");
        let parent = if path.len() >= 2 {
            path[path.len() - 2].as_str()
        } else {
            ""
        };

        // Line items first: `det` nests its own vBC/vICMS/vProd leaves that
        // must not bleed into the document-level blocks.
        if self.current_det.is_some() {
            self.handle_det_text(path, leaf, parent, text);
            return;
        }

        let set = |slot: &mut Option<String>| *slot = Some(text.to_string());

        if parent == "ide" {
            match leaf {
                "natOp" => set(&mut self.operation_nature),
                "mod" => set(&mut self.model),
                "serie" => set(&mut self.series),
                "nNF" => set(&mut self.number),
                "tpNF" => set(&mut self.operation_type),
                "dhEmi" => set(&mut self.emitted_at),
                "dhSaiEnt" => set(&mut self.exited_at),
                _ => {}
            }
            return;
        }

        if path.iter().any(|p| p == "infProt") {
            match leaf {
                "nProt" => set(&mut self.protocol_number),
                "dhRecbto" => set(&mut self.protocol_received_at),
                _ => {}
            }
            return;
        }

        if path.iter().any(|p| p == "emit") {
            match leaf {
                "xNome" if parent == "emit" => set(&mut self.issuer_name),
                "CNPJ" if parent == "emit" => set(&mut self.issuer_cnpj),
                "IE" if parent == "emit" => set(&mut self.issuer_ie),
                "IEST" if parent == "emit" => set(&mut self.issuer_ie_st),
                "xLgr" => set(&mut self.issuer_street),
                "nro" => set(&mut self.issuer_number),
                "xCpl" => set(&mut self.issuer_complement),
                "xBairro" => set(&mut self.issuer_district),
                "xMun" => set(&mut self.issuer_city),
                "UF" => set(&mut self.issuer_state),
                "CEP" => set(&mut self.issuer_cep),
                "fone" => set(&mut self.issuer_phone),
                _ => {}
            }
            return;
        }

        if path.iter().any(|p| p == "dest") {
            match leaf {
                "xNome" if parent == "dest" => set(&mut self.recipient_name),
                "CNPJ" if parent == "dest" => set(&mut self.recipient_cnpj),
                "CPF" if parent == "dest" => set(&mut self.recipient_cpf),
                "IE" if parent == "dest" => set(&mut self.recipient_ie),
                "xLgr" => set(&mut self.recipient_street),
                "nro" => set(&mut self.recipient_number),
                "xBairro" => set(&mut self.recipient_district),
                "xMun" => set(&mut self.recipient_city),
                "UF" => set(&mut self.recipient_state),
                "CEP" => set(&mut self.recipient_cep),
                "fone" => set(&mut self.recipient_phone),
                _ => {}
            }
            return;
        }

        if path.iter().any(|p| p == "ICMSTot") {
            match leaf {
                "vBC" => set(&mut self.total_icms_base),
                "vICMS" => set(&mut self.total_icms),
                "vBCST" => set(&mut self.total_icms_st_base),
                "vST" => set(&mut self.total_icms_st),
                "vProd" => set(&mut self.total_products),
                "vFrete" => set(&mut self.total_freight),
                "vSeg" => set(&mut self.total_insurance),
                "vDesc" => set(&mut self.total_discount),
                "vIPI" => set(&mut self.total_ipi),
                "vOutro" => set(&mut self.total_other),
                "vNF" => set(&mut self.total_invoice),
                _ => {}
            }
            return;
        }

        if path.iter().any(|p| p == "transp") {
            match leaf {
                "modFrete" => set(&mut self.freight_mode),
                "xNome" if parent == "transporta" => set(&mut self.carrier_name),
                "CNPJ" if parent == "transporta" => set(&mut self.carrier_cnpj),
                "CPF" if parent == "transporta" => set(&mut self.carrier_cpf),
                "xEnder" => set(&mut self.carrier_address),
                "xMun" if parent == "transporta" => set(&mut self.carrier_city),
                "UF" if parent == "transporta" => set(&mut self.carrier_state),
                "IE" if parent == "transporta" => set(&mut self.carrier_ie),
                "qVol" => set(&mut self.volume_count),
                "esp" => set(&mut self.volume_species),
                "pesoB" => set(&mut self.gross_weight),
                "pesoL" => set(&mut self.net_weight),
                _ => {}
            }
            return;
        }

        if leaf == "infCpl" && parent == "infAdic" {
            set(&mut self.additional_info);
        }
    }

    fn handle_det_text(&mut self, path: &[String], leaf: &str, parent: &str, text: &str) {
        let Some(det) = self.current_det.as_mut() else {
            return;
        };
        let set = |slot: &mut Option<String>| *slot = Some(text.to_string());

        if parent == "prod" {
            match leaf {
                "cProd" => set(&mut det.code),
                "xProd" => set(&mut det.description),
                "NCM" => set(&mut det.ncm),
                "CFOP" => set(&mut det.cfop),
                "uCom" => set(&mut det.unit),
                "qCom" => set(&mut det.quantity),
                "vUnCom" => set(&mut det.unit_value),
                "vProd" => set(&mut det.total_value),
                _ => {}
            }
            return;
        }

        if let Some(variant) = variant_under(path, "ICMS") {
            det.icms_tag = Some(variant.to_string());
            match leaf {
                "CST" => set(&mut det.icms_cst),
                "CSOSN" => set(&mut det.icms_csosn),
                "vBC" => set(&mut det.icms_base),
                "vICMS" => set(&mut det.icms_value),
                "pICMS" => set(&mut det.icms_rate),
                _ => {}
            }
            return;
        }

        if let Some(variant) = variant_under(path, "IPI") {
            det.ipi_tag = Some(variant.to_string());
            match leaf {
                "vIPI" => set(&mut det.ipi_value),
                "pIPI" => set(&mut det.ipi_rate),
                _ => {}
            }
        }
    }

    fn into_record(self, fallback_key: &str) -> InvoiceRecord {
        let access_key_raw = self
            .access_key
            .unwrap_or_else(|| fallback_key.to_string());

        let emission_date = display_date(self.emitted_at.as_deref().unwrap_or(""));
        let exited_at = self.exited_at.unwrap_or_default();
        let exit_date = display_date(&exited_at);
        let exit_time = display_time(&exited_at);

        let issuer_address = compose_issuer_address(
            self.issuer_street.as_deref().unwrap_or(""),
            self.issuer_number.as_deref().unwrap_or(""),
            self.issuer_complement.as_deref().unwrap_or(""),
            self.issuer_district.as_deref().unwrap_or(""),
            self.issuer_city.as_deref().unwrap_or(""),
            self.issuer_state.as_deref().unwrap_or(""),
        );

        let recipient_name = if self.recipient_present {
            self.recipient_name.unwrap_or_default()
        } else {
            "CONSUMIDOR".to_string()
        };
        // CNPJ wins when both documents occur
        let recipient_document = format_document(
            &self
                .recipient_cnpj
                .or(self.recipient_cpf)
                .unwrap_or_default(),
        );
        let recipient_street = compose_street(
            self.recipient_street.as_deref().unwrap_or(""),
            self.recipient_number.as_deref().unwrap_or(""),
        );

        let carrier_document = format_document(
            &self.carrier_cnpj.or(self.carrier_cpf).unwrap_or_default(),
        );
        let freight_mode =
            FreightMode::from_code(self.freight_mode.as_deref().unwrap_or(""))
                .label()
                .to_string();

        let mut products = Vec::with_capacity(self.dets.len());
        for det in self.dets {
            let (cst, icms_base, icms_value, icms_rate) = match det.icms_tag {
                Some(tag) => {
                    let variant = IcmsVariant::from_parts(
                        &tag,
                        det.icms_cst,
                        det.icms_csosn,
                        det.icms_base,
                        det.icms_value,
                        det.icms_rate,
                    );
                    let code = variant.situation_code().to_string();
                    let (base, value, rate) = variant.display_fields();
                    (code, base, value, rate)
                }
                None => (
                    String::new(),
                    "0,00".to_string(),
                    "0,00".to_string(),
                    "0,00".to_string(),
                ),
            };
            let (ipi_value, ipi_rate) = match det.ipi_tag {
                Some(tag) => {
                    IpiVariant::from_parts(&tag, det.ipi_value, det.ipi_rate).display_fields()
                }
                None => ("0,00".to_string(), "0,00".to_string()),
            };

            products.push(ProductLine {
                code: det.code.unwrap_or_default(),
                description: det.description.unwrap_or_default(),
                ncm: det.ncm.unwrap_or_default(),
                cst,
                cfop: det.cfop.unwrap_or_default(),
                unit: det.unit.unwrap_or_default(),
                quantity: format_quantity(det.quantity.as_deref().unwrap_or("")),
                unit_value: format_currency(det.unit_value.as_deref().unwrap_or("")),
                total_value: format_currency(det.total_value.as_deref().unwrap_or("")),
                icms_base,
                icms_value,
                icms_rate,
                ipi_value,
                ipi_rate,
            });
        }

        InvoiceRecord {
            access_key: format_access_key(&access_key_raw),
            access_key_raw,
            operation_nature: self.operation_nature.unwrap_or_default(),
            model: self.model.unwrap_or_default(),
            series: self.series.unwrap_or_default(),
            number: self.number.unwrap_or_default(),
            operation_type: self.operation_type.unwrap_or_default(),
            emission_date,
            exit_date,
            exit_time,
            protocol_number: self.protocol_number.unwrap_or_default(),
            protocol_timestamp: self.protocol_received_at.unwrap_or_default(),
            issuer_name: self.issuer_name.unwrap_or_default(),
            issuer_cnpj: format_document(self.issuer_cnpj.as_deref().unwrap_or("")),
            issuer_ie: self.issuer_ie.unwrap_or_default(),
            issuer_ie_st: self.issuer_ie_st.unwrap_or_default(),
            issuer_address,
            issuer_postal_code: format_postal_code(self.issuer_cep.as_deref().unwrap_or("")),
            issuer_phone: format_phone(self.issuer_phone.as_deref().unwrap_or("")),
            recipient_name,
            recipient_document,
            recipient_ie: self.recipient_ie.unwrap_or_default(),
            recipient_street,
            recipient_district: self.recipient_district.unwrap_or_default(),
            recipient_city: self.recipient_city.unwrap_or_default(),
            recipient_state: self.recipient_state.unwrap_or_default(),
            recipient_postal_code: format_postal_code(
                self.recipient_cep.as_deref().unwrap_or(""),
            ),
            recipient_phone: format_phone(self.recipient_phone.as_deref().unwrap_or("")),
            icms_base: format_currency(self.total_icms_base.as_deref().unwrap_or("")),
            icms_value: format_currency(self.total_icms.as_deref().unwrap_or("")),
            icms_st_base: format_currency(self.total_icms_st_base.as_deref().unwrap_or("")),
            icms_st_value: format_currency(self.total_icms_st.as_deref().unwrap_or("")),
            products_total: format_currency(self.total_products.as_deref().unwrap_or("")),
            freight_total: format_currency(self.total_freight.as_deref().unwrap_or("")),
            insurance_total: format_currency(self.total_insurance.as_deref().unwrap_or("")),
            discount_total: format_currency(self.total_discount.as_deref().unwrap_or("")),
            ipi_total: format_currency(self.total_ipi.as_deref().unwrap_or("")),
            other_total: format_currency(self.total_other.as_deref().unwrap_or("")),
            invoice_total: format_currency(self.total_invoice.as_deref().unwrap_or("")),
            carrier_name: self.carrier_name.unwrap_or_default(),
            carrier_document,
            carrier_address: self.carrier_address.unwrap_or_default(),
            carrier_city: self.carrier_city.unwrap_or_default(),
            carrier_state: self.carrier_state.unwrap_or_default(),
            carrier_ie: self.carrier_ie.unwrap_or_default(),
            freight_mode,
            volume_count: self.volume_count.unwrap_or_default(),
            volume_species: self.volume_species.unwrap_or_default(),
            gross_weight: format_quantity(self.gross_weight.as_deref().unwrap_or("")),
            net_weight: format_quantity(self.net_weight.as_deref().unwrap_or("")),
            additional_info: self.additional_info.unwrap_or_default(),
            products,
        }
    }
}

/// The variant tag under a tax wrapper, when `leaf` sits inside one.
///
/// For a path like `det/imposto/ICMS/ICMS00/vICMS` and group "ICMS" this
/// returns "ICMS00". The wrapper is matched by substring because
/// interstate forms (`ICMSUFDest`) share the prefix.
fn variant_under<'a>(path: &'a [String], group: &str) -> Option<&'a str> {
    let imposto = path.iter().position(|p| p == "imposto")?;
    let wrapper = path.get(imposto + 1)?;
    if !wrapper.contains(group) {
        return None;
    }
    // the leaf must sit strictly inside the variant element
    if path.len() <= imposto + 3 {
        return None;
    }
    path.get(imposto + 2).map(|s| s.as_str())
}

/// First 10 characters of an ISO timestamp as dd/mm/yyyy, or empty.
fn display_date(raw: &str) -> String {
    let Some(date_part) = raw.get(..10) else {
        return String::new();
    };
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(d) => d.format("%d/%m/%Y").to_string(),
        Err(_) => String::new(),
    }
}

/// Characters 11–19 of an ISO timestamp (HH:MM:SS), or empty.
fn display_time(raw: &str) -> String {
    if raw.len() <= 11 {
        return String::new();
    }
    raw.get(11..19)
        .or_else(|| raw.get(11..))
        .unwrap_or("")
        .to_string()
}

fn compose_street(street: &str, number: &str) -> String {
    if street.is_empty() && number.is_empty() {
        String::new()
    } else {
        format!("{street}, {number}")
    }
}

fn compose_issuer_address(
    street: &str,
    number: &str,
    complement: &str,
    district: &str,
    city: &str,
    state: &str,
) -> String {
    if [street, number, complement, district, city, state]
        .iter()
        .all(|s| s.is_empty())
    {
        return String::new();
    }
    let mut address = format!("{street}, {number}");
    if !complement.is_empty() {
        address.push(' ');
        address.push_str(complement);
    }
    format!("{address} - {district} - {city} - {state}")
}
