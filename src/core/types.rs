use serde::{Deserialize, Serialize};

/// The render-ready representation of one NFe.
///
/// Every field is already display-formatted: monetary values carry the
/// Brazilian convention ("1.234,50"), documents are masked, dates are
/// dd/mm/yyyy. Field names double as the placeholder names of the DANFE
/// template. A record is built fresh per XML document, consumed by the
/// renderer, and discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Access key in space-grouped display form ("3520 0714 …").
    pub access_key: String,
    /// Raw 44-digit access key, or the source filename stem when the
    /// `infNFe` identifier attribute is absent.
    pub access_key_raw: String,

    /// Nature of the operation (`natOp`).
    pub operation_nature: String,
    /// Fiscal model (`mod`), "55" for NFe.
    pub model: String,
    /// Series (`serie`).
    pub series: String,
    /// Invoice number (`nNF`).
    pub number: String,
    /// Operation type (`tpNF`): "0" entrada, "1" saída.
    pub operation_type: String,
    /// Emission date as dd/mm/yyyy (`dhEmi`).
    pub emission_date: String,
    /// Exit/entry date as dd/mm/yyyy (`dhSaiEnt`).
    pub exit_date: String,
    /// Exit/entry time as HH:MM:SS (`dhSaiEnt`).
    pub exit_time: String,
    /// Authorization protocol number (`nProt`).
    pub protocol_number: String,
    /// Authorization protocol timestamp (`dhRecbto`).
    pub protocol_timestamp: String,

    /// Issuer name (`emit/xNome`).
    pub issuer_name: String,
    /// Issuer CNPJ, masked.
    pub issuer_cnpj: String,
    /// Issuer state registration (`IE`).
    pub issuer_ie: String,
    /// Issuer substitute state registration (`IEST`).
    pub issuer_ie_st: String,
    /// Issuer address composed as "street, number complement - district - city - UF".
    pub issuer_address: String,
    /// Issuer postal code, masked ("01310-100").
    pub issuer_postal_code: String,
    /// Issuer phone, masked ("(11) 3456-7890").
    pub issuer_phone: String,

    /// Recipient name; "CONSUMIDOR" when the `dest` block is absent.
    pub recipient_name: String,
    /// Recipient document, masked. CNPJ preferred over CPF when both occur.
    pub recipient_document: String,
    /// Recipient state registration.
    pub recipient_ie: String,
    /// Recipient street and number ("xLgr, nro").
    pub recipient_street: String,
    /// Recipient district (`xBairro`).
    pub recipient_district: String,
    /// Recipient municipality (`xMun`).
    pub recipient_city: String,
    /// Recipient state (`UF`).
    pub recipient_state: String,
    /// Recipient postal code, masked.
    pub recipient_postal_code: String,
    /// Recipient phone, masked.
    pub recipient_phone: String,

    /// ICMS calculation base (`vBC`).
    pub icms_base: String,
    /// ICMS amount (`vICMS`).
    pub icms_value: String,
    /// ICMS-ST calculation base (`vBCST`).
    pub icms_st_base: String,
    /// ICMS-ST amount (`vST`).
    pub icms_st_value: String,
    /// Total product value (`vProd`).
    pub products_total: String,
    /// Freight (`vFrete`).
    pub freight_total: String,
    /// Insurance (`vSeg`).
    pub insurance_total: String,
    /// Discount (`vDesc`).
    pub discount_total: String,
    /// IPI amount (`vIPI`).
    pub ipi_total: String,
    /// Other costs (`vOutro`).
    pub other_total: String,
    /// Grand total (`vNF`).
    pub invoice_total: String,

    /// Carrier name (`transporta/xNome`).
    pub carrier_name: String,
    /// Carrier document, masked.
    pub carrier_document: String,
    /// Carrier address (`xEnder`).
    pub carrier_address: String,
    /// Carrier municipality.
    pub carrier_city: String,
    /// Carrier state.
    pub carrier_state: String,
    /// Carrier state registration.
    pub carrier_ie: String,
    /// Freight responsibility label ("0 - Emitente", "1 - Destinatário", "9 - Sem Frete").
    pub freight_mode: String,
    /// Volume count (`qVol`).
    pub volume_count: String,
    /// Volume species (`esp`).
    pub volume_species: String,
    /// Gross weight (`pesoB`), quantity-formatted.
    pub gross_weight: String,
    /// Net weight (`pesoL`), quantity-formatted.
    pub net_weight: String,

    /// Free-text additional information (`infAdic/infCpl`).
    pub additional_info: String,

    /// Line items in document order.
    pub products: Vec<ProductLine>,
}

impl InvoiceRecord {
    /// Year and month used for output-folder routing, derived from the
    /// display emission date. Missing or malformed dates degrade to
    /// `("0000", "00")`.
    pub fn routing_period(&self) -> (String, String) {
        let mut parts = self.emission_date.split('/');
        if let (Some(d), Some(m), Some(y)) = (parts.next(), parts.next(), parts.next()) {
            let all_digits =
                |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
            if all_digits(d) && all_digits(m) && y.len() == 4 && all_digits(y) {
                return (y.to_string(), m.to_string());
            }
        }
        ("0000".to_string(), "00".to_string())
    }
}

/// One DANFE product row with its per-line tax breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
    /// Product code (`cProd`).
    pub code: String,
    /// Product description (`xProd`).
    pub description: String,
    /// Mercosur classification (`NCM`).
    pub ncm: String,
    /// Tax situation: CST (normal regime) or CSOSN (Simples Nacional),
    /// whichever the matched ICMS variant carries.
    pub cst: String,
    /// Fiscal operation code (`CFOP`).
    pub cfop: String,
    /// Commercial unit (`uCom`).
    pub unit: String,
    /// Quantity (`qCom`): integer display when whole, else two decimals.
    pub quantity: String,
    /// Unit value (`vUnCom`).
    pub unit_value: String,
    /// Line total (`vProd`).
    pub total_value: String,
    /// Per-line ICMS base.
    pub icms_base: String,
    /// Per-line ICMS amount.
    pub icms_value: String,
    /// Per-line ICMS rate.
    pub icms_rate: String,
    /// Per-line IPI amount.
    pub ipi_value: String,
    /// Per-line IPI rate.
    pub ipi_rate: String,
}

/// Freight responsibility (`modFrete`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreightMode {
    /// Freight paid by the issuer (code 0).
    Issuer,
    /// Freight paid by the recipient (code 1).
    Recipient,
    /// No freight (code 9).
    None,
}

impl FreightMode {
    /// Classify the `modFrete` code. Anything unrecognized means no freight.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "0" => FreightMode::Issuer,
            "1" => FreightMode::Recipient,
            _ => FreightMode::None,
        }
    }

    /// The DANFE display label.
    pub fn label(&self) -> &'static str {
        match self {
            FreightMode::Issuer => "0 - Emitente",
            FreightMode::Recipient => "1 - Destinatário",
            FreightMode::None => "9 - Sem Frete",
        }
    }
}
