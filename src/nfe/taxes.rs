//! Regime-specific tax variant groups.
//!
//! Under `det/imposto` the ICMS and IPI amounts live inside exactly one
//! variant sub-element whose tag name encodes the tax regime
//! (`ICMS00`, `ICMSSN102`, `IPITrib`, …). The variants are modeled as
//! tagged unions with a defensive arm for tags the known lists miss.

use crate::core::format_currency;

/// Normal-regime ICMS variant tags.
const ICMS_REGULAR_TAGS: &[&str] = &[
    "ICMS00", "ICMS02", "ICMS10", "ICMS15", "ICMS20", "ICMS30", "ICMS40", "ICMS51",
    "ICMS53", "ICMS60", "ICMS61", "ICMS70", "ICMS90", "ICMSPart", "ICMSST",
];

/// ICMS variant found under the line-item tax block.
#[derive(Debug, Clone, PartialEq)]
pub enum IcmsVariant {
    /// Normal regime (`ICMS00`..`ICMS90`, partilha and ST forms); carries a CST.
    Regular {
        cst: String,
        base: String,
        value: String,
        rate: String,
    },
    /// Simples Nacional (`ICMSSN101`..`ICMSSN900`); carries a CSOSN.
    SimplesNacional {
        csosn: String,
        base: String,
        value: String,
        rate: String,
    },
    /// Unrecognized variant tag; values extracted defensively.
    Other {
        base: String,
        value: String,
        rate: String,
    },
}

impl IcmsVariant {
    /// Classify a variant from its tag name and raw field values.
    pub fn from_parts(
        tag: &str,
        cst: Option<String>,
        csosn: Option<String>,
        base: Option<String>,
        value: Option<String>,
        rate: Option<String>,
    ) -> Self {
        let base = base.unwrap_or_default();
        let value = value.unwrap_or_default();
        let rate = rate.unwrap_or_default();
        if tag.starts_with("ICMSSN") {
            IcmsVariant::SimplesNacional {
                csosn: csosn.unwrap_or_default(),
                base,
                value,
                rate,
            }
        } else if ICMS_REGULAR_TAGS.contains(&tag) {
            IcmsVariant::Regular {
                cst: cst.unwrap_or_default(),
                base,
                value,
                rate,
            }
        } else {
            IcmsVariant::Other { base, value, rate }
        }
    }

    /// The tax situation code for display: CST, CSOSN, or empty.
    pub fn situation_code(&self) -> &str {
        match self {
            IcmsVariant::Regular { cst, .. } => cst,
            IcmsVariant::SimplesNacional { csosn, .. } => csosn,
            IcmsVariant::Other { .. } => "",
        }
    }

    /// Display-formatted (base, value, rate), absent fields as "0,00".
    pub fn display_fields(&self) -> (String, String, String) {
        let (base, value, rate) = match self {
            IcmsVariant::Regular {
                base, value, rate, ..
            }
            | IcmsVariant::SimplesNacional {
                base, value, rate, ..
            }
            | IcmsVariant::Other { base, value, rate } => (base, value, rate),
        };
        (
            format_currency(base),
            format_currency(value),
            format_currency(rate),
        )
    }
}

/// IPI variant found under the line-item tax block.
#[derive(Debug, Clone, PartialEq)]
pub enum IpiVariant {
    /// Taxed (`IPITrib`); carries an amount and a rate.
    Taxed { value: String, rate: String },
    /// Non-taxed (`IPINT`); no amounts.
    NonTaxed,
    /// Unrecognized variant tag; values extracted defensively.
    Other { value: String, rate: String },
}

impl IpiVariant {
    /// Classify a variant from its tag name and raw field values.
    pub fn from_parts(tag: &str, value: Option<String>, rate: Option<String>) -> Self {
        match tag {
            "IPITrib" => IpiVariant::Taxed {
                value: value.unwrap_or_default(),
                rate: rate.unwrap_or_default(),
            },
            "IPINT" => IpiVariant::NonTaxed,
            _ => IpiVariant::Other {
                value: value.unwrap_or_default(),
                rate: rate.unwrap_or_default(),
            },
        }
    }

    /// Display-formatted (value, rate), absent fields as "0,00".
    pub fn display_fields(&self) -> (String, String) {
        match self {
            IpiVariant::Taxed { value, rate } | IpiVariant::Other { value, rate } => {
                (format_currency(value), format_currency(rate))
            }
            IpiVariant::NonTaxed => ("0,00".to_string(), "0,00".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_variant_carries_cst() {
        let v = IcmsVariant::from_parts(
            "ICMS00",
            Some("00".into()),
            None,
            Some("100.00".into()),
            Some("18.00".into()),
            Some("18.00".into()),
        );
        assert_eq!(v.situation_code(), "00");
        assert_eq!(
            v.display_fields(),
            ("100,00".into(), "18,00".into(), "18,00".into())
        );
    }

    #[test]
    fn simples_variant_carries_csosn() {
        let v = IcmsVariant::from_parts("ICMSSN102", None, Some("102".into()), None, None, None);
        assert_eq!(v.situation_code(), "102");
        assert_eq!(
            v.display_fields(),
            ("0,00".into(), "0,00".into(), "0,00".into())
        );
    }

    #[test]
    fn unknown_variant_extracts_defensively() {
        let v = IcmsVariant::from_parts("ICMS99", None, None, Some("5".into()), None, None);
        assert!(matches!(v, IcmsVariant::Other { .. }));
        assert_eq!(v.situation_code(), "");
        assert_eq!(v.display_fields().0, "5,00");
    }

    #[test]
    fn ipi_non_taxed_zeroes() {
        let v = IpiVariant::from_parts("IPINT", None, None);
        assert_eq!(v.display_fields(), ("0,00".into(), "0,00".into()));
    }

    #[test]
    fn ipi_taxed_formats() {
        let v = IpiVariant::from_parts("IPITrib", Some("12.3".into()), Some("10".into()));
        assert_eq!(v.display_fields(), ("12,30".into(), "10,00".into()));
    }
}
