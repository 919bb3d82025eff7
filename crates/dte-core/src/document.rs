//! The authority's document-type taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of electronic tax document, identified on the wire by a two-digit code.
///
/// The code is what the authority's schema carries in `identificacion.tipoDte`
/// and what the contingency classifier receives as the document type.
///
/// # Example
///
/// ```
/// use dte_core::DocumentType;
///
/// assert_eq!(DocumentType::CreditFiscalVoucher.code(), "03");
/// assert_eq!("05".parse::<DocumentType>().unwrap(), DocumentType::CreditNote);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
    /// Consumer invoice (Factura).
    #[serde(rename = "01")]
    Invoice,
    /// Fiscal-credit voucher (Comprobante de Crédito Fiscal, CCF).
    #[serde(rename = "03")]
    CreditFiscalVoucher,
    /// Credit note (Nota de Crédito).
    #[serde(rename = "05")]
    CreditNote,
    /// Debit note (Nota de Débito).
    #[serde(rename = "06")]
    DebitNote,
    /// Withholding voucher (Comprobante de Retención).
    #[serde(rename = "07")]
    Retention,
    /// Export invoice (Factura de Exportación).
    #[serde(rename = "11")]
    ExportInvoice,
    /// Excluded-subject invoice (Factura de Sujeto Excluido).
    #[serde(rename = "14")]
    ExcludedSubjectInvoice,
}

impl DocumentType {
    /// Every document type the authority defines, in code order.
    pub const ALL: [Self; 7] = [
        Self::Invoice,
        Self::CreditFiscalVoucher,
        Self::CreditNote,
        Self::DebitNote,
        Self::Retention,
        Self::ExportInvoice,
        Self::ExcludedSubjectInvoice,
    ];

    /// Returns the two-digit authority code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Invoice => "01",
            Self::CreditFiscalVoucher => "03",
            Self::CreditNote => "05",
            Self::DebitNote => "06",
            Self::Retention => "07",
            Self::ExportInvoice => "11",
            Self::ExcludedSubjectInvoice => "14",
        }
    }

    /// Returns a short human-readable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Invoice => "Factura Electrónica",
            Self::CreditFiscalVoucher => "Comprobante de Crédito Fiscal",
            Self::CreditNote => "Nota de Crédito",
            Self::DebitNote => "Nota de Débito",
            Self::Retention => "Comprobante de Retención",
            Self::ExportInvoice => "Factura de Exportación",
            Self::ExcludedSubjectInvoice => "Factura de Sujeto Excluido",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Returned when a string is not one of the authority's document-type codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown document type code: {0}")]
pub struct UnknownDocumentType(pub String);

impl FromStr for DocumentType {
    type Err = UnknownDocumentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == s)
            .ok_or_else(|| UnknownDocumentType(s.to_string()))
    }
}
