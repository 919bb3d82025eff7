//! Sample documents for tests across the workspace.
//!
//! The shapes follow the authority's published JSON schema closely enough to
//! exercise the identification block; the monetary content is illustrative.
//!
//! # Example
//!
//! ```
//! use dte_core::{fixtures, DocumentType};
//!
//! let ccf = fixtures::artifact_for(DocumentType::CreditFiscalVoucher);
//! let ident = ccf.identification().unwrap();
//! assert_eq!(ident.document_type_code(), Some("03"));
//! assert!(!ident.is_contingency());
//! ```

use serde_json::{json, Value};

use crate::{Artifact, DocumentType};

/// Builds a fresh (not yet transmitted) document of the given type.
#[must_use]
pub fn artifact_for(document_type: DocumentType) -> Artifact {
    let code = document_type.code();
    let mut document = json!({
        "identificacion": identification(code),
        "emisor": {
            "nit": "06142803901121",
            "nrc": "2234567",
            "nombre": "Ferretería El Martillo, S.A. de C.V.",
            "codActividad": "46632",
            "descActividad": "Venta al por mayor de artículos de ferretería"
        },
        "receptor": {
            "nombre": "Cliente de Prueba",
            "correo": "cliente@example.com"
        },
        "cuerpoDocumento": [
            {
                "numItem": 1,
                "tipoItem": 1,
                "codigo": "COD1",
                "descripcion": "CODO PVC 3/4",
                "cantidad": 12,
                "uniMedida": 59,
                "precioUni": 0.65,
                "montoDescu": 0,
                "ventaNoSuj": 0,
                "ventaExenta": 0,
                "ventaGravada": 7.8
            }
        ],
        "resumen": {
            "totalGravada": 7.8,
            "subTotal": 7.8,
            "montoTotalOperacion": 7.8,
            "totalPagar": 7.8,
            "condicionOperacion": 1
        }
    });

    if document_type == DocumentType::CreditNote {
        document["documentoRelacionado"] = json!([{
            "tipoDocumento": "03",
            "tipoGeneracion": 2,
            "numeroDocumento": "5D1B4C1A-3E59-4F0A-9C7E-0D1E2F3A4B5C",
            "fechaEmision": "2024-02-28"
        }]);
    }

    Artifact::new(document)
}

/// A consumer invoice.
#[must_use]
pub fn invoice_artifact() -> Artifact {
    artifact_for(DocumentType::Invoice)
}

/// A fiscal-credit voucher.
#[must_use]
pub fn ccf_artifact() -> Artifact {
    artifact_for(DocumentType::CreditFiscalVoucher)
}

/// A credit note referencing a CCF.
#[must_use]
pub fn credit_note_artifact() -> Artifact {
    artifact_for(DocumentType::CreditNote)
}

/// A withholding voucher.
#[must_use]
pub fn retention_artifact() -> Artifact {
    artifact_for(DocumentType::Retention)
}

/// A document missing its identification block, as a buggy use case
/// might produce.
#[must_use]
pub fn artifact_without_identification() -> Artifact {
    Artifact::new(json!({
        "emisor": { "nit": "06142803901121" },
        "resumen": { "totalPagar": 1.0 }
    }))
}

fn identification(code: &str) -> Value {
    json!({
        "version": 3,
        "ambiente": "00",
        "tipoDte": code,
        "numeroControl": format!("DTE-{code}-M001P001-000000000000001"),
        "codigoGeneracion": "0F8FAD5B-D9CB-469F-A165-70867728950E",
        "tipoModelo": 1,
        "tipoOperacion": 1,
        "tipoContingencia": null,
        "motivoContin": null,
        "fecEmi": "2024-03-01",
        "horEmi": "10:15:00",
        "tipoMoneda": "USD"
    })
}
