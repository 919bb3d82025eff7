//! Kind catalog served at `GET {base_path}/dte/kinds`.

use dte_dispatch::{DocumentKindDescriptor, Registry};
use serde::Serialize;

/// One registered document kind as seen by clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KindSummary {
    /// Normalized route key.
    pub route_key: String,
    /// Two-digit document type code.
    pub document_type: &'static str,
    /// Human title.
    pub title: String,
    /// Human description, empty when none was set.
    pub description: String,
    /// Whether a transmission failure may fall back to contingency.
    pub allows_contingency: bool,
    /// Name of the request type the body decodes into.
    pub request_shape: &'static str,
}

impl From<&DocumentKindDescriptor> for KindSummary {
    fn from(descriptor: &DocumentKindDescriptor) -> Self {
        Self {
            route_key: descriptor.route_key().to_string(),
            document_type: descriptor.document_type().code(),
            title: descriptor.title().to_string(),
            description: descriptor.description().to_string(),
            allows_contingency: descriptor.allows_contingency(),
            request_shape: descriptor.request_shape(),
        }
    }
}

/// Lists the registered kinds in route-key order.
#[must_use]
pub fn catalog(registry: &Registry) -> Vec<KindSummary> {
    registry.descriptors().map(KindSummary::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dte_core::{
        fixtures, DocumentType, FnUseCase, RequestContext, ResponseOptions, SubmissionOutcome,
    };
    use dte_dispatch::RegistryBuilder;

    fn descriptor(document_type: DocumentType) -> DocumentKindDescriptor {
        DocumentKindDescriptor::new(
            document_type,
            FnUseCase::new(move |_ctx: RequestContext, _req: serde_json::Value| async move {
                SubmissionOutcome::accepted(
                    fixtures::artifact_for(document_type),
                    ResponseOptions::new(),
                )
            }),
        )
    }

    #[test]
    fn test_catalog_in_route_key_order() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("retention", descriptor(DocumentType::Retention))
            .unwrap()
            .register(
                "ccf",
                descriptor(DocumentType::CreditFiscalVoucher)
                    .allow_contingency(true)
                    .with_description("Comprobante de crédito fiscal"),
            )
            .unwrap();
        let registry = builder.build();

        let kinds = catalog(&registry);
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0].route_key, "ccf");
        assert_eq!(kinds[0].document_type, "03");
        assert!(kinds[0].allows_contingency);
        assert_eq!(kinds[0].description, "Comprobante de crédito fiscal");
        assert_eq!(kinds[1].route_key, "retention");
        assert!(!kinds[1].allows_contingency);
        assert!(kinds[1].request_shape.ends_with("Value"));
    }

    #[test]
    fn test_empty_registry() {
        assert!(catalog(&RegistryBuilder::new().build()).is_empty());
    }
}
