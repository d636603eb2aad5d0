//! Strategies for turning a dataset descriptor into a provider method.

use std::sync::Arc;

use crate::definition::DataSetDescriptor;
use crate::error::{GenerateError, LookupMiss};
use crate::provider::{ProviderMethod, ProviderRegistry, ProviderType};

/// A provider method located for a dataset.
#[derive(Clone, Debug)]
pub struct ResolvedMethod {
    /// Type declaring the method.
    pub provider: Arc<ProviderType>,
    /// The method itself.
    pub method: Arc<ProviderMethod>,
}

/// Locates the provider method named by a dataset descriptor.
///
/// Implementations must be stateless: the same registry and descriptor
/// always yield the same method.
pub trait ProviderResolver: Send + Sync {
    /// Resolves `descriptor` against `registry`.
    fn resolve(
        &self,
        registry: &ProviderRegistry,
        descriptor: &DataSetDescriptor,
    ) -> Result<ResolvedMethod, GenerateError>;
}

/// Matches methods whose canonical signature equals the declared signature
/// string exactly. The first matching method wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureResolver;

impl ProviderResolver for SignatureResolver {
    fn resolve(
        &self,
        registry: &ProviderRegistry,
        descriptor: &DataSetDescriptor,
    ) -> Result<ResolvedMethod, GenerateError> {
        let provider = lookup_type(registry, descriptor)?;
        let method = provider
            .methods()
            .iter()
            .find(|method| method.signature() == descriptor.method_signature)
            .ok_or_else(|| not_found(descriptor, LookupMiss::Method))?;

        Ok(ResolvedMethod {
            provider: Arc::clone(provider),
            method: Arc::clone(method),
        })
    }
}

/// Matches on method name and parameter type list, ignoring whitespace and
/// the declared return type.
///
/// Useful when definitions were authored by hand and the signature text does
/// not follow the canonical spacing.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralResolver;

impl ProviderResolver for StructuralResolver {
    fn resolve(
        &self,
        registry: &ProviderRegistry,
        descriptor: &DataSetDescriptor,
    ) -> Result<ResolvedMethod, GenerateError> {
        let provider = lookup_type(registry, descriptor)?;
        let wanted = ParsedSignature::parse(&descriptor.method_signature)
            .ok_or_else(|| not_found(descriptor, LookupMiss::Method))?;

        let method = provider
            .methods()
            .iter()
            .find(|method| {
                method.name() == wanted.name
                    && method.params().len() == wanted.params.len()
                    && method
                        .params()
                        .iter()
                        .zip(&wanted.params)
                        .all(|(param, kind)| param.kind.type_name() == *kind)
            })
            .ok_or_else(|| not_found(descriptor, LookupMiss::Method))?;

        Ok(ResolvedMethod {
            provider: Arc::clone(provider),
            method: Arc::clone(method),
        })
    }
}

struct ParsedSignature<'a> {
    name: &'a str,
    params: Vec<&'a str>,
}

impl<'a> ParsedSignature<'a> {
    fn parse(signature: &'a str) -> Option<Self> {
        let open = signature.find('(')?;
        let close = signature.rfind(')')?;
        if close < open {
            return None;
        }

        let head = signature[..open].trim_end();
        let name = head.rsplit(char::is_whitespace).next()?.trim();
        let params = signature[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|param| !param.is_empty())
            .collect();

        Some(Self { name, params })
    }
}

fn lookup_type<'r>(
    registry: &'r ProviderRegistry,
    descriptor: &DataSetDescriptor,
) -> Result<&'r Arc<ProviderType>, GenerateError> {
    registry
        .find_type(&descriptor.provider_type)
        .ok_or_else(|| not_found(descriptor, LookupMiss::Type))
}

fn not_found(descriptor: &DataSetDescriptor, miss: LookupMiss) -> GenerateError {
    GenerateError::ProviderNotFound {
        dataset: descriptor.name.clone(),
        provider_type: descriptor.provider_type.clone(),
        signature: descriptor.method_signature.clone(),
        miss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DataRow, ParamSpec};
    use crate::value::ParamKind;

    #[derive(Default)]
    struct Lines;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new().with_provider(
            ProviderType::builder::<Lines>("Invoice.Lines")
                .method("lines", "Vec<Line>", [], |_: &Lines, _| Ok(Vec::new()))
                .method(
                    "lines",
                    "Vec<Line>",
                    [ParamSpec::new("orderId", ParamKind::Int32)],
                    |_: &Lines, _| Ok(vec![DataRow::new().with("id", 1)]),
                )
                .build(),
        )
    }

    fn descriptor(provider_type: &str, signature: &str) -> DataSetDescriptor {
        DataSetDescriptor {
            name: "Lines".into(),
            provider_type: provider_type.into(),
            method_signature: signature.into(),
        }
    }

    #[test]
    fn signature_resolver_picks_exact_overload() {
        let registry = registry();
        let resolved = SignatureResolver
            .resolve(&registry, &descriptor("Invoice.Lines", "Vec<Line> lines(i32)"))
            .unwrap();
        assert_eq!(resolved.method.params().len(), 1);
        assert_eq!(resolved.provider.name(), "Invoice.Lines");
    }

    #[test]
    fn signature_resolver_is_whitespace_sensitive() {
        let registry = registry();
        let err = SignatureResolver
            .resolve(&registry, &descriptor("Invoice.Lines", "Vec<Line> lines( i32 )"))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::ProviderNotFound {
                miss: LookupMiss::Method,
                ..
            }
        ));
    }

    #[test]
    fn unknown_type_is_reported() {
        let registry = registry();
        let err = SignatureResolver
            .resolve(&registry, &descriptor("Invoice.Missing", "Vec<Line> lines()"))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::ProviderNotFound {
                miss: LookupMiss::Type,
                ..
            }
        ));
        assert_eq!(err.dataset(), Some("Lines"));
    }

    #[test]
    fn resolution_is_repeatable() {
        let registry = registry();
        let descriptor = descriptor("Invoice.Lines", "Vec<Line> lines(i32)");
        let first = SignatureResolver.resolve(&registry, &descriptor).unwrap();
        let second = SignatureResolver.resolve(&registry, &descriptor).unwrap();
        assert!(Arc::ptr_eq(&first.method, &second.method));
    }

    #[test]
    fn structural_resolver_tolerates_spacing() {
        let registry = registry();
        let resolved = StructuralResolver
            .resolve(&registry, &descriptor("Invoice.Lines", "Vec<Line>  lines( i32 )"))
            .unwrap();
        assert_eq!(resolved.method.signature(), "Vec<Line> lines(i32)");

        let resolved = StructuralResolver
            .resolve(&registry, &descriptor("Invoice.Lines", "Rows lines()"))
            .unwrap();
        assert!(resolved.method.params().is_empty());
    }

    #[test]
    fn structural_resolver_compares_parameter_kinds() {
        let registry = registry();
        let err = StructuralResolver
            .resolve(&registry, &descriptor("Invoice.Lines", "Vec<Line> lines(String)"))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::ProviderNotFound {
                miss: LookupMiss::Method,
                ..
            }
        ));
    }
}
