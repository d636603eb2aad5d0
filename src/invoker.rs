//! Calling bound provider methods.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::binder::BoundArguments;
use crate::error::GenerateError;
use crate::provider::{ProviderMethod, Rows};
use crate::resolver::ResolvedMethod;

/// A dataset resolved to a concrete provider method.
#[derive(Clone)]
pub struct ProviderBinding {
    dataset: String,
    provider_type: String,
    factory: Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>,
    method: Arc<ProviderMethod>,
}

impl ProviderBinding {
    /// Binds `dataset` to a resolved method.
    pub fn new(dataset: impl Into<String>, resolved: ResolvedMethod) -> Self {
        Self {
            dataset: dataset.into(),
            provider_type: resolved.provider.name().to_string(),
            factory: resolved.provider.factory(),
            method: resolved.method,
        }
    }

    /// Dataset this binding fills.
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Name of the provider type.
    pub fn provider_type(&self) -> &str {
        &self.provider_type
    }

    /// The bound method.
    pub fn method(&self) -> &ProviderMethod {
        &self.method
    }

    /// Returns `true` if both bindings call the same method.
    pub fn same_method(&self, other: &ProviderBinding) -> bool {
        Arc::ptr_eq(&self.method, &other.method)
    }
}

impl fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("dataset", &self.dataset)
            .field("provider_type", &self.provider_type)
            .field("method", &self.method)
            .finish()
    }
}

/// Named rows handed to the rendering engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSource {
    /// Dataset name.
    pub name: String,
    /// Rows returned by the provider.
    pub rows: Rows,
}

impl DataSource {
    /// Creates a data source.
    pub fn new(name: impl Into<String>, rows: Rows) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// Constructs a fresh provider instance and calls the bound method.
///
/// Errors returned by the provider, and panics raised inside it, surface as
/// [`GenerateError::Invocation`].
pub fn invoke(
    binding: &ProviderBinding,
    args: &BoundArguments,
) -> Result<DataSource, GenerateError> {
    log::trace!(
        "invoking {}::{} for dataset {}",
        binding.provider_type,
        binding.method.name(),
        binding.dataset
    );

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let instance = (binding.factory)();
        binding.method.call(&*instance, args)
    }));

    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(panic_message(&*payload).into()),
    };

    result
        .map(|rows| DataSource::new(binding.dataset.clone(), rows))
        .map_err(|source| GenerateError::Invocation {
            dataset: binding.dataset.clone(),
            source,
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("provider panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DataSetDescriptor;
    use crate::provider::{DataRow, ParamSpec, ProviderRegistry, ProviderType};
    use crate::resolver::{ProviderResolver, SignatureResolver};
    use crate::value::{ParamKind, Value};

    #[derive(Default)]
    struct Orders;

    fn binding(signature: &str) -> ProviderBinding {
        let registry = ProviderRegistry::new().with_provider(
            ProviderType::builder::<Orders>("Shop.Orders")
                .method(
                    "lines",
                    "Vec<Line>",
                    [ParamSpec::new("orderId", ParamKind::Int32)],
                    |_: &Orders, args| {
                        let id = args[0].as_i32().ok_or("orderId is required")?;
                        Ok(vec![DataRow::new().with("order", id)])
                    },
                )
                .method("explode", "Vec<Line>", [], |_: &Orders, _| {
                    panic!("boom")
                })
                .build(),
        );
        let descriptor = DataSetDescriptor {
            name: "Lines".into(),
            provider_type: "Shop.Orders".into(),
            method_signature: signature.into(),
        };
        let resolved = SignatureResolver.resolve(&registry, &descriptor).unwrap();
        ProviderBinding::new("Lines", resolved)
    }

    #[test]
    fn wraps_rows_in_named_source() {
        let source = invoke(&binding("Vec<Line> lines(i32)"), &vec![Value::Int32(100)]).unwrap();
        assert_eq!(source.name, "Lines");
        assert_eq!(source.rows[0].get("order"), Some(&Value::Int32(100)));
    }

    #[test]
    fn provider_error_carries_dataset() {
        let err = invoke(&binding("Vec<Line> lines(i32)"), &vec![Value::Null]).unwrap_err();
        assert_eq!(err.dataset(), Some("Lines"));
        assert!(std::error::Error::source(&err)
            .unwrap()
            .to_string()
            .contains("orderId is required"));
    }

    #[test]
    fn provider_panic_becomes_invocation_error() {
        let err = invoke(&binding("Vec<Line> explode()"), &Vec::new()).unwrap_err();
        assert!(matches!(err, GenerateError::Invocation { .. }));
        assert!(err.to_string().contains("boom"));
    }
}
