//! Application-defined data providers.
//!
//! Providers are registered up front in a [`ProviderRegistry`]: a provider
//! type has a name, a way to construct a fresh instance and a list of
//! methods. Each method declares its parameters in order together with a
//! return type name, which is enough to render the canonical signature a
//! report definition refers to.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::{ParamKind, Value};

/// Failure reported by a provider method.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

type Factory = dyn Fn() -> Box<dyn Any> + Send + Sync;
type MethodFn = dyn Fn(&dyn Any, &[Value]) -> Result<Rows, ProviderError> + Send + Sync;

/// A row of named column values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataRow {
    columns: IndexMap<String, Value>,
}

impl DataRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column and returns the updated row.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Sets a column value, replacing any previous value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Returns the value of a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Column values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.values()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// The rows returned by a provider method.
pub type Rows = Vec<DataRow>;

/// A declared provider method parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name, matched case-insensitively against caller parameters.
    pub name: String,
    /// Declared type.
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Creates a parameter declaration.
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A callable provider method.
pub struct ProviderMethod {
    name: String,
    return_type: String,
    params: Vec<ParamSpec>,
    call: Box<MethodFn>,
}

impl ProviderMethod {
    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared return type name.
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// Declared parameters in positional order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Canonical signature: `<return type> <name>(<kind>, <kind>, ...)`.
    pub fn signature(&self) -> String {
        let kinds = self
            .params
            .iter()
            .map(|param| param.kind.type_name())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {}({})", self.return_type, self.name, kinds)
    }

    /// Calls the method on a provider instance with positional arguments.
    pub fn call(&self, instance: &dyn Any, args: &[Value]) -> Result<Rows, ProviderError> {
        (self.call)(instance, args)
    }
}

impl fmt::Debug for ProviderMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderMethod")
            .field("signature", &self.signature())
            .finish()
    }
}

/// A registered provider type.
pub struct ProviderType {
    name: String,
    factory: Arc<Factory>,
    methods: Vec<Arc<ProviderMethod>>,
}

impl ProviderType {
    /// Starts describing a provider type backed by `P`.
    ///
    /// A fresh `P::default()` is constructed for every invocation.
    pub fn builder<P>(name: impl Into<String>) -> ProviderTypeBuilder<P>
    where
        P: Default + 'static,
    {
        ProviderTypeBuilder {
            name: name.into(),
            methods: Vec::new(),
            _provider: std::marker::PhantomData,
        }
    }

    /// Registered type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Methods in registration order.
    pub fn methods(&self) -> &[Arc<ProviderMethod>] {
        &self.methods
    }

    /// Constructs a new provider instance.
    pub fn instantiate(&self) -> Box<dyn Any> {
        (self.factory)()
    }

    pub(crate) fn factory(&self) -> Arc<Factory> {
        Arc::clone(&self.factory)
    }
}

impl fmt::Debug for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderType")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Builder for [`ProviderType`] values backed by a concrete provider struct.
pub struct ProviderTypeBuilder<P> {
    name: String,
    methods: Vec<Arc<ProviderMethod>>,
    _provider: std::marker::PhantomData<fn() -> P>,
}

impl<P> ProviderTypeBuilder<P>
where
    P: Default + 'static,
{
    /// Adds a method and returns the updated builder.
    ///
    /// `body` receives the freshly constructed provider and the bound
    /// arguments, one per declared parameter and in the same order.
    pub fn method<I, F>(
        mut self,
        name: impl Into<String>,
        return_type: impl Into<String>,
        params: I,
        body: F,
    ) -> Self
    where
        I: IntoIterator<Item = ParamSpec>,
        F: Fn(&P, &[Value]) -> Result<Rows, ProviderError> + Send + Sync + 'static,
    {
        let call = move |instance: &dyn Any, args: &[Value]| -> Result<Rows, ProviderError> {
            let provider = instance
                .downcast_ref::<P>()
                .ok_or("provider instance has an unexpected type")?;
            body(provider, args)
        };

        self.methods.push(Arc::new(ProviderMethod {
            name: name.into(),
            return_type: return_type.into(),
            params: params.into_iter().collect(),
            call: Box::new(call),
        }));
        self
    }

    /// Finishes the provider type.
    pub fn build(self) -> ProviderType {
        ProviderType {
            name: self.name,
            factory: Arc::new(|| Box::new(P::default()) as Box<dyn Any>),
            methods: self.methods,
        }
    }
}

/// The set of provider types available to a generator.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    types: Vec<Arc<ProviderType>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider type.
    pub fn register(&mut self, provider: ProviderType) {
        log::trace!("registering provider type {}", provider.name);
        self.types.push(Arc::new(provider));
    }

    /// Registers a provider type and returns the updated registry.
    pub fn with_provider(mut self, provider: ProviderType) -> Self {
        self.register(provider);
        self
    }

    /// Looks up a provider type by name.
    ///
    /// An exact match wins. Failing that, an assembly-qualified name such as
    /// `Invoice.Lines, Invoice` matches on the part before the first comma.
    pub fn find_type(&self, name: &str) -> Option<&Arc<ProviderType>> {
        let name = name.trim();
        self.types
            .iter()
            .find(|provider| provider.name == name)
            .or_else(|| {
                let (bare, _) = name.split_once(',')?;
                let bare = bare.trim();
                self.types.iter().find(|provider| provider.name == bare)
            })
    }

    /// Registered types in registration order.
    pub fn types(&self) -> &[Arc<ProviderType>] {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Numbers {
        offset: i32,
    }

    fn numbers_type() -> ProviderType {
        ProviderType::builder::<Numbers>("Demo.Numbers")
            .method(
                "range",
                "Vec<Number>",
                [
                    ParamSpec::new("count", ParamKind::Int32),
                    ParamSpec::new("label", ParamKind::Text),
                ],
                |numbers: &Numbers, args| {
                    let count = args[0].as_i32().unwrap_or(0);
                    Ok((0..count)
                        .map(|n| DataRow::new().with("n", n + numbers.offset))
                        .collect())
                },
            )
            .build()
    }

    #[test]
    fn signature_lists_parameter_kinds() {
        let provider = numbers_type();
        assert_eq!(
            provider.methods()[0].signature(),
            "Vec<Number> range(i32, String)"
        );
    }

    #[test]
    fn method_runs_on_fresh_instance() {
        let provider = numbers_type();
        let instance = provider.instantiate();
        let rows = provider.methods()[0]
            .call(&*instance, &[Value::Int32(3), Value::Null])
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("n"), Some(&Value::Int32(2)));
    }

    #[test]
    fn wrong_instance_type_is_an_error() {
        let provider = numbers_type();
        let err = provider.methods()[0]
            .call(&42_u8, &[Value::Int32(1), Value::Null])
            .unwrap_err();
        assert!(err.to_string().contains("unexpected type"));
    }

    #[test]
    fn finds_assembly_qualified_names() {
        let registry = ProviderRegistry::new().with_provider(numbers_type());
        assert!(registry.find_type("Demo.Numbers").is_some());
        assert!(registry.find_type("Demo.Numbers, Demo.Assembly").is_some());
        assert!(registry.find_type("demo.numbers").is_none());
    }

    #[test]
    fn row_keeps_column_order() {
        let row = DataRow::new().with("b", 1).with("a", "x");
        assert_eq!(row.columns().collect::<Vec<_>>(), ["b", "a"]);
    }
}
