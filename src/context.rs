//! Per-generation state.
//!
//! A [`GenerationContext`] is built fresh for every `generate` call and is
//! not modified once built. It owns the loaded definitions and the bindings
//! of every dataset declared by the top-level report and its subreports,
//! merged into one namespace.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::binder;
use crate::definition::{DataSetDescriptor, ReportDefinition};
use crate::error::{GenerateError, LookupMiss, Stage};
use crate::invoker::{self, DataSource, ProviderBinding};
use crate::params::ParameterBag;
use crate::provider::ProviderRegistry;
use crate::resolver::ProviderResolver;
use crate::subreport::LoadedSubreport;

/// Wall-clock budget for one generation.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    /// Starts a deadline of `limit` from now.
    pub fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    /// Fails with [`GenerateError::Timeout`] once the limit has passed.
    pub fn check(&self, stage: Stage) -> Result<(), GenerateError> {
        if self.started.elapsed() >= self.limit {
            log::warn!("generation deadline of {:?} exceeded before {stage}", self.limit);
            return Err(GenerateError::Timeout {
                stage,
                deadline: self.limit,
            });
        }
        Ok(())
    }
}

/// Checks an optional deadline.
pub(crate) fn check_deadline(
    deadline: Option<&Deadline>,
    stage: Stage,
) -> Result<(), GenerateError> {
    deadline.map_or(Ok(()), |deadline| deadline.check(stage))
}

/// Definitions, bindings and caller parameters of one generation.
#[derive(Debug)]
pub struct GenerationContext<'a> {
    definition: ReportDefinition,
    subreports: Vec<LoadedSubreport>,
    bindings: HashMap<String, ProviderBinding>,
    parameters: &'a ParameterBag,
    deadline: Option<Deadline>,
}

impl<'a> GenerationContext<'a> {
    /// Resolves every dataset of `definition` and `subreports`.
    ///
    /// Subreport datasets are bound first, then the top-level ones. A dataset
    /// name may appear in several definitions only if every declaration
    /// resolves to the same provider method.
    pub fn build(
        definition: ReportDefinition,
        subreports: Vec<LoadedSubreport>,
        registry: &ProviderRegistry,
        resolver: &dyn ProviderResolver,
        parameters: &'a ParameterBag,
        deadline: Option<Deadline>,
    ) -> Result<Self, GenerateError> {
        check_deadline(deadline.as_ref(), Stage::Resolve)?;

        let mut bindings: HashMap<String, ProviderBinding> = HashMap::new();
        let declared = subreports
            .iter()
            .map(|subreport| &subreport.definition)
            .chain(std::iter::once(&definition));

        for owner in declared {
            for descriptor in owner.datasets() {
                let binding = bind_dataset(registry, resolver, descriptor)?;
                merge_binding(&mut bindings, owner, binding)?;
            }
        }

        log::debug!(
            "bound {} dataset(s) for {} ({} subreport(s))",
            bindings.len(),
            definition.key(),
            subreports.len()
        );

        Ok(Self {
            definition,
            subreports,
            bindings,
            parameters,
            deadline,
        })
    }

    /// The top-level definition.
    pub fn definition(&self) -> &ReportDefinition {
        &self.definition
    }

    /// Loaded subreports in order of first reference.
    pub fn subreports(&self) -> &[LoadedSubreport] {
        &self.subreports
    }

    /// The caller's parameters.
    pub fn parameters(&self) -> &ParameterBag {
        self.parameters
    }

    /// Returns the binding of `dataset`.
    pub fn binding(&self, dataset: &str) -> Result<&ProviderBinding, GenerateError> {
        self.bindings
            .get(dataset)
            .ok_or_else(|| GenerateError::ProviderNotFound {
                dataset: dataset.to_string(),
                provider_type: String::new(),
                signature: String::new(),
                miss: LookupMiss::Binding,
            })
    }

    /// Number of bound datasets.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Fails once the generation deadline has passed.
    pub fn check_deadline(&self, stage: Stage) -> Result<(), GenerateError> {
        check_deadline(self.deadline.as_ref(), stage)
    }

    /// Binds `bag` to the provider of `dataset`, invokes it and returns its rows.
    pub fn fetch(&self, dataset: &str, bag: &ParameterBag) -> Result<DataSource, GenerateError> {
        let binding = self.binding(dataset)?;
        let args = binder::bind_arguments(binding.method().params(), bag)?;
        self.check_deadline(Stage::Invoke)?;
        invoker::invoke(binding, &args)
    }
}

fn bind_dataset(
    registry: &ProviderRegistry,
    resolver: &dyn ProviderResolver,
    descriptor: &DataSetDescriptor,
) -> Result<ProviderBinding, GenerateError> {
    let resolved = resolver.resolve(registry, descriptor)?;
    log::trace!(
        "dataset {} -> {}::{}",
        descriptor.name,
        resolved.provider.name(),
        resolved.method.signature()
    );
    Ok(ProviderBinding::new(descriptor.name.clone(), resolved))
}

fn merge_binding(
    bindings: &mut HashMap<String, ProviderBinding>,
    owner: &ReportDefinition,
    binding: ProviderBinding,
) -> Result<(), GenerateError> {
    match bindings.get(binding.dataset()) {
        None => {
            bindings.insert(binding.dataset().to_string(), binding);
            Ok(())
        }
        Some(existing) if existing.same_method(&binding) => {
            log::warn!(
                "dataset {} is declared again by {} with the same provider",
                binding.dataset(),
                owner.key()
            );
            Ok(())
        }
        Some(_) => Err(GenerateError::malformed(
            owner.key(),
            format!(
                "dataset '{}' is already bound to a different provider method",
                binding.dataset()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DataRow, ParamSpec, ProviderError, ProviderType, Rows};
    use crate::resolver::SignatureResolver;
    use crate::value::{ParamKind, Value};

    const NS: &str = "http://schemas.microsoft.com/sqlserver/reporting/2010/01/reportdefinition";

    #[derive(Default)]
    struct Echo;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new().with_provider(
            ProviderType::builder::<Echo>("Echo")
                .method(
                    "Get",
                    "Rows",
                    [ParamSpec::new("n", ParamKind::Int64)],
                    |_: &Echo, args: &[Value]| -> Result<Rows, ProviderError> {
                        Ok(vec![DataRow::new().with("N", args[0].clone())])
                    },
                )
                .build(),
        )
    }

    fn definition(key: &str, datasets: &[&str]) -> ReportDefinition {
        let datasets: String = datasets
            .iter()
            .map(|name| {
                format!(
                    r#"<DataSet Name="{name}"><rd:DataSetInfo>
<rd:ObjectDataSourceType>Echo</rd:ObjectDataSourceType>
<rd:ObjectDataSourceSelectMethodSignature>Rows Get(i64)</rd:ObjectDataSourceSelectMethodSignature>
</rd:DataSetInfo></DataSet>"#
                )
            })
            .collect();
        let xml = format!(
            r#"<Report xmlns="{NS}" xmlns:rd="{}"><DataSets>{datasets}</DataSets></Report>"#,
            crate::definition::REPORT_DESIGNER_NS
        );
        ReportDefinition::parse(key, xml.as_bytes()).expect("parse")
    }

    #[test]
    fn merges_top_level_and_subreport_datasets() {
        let bag = ParameterBag::new().with("N", "9");
        let subreports = vec![LoadedSubreport {
            name: "Detail".into(),
            definition: definition("R.Detail", &["Rows", "Extra"]),
        }];
        let context = GenerationContext::build(
            definition("R.Top", &["Rows"]),
            subreports,
            &registry(),
            &SignatureResolver,
            &bag,
            None,
        )
        .expect("build");

        assert_eq!(context.binding_count(), 2);
        let source = context.fetch("Extra", context.parameters()).expect("fetch");
        assert_eq!(source.rows[0].get("N"), Some(&Value::Int64(9)));
    }

    #[test]
    fn unknown_dataset_is_a_lookup_miss() {
        let bag = ParameterBag::new();
        let context = GenerationContext::build(
            definition("R.Top", &[]),
            Vec::new(),
            &registry(),
            &SignatureResolver,
            &bag,
            None,
        )
        .expect("build");

        let err = context.binding("Nope").unwrap_err();
        assert!(matches!(
            err,
            GenerateError::ProviderNotFound {
                miss: LookupMiss::Binding,
                ..
            }
        ));
    }

    #[test]
    fn expired_deadline_stops_before_resolution() {
        let bag = ParameterBag::new();
        let err = GenerationContext::build(
            definition("R.Top", &["Rows"]),
            Vec::new(),
            &registry(),
            &SignatureResolver,
            &bag,
            Some(Deadline::start(Duration::ZERO)),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            GenerateError::Timeout {
                stage: Stage::Resolve,
                ..
            }
        ));
    }
}
