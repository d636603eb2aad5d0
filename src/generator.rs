//! The generation pipeline.
//!
//! A call to [`ReportGenerator::generate`] moves through
//! `Created -> DefinitionLoaded -> TopLevelBound -> Rendering -> Done`.
//! Any failure ends the call. All per-call state lives in a
//! [`GenerationContext`], so one generator can serve concurrent calls.

use std::collections::HashMap;

use crate::binder::{self, ReportParameter};
use crate::config::GeneratorConfig;
use crate::context::{Deadline, GenerationContext};
use crate::document::Document;
use crate::engine::{
    RenderError, RenderRequest, RenderingEngine, SubreportDataHandler, SubreportRequest,
};
use crate::error::{GenerateError, Stage};
use crate::invoker::DataSource;
use crate::page_count::{PageCounter, PdfPageCounter};
use crate::params::ParameterBag;
use crate::provider::ProviderRegistry;
use crate::resolver::{ProviderResolver, SignatureResolver};
use crate::store::DefinitionStore;
use crate::subreport;

/// Progress of a single generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationState {
    /// Nothing loaded yet.
    Created,
    /// Top-level and subreport definitions loaded and all datasets resolved.
    DefinitionLoaded,
    /// Top-level data sources and report parameters bound.
    TopLevelBound,
    /// The rendering engine is running.
    Rendering,
    /// The document is complete.
    Done,
    /// The generation failed.
    Failed,
}

/// Generates documents from stored report definitions.
pub struct ReportGenerator {
    store: Box<dyn DefinitionStore>,
    registry: ProviderRegistry,
    engine: Box<dyn RenderingEngine>,
    resolver: Box<dyn ProviderResolver>,
    page_counter: Box<dyn PageCounter>,
    config: GeneratorConfig,
}

impl ReportGenerator {
    /// Creates a generator with signature-equality resolution, a PDF page
    /// counter and the default configuration.
    pub fn new<S, E>(store: S, registry: ProviderRegistry, engine: E) -> Self
    where
        S: DefinitionStore + 'static,
        E: RenderingEngine + 'static,
    {
        Self {
            store: Box::new(store),
            registry,
            engine: Box::new(engine),
            resolver: Box::new(SignatureResolver),
            page_counter: Box::new(PdfPageCounter::default()),
            config: GeneratorConfig::default(),
        }
    }

    /// Replaces the provider resolution strategy.
    pub fn with_resolver(mut self, resolver: impl ProviderResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replaces the page counter.
    pub fn with_page_counter(mut self, counter: impl PageCounter + 'static) -> Self {
        self.page_counter = Box::new(counter);
        self
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The registered providers.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Renders the report stored under `key` in `format`.
    ///
    /// `parameters` fill both provider arguments and report-level
    /// parameters. When `calculate_page_count` is set and `format` is the
    /// page-countable format, the rendered output is parsed to count pages.
    pub fn generate(
        &self,
        key: &str,
        parameters: &ParameterBag,
        format: &str,
        calculate_page_count: bool,
    ) -> Result<Document, GenerateError> {
        let mut state = GenerationState::Created;
        let result = self.run(key, parameters, format, calculate_page_count, &mut state);
        match &result {
            Ok(document) => log::debug!(
                "generated {key} as {format}: {} bytes, {} page(s)",
                document.content.len(),
                document.page_count
            ),
            Err(err) => {
                log::debug!(
                    "generation of {key} failed during {state:?} ({}): {err}",
                    err.stage()
                );
                transition(key, &mut state, GenerationState::Failed);
            }
        }
        result
    }

    /// Same as [`generate`](Self::generate) with single-valued parameters.
    pub fn generate_with_map(
        &self,
        key: &str,
        parameters: &HashMap<String, String>,
        format: &str,
        calculate_page_count: bool,
    ) -> Result<Document, GenerateError> {
        self.generate(key, &ParameterBag::from(parameters), format, calculate_page_count)
    }

    /// Loads `key` and its subreports and resolves every dataset without rendering.
    pub fn prepare<'a>(
        &self,
        key: &str,
        parameters: &'a ParameterBag,
    ) -> Result<GenerationContext<'a>, GenerateError> {
        self.load(key, parameters, self.config.deadline().map(Deadline::start))
    }

    fn load<'a>(
        &self,
        key: &str,
        parameters: &'a ParameterBag,
        deadline: Option<Deadline>,
    ) -> Result<GenerationContext<'a>, GenerateError> {
        let extension = self.config.definition_extension();
        let definition = subreport::load_definition(self.store.as_ref(), key, extension)?;
        let subreports = subreport::load_subreports(self.store.as_ref(), &definition, extension)?;
        GenerationContext::build(
            definition,
            subreports,
            &self.registry,
            self.resolver.as_ref(),
            parameters,
            deadline,
        )
    }

    fn run(
        &self,
        key: &str,
        parameters: &ParameterBag,
        format: &str,
        calculate_page_count: bool,
        state: &mut GenerationState,
    ) -> Result<Document, GenerateError> {
        let deadline = self.config.deadline().map(Deadline::start);

        let context = self.load(key, parameters, deadline)?;
        transition(key, state, GenerationState::DefinitionLoaded);

        let (data_sources, report_parameters) = self.bind_top_level(&context)?;
        transition(key, state, GenerationState::TopLevelBound);

        context.check_deadline(Stage::Render)?;
        transition(key, state, GenerationState::Rendering);
        let request = RenderRequest {
            definition: context.definition(),
            subreports: context.subreports(),
            data_sources: &data_sources,
            parameters: &report_parameters,
            format,
        };
        let mut callback = SubreportCallback {
            context: &context,
            failure: None,
        };
        let rendered = self.engine.render(request, &mut callback);
        if let Some(failure) = callback.failure.take() {
            return Err(failure);
        }
        let output = rendered?;

        let page_count = if calculate_page_count
            && self.config.counts_pages_of(format)
            && self.page_counter.supports(format)
        {
            context.check_deadline(Stage::PageCount)?;
            self.page_counter.count(format, &output.bytes)?
        } else {
            0
        };
        transition(key, state, GenerationState::Done);

        Ok(Document {
            content: output.bytes,
            mime_type: output.mime_type,
            encoding: output.encoding,
            extension: output.extension,
            stream_ids: output.stream_ids,
            page_count,
        })
    }

    fn bind_top_level(
        &self,
        context: &GenerationContext<'_>,
    ) -> Result<(Vec<DataSource>, Vec<ReportParameter>), GenerateError> {
        let definition = context.definition();

        let data_sources = self
            .engine
            .data_source_names(definition)
            .iter()
            .map(|name| context.fetch(name, context.parameters()))
            .collect::<Result<Vec<_>, _>>()?;

        let parameter_names = self.engine.parameter_names(definition);
        let report_parameters = binder::bind_report_parameters(
            parameter_names.iter().map(String::as_str),
            context.parameters(),
        );

        Ok((data_sources, report_parameters))
    }
}

fn transition(key: &str, state: &mut GenerationState, next: GenerationState) {
    log::debug!("{key}: {state:?} -> {next:?}");
    *state = next;
}

/// Answers the engine's mid-render data requests.
///
/// The first failure is kept so the generator can report it instead of the
/// engine's generic abort error.
struct SubreportCallback<'c, 'a> {
    context: &'c GenerationContext<'a>,
    failure: Option<GenerateError>,
}

impl SubreportCallback<'_, '_> {
    fn fetch_all(&self, request: &SubreportRequest) -> Result<Vec<DataSource>, GenerateError> {
        let bag: ParameterBag = request
            .parameters
            .iter()
            .filter_map(|parameter| {
                let value = parameter.values.first()?;
                Some((parameter.name.as_str(), value.as_str()))
            })
            .collect();

        request
            .data_source_names
            .iter()
            .map(|name| self.context.fetch(name, &bag))
            .collect()
    }
}

impl SubreportDataHandler for SubreportCallback<'_, '_> {
    fn data_sources(&mut self, request: &SubreportRequest) -> Result<Vec<DataSource>, RenderError> {
        if self.failure.is_some() {
            return Err(RenderError::Aborted(request.report_name.clone()));
        }

        log::trace!(
            "subreport {} requests {:?}",
            request.report_name,
            request.data_source_names
        );
        self.fetch_all(request).map_err(|err| {
            self.failure = Some(err);
            RenderError::Aborted(request.report_name.clone())
        })
    }
}
