//! The contract between the generator and a rendering engine.
//!
//! The engine receives the top-level definition, the loaded subreport
//! definitions, the top-level data sources and report parameters. While
//! rendering it may call back into a [`SubreportDataHandler`] to fetch the
//! data for each subreport instance. The callback runs synchronously, nested
//! inside [`RenderingEngine::render`].

use thiserror::Error;

use crate::binder::ReportParameter;
use crate::definition::{ReportDefinition, SubreportReference};
use crate::expression;
use crate::invoker::DataSource;
use crate::subreport::LoadedSubreport;

/// Errors surfaced by a rendering engine.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine cannot produce the requested output format.
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),
    /// A subreport referenced during rendering was not supplied.
    #[error("subreport '{0}' was not loaded")]
    MissingSubreport(String),
    /// The data callback failed and rendering was abandoned.
    #[error("data request for subreport '{0}' failed")]
    Aborted(String),
    /// Any other engine failure.
    #[error(transparent)]
    Engine(Box<dyn std::error::Error + Send + Sync>),
}

impl RenderError {
    /// Wraps an arbitrary engine failure.
    pub fn engine(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Engine(err.into())
    }
}

/// Everything the engine needs to render a report.
#[derive(Clone, Copy, Debug)]
pub struct RenderRequest<'a> {
    /// The top-level definition.
    pub definition: &'a ReportDefinition,
    /// Subreport definitions, registered under their reference names.
    pub subreports: &'a [LoadedSubreport],
    /// Data sources for the top-level datasets.
    pub data_sources: &'a [DataSource],
    /// Report-level parameters with raw values.
    pub parameters: &'a [ReportParameter],
    /// Requested output format identifier.
    pub format: &'a str,
}

impl<'a> RenderRequest<'a> {
    /// Returns the loaded subreport registered under `name`.
    pub fn subreport(&self, name: &str) -> Option<&'a LoadedSubreport> {
        self.subreports.iter().find(|subreport| subreport.name == name)
    }

    /// Returns the top-level data source called `name`.
    pub fn data_source(&self, name: &str) -> Option<&'a DataSource> {
        self.data_sources.iter().find(|source| source.name == name)
    }
}

/// A mid-render request for the data of one subreport instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubreportRequest {
    /// Name the subreport is registered under.
    pub report_name: String,
    /// Datasets the subreport needs.
    pub data_source_names: Vec<String>,
    /// Parameter values for this particular instance.
    pub parameters: Vec<ReportParameter>,
}

impl SubreportRequest {
    /// Builds the requests for every instance of `reference`.
    ///
    /// A subreport inside a data region is instantiated once per row of the
    /// region's dataset, with `=Fields!..` parameter expressions evaluated
    /// against that row. Otherwise it is instantiated once.
    pub fn instances(
        request: &RenderRequest<'_>,
        reference: &SubreportReference,
    ) -> Result<Vec<SubreportRequest>, RenderError> {
        let subreport = request
            .subreport(&reference.name)
            .ok_or_else(|| RenderError::MissingSubreport(reference.name.clone()))?;
        let data_source_names: Vec<String> = subreport
            .definition
            .datasets()
            .iter()
            .map(|dataset| dataset.name.clone())
            .collect();

        let rows = match &reference.scope_dataset {
            Some(dataset) => request
                .data_source(dataset)
                .map(|source| source.rows.iter().map(Some).collect())
                .unwrap_or_default(),
            None => vec![None],
        };

        Ok(rows
            .into_iter()
            .map(|row| SubreportRequest {
                report_name: reference.name.clone(),
                data_source_names: data_source_names.clone(),
                parameters: reference
                    .parameters
                    .iter()
                    .map(|(name, value)| {
                        ReportParameter::new(
                            name.clone(),
                            vec![expression::evaluate(value, row, request.parameters)],
                        )
                    })
                    .collect(),
            })
            .collect())
    }
}

/// Supplies subreport data sources while the engine renders.
pub trait SubreportDataHandler {
    /// Returns one data source per name in `request.data_source_names`.
    fn data_sources(&mut self, request: &SubreportRequest) -> Result<Vec<DataSource>, RenderError>;
}

/// Rendered bytes plus format metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderOutput {
    /// Rendered bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Text encoding, empty for binary formats.
    pub encoding: String,
    /// File extension for the format.
    pub extension: String,
    /// Auxiliary stream identifiers.
    pub stream_ids: Vec<String>,
}

/// A report rendering engine.
pub trait RenderingEngine: Send + Sync {
    /// Names of the datasets the top-level report needs before rendering.
    fn data_source_names(&self, definition: &ReportDefinition) -> Vec<String> {
        definition
            .datasets()
            .iter()
            .map(|dataset| dataset.name.clone())
            .collect()
    }

    /// Names of the report-level parameters the top-level report declares.
    fn parameter_names(&self, definition: &ReportDefinition) -> Vec<String> {
        definition
            .parameters()
            .iter()
            .map(|parameter| parameter.name.clone())
            .collect()
    }

    /// Renders the report, calling `handler` for each subreport instance.
    fn render(
        &self,
        request: RenderRequest<'_>,
        handler: &mut dyn SubreportDataHandler,
    ) -> Result<RenderOutput, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DataRow;

    const NS: &str = "http://schemas.microsoft.com/sqlserver/reporting/2008/01/reportdefinition";

    fn parse(key: &str, body: &str) -> ReportDefinition {
        let xml = format!(r#"<Report xmlns="{NS}"><Body>{body}</Body></Report>"#);
        ReportDefinition::parse(key, xml.as_bytes()).expect("parse")
    }

    #[test]
    fn scoped_subreport_has_one_instance_per_row() {
        let parent = parse(
            "R.Orders",
            r#"<Tablix><DataSetName>Orders</DataSetName><Subreport Name="s">
<ReportName>Detail</ReportName><Parameters>
<Parameter Name="id"><Value>=Fields!Id.Value</Value></Parameter>
<Parameter Name="title"><Value>=Parameters!Title.Value</Value></Parameter>
</Parameters></Subreport></Tablix>"#,
        );
        let subreports = [LoadedSubreport {
            name: "Detail".into(),
            definition: parse("R.Detail", ""),
        }];
        let data_sources = [DataSource::new(
            "Orders",
            vec![DataRow::new().with("Id", 7), DataRow::new().with("Id", 8)],
        )];
        let parameters = [ReportParameter::new("Title", vec!["Q1".into()])];
        let request = RenderRequest {
            definition: &parent,
            subreports: &subreports,
            data_sources: &data_sources,
            parameters: &parameters,
            format: "pdf",
        };

        let instances = SubreportRequest::instances(&request, &parent.subreports()[0]).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(
            instances[1].parameters,
            [
                ReportParameter::new("id", vec!["8".into()]),
                ReportParameter::new("title", vec!["Q1".into()]),
            ]
        );
    }

    #[test]
    fn unloaded_subreport_is_reported() {
        let parent = parse("R.Top", "<Subreport><ReportName>Ghost</ReportName></Subreport>");
        let request = RenderRequest {
            definition: &parent,
            subreports: &[],
            data_sources: &[],
            parameters: &[],
            format: "pdf",
        };
        let err = SubreportRequest::instances(&request, &parent.subreports()[0]).unwrap_err();
        assert!(matches!(err, RenderError::MissingSubreport(name) if name == "Ghost"));
    }
}
