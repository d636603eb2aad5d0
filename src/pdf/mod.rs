//! A reference [`RenderingEngine`] that typesets reports as PDF with `genpdf`.
//!
//! The layout is deliberately plain: the report parameters, then one table per
//! top-level data source, then every subreport instance with its own tables.
//! Subreport data is requested through the [`SubreportDataHandler`] while the
//! document is being assembled.

mod layout;

use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::{Element, Margins, PaperSize};

use crate::binder::ReportParameter;
use crate::engine::{
    RenderError, RenderOutput, RenderRequest, RenderingEngine, SubreportDataHandler,
    SubreportRequest,
};
use crate::fonts;
use crate::invoker::DataSource;

use self::layout::ReportPageDecorator;

/// Format identifier accepted by [`PdfEngine`].
pub const PDF_FORMAT: &str = "pdf";

const PAGE_MARGIN_MM: i32 = 12;

/// Renders reports to PDF using the fonts found by [`fonts::report_font_family`].
#[derive(Clone, Debug)]
pub struct PdfEngine {
    paper_size: PaperSize,
    margins: Margins,
}

impl Default for PdfEngine {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            margins: Margins::trbl(PAGE_MARGIN_MM, PAGE_MARGIN_MM, PAGE_MARGIN_MM, PAGE_MARGIN_MM),
        }
    }
}

impl PdfEngine {
    /// Creates an A4 engine with the default margins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the paper size used for rendered documents.
    pub fn with_paper_size(mut self, paper_size: PaperSize) -> Self {
        self.paper_size = paper_size;
        self
    }

    /// Sets the page margins.
    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = margins.into();
        self
    }
}

impl RenderingEngine for PdfEngine {
    fn render(
        &self,
        request: RenderRequest<'_>,
        handler: &mut dyn SubreportDataHandler,
    ) -> Result<RenderOutput, RenderError> {
        if !request.format.eq_ignore_ascii_case(PDF_FORMAT) {
            return Err(RenderError::UnsupportedFormat(request.format.to_string()));
        }

        let title = report_title(request.definition.key());
        let family = fonts::report_font_family().map_err(genpdf_error)?;
        let mut document = genpdf::Document::new(family);
        document.set_title(title);
        document.set_paper_size(self.paper_size);
        document.set_page_decorator(ReportPageDecorator::new(title, self.margins));

        document.push(Paragraph::new(title).styled(Style::new().bold().with_font_size(16)));
        document.push(Break::new(1));

        if !request.parameters.is_empty() {
            document.push(heading("Parameters"));
            document.push(parameter_table(request.parameters)?);
            document.push(Break::new(1));
        }

        for source in request.data_sources {
            push_data_source(&mut document, source)?;
        }

        for reference in request.definition.subreports() {
            for instance in SubreportRequest::instances(&request, reference)? {
                let sources = handler.data_sources(&instance)?;
                log::trace!(
                    "rendering subreport {} with {} data source(s)",
                    instance.report_name,
                    sources.len()
                );
                document.push(heading(&subreport_caption(&instance)));
                for source in &sources {
                    push_data_source(&mut document, source)?;
                }
            }
        }

        let mut bytes = Vec::new();
        document.render(&mut bytes).map_err(genpdf_error)?;

        Ok(RenderOutput {
            bytes,
            mime_type: "application/pdf".to_string(),
            encoding: String::new(),
            extension: PDF_FORMAT.to_string(),
            stream_ids: Vec::new(),
        })
    }
}

fn genpdf_error(err: genpdf::error::Error) -> RenderError {
    RenderError::engine(err.to_string())
}

/// Last dotted segment of a definition key.
fn report_title(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

fn heading(text: &str) -> impl Element {
    Paragraph::new(text.to_string()).styled(Style::new().bold().with_font_size(12))
}

fn subreport_caption(instance: &SubreportRequest) -> String {
    if instance.parameters.is_empty() {
        return instance.report_name.clone();
    }
    let arguments = instance
        .parameters
        .iter()
        .map(|parameter| format!("{}={}", parameter.name, parameter.values.join(",")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} ({arguments})", instance.report_name)
}

fn cell(text: String) -> impl Element {
    Paragraph::new(text).padded(Margins::trbl(1, 1, 1, 1))
}

fn header_cell(text: &str) -> impl Element {
    Paragraph::new(text.to_string())
        .styled(Style::new().bold())
        .padded(Margins::trbl(1, 1, 1, 1))
}

fn parameter_table(parameters: &[ReportParameter]) -> Result<TableLayout, RenderError> {
    let mut table = TableLayout::new(vec![1, 2]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
    table
        .row()
        .element(header_cell("Name"))
        .element(header_cell("Value"))
        .push()
        .map_err(genpdf_error)?;
    for parameter in parameters {
        table
            .row()
            .element(cell(parameter.name.clone()))
            .element(cell(parameter.values.join(", ")))
            .push()
            .map_err(genpdf_error)?;
    }
    Ok(table)
}

fn push_data_source(
    document: &mut genpdf::Document,
    source: &DataSource,
) -> Result<(), RenderError> {
    document.push(Paragraph::new(source.name.as_str()).styled(Style::new().italic()));

    let columns: Vec<String> = source
        .rows
        .first()
        .map(|row| row.columns().map(str::to_string).collect())
        .unwrap_or_default();
    if columns.is_empty() {
        document.push(Paragraph::new("No rows."));
        document.push(Break::new(1));
        return Ok(());
    }

    let mut table = TableLayout::new(vec![1; columns.len()]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for column in &columns {
        header = header.element(header_cell(column));
    }
    header.push().map_err(genpdf_error)?;

    for row in &source.rows {
        let mut line = table.row();
        for column in &columns {
            let text = row.get(column).map(ToString::to_string).unwrap_or_default();
            line = line.element(cell(text));
        }
        line.push().map_err(genpdf_error)?;
    }

    document.push(table);
    document.push(Break::new(1));
    Ok(())
}
