//! Page layout of rendered reports.

use genpdf::elements::Paragraph;
use genpdf::error::{Error, ErrorKind};
use genpdf::style::Style;
use genpdf::{Element, Margins, Mm, PageDecorator, Position};

const FOOTER_HEIGHT_MM: f64 = 8.0;

/// Adds margins, a title header and a page-number footer to every page.
pub(crate) struct ReportPageDecorator {
    page: usize,
    title: String,
    margins: Margins,
    footer_height: Mm,
}

impl ReportPageDecorator {
    pub(crate) fn new(title: impl Into<String>, margins: impl Into<Margins>) -> Self {
        Self {
            page: 0,
            title: title.into(),
            margins: margins.into(),
            footer_height: Mm::from(FOOTER_HEIGHT_MM),
        }
    }
}

impl PageDecorator for ReportPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        area.add_margins(self.margins);

        let mut header = Paragraph::new(self.title.as_str()).styled(Style::new().italic());
        let result = header.render(context, area.clone(), style)?;
        area.add_offset(Position::new(0, result.size.height + Mm::from(2.0)));

        let available = area.size().height;
        if self.footer_height > available {
            return Err(Error::new(
                "Footer height exceeds available space",
                ErrorKind::InvalidData,
            ));
        }

        let mut footer_area = area.clone();
        footer_area.add_offset(Position::new(0, available - self.footer_height));
        let mut footer = Paragraph::new(format!("Page {}", self.page));
        let result = footer.render(context, footer_area, style)?;
        if result.has_more {
            return Err(Error::new(
                "Footer does not fit into the reserved space",
                ErrorKind::PageSizeExceeded,
            ));
        }

        area.set_height(available - self.footer_height);
        Ok(area)
    }
}
