#![cfg(feature = "pdf-engine")]

use rdlc_generator::{demo, fonts, Document, ParameterBag, PdfEngine, ReportGenerator};
use sha2::{Digest, Sha256};

const FONTS_MISSING: &str = "report fonts missing. Set RDLC_FONTS_DIR or copy assets/fonts next to the binary.";

fn render_demo_invoice(year: Option<i32>) -> Option<Document> {
    if !fonts::report_fonts_available() {
        return None;
    }

    let mut parameters = ParameterBag::new();
    if let Some(year) = year {
        parameters.add("year", year.to_string());
    }

    let document = ReportGenerator::new(demo::store(), demo::registry(), PdfEngine::new())
        .generate(demo::INVOICE_REPORT, &parameters, "pdf", true)
        .expect("render demo invoice");
    Some(document)
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() {
                    let byte = data[cursor];
                    if byte == terminator {
                        break;
                    }
                    if terminator == b')' {
                        data[cursor] = b'0';
                    } else if !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            if let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            {
                let start_index = offset + start_pos + start.len();
                if let Some(end_pos) = data[start_index..]
                    .windows(end.len())
                    .position(|window| window == end)
                {
                    for byte in &mut data[start_index..start_index + end_pos] {
                        if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                            *byte = b'0';
                        }
                    }
                    offset = start_index + end_pos + end.len();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(
        &mut normalized,
        b"<xmp:MetadataDate>",
        b"</xmp:MetadataDate>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:DocumentID>",
        b"</xmpMM:DocumentID>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:InstanceID>",
        b"</xmpMM:InstanceID>",
    );
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let normalized = scrub_pdf(bytes);
    let digest = Sha256::digest(&normalized);
    digest.into()
}

#[test]
fn renders_counted_pdf() {
    let Some(document) = render_demo_invoice(Some(2024)) else {
        eprintln!("Skipping renders_counted_pdf: {FONTS_MISSING}");
        return;
    };

    assert!(document.content.starts_with(b"%PDF"));
    assert_eq!(document.mime_type, "application/pdf");
    assert_eq!(document.extension, "pdf");
    assert!(document.page_count >= 1, "page count should be computed");
}

#[test]
fn more_rows_never_shrink_the_document() {
    let (Some(one_year), Some(all_years)) =
        (render_demo_invoice(Some(2023)), render_demo_invoice(None))
    else {
        eprintln!("Skipping more_rows_never_shrink_the_document: {FONTS_MISSING}");
        return;
    };

    assert!(all_years.content.len() > one_year.content.len());
    assert!(all_years.page_count >= one_year.page_count);
}

#[test]
fn rendering_is_deterministic() {
    let (Some(first), Some(second)) =
        (render_demo_invoice(Some(2024)), render_demo_invoice(Some(2024)))
    else {
        eprintln!("Skipping rendering_is_deterministic: {FONTS_MISSING}");
        return;
    };

    assert_eq!(
        first.content.len(),
        second.content.len(),
        "PDF sizes should match"
    );
    assert_eq!(
        normalized_hash(&first.content),
        normalized_hash(&second.content),
        "PDF renders must be deterministic after metadata normalization"
    );
}
