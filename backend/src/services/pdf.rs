//! Single-page A4 authorization certificate.
//!
//! The page is drawn with the PDF base-14 Helvetica faces so no font files
//! are embedded. Text is reduced to printable ASCII before it reaches a
//! content stream. The QR code is drawn as filled rectangles.

use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use qrcode::{Color, EcLevel, QrCode};
use serde::Deserialize;

use crate::models::{AbsenceRequest, RequestKind};
use crate::services::document::DocumentError;
use crate::utils::long_date;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const QR_SIZE: f32 = 110.0;
const QR_QUIET_ZONE: usize = 1;
const QR_BOTTOM: f32 = MARGIN + 60.0;
/// Lowest baseline for body text; leaves room for the approval block above
/// the QR code.
const BODY_FLOOR: f32 = QR_BOTTOM + QR_SIZE + 70.0;

/// Institution branding printed at the top of every certificate.
#[derive(Debug, Clone, Deserialize)]
pub struct Letterhead {
    pub institution: String,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default = "default_signatory")]
    pub signatory_title: String,
}

fn default_signatory() -> String {
    "Head of the Department".to_string()
}

/// Module matrix of a QR code, row-major, `true` for dark modules.
#[derive(Debug, Clone)]
pub struct QrMatrix {
    width: usize,
    modules: Vec<bool>,
}

impl QrMatrix {
    pub fn encode(data: &str) -> Result<Self, DocumentError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
            .map_err(|err| DocumentError::Qr(err.to_string()))?;
        Ok(Self {
            width: code.width(),
            modules: code
                .to_colors()
                .into_iter()
                .map(|c| c == Color::Dark)
                .collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn is_dark(&self, row: usize, col: usize) -> bool {
        self.modules[row * self.width + col]
    }
}

/// Everything printed on one certificate.
pub struct Certificate<'a> {
    pub request: &'a AbsenceRequest,
    pub document_id: &'a str,
    pub verification_url: &'a str,
    pub issued_on: NaiveDate,
    pub letterhead: &'a Letterhead,
}

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

fn ascii(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c,
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\n' | '\t' | '\r' => ' ',
            _ => '?',
        })
        .collect()
}

/// Approximate Helvetica advance, good enough for centering and wrapping.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}

fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * 0.5)) as usize).max(10);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Accumulates drawing operations top to bottom.
struct PageWriter {
    ops: Vec<Operation>,
    cursor: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text_at(&mut self, face: Face, size: f32, x: f32, y: f32, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![face.resource().into(), size.into()],
        ));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(ascii(text))],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn line(&mut self, face: Face, size: f32, text: &str) {
        self.cursor -= size * 1.4;
        self.text_at(face, size, MARGIN, self.cursor, text);
    }

    fn centered(&mut self, face: Face, size: f32, text: &str) {
        self.cursor -= size * 1.4;
        let x = ((PAGE_WIDTH - text_width(text, size)) / 2.0).max(MARGIN);
        self.text_at(face, size, x, self.cursor, text);
    }

    /// Draws a wrapped paragraph, cut off with "..." where the next line
    /// would drop below `floor`. Returns false when cut off.
    fn paragraph(&mut self, size: f32, text: &str, floor: f32) -> bool {
        let step = size * 1.4;
        let lines = wrap(&ascii(text), size, PAGE_WIDTH - 2.0 * MARGIN);
        let count = lines.len();
        for (index, line) in lines.into_iter().enumerate() {
            if self.cursor - step < floor {
                return false;
            }
            if index + 1 < count && self.cursor - 2.0 * step < floor {
                self.line(Face::Regular, size, &format!("{line} ..."));
                return false;
            }
            self.line(Face::Regular, size, &line);
        }
        true
    }

    fn labelled(&mut self, size: f32, label: &str, value: &str) {
        self.cursor -= size * 1.4;
        self.text_at(Face::Bold, size, MARGIN, self.cursor, label);
        self.text_at(Face::Regular, size, MARGIN + 120.0, self.cursor, value);
    }

    fn gap(&mut self, points: f32) {
        self.cursor -= points;
    }

    fn rule(&mut self) {
        self.cursor -= 6.0;
        self.ops.push(Operation::new("w", vec![0.8f32.into()]));
        self.ops.push(Operation::new("m", vec![MARGIN.into(), self.cursor.into()]));
        self.ops.push(Operation::new(
            "l",
            vec![(PAGE_WIDTH - MARGIN).into(), self.cursor.into()],
        ));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn qr(&mut self, matrix: &QrMatrix, x: f32, y: f32) {
        let span = matrix.width() + 2 * QR_QUIET_ZONE;
        let module = QR_SIZE / span as f32;
        let top = y + QR_SIZE;
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("g", vec![0.into()]));
        for row in 0..matrix.width() {
            for col in 0..matrix.width() {
                if !matrix.is_dark(row, col) {
                    continue;
                }
                let mx = x + (col + QR_QUIET_ZONE) as f32 * module;
                let my = top - (row + QR_QUIET_ZONE + 1) as f32 * module;
                self.ops.push(Operation::new(
                    "re",
                    vec![mx.into(), my.into(), module.into(), module.into()],
                ));
            }
        }
        self.ops.push(Operation::new("f", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }
}

fn title_for(request: &AbsenceRequest) -> &'static str {
    match request.kind {
        RequestKind::Leave(_) => "LEAVE AUTHORIZATION",
        RequestKind::Od => "ON-DUTY AUTHORIZATION",
    }
}

fn body_for(request: &AbsenceRequest) -> Vec<String> {
    let placement = &request.placement;
    match &request.kind {
        RequestKind::Leave(details) => {
            let days = request.duration.max(1);
            vec![
                format!(
                    "This is to certify that {} of year {}, {} department, section {}, has been \
                     granted {} for {} day{} from {} to {}.",
                    request.student_name,
                    placement.year,
                    placement.department,
                    placement.section,
                    details.leave_type,
                    days,
                    if days == 1 { "" } else { "s" },
                    long_date(details.from_date),
                    long_date(details.to_date),
                ),
                format!("Reason: {}", details.reason),
            ]
        }
        RequestKind::Od => vec![
            "MEMORANDUM".to_string(),
            format!(
                "{} of year {}, {} department, section {}, is permitted to be on duty for the \
                 period {} to {} to take part in the following activity: {}",
                request.student_name,
                placement.year,
                placement.department,
                placement.section,
                request.from,
                request.to,
                request.content,
            ),
            "The attendance of the student for the above period shall be treated as On-Duty."
                .to_string(),
        ],
    }
}

/// Drawing operations for the whole page.
pub(crate) fn page_operations(certificate: &Certificate<'_>, qr: &QrMatrix) -> Vec<Operation> {
    let request = certificate.request;
    let letterhead = certificate.letterhead;
    let mut page = PageWriter::new();

    page.centered(Face::Bold, 16.0, &letterhead.institution);
    if let Some(affiliation) = &letterhead.affiliation {
        page.centered(Face::Regular, 10.0, affiliation);
    }
    for line in &letterhead.address_lines {
        page.centered(Face::Regular, 9.0, line);
    }
    if let Some(contact) = &letterhead.contact {
        page.centered(Face::Regular, 9.0, contact);
    }
    page.rule();
    page.gap(12.0);

    page.centered(Face::Bold, 14.0, title_for(request));
    page.gap(8.0);
    page.labelled(10.0, "Document ID", certificate.document_id);
    page.labelled(10.0, "Issued on", &long_date(certificate.issued_on));
    page.gap(10.0);

    page.labelled(11.0, "Name", &request.student_name);
    page.labelled(11.0, "Email", &request.student_email);
    page.labelled(11.0, "Department", &request.placement.department);
    page.labelled(
        11.0,
        "Year / Section",
        &format!("{} / {}", request.placement.year, request.placement.section),
    );
    page.labelled(11.0, "Subject", &request.subject);
    page.gap(12.0);

    for paragraph in body_for(request) {
        if !page.paragraph(11.0, &paragraph, BODY_FLOOR) {
            break;
        }
        page.gap(6.0);
    }
    page.gap(12.0);

    let forwarded_by = request.forwarded_by.as_deref().unwrap_or("Class staff");
    let forwarded = match request.forwarded_by_incharge.as_deref() {
        Some(incharge) => format!("{forwarded_by} (class in-charge: {incharge})"),
        None => forwarded_by.to_string(),
    };
    page.labelled(11.0, "Forwarded by", &forwarded);
    page.labelled(11.0, "Authorized by", &letterhead.signatory_title);
    page.labelled(11.0, "Status", "AUTHORIZED");

    let qr_x = PAGE_WIDTH - MARGIN - QR_SIZE;
    let qr_y = QR_BOTTOM;
    page.qr(qr, qr_x, qr_y);
    page.text_at(Face::Regular, 8.0, qr_x + 22.0, qr_y - 10.0, "Scan to verify");

    page.text_at(
        Face::Bold,
        8.0,
        MARGIN,
        MARGIN + 24.0,
        "This document is electronically generated. Any alteration makes it invalid.",
    );
    page.text_at(
        Face::Regular,
        8.0,
        MARGIN,
        MARGIN + 12.0,
        &format!("Verify authenticity at: {}", certificate.verification_url),
    );
    page.text_at(
        Face::Regular,
        8.0,
        MARGIN,
        MARGIN,
        &format!("Document ID: {}", certificate.document_id),
    );

    page.ops
}

/// Render the certificate to PDF bytes.
pub fn render(certificate: &Certificate<'_>, qr: &QrMatrix) -> Result<Vec<u8>, DocumentError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let content = Content {
        operations: page_operations(certificate, qr),
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(ascii(certificate.document_id)),
        "Producer" => Object::string_literal("passdesk"),
    });
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
