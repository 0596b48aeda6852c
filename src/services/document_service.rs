// src/services/document_service.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{operation::OperationKind, workflow::solution_usage},
    services::{template_source::TemplateSource, workflow::ReadyDraft},
};

pub const PDF_SIGNATURE: &[u8] = b"%PDF";
pub const MISSING_SIGNATURE: &str = "Not provided";

// =============================================================================
//  TEMPLATE LAYOUT
// =============================================================================
// Every position below belongs to the one certificate template in use.
// A new template means a new table.

const A4_HEIGHT: f32 = 842.0;

const FONT_RESOURCE: &str = "FPv1";
const FONT_SIZE: f32 = 10.0;
const SMALL_FONT_SIZE: f32 = 8.0;
const MARK_FONT_SIZE: f32 = 12.0;

#[derive(Debug, Clone, Copy)]
enum Edge {
    Top,
    Bottom,
}

/// Point measured from the top or bottom edge of the page.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    x: f32,
    offset: f32,
    edge: Edge,
}

impl Anchor {
    const fn top(x: f32, offset: f32) -> Self {
        Self { x, offset, edge: Edge::Top }
    }

    const fn bottom(x: f32, offset: f32) -> Self {
        Self { x, offset, edge: Edge::Bottom }
    }

    fn y(&self, page_height: f32) -> f32 {
        match self.edge {
            Edge::Top => page_height - self.offset,
            Edge::Bottom => self.offset,
        }
    }
}

const ORDER_NUMBER: Anchor = Anchor::top(470.0, 98.0);
const ISSUE_DATE: Anchor = Anchor::top(395.0, 121.0);
const ISSUE_TIME: Anchor = Anchor::top(505.0, 121.0);

const CUSTOMER_NAME: Anchor = Anchor::top(140.0, 168.0);
const CONTRACT_NUMBER: Anchor = Anchor::top(430.0, 168.0);
const LOCATION: Anchor = Anchor::top(140.0, 188.0);
const CUSTOMER_SURFACE: Anchor = Anchor::top(455.0, 188.0);

// Operations table: one block per operation type, one line per solution.
const OPERATIONS_TOP: f32 = 262.0;
const OPERATION_ROW_HEIGHT: f32 = 58.0;
const SOLUTION_LINE_HEIGHT: f32 = 11.0;
const MAX_SOLUTION_LINES: usize = 5;

const MARK_X: f32 = 48.0;
const COL_SURFACE: f32 = 128.0;
const COL_SOLUTION: f32 = 190.0;
const COL_QUANTITY: f32 = 330.0;
const COL_CONCENTRATION: f32 = 420.0;
const COL_LOT: f32 = 490.0;

const REPRESENTATIVE_NAME: Anchor = Anchor::bottom(70.0, 152.0);
const EMPLOYEE_NAME: Anchor = Anchor::bottom(340.0, 152.0);
const EMPLOYEE_ID: Anchor = Anchor::bottom(340.0, 138.0);

const CLIENT_SIGNATURE: Anchor = Anchor::bottom(70.0, 60.0);
const EMPLOYEE_SIGNATURE: Anchor = Anchor::bottom(340.0, 60.0);
const SIGNATURE_WIDTH: f32 = 140.0;
const SIGNATURE_HEIGHT: f32 = 60.0;

/// Baseline of `line` inside the block of `op`.
pub fn operation_line_y(op: OperationKind, line: usize, page_height: f32) -> f32 {
    let offset = OPERATIONS_TOP
        + op.row_index() as f32 * OPERATION_ROW_HEIGHT
        + line as f32 * SOLUTION_LINE_HEIGHT;
    page_height - offset
}

// =============================================================================
//  CERTIFICATE DATA
// =============================================================================

#[derive(Debug, Clone)]
pub struct CertificateSolution {
    pub label: String,
    pub quantity: Decimal,
    /// None when the unit lookup failed or the solution has none.
    pub unit: Option<String>,
    pub concentration: Option<Decimal>,
    pub lot: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CertificateOperation {
    pub kind: OperationKind,
    pub surface: Option<Decimal>,
    pub solutions: Vec<CertificateSolution>,
}

/// Everything printed on a proces verbal.
#[derive(Debug, Clone)]
pub struct CertificateData {
    pub order_number: i32,
    pub issued_at: NaiveDateTime,
    pub customer_name: String,
    pub contract_number: Option<String>,
    pub location: Option<String>,
    pub surface: Option<Decimal>,
    pub representative_name: String,
    pub employee_name: String,
    pub employee_id_document: Option<String>,
    pub operations: Vec<CertificateOperation>,
    pub client_signature: Option<Vec<u8>>,
    pub employee_signature: Option<Vec<u8>>,
}

impl CertificateData {
    /// `units` maps solution id to the unit read just before rendering.
    pub fn from_draft(
        ready: &ReadyDraft<'_>,
        order_number: i32,
        issued_at: NaiveDateTime,
        units: &HashMap<Uuid, Option<String>>,
    ) -> Self {
        let draft = ready.draft;

        let operations = draft
            .operations
            .iter()
            .map(|op| {
                let surface = draft.surface_for(*op);
                let solutions = draft
                    .solutions_for(*op)
                    .iter()
                    .map(|s| CertificateSolution {
                        label: s.name.clone(),
                        quantity: solution_usage(surface, s),
                        unit: units.get(&s.id).cloned().flatten(),
                        concentration: s.concentration,
                        lot: s.lot.clone(),
                    })
                    .collect();

                CertificateOperation {
                    kind: *op,
                    surface,
                    solutions,
                }
            })
            .collect();

        Self {
            order_number,
            issued_at,
            customer_name: ready.customer.name.clone(),
            contract_number: ready.customer.contract_number.clone(),
            location: ready.customer.location.clone(),
            surface: ready.customer.total_surface,
            representative_name: ready.representative_name.to_string(),
            employee_name: ready.employee.full_name.clone(),
            employee_id_document: ready.employee.id_document.clone(),
            operations,
            client_signature: Some(ready.client_signature.as_bytes().to_vec()),
            employee_signature: Some(ready.employee_signature.as_bytes().to_vec()),
        }
    }
}

// =============================================================================
//  LAYOUT
// =============================================================================

/// Decoded signature, flattened onto white.
#[derive(Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterImage({}x{})", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Text {
        x: f32,
        y: f32,
        size: f32,
        text: String,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: RasterImage,
    },
}

fn text_at(anchor: Anchor, page_height: f32, size: f32, text: impl Into<String>) -> Placement {
    Placement::Text {
        x: anchor.x,
        y: anchor.y(page_height),
        size,
        text: text.into(),
    }
}

fn format_surface(surface: Option<Decimal>) -> String {
    surface.map(|s| format!("{} mp", s.normalize())).unwrap_or_default()
}

fn format_quantity(quantity: Decimal, unit: Option<&str>) -> String {
    match unit {
        Some(unit) => format!("{:.2} {}", quantity.round_dp(2), unit),
        None => format!("{:.2}", quantity.round_dp(2)),
    }
}

/// Where everything goes on a page of the given height.
pub fn layout(data: &CertificateData, page_height: f32) -> Vec<Placement> {
    let mut placements = vec![
        text_at(ORDER_NUMBER, page_height, FONT_SIZE, data.order_number.to_string()),
        text_at(ISSUE_DATE, page_height, FONT_SIZE, data.issued_at.format("%d.%m.%Y").to_string()),
        text_at(ISSUE_TIME, page_height, FONT_SIZE, data.issued_at.format("%H:%M").to_string()),
        text_at(CUSTOMER_NAME, page_height, FONT_SIZE, data.customer_name.clone()),
        text_at(CONTRACT_NUMBER, page_height, FONT_SIZE, data.contract_number.clone().unwrap_or_default()),
        text_at(LOCATION, page_height, FONT_SIZE, data.location.clone().unwrap_or_default()),
        text_at(CUSTOMER_SURFACE, page_height, FONT_SIZE, format_surface(data.surface)),
        text_at(REPRESENTATIVE_NAME, page_height, FONT_SIZE, data.representative_name.clone()),
        text_at(EMPLOYEE_NAME, page_height, FONT_SIZE, data.employee_name.clone()),
        text_at(EMPLOYEE_ID, page_height, SMALL_FONT_SIZE, data.employee_id_document.clone().unwrap_or_default()),
    ];

    for operation in &data.operations {
        let op = operation.kind;

        placements.push(Placement::Text {
            x: MARK_X,
            y: operation_line_y(op, 0, page_height),
            size: MARK_FONT_SIZE,
            text: "X".to_string(),
        });

        if operation.solutions.len() > MAX_SOLUTION_LINES {
            tracing::warn!(
                operation = op.as_str(),
                solutions = operation.solutions.len(),
                "More solutions than template lines; extra lines are dropped"
            );
        }

        if operation.solutions.is_empty() {
            placements.push(Placement::Text {
                x: COL_SURFACE,
                y: operation_line_y(op, 0, page_height),
                size: SMALL_FONT_SIZE,
                text: format_surface(operation.surface),
            });
        }

        for (line, solution) in operation.solutions.iter().take(MAX_SOLUTION_LINES).enumerate() {
            let y = operation_line_y(op, line, page_height);
            let columns = [
                (COL_SURFACE, format_surface(operation.surface)),
                (COL_SOLUTION, solution.label.clone()),
                (COL_QUANTITY, format_quantity(solution.quantity, solution.unit.as_deref())),
                (
                    COL_CONCENTRATION,
                    solution
                        .concentration
                        .map(|c| format!("{}%", c.normalize()))
                        .unwrap_or_default(),
                ),
                (COL_LOT, solution.lot.clone().unwrap_or_default()),
            ];

            for (x, text) in columns {
                placements.push(Placement::Text {
                    x,
                    y,
                    size: SMALL_FONT_SIZE,
                    text,
                });
            }
        }
    }

    placements.push(signature_placement(CLIENT_SIGNATURE, page_height, data.client_signature.as_deref()));
    placements.push(signature_placement(EMPLOYEE_SIGNATURE, page_height, data.employee_signature.as_deref()));

    placements.retain(|p| !matches!(p, Placement::Text { text, .. } if text.is_empty()));
    placements
}

fn signature_placement(anchor: Anchor, page_height: f32, bytes: Option<&[u8]>) -> Placement {
    match bytes.and_then(decode_signature) {
        Some(image) => Placement::Image {
            x: anchor.x,
            y: anchor.y(page_height),
            width: SIGNATURE_WIDTH,
            height: SIGNATURE_HEIGHT,
            image,
        },
        None => text_at(
            Anchor { offset: anchor.offset + SIGNATURE_HEIGHT / 2.0, ..anchor },
            page_height,
            FONT_SIZE,
            MISSING_SIGNATURE,
        ),
    }
}

fn decode_signature(bytes: &[u8]) -> Option<RasterImage> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("Signature image could not be decoded: {}", e);
            return None;
        }
    };

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);

    // Signature pads export transparent canvases; composite onto white.
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        for channel in [r, g, b] {
            rgb.push(((channel as u16 * alpha + 255 * (255 - alpha)) / 255) as u8);
        }
    }

    Some(RasterImage { width, height, rgb })
}

/// Encodes `text` as WinAnsi bytes for the base-14 font. Romanian letters
/// outside WinAnsi fold to ASCII; anything else unmappable becomes `?`.
fn pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            'ă' => b'a',
            'Ă' => b'A',
            'ș' | 'ş' => b's',
            'Ș' | 'Ş' => b'S',
            'ț' | 'ţ' => b't',
            'Ț' | 'Ţ' => b'T',
            // ASCII and Latin-1 share their code points with WinAnsi.
            c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            c => win_ansi_extra(c).unwrap_or(b'?'),
        })
        .collect()
}

// The 0x80..0x9F block of WinAnsiEncoding.
fn win_ansi_extra(c: char) -> Option<u8> {
    let byte = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

// =============================================================================
//  RENDER
// =============================================================================

fn render_err(e: lopdf::Error) -> AppError {
    AppError::Render(e.to_string())
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// Overlays the certificate on the first page of `template`.
pub fn render_certificate(template: &[u8], data: &CertificateData) -> Result<Vec<u8>, AppError> {
    if !template.starts_with(PDF_SIGNATURE) {
        return Err(AppError::Template("input does not start with %PDF".to_string()));
    }

    let mut doc = Document::load_mem(template).map_err(render_err)?;

    let page_id = doc
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| AppError::Render("template has no pages".to_string()))?;

    let placements = layout(data, page_height(&doc, page_id)?);

    ensure_own_resources(&mut doc, page_id)?;

    let font_id = doc.add_object(lopdf::dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    register_resource(&mut doc, page_id, b"Font", FONT_RESOURCE, font_id)?;

    let mut operations = vec![Operation::new("g", vec![Object::Integer(0)])];

    for (index, placement) in placements.iter().enumerate() {
        match placement {
            Placement::Text { x, y, size, text } => {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec![FONT_RESOURCE.into(), real(*size)]));
                operations.push(Operation::new("Td", vec![real(*x), real(*y)]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(pdf_text(text))]));
                operations.push(Operation::new("ET", vec![]));
            }
            Placement::Image { x, y, width, height, image } => {
                let name = format!("PvSig{}", index);
                let image_id = doc.add_object(Stream::new(
                    lopdf::dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => image.width as i64,
                        "Height" => image.height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8_i64,
                    },
                    image.rgb.clone(),
                ));
                register_resource(&mut doc, page_id, b"XObject", &name, image_id)?;

                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new(
                    "cm",
                    vec![real(*width), real(0.0), real(0.0), real(*height), real(*x), real(*y)],
                ));
                operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                operations.push(Operation::new("Q", vec![]));
            }
        }
    }

    let overlay = Content { operations }.encode().map_err(render_err)?;
    append_overlay(&mut doc, page_id, overlay)?;

    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Render(e.to_string()))?;

    Ok(buffer)
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// The page followed by its `/Parent` chain up to the root.
fn page_tree_chain(doc: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>, AppError> {
    let mut chain = vec![page_id];
    let mut visited = HashSet::from([page_id]);

    let mut current = doc.get_dictionary(page_id).map_err(render_err)?;
    while let Ok(parent_id) = current.get(b"Parent").and_then(Object::as_reference) {
        if !visited.insert(parent_id) {
            return Err(AppError::Render("cyclic page tree".to_string()));
        }
        current = match doc.get_dictionary(parent_id) {
            Ok(dict) => dict,
            Err(_) => break,
        };
        chain.push(parent_id);
    }

    Ok(chain)
}

/// MediaBox height, inherited from the page tree when needed; A4 when absent.
fn page_height(doc: &Document, page_id: ObjectId) -> Result<f32, AppError> {
    for node_id in page_tree_chain(doc, page_id)? {
        let dict = doc.get_dictionary(node_id).map_err(render_err)?;
        if let Ok(media_box) = dict.get(b"MediaBox").and_then(Object::as_array) {
            if let (Some(y0), Some(y1)) = (
                media_box.get(1).and_then(number),
                media_box.get(3).and_then(number),
            ) {
                return Ok(y1 - y0);
            }
        }
    }

    Ok(A4_HEIGHT)
}

/// Copies inherited resources onto the page so additions don't hide them.
fn ensure_own_resources(doc: &mut Document, page_id: ObjectId) -> Result<(), AppError> {
    if doc.get_dictionary(page_id).map_err(render_err)?.has(b"Resources") {
        return Ok(());
    }

    let mut inherited = None;
    for node_id in page_tree_chain(doc, page_id)?.into_iter().skip(1) {
        let node = doc.get_dictionary(node_id).map_err(render_err)?;
        if let Ok(resources) = node.get(b"Resources") {
            inherited = Some(resources.clone());
            break;
        }
    }

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(render_err)?;
    page.set(
        "Resources",
        inherited.unwrap_or_else(|| Object::Dictionary(Dictionary::new())),
    );
    Ok(())
}

fn resources_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, AppError> {
    let reference = doc
        .get_dictionary(page_id)
        .map_err(render_err)?
        .get(b"Resources")
        .and_then(Object::as_reference)
        .ok();

    match reference {
        Some(id) => doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(render_err),
        None => doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .and_then(|page| page.get_mut(b"Resources"))
            .and_then(Object::as_dict_mut)
            .map_err(render_err),
    }
}

/// Adds `/name target` under `/Resources /category`, wherever that dictionary lives.
fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    target: ObjectId,
) -> Result<(), AppError> {
    // None: missing, Some(None): inline, Some(Some(id)): indirect
    let existing = resources_mut(doc, page_id)?
        .get(category)
        .ok()
        .map(|entry| entry.as_reference().ok());

    let dict = match existing {
        Some(Some(id)) => doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(render_err)?,
        Some(None) => resources_mut(doc, page_id)?
            .get_mut(category)
            .and_then(Object::as_dict_mut)
            .map_err(render_err)?,
        None => {
            let resources = resources_mut(doc, page_id)?;
            resources.set(category, Dictionary::new());
            resources
                .get_mut(category)
                .and_then(Object::as_dict_mut)
                .map_err(render_err)?
        }
    };

    dict.set(name, Object::Reference(target));
    Ok(())
}

/// Wraps the template's content in q/Q and appends the overlay after it.
fn append_overlay(doc: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> Result<(), AppError> {
    let existing: Vec<Object> = {
        let page = doc.get_dictionary(page_id).map_err(render_err)?;
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![],
        }
    };

    let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save));
    contents.extend(existing);
    contents.push(Object::Reference(restore));
    contents.push(Object::Reference(overlay));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(render_err)?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

// =============================================================================
//  SERVICE
// =============================================================================

/// Fetches the template and renders certificates onto it.
#[derive(Clone)]
pub struct DocumentService {
    template: Arc<dyn TemplateSource>,
}

impl DocumentService {
    pub fn new(template: Arc<dyn TemplateSource>) -> Self {
        Self { template }
    }

    pub async fn generate_certificate(&self, data: &CertificateData) -> Result<Vec<u8>, AppError> {
        // The template is fetched for every certificate.
        let template = self.template.fetch().await?;
        render_certificate(&template, data)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    /// Single empty A4 page.
    pub(crate) fn blank_template() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"BT ET\n".to_vec()));
        let page_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = lopdf::dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1_i64,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    pub(crate) fn png_signature() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(8, 4, image::Rgba([0, 0, 0, 255]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, image::ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn certificate(operations: Vec<CertificateOperation>) -> CertificateData {
        CertificateData {
            order_number: 41,
            issued_at: NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            customer_name: "SC Brutăria Șincai SRL".to_string(),
            contract_number: Some("C-17".to_string()),
            location: Some("Cluj-Napoca".to_string()),
            surface: Some(dec("250")),
            representative_name: "Maria Ionescu".to_string(),
            employee_name: "Popescu Ion".to_string(),
            employee_id_document: Some("CJ 123456".to_string()),
            operations,
            client_signature: None,
            employee_signature: None,
        }
    }

    fn operation(kind: OperationKind, labels: &[&str]) -> CertificateOperation {
        CertificateOperation {
            kind,
            surface: Some(dec("100")),
            solutions: labels
                .iter()
                .map(|label| CertificateSolution {
                    label: label.to_string(),
                    quantity: dec("50"),
                    unit: Some("kg".to_string()),
                    concentration: Some(dec("0.005")),
                    lot: Some("L-1".to_string()),
                })
                .collect(),
        }
    }

    fn texts(placements: &[Placement]) -> Vec<(&str, f32, f32)> {
        placements
            .iter()
            .filter_map(|p| match p {
                Placement::Text { text, x, y, .. } => Some((text.as_str(), *x, *y)),
                _ => None,
            })
            .collect()
    }

    fn drawn_strings(pdf: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .filter_map(|operand| operand.as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    #[test]
    fn rejects_input_without_pdf_signature() {
        let err = render_certificate(b"<html>not a pdf</html>", &certificate(vec![])).unwrap_err();
        assert!(matches!(err, AppError::Template(_)));
    }

    #[test]
    fn unparsable_template_is_a_render_error() {
        let err = render_certificate(b"%PDF-1.4 garbage", &certificate(vec![])).unwrap_err();
        assert!(matches!(err, AppError::Render(_)));
    }

    #[test]
    fn missing_signatures_draw_the_placeholder() {
        let placements = layout(&certificate(vec![]), A4_HEIGHT);
        let placeholders = texts(&placements)
            .into_iter()
            .filter(|(text, _, _)| *text == MISSING_SIGNATURE)
            .count();
        assert_eq!(placeholders, 2);

        let pdf = render_certificate(&blank_template(), &certificate(vec![])).unwrap();
        assert!(pdf.starts_with(PDF_SIGNATURE));
        let strings = drawn_strings(&pdf);
        assert_eq!(strings.iter().filter(|s| *s == MISSING_SIGNATURE).count(), 2);
    }

    #[test]
    fn undecodable_signature_falls_back_to_placeholder() {
        let mut data = certificate(vec![]);
        data.client_signature = Some(vec![0xde, 0xad, 0xbe, 0xef]);
        data.employee_signature = Some(png_signature());

        let placements = layout(&data, A4_HEIGHT);
        assert!(texts(&placements).iter().any(|(t, _, _)| *t == MISSING_SIGNATURE));
        assert_eq!(
            placements.iter().filter(|p| matches!(p, Placement::Image { .. })).count(),
            1
        );

        assert!(render_certificate(&blank_template(), &data).is_ok());
    }

    #[test]
    fn operation_rows_are_fixed_regardless_of_selection_order() {
        let data = certificate(vec![
            operation(OperationKind::Dezinsectie, &["Insecticid"]),
            operation(OperationKind::Deratizare, &["Raticid"]),
        ]);
        let placements = layout(&data, A4_HEIGHT);
        let marks: Vec<f32> = texts(&placements)
            .into_iter()
            .filter(|(text, x, _)| *text == "X" && *x == MARK_X)
            .map(|(_, _, y)| y)
            .collect();

        assert_eq!(
            marks,
            vec![
                operation_line_y(OperationKind::Dezinsectie, 0, A4_HEIGHT),
                operation_line_y(OperationKind::Deratizare, 0, A4_HEIGHT),
            ]
        );
        assert!(
            operation_line_y(OperationKind::Deratizare, 0, A4_HEIGHT)
                > operation_line_y(OperationKind::Dezinsectie, 0, A4_HEIGHT)
        );
    }

    #[test]
    fn each_extra_solution_moves_down_one_line() {
        let data = certificate(vec![operation(OperationKind::Dezinfectie, &["Clor", "Alcool"])]);
        let placements = layout(&data, A4_HEIGHT);
        let lines: Vec<f32> = texts(&placements)
            .into_iter()
            .filter(|(_, x, _)| *x == COL_SOLUTION)
            .map(|(_, _, y)| y)
            .collect();

        assert_eq!(
            lines,
            vec![
                operation_line_y(OperationKind::Dezinfectie, 0, A4_HEIGHT),
                operation_line_y(OperationKind::Dezinfectie, 1, A4_HEIGHT),
            ]
        );
    }

    #[test]
    fn quantity_has_two_decimals_and_optional_unit() {
        assert_eq!(format_quantity(dec("50"), Some("kg")), "50.00 kg");
        assert_eq!(format_quantity(dec("1.005"), None), "1.00");
    }

    #[test]
    fn rendered_page_carries_the_fields() {
        let mut data = certificate(vec![operation(OperationKind::Deratizare, &["Raticid"])]);
        data.client_signature = Some(png_signature());
        data.employee_signature = Some(png_signature());

        let pdf = render_certificate(&blank_template(), &data).unwrap();
        let strings = drawn_strings(&pdf);

        assert!(strings.contains(&"41".to_string()));
        assert!(strings.contains(&"17.05.2024".to_string()));
        assert!(strings.contains(&"SC Brutaria Sincai SRL".to_string()));
        assert!(strings.contains(&"50.00 kg".to_string()));
        assert!(!strings.contains(&MISSING_SIGNATURE.to_string()));
    }

    #[test]
    fn self_parented_page_is_a_render_error() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.new_object_id();
        doc.objects.insert(
            page_id,
            Object::Dictionary(lopdf::dictionary! {
                "Type" => "Page",
                "Parent" => page_id,
            }),
        );

        assert!(matches!(page_height(&doc, page_id), Err(AppError::Render(_))));
        assert!(matches!(ensure_own_resources(&mut doc, page_id), Err(AppError::Render(_))));
    }

    #[test]
    fn parent_cycle_is_a_render_error() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.new_object_id();
        let upper_id = doc.new_object_id();
        let lower_id = doc.new_object_id();
        doc.objects.insert(page_id, Object::Dictionary(lopdf::dictionary! { "Parent" => lower_id }));
        doc.objects.insert(lower_id, Object::Dictionary(lopdf::dictionary! { "Parent" => upper_id }));
        doc.objects.insert(upper_id, Object::Dictionary(lopdf::dictionary! { "Parent" => lower_id }));

        assert!(matches!(page_height(&doc, page_id), Err(AppError::Render(_))));
    }

    #[test]
    fn page_height_is_inherited_from_the_page_tree() {
        let doc = Document::load_mem(&blank_template()).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        assert_eq!(page_height(&doc, page_id).unwrap(), 842.0);
    }

    #[test]
    fn text_keeps_win_ansi_letters() {
        assert_eq!(pdf_text("Rémi Müller"), b"R\xe9mi M\xfcller".to_vec());
        assert_eq!(pdf_text("câmpul înalt"), b"c\xe2mpul \xeenalt".to_vec());
        assert_eq!(pdf_text("Brutăria Șincai"), b"Brutaria Sincai".to_vec());
        assert_eq!(pdf_text("100 € – ok"), b"100 \x80 \x96 ok".to_vec());
        assert_eq!(pdf_text("Łódź"), b"?\xf3d?".to_vec());
    }
}
