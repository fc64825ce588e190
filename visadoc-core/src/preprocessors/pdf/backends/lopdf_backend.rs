//! Pure-Rust PDF backend built on `lopdf`.
//!
//! Reads the document once, then walks pages in order collecting text, form
//! widgets, and image XObjects. Anything that can be missing in real-world
//! PDFs (Info dictionary, widget names, colorspaces) degrades to defaults
//! instead of failing the parse.

use super::PdfBackend;
use crate::types::{BoundingBox, DocumentMetadata, ExtractedContent, FormField, ImageInfo};
use anyhow::{anyhow, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Upper bound on /Parent hops, guards against cyclic field trees.
const MAX_PARENT_DEPTH: usize = 32;

// Field flag bits (PDF 32000-1, table 226 and 230)
const FF_RADIO: i64 = 1 << 15;
const FF_PUSHBUTTON: i64 = 1 << 16;
const FF_COMBO: i64 = 1 << 17;

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for LopdfBackend {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractedContent> {
        let doc =
            Document::load_mem(pdf_bytes).map_err(|e| anyhow!("failed to parse PDF: {e}"))?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(anyhow!("PDF has no pages"));
        }

        let mut metadata = extract_metadata(&doc);
        metadata.page_count = pages.len() as u32;

        let mut pages_text = Vec::with_capacity(pages.len());
        let mut form_fields = Vec::new();
        let mut images_info = Vec::new();

        for (&page_number, &page_id) in &pages {
            pages_text.push(page_text(&doc, page_number));
            collect_widgets(&doc, page_id, page_number, &mut form_fields);
            collect_images(&doc, page_id, page_number, &mut images_info);
        }

        let full_text = pages_text.join("\n").trim().to_string();

        Ok(ExtractedContent {
            metadata,
            full_text,
            pages_text,
            form_fields,
            tables: Vec::new(),
            images_info,
        })
    }

    fn name(&self) -> &str {
        "lopdf"
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

fn page_text(doc: &Document, page_number: u32) -> String {
    match doc.extract_text(&[page_number]) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(page = page_number, error = %e, "page text could not be decoded");
            String::new()
        }
    }
}

fn extract_metadata(doc: &Document) -> DocumentMetadata {
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok());

    let Some(info) = info else {
        tracing::debug!("no Info dictionary in PDF trailer");
        return DocumentMetadata::default();
    };

    let entry = |key: &[u8]| -> String {
        info.get(key)
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(text_of)
            .unwrap_or_default()
    };

    DocumentMetadata {
        title: entry(b"Title"),
        author: entry(b"Author"),
        subject: entry(b"Subject"),
        creator: entry(b"Creator"),
        producer: entry(b"Producer"),
        creation_date: entry(b"CreationDate"),
        modification_date: entry(b"ModDate"),
        page_count: 0,
        file_size: 0,
    }
}

fn collect_widgets(doc: &Document, page_id: ObjectId, page_number: u32, fields: &mut Vec<FormField>) {
    let Some(page) = dict_by_id(doc, page_id) else {
        return;
    };
    let annots = page
        .get(b"Annots")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok());
    let Some(annots) = annots else {
        return;
    };

    for annot in annots {
        let Some(annot) = resolve(doc, annot).and_then(|obj| obj.as_dict().ok()) else {
            continue;
        };
        if !has_name(annot, b"Subtype", b"Widget") {
            continue;
        }

        let field_name =
            qualified_name(doc, annot).unwrap_or_else(|| format!("field_{}", fields.len()));
        let field_value = inherited(doc, annot, b"V")
            .map(|value| value_text(doc, value))
            .unwrap_or_default();
        let coordinates = annot
            .get(b"Rect")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .and_then(|rect| rect_of(rect))
            .unwrap_or(BoundingBox::EMPTY);

        fields.push(FormField {
            field_name,
            field_type: widget_type(doc, annot).to_string(),
            field_value,
            coordinates,
            page_number,
        });
    }
}

fn collect_images(doc: &Document, page_id: ObjectId, page_number: u32, images: &mut Vec<ImageInfo>) {
    let xobjects = dict_by_id(doc, page_id)
        .and_then(|page| inherited(doc, page, b"Resources"))
        .and_then(|obj| obj.as_dict().ok())
        .and_then(|resources| resources.get(b"XObject").ok())
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok());
    let Some(xobjects) = xobjects else {
        return;
    };

    let mut image_index = 0;
    for (_, value) in xobjects.iter() {
        let Object::Reference(id) = value else {
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };
        if !has_name(&stream.dict, b"Subtype", b"Image") {
            continue;
        }

        let index = image_index;
        image_index += 1;

        if is_cmyk(doc, &stream.dict) {
            tracing::debug!(page = page_number, xref = id.0, "skipping CMYK image");
            continue;
        }

        images.push(ImageInfo {
            page_number,
            image_index: index,
            width: dimension(&stream.dict, b"Width"),
            height: dimension(&stream.dict, b"Height"),
            colorspace: colorspace_name(doc, &stream.dict),
            xref: id.0,
        });
    }
}

fn widget_type(doc: &Document, annot: &Dictionary) -> &'static str {
    let flags = inherited(doc, annot, b"Ff")
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);

    match inherited(doc, annot, b"FT") {
        Some(Object::Name(kind)) => match kind.as_slice() {
            b"Tx" => "Text",
            b"Btn" if flags & FF_PUSHBUTTON != 0 => "Button",
            b"Btn" if flags & FF_RADIO != 0 => "RadioButton",
            b"Btn" => "CheckBox",
            b"Ch" if flags & FF_COMBO != 0 => "ComboBox",
            b"Ch" => "ListBox",
            b"Sig" => "Signature",
            _ => "Unknown",
        },
        _ => "Unknown",
    }
}

/// Dot-joined /T names from the field root down to this widget.
fn qualified_name(doc: &Document, annot: &Dictionary) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = Some(annot);

    for _ in 0..MAX_PARENT_DEPTH {
        let Some(dict) = current else {
            break;
        };
        if let Some(part) = dict
            .get(b"T")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(text_of)
        {
            if !part.is_empty() {
                parts.push(part);
            }
        }
        current = parent_of(doc, dict);
    }

    if parts.is_empty() {
        None
    } else {
        parts.reverse();
        Some(parts.join("."))
    }
}

fn value_text(doc: &Document, value: &Object) -> String {
    match value {
        Object::Array(items) => items
            .iter()
            .filter_map(|item| resolve(doc, item).and_then(text_of))
            .collect::<Vec<_>>()
            .join(", "),
        other => text_of(other).unwrap_or_default(),
    }
}

fn colorspace_name(doc: &Document, image: &Dictionary) -> String {
    let colorspace = image.get(b"ColorSpace").ok().and_then(|obj| resolve(doc, obj));
    match colorspace {
        Some(Object::Name(name)) => latin1(name),
        Some(Object::Array(family)) => match family.first() {
            Some(Object::Name(name)) => latin1(name),
            _ => "Unknown".to_string(),
        },
        _ => "Unknown".to_string(),
    }
}

fn is_cmyk(doc: &Document, image: &Dictionary) -> bool {
    let colorspace = image.get(b"ColorSpace").ok().and_then(|obj| resolve(doc, obj));
    match colorspace {
        Some(Object::Name(name)) => name.as_slice() == b"DeviceCMYK",
        Some(Object::Array(family)) => match family.as_slice() {
            [Object::Name(kind), profile, ..] if kind.as_slice() == b"ICCBased" => {
                match resolve(doc, profile) {
                    Some(Object::Stream(stream)) => {
                        matches!(stream.dict.get(b"N"), Ok(Object::Integer(4)))
                    }
                    _ => false,
                }
            }
            _ => false,
        },
        _ => false,
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0)
}

fn rect_of(array: &[Object]) -> Option<BoundingBox> {
    match array {
        [x0, y0, x1, y1] => Some(BoundingBox::new(
            object_to_f64(x0)?,
            object_to_f64(y0)?,
            object_to_f64(x1)?,
            object_to_f64(y1)?,
        )),
        _ => None,
    }
}

fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Look up `key` on `dict`, walking /Parent links when it is absent.
fn inherited<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(value) = current.get(key) {
            return resolve(doc, value);
        }
        current = parent_of(doc, current)?;
    }
    None
}

fn parent_of<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    dict.get(b"Parent")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
}

fn dict_by_id(doc: &Document, id: ObjectId) -> Option<&Dictionary> {
    doc.get_object(id).ok().and_then(|obj| obj.as_dict().ok())
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn has_name(dict: &Dictionary, key: &[u8], expected: &[u8]) -> bool {
    matches!(dict.get(key), Ok(Object::Name(name)) if name.as_slice() == expected)
}

fn text_of(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        Object::Name(name) => Some(latin1(name)),
        Object::Integer(i) => Some(i.to_string()),
        Object::Real(f) => Some(f.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a byte order mark,
/// UTF-8 with BOM, otherwise PDFDocEncoding approximated as Latin-1.
pub(crate) fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(body) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(body).into_owned()
    } else {
        latin1(bytes)
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
