use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ===== EXTRACTION TYPES =====

/// Axis-aligned box in PDF page units: (x0, y0) lower-left, (x1, y1) upper-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    /// Placeholder used when a backend cannot supply geometry.
    pub const EMPTY: BoundingBox = BoundingBox {
        x0: 0.0,
        y0: 0.0,
        x1: 0.0,
        y1: 0.0,
    };

    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        // PDF rects may list corners in any order
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x1 - self.x0 <= 0.0 || self.y1 - self.y0 <= 0.0
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
    /// Raw PDF date string, e.g. `D:20240101120000Z`
    pub creation_date: String,
    pub modification_date: String,
    pub page_count: u32,
    /// Filled in by the processor; extractors always leave it at 0.
    pub file_size: u64,
}

/// One interactive widget detected in the PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub field_name: String,
    pub field_type: String,
    pub field_value: String,
    pub coordinates: BoundingBox,
    /// 1-indexed
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Cells joined by tabs, rows by newlines
    pub table_text: String,
    pub table_data: Vec<Vec<String>>,
    /// `None` when the table backend has no geometry; serialized as the zero box.
    #[serde(with = "optional_box")]
    pub coordinates: Option<BoundingBox>,
    pub page_number: u32,
}

impl TableData {
    pub fn from_rows(rows: Vec<Vec<String>>, page_number: u32) -> Self {
        let table_text = rows
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            table_text,
            table_data: rows,
            coordinates: None,
            page_number,
        }
    }

    pub fn row_count(&self) -> usize {
        self.table_data.len()
    }
}

mod optional_box {
    use super::BoundingBox;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<BoundingBox>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.unwrap_or(BoundingBox::EMPTY).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BoundingBox>, D::Error> {
        let bbox = BoundingBox::deserialize(deserializer)?;
        Ok(if bbox == BoundingBox::EMPTY {
            None
        } else {
            Some(bbox)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub page_number: u32,
    pub image_index: usize,
    pub width: u32,
    pub height: u32,
    pub colorspace: String,
    /// PDF object number of the image XObject
    pub xref: u32,
}

/// Raw extractor output, before classification and scoring.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub metadata: DocumentMetadata,
    pub full_text: String,
    pub pages_text: Vec<String>,
    pub form_fields: Vec<FormField>,
    pub tables: Vec<TableData>,
    pub images_info: Vec<ImageInfo>,
}

// ===== CLASSIFICATION =====

/// Immigration form or generic document category.
///
/// Serialized as the human-readable label (`"I-130"`, `"Birth Certificate"`,
/// `"Unknown Document"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentType {
    I130,
    I485,
    I765,
    I821D,
    I90,
    N400,
    I864,
    I693,
    G1145,
    I131,
    Passport,
    BirthCertificate,
    MarriageCertificate,
    DivorceDecree,
    EmploymentAuthorization,
    Unknown,
}

impl DocumentType {
    pub const ALL: [DocumentType; 16] = [
        DocumentType::I130,
        DocumentType::I485,
        DocumentType::I765,
        DocumentType::I821D,
        DocumentType::I90,
        DocumentType::N400,
        DocumentType::I864,
        DocumentType::I693,
        DocumentType::G1145,
        DocumentType::I131,
        DocumentType::Passport,
        DocumentType::BirthCertificate,
        DocumentType::MarriageCertificate,
        DocumentType::DivorceDecree,
        DocumentType::EmploymentAuthorization,
        DocumentType::Unknown,
    ];

    pub const fn label(&self) -> &'static str {
        match self {
            DocumentType::I130 => "I-130",
            DocumentType::I485 => "I-485",
            DocumentType::I765 => "I-765",
            DocumentType::I821D => "I-821D",
            DocumentType::I90 => "I-90",
            DocumentType::N400 => "N-400",
            DocumentType::I864 => "I-864",
            DocumentType::I693 => "I-693",
            DocumentType::G1145 => "G-1145",
            DocumentType::I131 => "I-131",
            DocumentType::Passport => "Passport",
            DocumentType::BirthCertificate => "Birth Certificate",
            DocumentType::MarriageCertificate => "Marriage Certificate",
            DocumentType::DivorceDecree => "Divorce Decree",
            DocumentType::EmploymentAuthorization => "Employment Authorization",
            DocumentType::Unknown => "Unknown Document",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.label() == label)
    }

    pub fn is_known(&self) -> bool {
        *self != DocumentType::Unknown
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for DocumentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        DocumentType::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown document type: {label}")))
    }
}

// ===== PARSED DOCUMENT =====

/// Complete, immutable result of parsing one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub metadata: DocumentMetadata,
    pub full_text: String,
    pub pages_text: Vec<String>,
    pub form_fields: Vec<FormField>,
    pub tables: Vec<TableData>,
    pub images_info: Vec<ImageInfo>,
    pub document_type: DocumentType,
    pub confidence_score: f64,
}

impl ParsedDocument {
    /// Leading slice of the full text, at most `max_chars` characters.
    pub fn text_prefix(&self, max_chars: usize) -> &str {
        truncate_chars(&self.full_text, max_chars)
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            document_type: self.document_type,
            page_count: self.metadata.page_count,
            form_fields_count: self.form_fields.len(),
            tables_count: self.tables.len(),
            images_count: self.images_info.len(),
            text_length: self.full_text.chars().count(),
            confidence_score: self.confidence_score,
            has_form_fields: !self.form_fields.is_empty(),
            has_tables: !self.tables.is_empty(),
            has_images: !self.images_info.is_empty(),
        }
    }
}

/// Cheap overview of a parsed document for status listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_type: DocumentType,
    pub page_count: u32,
    pub form_fields_count: usize,
    pub tables_count: usize,
    pub images_count: usize,
    pub text_length: usize,
    pub confidence_score: f64,
    pub has_form_fields: bool,
    pub has_tables: bool,
    pub has_images: bool,
}

/// Char-boundary-safe prefix.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ===== ANALYSIS TYPES =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGuidance {
    pub field_name: String,
    pub field_type: String,
    pub guidance: String,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub summary: String,
    pub key_information: serde_json::Map<String, serde_json::Value>,
    pub form_fields_analysis: Vec<FieldGuidance>,
    pub recommendations: Vec<String>,
    pub questions_answered: BTreeMap<String, String>,
    pub confidence_score: f64,
}
