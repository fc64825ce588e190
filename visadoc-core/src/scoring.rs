//! Heuristic confidence scores.
//!
//! Both scores are coarse additive models with fixed weights. They are
//! quality estimates, not probabilities.

use crate::classifier::DocumentClassifier;
use crate::types::{DocumentType, FormField, ParsedDocument, TableData};

pub const TEXT_WEIGHT: f64 = 0.3;
pub const FIELDS_WEIGHT: f64 = 0.2;
pub const TABLES_WEIGHT: f64 = 0.2;
pub const CLASSIFIED_WEIGHT: f64 = 0.3;

/// Minimum trimmed text length (chars) that counts as a successful extraction.
pub const MIN_TEXT_CHARS: usize = 100;

/// Score how complete an extraction looks.
///
/// Re-runs classification on `text` rather than trusting a caller-supplied
/// label, so the score depends only on its inputs.
pub fn parsing_confidence(text: &str, form_fields: &[FormField], tables: &[TableData]) -> f64 {
    let mut score = 0.0;

    if text.trim().chars().count() > MIN_TEXT_CHARS {
        score += TEXT_WEIGHT;
    }
    if !form_fields.is_empty() {
        score += FIELDS_WEIGHT;
    }
    if !tables.is_empty() {
        score += TABLES_WEIGHT;
    }
    if DocumentClassifier::new().classify(text).is_known() {
        score += CLASSIFIED_WEIGHT;
    }

    clamp_unit(score)
}

pub const ANALYSIS_BASE_WEIGHT: f64 = 0.4;
pub const ANALYSIS_SUMMARY_WEIGHT: f64 = 0.2;
pub const ANALYSIS_KEY_INFO_WEIGHT: f64 = 0.2;
pub const ANALYSIS_FIELDS_WEIGHT: f64 = 0.1;
pub const ANALYSIS_CLASSIFIED_WEIGHT: f64 = 0.1;

/// Overall confidence of a comprehensive analysis.
pub fn analysis_confidence(doc: &ParsedDocument, summary: &str, key_info_entries: usize) -> f64 {
    let mut score = doc.confidence_score * ANALYSIS_BASE_WEIGHT;

    if summary.chars().count() > 200 {
        score += ANALYSIS_SUMMARY_WEIGHT;
    }
    if key_info_entries > 3 {
        score += ANALYSIS_KEY_INFO_WEIGHT;
    }
    if !doc.form_fields.is_empty() {
        score += ANALYSIS_FIELDS_WEIGHT;
    }
    if doc.document_type != DocumentType::Unknown {
        score += ANALYSIS_CLASSIFIED_WEIGHT;
    }

    clamp_unit(score)
}

fn clamp_unit(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}
