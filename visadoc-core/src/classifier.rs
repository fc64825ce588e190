use crate::types::DocumentType;

/// Ordered registry of USCIS form identifiers. The first entry with any
/// matching pattern wins, so earlier forms shadow later ones.
const FORM_PATTERNS: &[(DocumentType, &[&str])] = &[
    (DocumentType::I130, &["i-130", "petition for alien relative"]),
    (
        DocumentType::I485,
        &["i-485", "application to register permanent residence"],
    ),
    (
        DocumentType::I765,
        &["i-765", "application for employment authorization"],
    ),
    (DocumentType::I821D, &["i-821d", "daca", "deferred action"]),
    (
        DocumentType::I90,
        &["i-90", "application to replace permanent resident card"],
    ),
    (DocumentType::N400, &["n-400", "application for naturalization"]),
    (DocumentType::I864, &["i-864", "affidavit of support"]),
    (DocumentType::I693, &["i-693", "report of medical examination"]),
    (DocumentType::G1145, &["g-1145", "e-notification"]),
    (DocumentType::I131, &["i-131", "application for travel document"]),
];

/// Pattern-based document classifier.
///
/// Total and deterministic: holds no state and always returns a label,
/// falling back to [`DocumentType::Unknown`].
pub struct DocumentClassifier;

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> DocumentType {
        let text_lower = text.to_lowercase();

        if let Some(form) = Self::match_form(&text_lower) {
            return form;
        }

        Self::match_generic(&text_lower).unwrap_or(DocumentType::Unknown)
    }

    /// Registry labels in iteration order, for diagnostics and tests.
    pub fn registry_order() -> impl Iterator<Item = DocumentType> {
        FORM_PATTERNS.iter().map(|(doc_type, _)| *doc_type)
    }

    fn match_form(text_lower: &str) -> Option<DocumentType> {
        FORM_PATTERNS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| text_lower.contains(p)))
            .map(|(doc_type, _)| *doc_type)
    }

    fn match_generic(text_lower: &str) -> Option<DocumentType> {
        if text_lower.contains("passport") {
            Some(DocumentType::Passport)
        } else if text_lower.contains("birth certificate") {
            Some(DocumentType::BirthCertificate)
        } else if text_lower.contains("marriage certificate") {
            Some(DocumentType::MarriageCertificate)
        } else if text_lower.contains("divorce decree") {
            Some(DocumentType::DivorceDecree)
        } else if text_lower.contains("employment") && text_lower.contains("authorization") {
            Some(DocumentType::EmploymentAuthorization)
        } else {
            None
        }
    }
}

/// Convenience wrapper for callers that only need a label.
pub fn classify(text: &str) -> DocumentType {
    DocumentClassifier::new().classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_petition_for_alien_relative() {
        let text = "Form I-130, Petition for Alien Relative. Department of Homeland Security";
        assert_eq!(classify(text), DocumentType::I130);
    }

    #[test]
    fn test_registry_order_pins_i130_before_i485() {
        let text = "Submit Form I-485 together with Form I-130 when filing concurrently.";
        assert_eq!(classify(text), DocumentType::I130);

        let order: Vec<_> = DocumentClassifier::registry_order().collect();
        let i130 = order.iter().position(|t| *t == DocumentType::I130).unwrap();
        let i485 = order.iter().position(|t| *t == DocumentType::I485).unwrap();
        assert!(i130 < i485);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("APPLICATION FOR NATURALIZATION"), DocumentType::N400);
        assert_eq!(classify("Deferred Action for Childhood Arrivals"), DocumentType::I821D);
    }

    #[test]
    fn test_substring_semantics_preserved() {
        // "i-90" is a prefix of "i-901"
        assert_eq!(classify("I-901 SEVIS fee receipt"), DocumentType::I90);
    }

    #[test]
    fn test_generic_categories_in_order() {
        assert_eq!(
            classify("Passport and birth certificate copies"),
            DocumentType::Passport
        );
        assert_eq!(
            classify("Certified birth certificate"),
            DocumentType::BirthCertificate
        );
        assert_eq!(
            classify("Marriage certificate issued by the county"),
            DocumentType::MarriageCertificate
        );
        assert_eq!(
            classify("Final divorce decree"),
            DocumentType::DivorceDecree
        );
        assert_eq!(
            classify("Proof of employment and work authorization"),
            DocumentType::EmploymentAuthorization
        );
    }

    #[test]
    fn test_form_patterns_beat_generic_checks() {
        assert_eq!(
            classify("Application for Employment Authorization, attach passport photo"),
            DocumentType::I765
        );
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(classify(""), DocumentType::Unknown);
        assert_eq!(classify("grocery list: eggs, milk"), DocumentType::Unknown);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let classifier = DocumentClassifier::new();
        let a = classifier.classify("Affidavit of Support Under Section 213A");
        let _ = classifier.classify("Report of Medical Examination");
        let b = classifier.classify("Affidavit of Support Under Section 213A");
        assert_eq!(a, b);
        assert_eq!(a, DocumentType::I864);
    }
}
