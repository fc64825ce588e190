//! Prompt templates.
//!
//! Each builder receives the number of characters of document text it may
//! include and always sends a prefix of the full text, never the whole
//! document.

use crate::types::{truncate_chars, FormField, ParsedDocument};

pub fn summary(doc: &ParsedDocument, input_chars: usize) -> String {
    format!(
        "Analyze this immigration document and provide a comprehensive summary.\n\
         \n\
         Document Type: {doc_type}\n\
         Page Count: {pages}\n\
         \n\
         Document Content:\n\
         {content}\n\
         \n\
         Please provide:\n\
         1. Document purpose and type\n\
         2. Key requirements and deadlines\n\
         3. Required supporting documents\n\
         4. Important instructions\n\
         5. Potential issues or concerns\n\
         \n\
         Format your response as a clear, structured summary.",
        doc_type = doc.document_type,
        pages = doc.metadata.page_count,
        content = doc.text_prefix(input_chars),
    )
}

pub fn key_information(doc: &ParsedDocument, input_chars: usize) -> String {
    format!(
        "Extract key information from this immigration document in JSON format.\n\
         \n\
         Document Type: {doc_type}\n\
         \n\
         Document Content:\n\
         {content}\n\
         \n\
         Please extract and return as JSON:\n\
         {{\n  \
           \"form_number\": \"form number if applicable\",\n  \
           \"deadlines\": [\"list of important deadlines\"],\n  \
           \"required_documents\": [\"list of required supporting documents\"],\n  \
           \"fees\": [\"list of fees and payment methods\"],\n  \
           \"eligibility_requirements\": [\"list of eligibility criteria\"],\n  \
           \"processing_time\": \"estimated processing time\",\n  \
           \"contact_information\": \"relevant contact details\",\n  \
           \"special_instructions\": [\"any special instructions or notes\"]\n\
         }}",
        doc_type = doc.document_type,
        content = doc.text_prefix(input_chars),
    )
}

/// Field descriptors are small, so no document text is included.
pub fn field_guidance(doc: &ParsedDocument, field: &FormField) -> String {
    format!(
        "Analyze this form field from an immigration document:\n\
         \n\
         Field Name: {name}\n\
         Field Type: {kind}\n\
         Current Value: {value}\n\
         Document Type: {doc_type}\n\
         \n\
         Provide guidance on:\n\
         1. What information should be entered\n\
         2. Format requirements\n\
         3. Common mistakes to avoid\n\
         4. Required supporting documents\n\
         \n\
         Keep response concise and practical.",
        name = field.field_name,
        kind = field.field_type,
        value = field.field_value,
        doc_type = doc.document_type,
    )
}

pub fn recommendations(doc: &ParsedDocument, input_chars: usize) -> String {
    format!(
        "Based on this immigration document, provide 5-7 actionable recommendations:\n\
         \n\
         Document Type: {doc_type}\n\
         Document Content: {content}\n\
         \n\
         Focus on:\n\
         - Next steps to take\n\
         - Documents to gather\n\
         - Deadlines to meet\n\
         - Common pitfalls to avoid\n\
         - Resources to consult\n\
         \n\
         Format as a numbered list of clear, actionable items.",
        doc_type = doc.document_type,
        content = doc.text_prefix(input_chars),
    )
}

pub fn answer(doc: &ParsedDocument, question: &str, input_chars: usize) -> String {
    format!(
        "Answer this question based on the immigration document:\n\
         \n\
         Question: {question}\n\
         \n\
         Document Type: {doc_type}\n\
         Document Content: {content}\n\
         \n\
         Provide a clear, accurate answer based on the document content.\n\
         If the information is not available in the document, state that clearly.",
        doc_type = doc.document_type,
        content = doc.text_prefix(input_chars),
    )
}

/// `target_language` is forwarded verbatim.
pub fn translate(doc: &ParsedDocument, target_language: &str, input_chars: usize) -> String {
    format!(
        "Translate this immigration document content to {target_language}.\n\
         Maintain the original formatting and structure.\n\
         Keep legal terms accurate and provide context where needed.\n\
         \n\
         Document Content:\n\
         {content}",
        content = doc.text_prefix(input_chars),
    )
}

pub fn simplify(doc: &ParsedDocument, input_chars: usize) -> String {
    format!(
        "Simplify this immigration document content to make it easier to understand.\n\
         Replace complex legal terms with simpler explanations.\n\
         Maintain accuracy while improving readability.\n\
         \n\
         Document Content:\n\
         {content}",
        content = doc.text_prefix(input_chars),
    )
}

pub fn faq(doc: &ParsedDocument, input_chars: usize) -> String {
    format!(
        "Generate 5-7 frequently asked questions about this immigration document.\n\
         \n\
         Document Type: {doc_type}\n\
         Document Content: {content}\n\
         \n\
         Return as JSON array:\n\
         [\n  \
           {{\"question\": \"question text\", \"answer\": \"detailed answer\"}},\n  \
           ...\n\
         ]",
        doc_type = doc.document_type,
        content = doc.text_prefix(input_chars),
    )
}

/// Characters of document text a prompt would carry under `input_chars`.
pub fn included_chars(doc: &ParsedDocument, input_chars: usize) -> usize {
    truncate_chars(&doc.full_text, input_chars).chars().count()
}
