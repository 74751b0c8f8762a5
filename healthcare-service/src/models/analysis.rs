use crate::services::error::AnalysisError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use validator::Validate;

/// A document as submitted by the caller: bare text or a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentInput {
    Text(String),
    Record(DocumentRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Normalised document handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub id: String,
    pub text: String,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeHealthRequest {
    #[validate(length(min = 1, message = "No input documents"))]
    pub documents: Vec<DocumentInput>,
    /// Applies to documents that do not carry their own language.
    #[serde(default)]
    pub language: Option<String>,
}

impl AnalyzeHealthRequest {
    /// Parse and validate a raw request body.
    ///
    /// Fails with `InvalidInput` when the body is not a JSON object with a
    /// `documents` key or the documents are malformed, and with `EmptyInput`
    /// when `documents` is blank (null, false, zero, or an empty string,
    /// array or object).
    pub fn parse(body: &[u8]) -> Result<Self, AnalysisError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AnalysisError::invalid_input(format!("body is not JSON: {}", e)))?;

        let no_documents = match value.as_object().and_then(|o| o.get("documents")) {
            Some(documents) => is_blank(documents),
            None => {
                return Err(AnalysisError::invalid_input(
                    "body is not an object with a 'documents' field",
                ))
            }
        };
        if no_documents {
            return Err(AnalysisError::EmptyInput);
        }

        let request: Self = serde_json::from_value(value)
            .map_err(|e| AnalysisError::invalid_input(format!("malformed documents: {}", e)))?;
        request.validate().map_err(|_| AnalysisError::EmptyInput)?;
        request.check_unique_ids()?;

        Ok(request)
    }

    /// Documents in submission order. Bare strings and records without an id
    /// are identified by their zero-based position.
    pub fn text_documents(&self) -> Vec<TextDocument> {
        self.documents
            .iter()
            .enumerate()
            .map(|(idx, doc)| match doc {
                DocumentInput::Text(text) => TextDocument {
                    id: idx.to_string(),
                    text: text.clone(),
                    language: self.language.clone(),
                },
                DocumentInput::Record(record) => TextDocument {
                    id: record.id.clone().unwrap_or_else(|| idx.to_string()),
                    text: record.text.clone(),
                    language: record.language.clone().or_else(|| self.language.clone()),
                },
            })
            .collect()
    }

    fn check_unique_ids(&self) -> Result<(), AnalysisError> {
        let mut seen = HashSet::new();
        for doc in self.text_documents() {
            if !seen.insert(doc.id.clone()) {
                return Err(AnalysisError::invalid_input(format!(
                    "duplicate document id '{}'",
                    doc.id
                )));
            }
        }
        Ok(())
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// A recognised healthcare entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub text: String,
    pub category: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeHealthResponse {
    pub entities: Vec<ExtractedEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<AnalyzeHealthRequest, AnalysisError> {
        AnalyzeHealthRequest::parse(body.as_bytes())
    }

    #[test]
    fn test_parses_string_documents() {
        let request = parse(r#"{"documents": ["Patient takes 10mg aspirin daily", "No allergies"]}"#)
            .unwrap();
        let docs = request.text_documents();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "0");
        assert_eq!(docs[0].text, "Patient takes 10mg aspirin daily");
        assert_eq!(docs[1].id, "1");
        assert_eq!(docs[1].language, None);
    }

    #[test]
    fn test_parses_record_documents_with_language_fallback() {
        let request = parse(
            r#"{
                "language": "en",
                "documents": [
                    {"id": "note-a", "text": "BP 120/80"},
                    {"text": "Paciente con fiebre", "language": "es"}
                ]
            }"#,
        )
        .unwrap();
        let docs = request.text_documents();

        assert_eq!(docs[0].id, "note-a");
        assert_eq!(docs[0].language.as_deref(), Some("en"));
        assert_eq!(docs[1].id, "1");
        assert_eq!(docs[1].language.as_deref(), Some("es"));
    }

    #[test]
    fn test_missing_documents_is_invalid_input() {
        assert!(matches!(parse("{}"), Err(AnalysisError::InvalidInput { .. })));
        assert!(matches!(
            parse(r#"{"docs": ["x"]}"#),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_non_object_body_is_invalid_input() {
        assert!(matches!(parse("not json"), Err(AnalysisError::InvalidInput { .. })));
        assert!(matches!(parse(r#"["x"]"#), Err(AnalysisError::InvalidInput { .. })));
        assert!(matches!(parse(""), Err(AnalysisError::InvalidInput { .. })));
    }

    #[test]
    fn test_empty_or_null_documents_is_empty_input() {
        assert!(matches!(parse(r#"{"documents": []}"#), Err(AnalysisError::EmptyInput)));
        assert!(matches!(parse(r#"{"documents": null}"#), Err(AnalysisError::EmptyInput)));
    }

    #[test]
    fn test_blank_documents_of_any_shape_is_empty_input() {
        for body in [
            r#"{"documents": ""}"#,
            r#"{"documents": {}}"#,
            r#"{"documents": false}"#,
            r#"{"documents": 0}"#,
        ] {
            assert!(
                matches!(parse(body), Err(AnalysisError::EmptyInput)),
                "{} should be empty input",
                body
            );
        }
    }

    #[test]
    fn test_malformed_documents_is_invalid_input() {
        assert!(matches!(
            parse(r#"{"documents": "aspirin"}"#),
            Err(AnalysisError::InvalidInput { .. })
        ));
        assert!(matches!(
            parse(r#"{"documents": [42]}"#),
            Err(AnalysisError::InvalidInput { .. })
        ));
        assert!(matches!(
            parse(r#"{"documents": [{"id": "1"}]}"#),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = parse(r#"{"documents": [{"id": "1", "text": "a"}, "b"]}"#);
        assert!(matches!(result, Err(AnalysisError::InvalidInput { .. })));
    }

    #[test]
    fn test_entity_serializes_with_confidence_key() {
        let entity = ExtractedEntity {
            text: "aspirin".to_string(),
            category: "MedicationName".to_string(),
            confidence: 0.95,
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "aspirin", "category": "MedicationName", "confidence": 0.95})
        );
    }
}
