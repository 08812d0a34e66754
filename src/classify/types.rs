//! Classification result types

use serde::{Deserialize, Serialize};

use super::ClassificationFailure;

/// Category used when the classifier gives none
pub const DEFAULT_DOCUMENT_TYPE: &str = "Uncategorized";

/// Category-relative folder used when the classifier gives none
pub const DEFAULT_FOLDER_PATH: &str = "Main Folder";

/// Validated classifier output with defaults applied.
///
/// Strings are trimmed but otherwise exactly as the classifier returned them.
/// They are NOT safe for path construction until sanitized by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub document_type: String,
    pub suggested_file_name: String,
    pub folder_path: String,
    pub client_first_name: Option<String>,
    pub client_last_name: Option<String>,
}

/// Wire shape of the classifier reply. Every field is optional so that
/// omissions become defaults; wrong types still fail deserialization.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawClassification {
    #[serde(rename = "Document Type", alias = "document_type", default)]
    document_type: Option<String>,
    #[serde(rename = "Suggested File Name", alias = "suggested_file_name", default)]
    suggested_file_name: Option<String>,
    #[serde(rename = "Folder Path", alias = "folder_path", default)]
    folder_path: Option<String>,
    #[serde(rename = "Client First Name", alias = "client_first_name", default)]
    client_first_name: Option<String>,
    #[serde(rename = "Client Last Name", alias = "client_last_name", default)]
    client_last_name: Option<String>,
}

impl RawClassification {
    /// Parse a JSON value that must be an object of the expected shape
    pub(crate) fn from_value(value: serde_json::Value) -> Result<Self, ClassificationFailure> {
        if !value.is_object() {
            return Err(ClassificationFailure::parse(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| ClassificationFailure::parse(e.to_string()))
    }

    /// Apply defaults for missing or blank fields
    pub(crate) fn into_result(self, original_file_name: &str) -> ClassificationResult {
        ClassificationResult {
            document_type: non_blank(self.document_type)
                .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string()),
            suggested_file_name: non_blank(self.suggested_file_name)
                .unwrap_or_else(|| original_file_name.to_string()),
            folder_path: non_blank(self.folder_path)
                .unwrap_or_else(|| DEFAULT_FOLDER_PATH.to_string()),
            client_first_name: non_blank(self.client_first_name),
            client_last_name: non_blank(self.client_last_name),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_keys() {
        let raw = RawClassification::from_value(json!({
            "Document Type": "Bank Statement",
            "Suggested File Name": "Chase1234 From Jan1 to Jan31.pdf",
            "Folder Path": "Bank Statements",
            "Client First Name": "John",
            "Client Last Name": "Doe"
        }))
        .unwrap();
        let result = raw.into_result("statement.pdf");
        assert_eq!(result.document_type, "Bank Statement");
        assert_eq!(result.suggested_file_name, "Chase1234 From Jan1 to Jan31.pdf");
        assert_eq!(result.folder_path, "Bank Statements");
        assert_eq!(result.client_first_name.as_deref(), Some("John"));
        assert_eq!(result.client_last_name.as_deref(), Some("Doe"));
    }

    #[test]
    fn test_snake_case_keys() {
        let raw = RawClassification::from_value(json!({
            "document_type": "Paystub",
            "folder_path": "Paystubs",
        }))
        .unwrap();
        let result = raw.into_result("stub.pdf");
        assert_eq!(result.document_type, "Paystub");
        assert_eq!(result.folder_path, "Paystubs");
        assert_eq!(result.suggested_file_name, "stub.pdf");
    }

    #[test]
    fn test_defaults_for_missing_and_blank() {
        let raw = RawClassification::from_value(json!({
            "Document Type": "   ",
            "Client First Name": null,
            "Client Last Name": ""
        }))
        .unwrap();
        let result = raw.into_result("scan.docx");
        assert_eq!(result.document_type, DEFAULT_DOCUMENT_TYPE);
        assert_eq!(result.suggested_file_name, "scan.docx");
        assert_eq!(result.folder_path, DEFAULT_FOLDER_PATH);
        assert_eq!(result.client_first_name, None);
        assert_eq!(result.client_last_name, None);
    }

    #[test]
    fn test_values_are_trimmed() {
        let raw = RawClassification::from_value(json!({
            "Client First Name": "  John ",
        }))
        .unwrap();
        assert_eq!(
            raw.into_result("a.pdf").client_first_name.as_deref(),
            Some("John")
        );
    }

    #[test]
    fn test_wrong_field_type_is_parse_error() {
        let err = RawClassification::from_value(json!({
            "Document Type": 42
        }))
        .unwrap_err();
        assert!(matches!(err, ClassificationFailure::ResponseParseError { .. }));
    }

    #[test]
    fn test_non_object_is_parse_error() {
        for value in [json!(["Bank Statement", "x.pdf"]), json!("text"), json!(null)] {
            let err = RawClassification::from_value(value).unwrap_err();
            assert!(matches!(err, ClassificationFailure::ResponseParseError { .. }));
        }
    }
}
