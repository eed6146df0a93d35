//! Request and response types for the ElecMate upload API.
//!
//! All structs use camelCase serialization to match the API's JSON format.

use serde::{Deserialize, Serialize};

/// Metadata attached to a site photo or document upload.
///
/// The queue stores this verbatim next to the file and hands it back to
/// the uploader unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadOptions {
    pub description: String,
    /// Photo category (e.g. "safety", "eicr", "before-after").
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,
}

/// Record returned by POST /uploads once the file is stored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub file_url: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_serialization_skips_empty_fields() {
        let options = PhotoUploadOptions {
            description: "Consumer unit before works".to_string(),
            category: "safety".to_string(),
            tags: vec!["cu".to_string()],
            project_reference: Some("JOB-042".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"projectReference\":\"JOB-042\""));
        assert!(json.contains("\"tags\":[\"cu\"]"));
        assert!(!json.contains("gpsLatitude"));
        assert!(!json.contains("location"));
    }

    #[test]
    fn test_uploaded_file_deserialization() {
        let json = r#"{ "id": "p-1", "fileUrl": "https://cdn.example.com/p-1.jpg" }"#;
        let record: UploadedFile = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "p-1");
        assert_eq!(record.file_url, "https://cdn.example.com/p-1.jpg");
        assert_eq!(record.file_size, None);
    }
}
