use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Success,
    Warning,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Warning => "warning",
            Status::Error => "error",
        }
    }

    /// Lenient parse of a model-supplied status label. Anything unknown is
    /// treated as success.
    pub fn from_model(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "warning" => Status::Warning,
            "error" => Status::Error,
            _ => Status::Success,
        }
    }

    fn severity(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::Warning => 1,
            Status::Error => 2,
        }
    }

    /// Error dominates warning, warning dominates success.
    pub fn worst(self, other: Status) -> Status {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// One reference as reported by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationRecord {
    pub result: String,
    pub status: Status,
    pub changes: Vec<String>,
}

impl CitationRecord {
    /// Extracts a record from arbitrary JSON. Missing or mistyped fields fall
    /// back to their defaults; non-objects yield the default record.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let result = object
            .get("result")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let status = object
            .get("status")
            .and_then(Value::as_str)
            .map(Status::from_model)
            .unwrap_or_default();

        let changes = object
            .get("changes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            result,
            status,
            changes,
        }
    }

    pub fn has_result(&self) -> bool {
        !self.result.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedResult {
    pub formatted: String,
    pub status: Status,
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatRequest {
    #[serde(default)]
    pub text: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub endpoint_configured: bool,
}
