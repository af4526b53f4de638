use serde::{Deserialize, Serialize};

/// `{ "status": "..." }`, the body of every non-list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

impl StatusBody {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// Body of `POST /api/test-login-db`. Fields are optional so that a missing
/// field is a validation failure rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of `POST /api/add-project`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProjectRequest {
    #[serde(default)]
    pub researcher_name: Option<String>,
    #[serde(default)]
    pub project_title: Option<String>,
}

/// An absent or empty string counts as missing.
pub fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}
