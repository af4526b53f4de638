use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::{Row, SqlValue};

/// A project as stored; `created_at` is assigned by the server on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub researcher_name: String,
    pub project_title: String,
    pub created_at: DateTime<Utc>,
}

impl ProjectRecord {
    pub fn new(researcher_name: impl Into<String>, project_title: impl Into<String>) -> Self {
        Self {
            researcher_name: researcher_name.into(),
            project_title: project_title.into(),
            created_at: Utc::now(),
        }
    }
}

/// What the list endpoint exposes for each project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub researcher_name: String,
    pub project_title: String,
}

impl ProjectSummary {
    /// Reads `(ResearcherName, ProjectTitle)`. Returns `None` when the row
    /// does not have two text columns.
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            researcher_name: row.get(0).and_then(SqlValue::as_text)?.to_string(),
            project_title: row.get(1).and_then(SqlValue::as_text)?.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_from_two_text_columns() {
        let row = Row(vec![SqlValue::from("Ada"), SqlValue::from("Engines")]);
        assert_eq!(
            ProjectSummary::from_row(&row),
            Some(ProjectSummary {
                researcher_name: "Ada".into(),
                project_title: "Engines".into(),
            })
        );
    }

    #[test]
    fn summary_rejects_short_or_mistyped_rows() {
        assert_eq!(ProjectSummary::from_row(&Row(vec![SqlValue::from("Ada")])), None);
        assert_eq!(
            ProjectSummary::from_row(&Row(vec![SqlValue::from("Ada"), SqlValue::Null])),
            None
        );
    }

    #[test]
    fn summary_serializes_camel_case() {
        let json = serde_json::to_value(ProjectSummary {
            researcher_name: "Ada".into(),
            project_title: "Engines".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"researcherName": "Ada", "projectTitle": "Engines"})
        );
    }
}
