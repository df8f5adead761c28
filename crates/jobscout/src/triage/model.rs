//! Job postings as read from the jobs collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Document;

/// Review state of a posting. Each status is also the board bucket it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageStatus {
    New,
    Shortlisted,
    Contacted,
    Rejected,
}

impl TriageStatus {
    pub const ALL: [TriageStatus; 4] = [
        TriageStatus::New,
        TriageStatus::Shortlisted,
        TriageStatus::Contacted,
        TriageStatus::Rejected,
    ];

    /// Maps a stored status string to a status. Matching ignores case;
    /// absent or unrecognized values mean `New`.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return TriageStatus::New;
        };
        match raw.to_lowercase().as_str() {
            "new" => TriageStatus::New,
            "shortlisted" => TriageStatus::Shortlisted,
            "contacted" => TriageStatus::Contacted,
            "rejected" => TriageStatus::Rejected,
            other => {
                log::debug!("Unknown job status '{}', treating as new", other);
                TriageStatus::New
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriageStatus::New => "new",
            TriageStatus::Shortlisted => "shortlisted",
            TriageStatus::Contacted => "contacted",
            TriageStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for TriageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// A structured job posting produced by the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shifts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    pub post_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    pub status: TriageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl JobPosting {
    pub fn from_document(doc: &Document) -> Self {
        let text = |field: &str| doc.get(field).and_then(value_text);

        Self {
            id: doc.id.clone(),
            title: text("job_title").unwrap_or_default(),
            location: text("location").unwrap_or_default(),
            wage: text("wage_per_hour"),
            shifts: text("shifts"),
            requirements: text("requirements"),
            contact_info: text("contact_info"),
            post_link: text("post_link").unwrap_or_default(),
            posted_at: doc.get_timestamp("post_time"),
            status: TriageStatus::normalize(doc.get_str("status")),
            last_updated_at: doc.get_timestamp("lastUpdated"),
        }
    }
}

/// Non-empty text of a scalar field. Numbers are rendered as written.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_table() {
        let cases = [
            (None, TriageStatus::New),
            (Some("new"), TriageStatus::New),
            (Some("NEW"), TriageStatus::New),
            (Some("Shortlisted"), TriageStatus::Shortlisted),
            (Some("CONTACTED"), TriageStatus::Contacted),
            (Some("rejected"), TriageStatus::Rejected),
            (Some(""), TriageStatus::New),
            (Some("archived"), TriageStatus::New),
            (Some(" rejected"), TriageStatus::New),
        ];
        for (raw, expected) in cases {
            assert_eq!(TriageStatus::normalize(raw), expected, "raw = {:?}", raw);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Contacted".parse::<TriageStatus>(), Ok(TriageStatus::Contacted));
        assert!("pending".parse::<TriageStatus>().is_err());
    }

    #[test]
    fn test_from_document() {
        let doc = Document::from_value(
            "j1",
            json!({
                "job_title": "Line cook",
                "location": "Haifa",
                "wage_per_hour": 40,
                "shifts": "Evening",
                "requirements": null,
                "contact_info": "050-0000000",
                "post_link": "https://facebook.com/groups/1/posts/2",
                "post_time": {"seconds": 1_700_000_000, "nanoseconds": 0},
                "status": "Shortlisted"
            }),
        )
        .unwrap();

        let job = JobPosting::from_document(&doc);
        assert_eq!(job.title, "Line cook");
        assert_eq!(job.wage.as_deref(), Some("40"));
        assert_eq!(job.requirements, None);
        assert_eq!(job.status, TriageStatus::Shortlisted);
        assert_eq!(job.posted_at.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(job.last_updated_at, None);
    }

    #[test]
    fn test_from_sparse_document() {
        let doc = Document::from_value("j2", json!({"post_time": "not a date"})).unwrap();
        let job = JobPosting::from_document(&doc);
        assert_eq!(job.title, "");
        assert_eq!(job.posted_at, None);
        assert_eq!(job.status, TriageStatus::New);
    }
}
