//! Builder patterns for creating store documents in tests.

#![allow(dead_code)]

use serde_json::{json, Map, Value};

use jobscout::store::Document;

/// Builder for job posting documents as the extraction pipeline writes them.
pub struct JobDocBuilder {
    id: String,
    fields: Map<String, Value>,
}

impl JobDocBuilder {
    pub fn new(id: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("job_title".to_string(), json!(format!("Job {}", id)));
        fields.insert("location".to_string(), json!("Tel Aviv"));
        fields.insert(
            "post_link".to_string(),
            json!(format!("https://facebook.com/groups/1/posts/{}", id)),
        );
        Self {
            id: id.to_string(),
            fields,
        }
    }

    pub fn title(self, title: &str) -> Self {
        self.field("job_title", json!(title))
    }

    pub fn status(self, status: &str) -> Self {
        self.field("status", json!(status))
    }

    /// Server timestamp form, `{seconds, nanoseconds}`.
    pub fn posted_at(self, seconds: i64) -> Self {
        self.field("post_time", json!({ "seconds": seconds, "nanoseconds": 0 }))
    }

    pub fn wage(self, wage: &str) -> Self {
        self.field("wage_per_hour", json!(wage))
    }

    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn build(self) -> Document {
        Document::new(self.id, self.fields)
    }
}

/// Builder for schedule documents.
pub struct ScheduleDocBuilder {
    id: String,
    fields: Map<String, Value>,
}

impl ScheduleDocBuilder {
    pub fn new(id: &str, group_id: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("groupID".to_string(), json!(group_id));
        fields.insert("interval".to_string(), json!(1440));
        fields.insert("maxScrolls".to_string(), json!(5));
        Self {
            id: id.to_string(),
            fields,
        }
    }

    pub fn interval(mut self, minutes: u32) -> Self {
        self.fields.insert("interval".to_string(), json!(minutes));
        self
    }

    pub fn max_scrolls(mut self, scrolls: u32) -> Self {
        self.fields.insert("maxScrolls".to_string(), json!(scrolls));
        self
    }

    pub fn created_at(mut self, seconds: i64) -> Self {
        self.fields
            .insert("createdAt".to_string(), json!({ "seconds": seconds }));
        self
    }

    pub fn last_run(mut self, total_jobs: u64, completed_at: &str) -> Self {
        self.fields.insert(
            "lastRunStats".to_string(),
            json!({ "totalJobs": total_jobs, "breakdown": {}, "timestamp": completed_at }),
        );
        self
    }

    pub fn build(self) -> Document {
        Document::new(self.id, self.fields)
    }
}
