use crate::Display;
use chrono::{DateTime, Utc};
use docstore::DocumentModel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintStatus {
    Undone,
    Done,
    #[serde(other)]
    Unknown,
}

fn unknown_student() -> String {
    String::from("Unknown")
}

/// The open complaint for a room; the room number is the document key, so a
/// room holds at most one complaint at a time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, DocumentModel)]
#[document(collection = "maintenance")]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceComplaint {
    pub desc: String,
    pub status: ComplaintStatus,
    #[serde(default = "unknown_student")]
    pub student_email: String,
    pub timestamp: DateTime<Utc>,
}

impl MaintenanceComplaint {
    pub fn raise(desc: &str, student_email: Option<&str>) -> Self {
        MaintenanceComplaint {
            desc: desc.to_string(),
            status: ComplaintStatus::Undone,
            student_email: student_email.map(str::to_string).unwrap_or_else(unknown_student),
            timestamp: Utc::now(),
        }
    }
}

impl Display for MaintenanceComplaint {
    fn display(&self) -> Value {
        json!({
            "desc": self.desc,
            "status": self.status,
            "studentEmail": self.student_email,
            "timestamp": self.timestamp.to_rfc3339(),
        })
    }
}
