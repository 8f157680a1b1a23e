use crate::Display;
use docstore::DocumentModel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, DocumentModel)]
#[document(collection = "event")]
pub struct Event {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub poster: Option<String>,
    /// Email of the organiser running the event.
    #[serde(default)]
    pub organiser: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl Event {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_closed(&self) -> bool {
        self.status.as_deref() == Some("closed")
    }

    pub fn matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

impl Display for Event {
    fn display(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "venue": self.venue,
            "poster": self.poster,
            "organiser": self.organiser,
            "isClosed": self.is_closed(),
        })
    }
}
