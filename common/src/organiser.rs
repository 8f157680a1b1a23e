use crate::Display;
use docstore::DocumentModel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Marks an email as belonging to an organiser. Records are created outside
/// the portal; existence is the whole authorization signal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, DocumentModel)]
#[document(collection = "organiser")]
pub struct OrganiserRecord {
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrganiserProfile {
    pub name: String,
    pub email: String,
}

impl Display for OrganiserProfile {
    fn display(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "initial": self.name.chars().next().map(|c| c.to_uppercase().to_string()),
        })
    }
}
