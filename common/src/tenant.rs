use crate::validation::{require, ValidationError};
use crate::Display;
use docstore::DocumentModel;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Number, Value};

/// A resident. The id is the document key and is not stored in the body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, DocumentModel)]
#[document(collection = "tenants")]
pub struct Tenant {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "contact_number")]
    pub contact: u64,
    #[serde(default)]
    pub room: String,
}

/// Reads a phone number stored as an integer, a whole float (older records
/// round-trip through BSON doubles) or a digit string.
fn contact_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let whole = |n: &Number| {
        n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                .map(|f| f as u64)
        })
    };
    match Value::deserialize(deserializer)? {
        Value::Number(n) => {
            whole(&n).ok_or_else(|| de::Error::custom(format!("contact {} is not a whole number", n)))
        }
        Value::String(raw) => raw
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("contact {:?} is not a number", raw))),
        other => Err(de::Error::custom(format!("contact {} is not a number", other))),
    }
}

impl Tenant {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Roster search: name, id or room contains `query`, ignoring case.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        contains(&self.name, &query) || contains(&self.id, &query) || contains(&self.room, &query)
    }

    /// Ledger search: name or id contains `query`, ignoring case.
    pub fn matches_rent_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        contains(&self.name, &query) || contains(&self.id, &query)
    }
}

fn contains(field: &str, lowered_query: &str) -> bool {
    field.to_lowercase().contains(lowered_query)
}

impl Display for Tenant {
    fn display(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "contact": self.contact,
            "room": self.room,
        })
    }
}

/// The add-tenant form as submitted.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NewTenant {
    pub id: String,
    pub name: String,
    pub contact: String,
    pub room: String,
}

impl NewTenant {
    pub fn new(id: &str, name: &str, contact: &str, room: &str) -> Self {
        NewTenant {
            id: id.to_string(),
            name: name.to_string(),
            contact: contact.to_string(),
            room: room.to_string(),
        }
    }

    pub fn validate(&self) -> Result<Tenant, ValidationError> {
        let id = require("tenant id", &self.id)?;
        let name = require("name", &self.name)?;
        let contact = require("contact", &self.contact)?;
        let room = require("room", &self.room)?;
        let contact = contact
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidNumber {
                field: "contact",
                value: contact.to_string(),
            })?;
        Ok(Tenant {
            id: id.to_string(),
            name: name.to_string(),
            contact,
            room: room.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(id: &str, name: &str, room: &str) -> Tenant {
        Tenant {
            id: id.to_string(),
            name: name.to_string(),
            contact: 9876543210,
            room: room.to_string(),
        }
    }

    #[test]
    fn test_search_by_room_and_name() {
        let tenants = vec![tenant("T1", "Rao", "101"), tenant("T2", "Singh", "102")];

        let by_room: Vec<&str> = tenants
            .iter()
            .filter(|t| t.matches("10"))
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(by_room, vec!["T1", "T2"]);

        let by_name: Vec<&str> = tenants
            .iter()
            .filter(|t| t.matches("rao"))
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(by_name, vec!["T1"]);
    }

    #[test]
    fn test_rent_search_ignores_room() {
        let t = tenant("T1", "Rao", "101");
        assert!(t.matches_rent_search("t1"));
        assert!(t.matches_rent_search("RA"));
        assert!(!t.matches_rent_search("101"));
        assert!(t.matches_rent_search(""));
    }

    #[test]
    fn test_new_tenant_validation() {
        let ok = NewTenant::new("T1", " Rao ", "9876543210", "101").validate().unwrap();
        assert_eq!(ok, tenant("T1", "Rao", "101"));

        assert_eq!(
            NewTenant::new("T1", "Rao", "98-76", "101").validate(),
            Err(ValidationError::InvalidNumber {
                field: "contact",
                value: String::from("98-76")
            })
        );
        assert_eq!(
            NewTenant::new("T1", "Rao", "1", "").validate(),
            Err(ValidationError::MissingField("room"))
        );
    }

    #[test]
    fn test_stored_body_excludes_id() {
        let body = serde_json::to_value(tenant("T1", "Rao", "101")).unwrap();
        assert_eq!(body, json!({"name": "Rao", "contact": 9876543210u64, "room": "101"}));

        let legacy: Tenant = serde_json::from_value(json!({"name": "Old", "contact": 5})).unwrap();
        assert_eq!(legacy.room, "");
    }

    #[test]
    fn test_contact_accepts_whole_floats_and_digit_strings() {
        let from_double: Tenant =
            serde_json::from_value(json!({"name": "Rao", "contact": 9876543210.0})).unwrap();
        assert_eq!(from_double.contact, 9876543210);
        let from_text: Tenant =
            serde_json::from_value(json!({"name": "Rao", "contact": " 98765 "})).unwrap();
        assert_eq!(from_text.contact, 98765);

        for bad in [json!(98.5), json!(-1), json!("98-76"), json!(null)] {
            assert!(
                serde_json::from_value::<Tenant>(json!({"name": "Rao", "contact": bad})).is_err(),
                "{} should be rejected",
                bad
            );
        }
    }
}
