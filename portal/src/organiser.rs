use crate::error::ManagerError;
use crate::session::SessionContext;
use crate::timeout::bounded;
use docstore::{DocumentStore, ModelStore};
use keyvalue_common::{Display, Event, OrganiserProfile, OrganiserRecord};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ORGANISER_NAME: &str = "Organizer";
pub const GUEST_NAME: &str = "Guest";
pub const UNKNOWN_NAME: &str = "Not provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFilter {
    #[default]
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganiserDashboard {
    pub organiser_name: String,
    pub active: Vec<Event>,
    pub closed: Vec<Event>,
}

impl OrganiserDashboard {
    fn guest() -> Self {
        OrganiserDashboard {
            organiser_name: String::from(GUEST_NAME),
            active: Vec::new(),
            closed: Vec::new(),
        }
    }

    /// Events in one tab whose name contains `query`, ignoring case.
    pub fn events(&self, filter: EventFilter, query: &str) -> Vec<&Event> {
        let tab = match filter {
            EventFilter::Active => &self.active,
            EventFilter::Closed => &self.closed,
        };
        tab.iter().filter(|event| event.matches(query)).collect()
    }
}

impl Display for OrganiserDashboard {
    fn display(&self) -> Value {
        json!({
            "organiserName": self.organiser_name,
            "active": self.active.display(),
            "closed": self.closed.display(),
        })
    }
}

/// Read side of the organiser's own pages: events and profile.
#[derive(Clone)]
pub struct OrganiserDesk {
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    timeout: Duration,
}

impl OrganiserDesk {
    pub fn new(store: Arc<dyn DocumentStore>, session: SessionContext, timeout: Duration) -> Self {
        OrganiserDesk {
            store,
            session,
            timeout,
        }
    }

    async fn organiser_name(&self, email: &str) -> Result<Option<String>, ManagerError> {
        let record = bounded(self.timeout, self.store.fetch::<OrganiserRecord>(email))
            .await
            .map_err(ManagerError::RemoteRead)?;
        Ok(record
            .map(|record| record.name)
            .filter(|name| !name.trim().is_empty()))
    }

    pub async fn dashboard(&self) -> Result<OrganiserDashboard, ManagerError> {
        let email = match self.session.email() {
            Some(email) => email,
            None => return Ok(OrganiserDashboard::guest()),
        };

        let organiser_name = match self.organiser_name(&email).await {
            Ok(name) => name.unwrap_or_else(|| String::from(DEFAULT_ORGANISER_NAME)),
            Err(e) => {
                warn!("could not read organiser name for {}: {}", email, e);
                String::from(DEFAULT_ORGANISER_NAME)
            }
        };

        let events = bounded(self.timeout, self.store.fetch_all::<Event>())
            .await
            .map_err(ManagerError::RemoteRead)?;
        let (closed, active) = events
            .into_iter()
            .map(|(id, event)| event.with_id(id))
            .filter(|event| event.organiser == email)
            .partition(Event::is_closed);

        Ok(OrganiserDashboard {
            organiser_name,
            active,
            closed,
        })
    }

    pub async fn profile(&self) -> Result<OrganiserProfile, ManagerError> {
        let email = self.session.email().ok_or(ManagerError::NotSignedIn)?;
        let name = self
            .organiser_name(&email)
            .await?
            .unwrap_or_else(|| String::from(UNKNOWN_NAME));
        Ok(OrganiserProfile { name, email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_organiser, signed_in, TIMEOUT};
    use docstore::{MemoryStore, WriteMode};

    async fn seed_event(store: &MemoryStore, id: &str, name: &str, organiser: &str, status: Option<&str>) {
        let event = Event {
            id: String::new(),
            name: name.to_string(),
            venue: String::from("Main hall"),
            poster: None,
            organiser: organiser.to_string(),
            status: status.map(str::to_string),
        };
        store.save(id, &event, WriteMode::Replace).await.unwrap();
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        seed_organiser(&store, "boss@x.com", "Asha").await;
        seed_event(&store, "e1", "Spring Fest", "boss@x.com", None).await;
        seed_event(&store, "e2", "Winter Gala", "boss@x.com", Some("closed")).await;
        seed_event(&store, "e3", "Hack Night", "boss@x.com", Some("open")).await;
        seed_event(&store, "e4", "Other Fest", "other@x.com", None).await;
        store
    }

    #[tokio::test]
    async fn test_dashboard_splits_own_events() {
        let store = seeded().await;
        let desk = OrganiserDesk::new(Arc::new(store), signed_in("boss@x.com"), TIMEOUT);
        let dashboard = desk.dashboard().await.unwrap();
        assert_eq!(dashboard.organiser_name, "Asha");

        let active: Vec<&str> = dashboard
            .events(EventFilter::Active, "")
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(active, vec!["e1", "e3"]);
        assert_eq!(dashboard.closed.len(), 1);
        assert_eq!(dashboard.events(EventFilter::Active, "FEST").len(), 1);
        assert!(dashboard.events(EventFilter::Closed, "fest").is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_for_guest_and_unnamed_organiser() {
        let store = seeded().await;
        let guest = OrganiserDesk::new(Arc::new(store.clone()), SessionContext::new(), TIMEOUT);
        let dashboard = guest.dashboard().await.unwrap();
        assert_eq!(dashboard.organiser_name, GUEST_NAME);
        assert!(dashboard.active.is_empty());

        let other = OrganiserDesk::new(Arc::new(store), signed_in("other@x.com"), TIMEOUT);
        let dashboard = other.dashboard().await.unwrap();
        assert_eq!(dashboard.organiser_name, DEFAULT_ORGANISER_NAME);
        assert_eq!(dashboard.active.len(), 1);
    }

    #[tokio::test]
    async fn test_profile() {
        let store = seeded().await;
        let desk = OrganiserDesk::new(Arc::new(store.clone()), signed_in("boss@x.com"), TIMEOUT);
        let profile = desk.profile().await.unwrap();
        assert_eq!(profile.name, "Asha");
        assert_eq!(profile.display()["initial"], json!("A"));

        let unnamed = OrganiserDesk::new(Arc::new(store.clone()), signed_in("new@x.com"), TIMEOUT);
        assert_eq!(unnamed.profile().await.unwrap().name, UNKNOWN_NAME);

        let nobody = OrganiserDesk::new(Arc::new(store), SessionContext::new(), TIMEOUT);
        assert!(matches!(nobody.profile().await, Err(ManagerError::NotSignedIn)));
    }
}
