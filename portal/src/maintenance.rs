//! Maintenance complaints, one per room, and live feeds of them.
use crate::error::ManagerError;
use crate::session::SessionContext;
use crate::timeout::bounded;
use docstore::{DocumentModel, DocumentStore, ModelStore, Snapshot, Subscription, WriteMode};
use futures::stream::{Map, StreamExt};
use keyvalue_common::{require, MaintenanceComplaint};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Live view of one room's complaint: `None` while the room has none.
/// Dropping the feed releases the underlying subscription.
pub type ComplaintFeed = Map<Subscription, fn(Snapshot) -> Option<MaintenanceComplaint>>;

fn decode_complaint(snapshot: Snapshot) -> Option<MaintenanceComplaint> {
    let doc = snapshot?;
    match doc.decode() {
        Ok(complaint) => Some(complaint),
        Err(e) => {
            warn!("unreadable complaint for room {}: {}", doc.key, e);
            None
        }
    }
}

#[derive(Clone)]
pub struct MaintenanceDesk {
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    timeout: Duration,
}

impl MaintenanceDesk {
    pub fn new(store: Arc<dyn DocumentStore>, session: SessionContext, timeout: Duration) -> Self {
        MaintenanceDesk {
            store,
            session,
            timeout,
        }
    }

    /// Files a complaint for `room`, replacing whatever the room had before.
    pub async fn raise_complaint(
        &self,
        room: &str,
        desc: &str,
    ) -> Result<MaintenanceComplaint, ManagerError> {
        let room = require("room number", room)?;
        let desc = require("description", desc)?;
        let email = self.session.email();
        let complaint = MaintenanceComplaint::raise(desc, email.as_deref());

        let confirmed = bounded(
            self.timeout,
            self.store.save(room, &complaint, WriteMode::Replace),
        )
        .await
        .map_err(|source| ManagerError::RemoteWrite {
            collection: MaintenanceComplaint::collection(),
            key: room.to_string(),
            source,
        })?;
        info!("complaint raised for room {} by {}", room, confirmed.student_email);
        Ok(confirmed)
    }

    pub async fn complaint(&self, room: &str) -> Result<Option<MaintenanceComplaint>, ManagerError> {
        let room = require("room number", room)?;
        bounded(self.timeout, self.store.fetch::<MaintenanceComplaint>(room))
            .await
            .map_err(ManagerError::RemoteRead)
    }

    pub async fn watch(&self, room: &str) -> Result<ComplaintFeed, ManagerError> {
        let room = require("room number", room)?;
        let subscription = bounded(
            self.timeout,
            self.store
                .subscribe(MaintenanceComplaint::collection(), room),
        )
        .await
        .map_err(ManagerError::RemoteRead)?;
        let decode: fn(Snapshot) -> Option<MaintenanceComplaint> = decode_complaint;
        Ok(subscription.map(decode))
    }

    pub fn watcher(&self) -> ComplaintWatcher {
        ComplaintWatcher {
            desk: self.clone(),
            room: None,
            feed: None,
        }
    }
}

/// Follows the complaint of whichever room is currently selected, holding
/// at most one subscription.
pub struct ComplaintWatcher {
    desk: MaintenanceDesk,
    room: Option<String>,
    feed: Option<ComplaintFeed>,
}

impl ComplaintWatcher {
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn is_watching(&self) -> bool {
        self.feed.is_some()
    }

    /// Switches to `room`. The previous subscription is released first; a
    /// blank room leaves the watcher idle.
    pub async fn set_room(&mut self, room: &str) -> Result<(), ManagerError> {
        let room = room.trim();
        if self.feed.is_some() && self.room.as_deref() == Some(room) {
            return Ok(());
        }
        self.release();
        if room.is_empty() {
            return Ok(());
        }
        let feed = self.desk.watch(room).await?;
        debug!("watching complaints for room {}", room);
        self.room = Some(room.to_string());
        self.feed = Some(feed);
        Ok(())
    }

    pub fn release(&mut self) {
        if let Some(room) = self.room.take() {
            debug!("released complaint feed for room {}", room);
        }
        self.feed = None;
    }

    /// Next snapshot of the watched room. `None` when idle or when the store
    /// closed the feed.
    pub async fn next(&mut self) -> Option<Option<MaintenanceComplaint>> {
        match self.feed.as_mut() {
            Some(feed) => feed.next().await,
            None => None,
        }
    }
}
