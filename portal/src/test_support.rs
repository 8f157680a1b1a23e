use crate::session::SessionContext;
use async_trait::async_trait;
use docstore::{
    Document, DocumentStore, Fields, MemoryStore, ModelStore, StoreError, Subscription, WriteMode,
};
use keyvalue_common::{BearerToken, OrganiserRecord, Session, Tenant, User};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) const TIMEOUT: Duration = Duration::from_secs(2);

/// Memory store that can be told to fail or stall, and counts the calls made
/// through it.
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    failing_writes: Mutex<HashSet<(String, String)>>,
    fail_reads: AtomicBool,
    stall_reads: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        FlakyStore {
            inner,
            failing_writes: Mutex::new(HashSet::new()),
            fail_reads: AtomicBool::new(false),
            stall_reads: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Direct access, bypassing failures and the call counter.
    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub(crate) fn fail_writes_to(&self, collection: &str, key: &str) {
        self.failing_writes
            .lock()
            .unwrap()
            .insert((collection.to_string(), key.to_string()));
    }

    pub(crate) fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stall_reads(&self) {
        self.stall_reads.store(true, Ordering::SeqCst);
    }

    pub(crate) fn remote_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn before_read(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_reads.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(String::from("unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        self.before_read().await?;
        self.inner.get(collection, key).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.before_read().await?;
        self.inner.list(collection).await
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<Document, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_writes
            .lock()
            .unwrap()
            .contains(&(collection.to_string(), key.to_string()));
        if failing {
            return Err(StoreError::Backend(String::from("permission denied")));
        }
        self.inner.set(collection, key, fields, mode).await
    }

    async fn subscribe(&self, collection: &str, key: &str) -> Result<Subscription, StoreError> {
        self.before_read().await?;
        self.inner.subscribe(collection, key).await
    }
}

pub(crate) fn session_for(email: &str) -> Session {
    Session {
        user: User {
            uid: format!("uid-{}", email),
            email: email.to_string(),
            display_name: None,
        },
        token: BearerToken::new(format!("token-{}", email)),
        refresh_token: None,
    }
}

pub(crate) fn signed_in(email: &str) -> SessionContext {
    let context = SessionContext::new();
    context.begin(session_for(email));
    context
}

pub(crate) async fn seed_organiser<S: DocumentStore + ?Sized>(store: &S, email: &str, name: &str) {
    store
        .save(
            email,
            &OrganiserRecord {
                name: name.to_string(),
            },
            WriteMode::Replace,
        )
        .await
        .unwrap();
}

pub(crate) async fn seed_tenant<S: DocumentStore + ?Sized>(
    store: &S,
    id: &str,
    name: &str,
    room: &str,
) {
    let tenant = Tenant {
        id: id.to_string(),
        name: name.to_string(),
        contact: 9876543210,
        room: room.to_string(),
    };
    store.save(id, &tenant, WriteMode::Replace).await.unwrap();
}
