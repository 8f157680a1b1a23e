use docstore::DocumentStore;
use keyvalue_common::BearerToken;
use keyvalue_portal::{
    AdminSurface, IdentityProvider, MaintenanceDesk, OrganiserDesk, Role, RoleResolver,
    RoleSession, SessionContext,
};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Lifetime of a Firebase ID token.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Everything one signed-in client works with, all bound to the same
/// session context.
pub struct Workspace {
    pub role: Role,
    pub session: SessionContext,
    pub resolver: RoleResolver,
    pub admin: Mutex<AdminSurface>,
    pub maintenance: MaintenanceDesk,
    pub organiser: OrganiserDesk,
    pub expires_at: Instant,
}

impl Workspace {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub enum WorkspaceLookup {
    Live(Arc<Workspace>),
    /// Past its lifetime; already removed from the registry.
    Expired(Arc<Workspace>),
    Unknown,
}

#[derive(Clone)]
pub struct WebServerData {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub timeout: Duration,
    pub session_ttl: Duration,
    // bearer token -> workspace of the client holding it
    workspaces: Arc<RwLock<HashMap<BearerToken, Arc<Workspace>>>>,
}

impl WebServerData {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        timeout: Duration,
    ) -> Self {
        WebServerData {
            store,
            identity,
            timeout,
            session_ttl: DEFAULT_SESSION_TTL,
            workspaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<BearerToken, Arc<Workspace>>> {
        self.workspaces
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<BearerToken, Arc<Workspace>>> {
        self.workspaces
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A resolver over a fresh, empty session context.
    pub fn resolver(&self) -> RoleResolver {
        RoleResolver::new(
            self.identity.clone(),
            self.store.clone(),
            SessionContext::new(),
            self.timeout,
        )
    }

    /// Desk for requests made without a session.
    pub fn anonymous_desk(&self) -> MaintenanceDesk {
        MaintenanceDesk::new(self.store.clone(), SessionContext::new(), self.timeout)
    }

    /// Registers the workspace for a session the resolver just produced.
    /// Workspaces past their lifetime are dropped on the way.
    pub fn open_workspace(&self, resolver: RoleResolver, signed_in: &RoleSession) -> Arc<Workspace> {
        let now = Instant::now();
        let session = resolver.session().clone();
        let workspace = Arc::new(Workspace {
            role: signed_in.role(),
            admin: Mutex::new(AdminSurface::new(
                self.store.clone(),
                session.clone(),
                self.timeout,
            )),
            maintenance: MaintenanceDesk::new(self.store.clone(), session.clone(), self.timeout),
            organiser: OrganiserDesk::new(self.store.clone(), session.clone(), self.timeout),
            session,
            resolver,
            expires_at: now + self.session_ttl,
        });
        let mut workspaces = self.write();
        let before = workspaces.len();
        workspaces.retain(|_, open| !open.is_expired(now));
        if workspaces.len() < before {
            debug!("dropped {} expired workspaces", before - workspaces.len());
        }
        workspaces.insert(signed_in.session().token.clone(), workspace.clone());
        workspace
    }

    pub fn workspace(&self, token: &BearerToken) -> WorkspaceLookup {
        let found = self.read().get(token).cloned();
        match found {
            Some(workspace) if workspace.is_expired(Instant::now()) => {
                self.close_workspace(token);
                WorkspaceLookup::Expired(workspace)
            }
            Some(workspace) => WorkspaceLookup::Live(workspace),
            None => WorkspaceLookup::Unknown,
        }
    }

    pub fn open_workspaces(&self) -> usize {
        self.read().len()
    }

    pub fn close_workspace(&self, token: &BearerToken) -> Option<Arc<Workspace>> {
        self.write().remove(token)
    }
}
