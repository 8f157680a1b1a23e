use keyvalue_common::Session;
use std::sync::Arc;
use tokio::sync::watch;

/// The signed-in identity, handed explicitly to every surface that needs it.
///
/// Clones share state. Only the resolver starts or ends a session; everyone
/// else reads it or listens for changes.
#[derive(Clone)]
pub struct SessionContext {
    state: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        let (state, _) = watch::channel(None);
        SessionContext {
            state: Arc::new(state),
        }
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn email(&self) -> Option<String> {
        self.state
            .borrow()
            .as_ref()
            .map(|session| session.user.email.clone())
    }

    /// Receives every session start and end from now on.
    pub fn on_change(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    pub(crate) fn begin(&self, session: Session) {
        self.state.send_replace(Some(session));
    }

    pub(crate) fn end(&self) -> Option<Session> {
        self.state.send_replace(None)
    }
}
