//! Turns credentials into a role-bearing session.
//!
//! Authentication belongs to the identity provider; the role comes from the
//! `organiser` collection, where the mere existence of a record keyed by the
//! email marks an admin. Paths that authenticate and then refuse the role
//! revoke the fresh session before returning, so nobody is left signed in
//! without authorization.
use crate::error::AuthError;
use crate::identity::{IdentityProvider, ProviderError};
use crate::session::SessionContext;
use crate::timeout::bounded;
use docstore::{DocumentStore, ModelStore};
use keyvalue_common::{
    normalize_email, Credentials, FederatedAssertion, OrganiserRecord, Session, SignupForm,
};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSession {
    Admin(Session),
    Student(Session),
    Guest(Session),
}

impl RoleSession {
    pub fn session(&self) -> &Session {
        match self {
            RoleSession::Admin(session)
            | RoleSession::Student(session)
            | RoleSession::Guest(session) => session,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RoleSession::Admin(_) => Role::Admin,
            RoleSession::Student(_) => Role::Student,
            RoleSession::Guest(_) => Role::Guest,
        }
    }

    /// Where the client should land after signing in.
    pub fn landing(&self) -> &'static str {
        match self {
            RoleSession::Admin(_) => "/adminHomepage",
            RoleSession::Student(_) => "/student-home",
            RoleSession::Guest(_) => "/homepage",
        }
    }
}

#[derive(Clone)]
pub struct RoleResolver {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    timeout: Duration,
}

impl RoleResolver {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        session: SessionContext,
        timeout: Duration,
    ) -> Self {
        RoleResolver {
            identity,
            store,
            session,
            timeout,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn admin_sign_in(&self, credentials: &Credentials) -> Result<RoleSession, AuthError> {
        let session = self.authenticate(credentials).await?;
        self.admit_organiser(session).await
    }

    pub async fn admin_sign_in_federated(
        &self,
        assertion: &FederatedAssertion,
    ) -> Result<RoleSession, AuthError> {
        let session = self.authenticate_federated(assertion).await?;
        self.admit_organiser(session).await
    }

    /// Shared login: organisers land as admins, everyone else as guests.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<RoleSession, AuthError> {
        let session = self.authenticate(credentials).await?;
        self.route_by_role(session).await
    }

    pub async fn sign_in_federated(
        &self,
        assertion: &FederatedAssertion,
    ) -> Result<RoleSession, AuthError> {
        let session = self.authenticate_federated(assertion).await?;
        self.route_by_role(session).await
    }

    pub async fn student_sign_in(
        &self,
        credentials: &Credentials,
    ) -> Result<RoleSession, AuthError> {
        let session = self.authenticate(credentials).await?;
        self.admit_student(session).await
    }

    /// The organiser check runs before the account exists, so an organiser
    /// email never gets a student account.
    pub async fn student_sign_up(&self, form: &SignupForm) -> Result<RoleSession, AuthError> {
        form.validate()?;
        let credentials = form.credentials();
        if self.is_organiser(&credentials.email).await? {
            warn!("student signup refused for organiser {}", credentials.email);
            return Err(AuthError::AdminEmailConflict);
        }

        let created = bounded(
            self.timeout,
            self.identity
                .create_account(&credentials, Some(form.name.trim())),
        )
        .await;
        let session = match created {
            Ok(session) => session,
            Err(ProviderError::EmailExists) => return Err(AuthError::EmailInUse),
            Err(e) => {
                warn!("creating account for {} failed: {}", credentials.email, e);
                return Err(AuthError::SignupFailed);
            }
        };
        self.session.begin(session.clone());
        info!("student account created for {}", session.email());
        Ok(RoleSession::Student(session))
    }

    pub async fn student_sign_up_federated(
        &self,
        assertion: &FederatedAssertion,
    ) -> Result<RoleSession, AuthError> {
        let session = self.authenticate_federated(assertion).await?;
        self.admit_student(session).await
    }

    /// Ends the current session, if any. A provider failure is logged; the
    /// local session is cleared regardless.
    pub async fn sign_out(&self) {
        if let Some(session) = self.session.current() {
            self.revoke(&session).await;
            info!("{} signed out", session.email());
        }
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        credentials.validate()?;
        match bounded(self.timeout, self.identity.sign_in(credentials)).await {
            Ok(session) => {
                self.session.begin(session.clone());
                Ok(session)
            }
            Err(e) => {
                warn!("sign-in for {} failed: {}", credentials.email.trim(), e);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn authenticate_federated(
        &self,
        assertion: &FederatedAssertion,
    ) -> Result<Session, AuthError> {
        keyvalue_common::require("id token", &assertion.id_token)?;
        match bounded(self.timeout, self.identity.sign_in_federated(assertion)).await {
            Ok(session) => {
                self.session.begin(session.clone());
                Ok(session)
            }
            Err(e) => {
                warn!("{} sign-in failed: {}", assertion.provider_id, e);
                Err(AuthError::ProviderFailure)
            }
        }
    }

    async fn is_organiser(&self, email: &str) -> Result<bool, AuthError> {
        let email = normalize_email(email);
        let lookup = bounded(self.timeout, self.store.fetch::<OrganiserRecord>(&email)).await;
        match lookup {
            Ok(record) => Ok(record.is_some()),
            Err(e) => {
                warn!("organiser lookup for {} failed: {}", email, e);
                Err(AuthError::LookupFailed)
            }
        }
    }

    async fn admit_organiser(&self, session: Session) -> Result<RoleSession, AuthError> {
        match self.is_organiser(session.email()).await {
            Ok(true) => {
                info!("{} signed in as organiser", session.email());
                Ok(RoleSession::Admin(session))
            }
            Ok(false) => {
                warn!("{} is not an organiser, revoking session", session.email());
                self.revoke(&session).await;
                Err(AuthError::AccessDenied)
            }
            Err(e) => {
                self.revoke(&session).await;
                Err(e)
            }
        }
    }

    async fn admit_student(&self, session: Session) -> Result<RoleSession, AuthError> {
        match self.is_organiser(session.email()).await {
            Ok(false) => {
                info!("{} signed in as student", session.email());
                Ok(RoleSession::Student(session))
            }
            Ok(true) => {
                warn!("{} is an organiser, revoking student session", session.email());
                self.revoke(&session).await;
                Err(AuthError::AdminEmailConflict)
            }
            Err(e) => {
                self.revoke(&session).await;
                Err(e)
            }
        }
    }

    async fn route_by_role(&self, session: Session) -> Result<RoleSession, AuthError> {
        match self.is_organiser(session.email()).await {
            Ok(true) => Ok(RoleSession::Admin(session)),
            Ok(false) => Ok(RoleSession::Guest(session)),
            Err(e) => {
                self.revoke(&session).await;
                Err(e)
            }
        }
    }

    async fn revoke(&self, session: &Session) {
        if let Err(e) = bounded(self.timeout, self.identity.sign_out(session)).await {
            warn!("provider sign-out for {} failed: {}", session.email(), e);
        }
        self.session.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentity;
    use crate::test_support::{seed_organiser, FlakyStore, TIMEOUT};
    use docstore::MemoryStore;

    struct Fixture {
        identity: Arc<MemoryIdentity>,
        store: Arc<FlakyStore>,
        resolver: RoleResolver,
    }

    async fn fixture() -> Fixture {
        let identity = Arc::new(
            MemoryIdentity::new()
                .with_account("boss@x.com", "secret1", Some("Boss"))
                .with_account("stu@x.com", "secret2", None)
                .with_federated("boss-google", "boss@x.com", None)
                .with_federated("stu-google", "stu@x.com", None),
        );
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        seed_organiser(store.inner(), "boss@x.com", "Boss").await;
        let resolver = RoleResolver::new(
            identity.clone(),
            store.clone(),
            SessionContext::new(),
            TIMEOUT,
        );
        Fixture {
            identity,
            store,
            resolver,
        }
    }

    fn form(email: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            name: String::from("Meera"),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[tokio::test]
    async fn test_admin_sign_in_for_organiser() {
        let f = fixture().await;
        let role = f
            .resolver
            .admin_sign_in(&Credentials::new("boss@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(role.role(), Role::Admin);
        assert_eq!(f.resolver.session().email().as_deref(), Some("boss@x.com"));
        assert!(f.identity.is_active(&role.session().token));
    }

    #[tokio::test]
    async fn test_admin_sign_in_revokes_non_organiser() {
        let f = fixture().await;
        let mut changes = f.resolver.session().on_change();
        let err = f
            .resolver
            .admin_sign_in(&Credentials::new("stu@x.com", "secret2"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AccessDenied);
        assert!(!f.resolver.session().is_signed_in());
        assert_eq!(f.identity.active_sessions(), 0);
        // the session was started and then ended
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let f = fixture().await;
        let err = f
            .resolver
            .admin_sign_in(&Credentials::new("boss@x.com", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(err.user_message(), "Invalid email or password.");
        assert_eq!(f.store.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_credentials_make_no_remote_call() {
        let f = fixture().await;
        let err = f
            .resolver
            .sign_in(&Credentials::new("", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
        assert_eq!(f.identity.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_federated_admin_sign_in() {
        let f = fixture().await;
        let role = f
            .resolver
            .admin_sign_in_federated(&FederatedAssertion::google("boss-google"))
            .await
            .unwrap();
        assert_eq!(role.role(), Role::Admin);

        let err = f
            .resolver
            .admin_sign_in_federated(&FederatedAssertion::google("forged"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::ProviderFailure);
    }

    #[tokio::test]
    async fn test_shared_login_routes_by_record() {
        let f = fixture().await;
        let admin = f
            .resolver
            .sign_in(&Credentials::new("boss@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(admin.landing(), "/adminHomepage");
        let guest = f
            .resolver
            .sign_in(&Credentials::new("stu@x.com", "secret2"))
            .await
            .unwrap();
        assert_eq!(guest.role(), Role::Guest);
        assert!(f.identity.is_active(&guest.session().token));
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let f = fixture().await;
        f.store.fail_reads();
        let err = f
            .resolver
            .admin_sign_in(&Credentials::new("boss@x.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::LookupFailed);
        assert!(!f.resolver.session().is_signed_in());
        assert_eq!(f.identity.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_student_sign_up() {
        let f = fixture().await;
        let role = f
            .resolver
            .student_sign_up(&form("new@x.com", "secret3", "secret3"))
            .await
            .unwrap();
        assert_eq!(role.role(), Role::Student);
        assert_eq!(role.session().user.display_name.as_deref(), Some("Meera"));
        assert!(f.identity.has_account("new@x.com"));
    }

    #[tokio::test]
    async fn test_student_sign_up_refuses_organiser_before_creating() {
        let identity = Arc::new(MemoryIdentity::new());
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        seed_organiser(store.inner(), "boss@x.com", "Boss").await;
        let resolver = RoleResolver::new(
            identity.clone(),
            store,
            SessionContext::new(),
            TIMEOUT,
        );
        let err = resolver
            .student_sign_up(&form("boss@x.com", "secret1", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AdminEmailConflict);
        assert!(!identity.has_account("boss@x.com"));
    }

    #[tokio::test]
    async fn test_student_sign_up_refuses_organiser_in_other_case() {
        let identity = Arc::new(MemoryIdentity::new());
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        seed_organiser(store.inner(), "boss@x.com", "Boss").await;
        let resolver = RoleResolver::new(
            identity.clone(),
            store,
            SessionContext::new(),
            TIMEOUT,
        );
        let err = resolver
            .student_sign_up(&form("Boss@X.com", "secret1", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AdminEmailConflict);
        assert!(!identity.has_account("boss@x.com"));
    }

    #[tokio::test]
    async fn test_admin_sign_in_ignores_email_case() {
        let f = fixture().await;
        let role = f
            .resolver
            .admin_sign_in(&Credentials::new("BOSS@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(role.role(), Role::Admin);
        assert_eq!(role.session().email(), "boss@x.com");
    }

    #[tokio::test]
    async fn test_student_sign_up_failures() {
        let f = fixture().await;
        assert_eq!(
            f.resolver
                .student_sign_up(&form("stu@x.com", "secret9", "secret9"))
                .await
                .unwrap_err(),
            AuthError::EmailInUse
        );
        assert_eq!(
            f.resolver
                .student_sign_up(&form("weak@x.com", "123", "123"))
                .await
                .unwrap_err(),
            AuthError::SignupFailed
        );
        assert_eq!(
            f.resolver
                .student_sign_up(&form("new@x.com", "secret3", "secret4"))
                .await
                .unwrap_err(),
            AuthError::Invalid(keyvalue_common::ValidationError::PasswordMismatch)
        );
        assert!(!f.identity.has_account("new@x.com"));
        assert!(!f.resolver.session().is_signed_in());
    }

    #[tokio::test]
    async fn test_student_paths_revoke_organisers() {
        let f = fixture().await;
        let err = f
            .resolver
            .student_sign_in(&Credentials::new("boss@x.com", "secret1"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AdminEmailConflict);
        let err = f
            .resolver
            .student_sign_up_federated(&FederatedAssertion::google("boss-google"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::AdminEmailConflict);
        assert_eq!(f.identity.active_sessions(), 0);

        let student = f
            .resolver
            .student_sign_up_federated(&FederatedAssertion::google("stu-google"))
            .await
            .unwrap();
        assert_eq!(student.role(), Role::Student);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let f = fixture().await;
        let role = f
            .resolver
            .sign_in(&Credentials::new("stu@x.com", "secret2"))
            .await
            .unwrap();
        f.resolver.sign_out().await;
        assert!(!f.resolver.session().is_signed_in());
        assert!(!f.identity.is_active(&role.session().token));
        // signing out twice is harmless
        f.resolver.sign_out().await;
    }

    #[tokio::test]
    async fn test_login_is_idempotent() {
        let f = fixture().await;
        let credentials = Credentials::new("boss@x.com", "secret1");
        let first = f.resolver.admin_sign_in(&credentials).await.unwrap();
        let second = f.resolver.admin_sign_in(&credentials).await.unwrap();
        assert_eq!(first.role(), second.role());
        assert_eq!(f.resolver.session().current(), Some(second.session().clone()));
    }
}
