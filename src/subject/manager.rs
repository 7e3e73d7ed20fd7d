//! # Security manager
//!
//! Glue between authentication, remember-me, sessions and [`Subject`]s.
//!
//! - [`SecurityManager::login`] authenticates a token and derives a new
//!   authenticated subject from the caller's current one.
//! - [`SecurityManager::logout`] tears everything down again.
//! - [`SecurityManager::resolve_subject`] builds the subject for an incoming
//!   request, recalling a remembered identity when nothing else is known.
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use wzs_auth::auth::coordinator::AuthenticationCoordinator;
//! use wzs_auth::auth::identity::IdentityRecord;
//! use wzs_auth::auth::principal::PrincipalSet;
//! use wzs_auth::auth::realm::Realm;
//! use wzs_auth::auth::token::{AuthenticationToken, UsernamePasswordToken};
//! use wzs_auth::subject::manager::SecurityManager;
//! use wzs_auth::subject::Subject;
//!
//! struct Open;
//!
//! impl Realm for Open {
//!     fn name(&self) -> &str { "open" }
//!     fn supports(&self, _t: &dyn AuthenticationToken) -> bool { true }
//!     fn identity(&self, t: &dyn AuthenticationToken) -> anyhow::Result<Option<IdentityRecord>> {
//!         Ok(Some(IdentityRecord::new(PrincipalSet::single("open", t.principal()))))
//!     }
//! }
//!
//! let coordinator = AuthenticationCoordinator::new(vec![Arc::new(Open)]);
//! let manager = SecurityManager::new(Arc::new(coordinator));
//! let subject = manager
//!     .login(&Subject::anonymous(), &UsernamePasswordToken::new("alice", "pw"))
//!     .unwrap();
//! assert!(subject.is_authenticated());
//! assert_eq!(subject.primary_principal().as_deref(), Some("alice"));
//! ```

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::authz::Authorizer;
use super::model::{Subject, SubjectBuilder};
use super::run_as::RunAsStack;
use super::session::{Session, SessionFactory};
use crate::auth::coordinator::Authenticator;
use crate::auth::listener::AuthenticationListener;
use crate::auth::principal::PrincipalSet;
use crate::auth::token::AuthenticationToken;
use crate::error::AuthenticationError;
use crate::remember_me::pipeline::RememberMePipeline;
use crate::remember_me::store::RememberMeStore;

/// What is known about a caller before a [`Subject`] exists for it.
#[derive(Clone, Default)]
pub struct SubjectContext {
    pub principals: Option<PrincipalSet>,
    pub authenticated: bool,
    pub host: Option<IpAddr>,
    pub session: Option<Arc<dyn Session>>,
    pub remember_me_store: Option<Arc<dyn RememberMeStore>>,
}

impl SubjectContext {
    pub fn with_host(mut self, host: Option<IpAddr>) -> Self {
        self.host = host;
        self
    }

    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_remember_me_store(mut self, store: Arc<dyn RememberMeStore>) -> Self {
        self.remember_me_store = Some(store);
        self
    }

    pub fn with_principals(mut self, principals: PrincipalSet, authenticated: bool) -> Self {
        self.principals = Some(principals);
        self.authenticated = authenticated;
        self
    }
}

/// Entry point for logging subjects in and out.
pub struct SecurityManager {
    authenticator: Arc<dyn Authenticator>,
    remember_me: Option<RememberMePipeline>,
    session_factory: Option<Arc<dyn SessionFactory>>,
    authorizer: Option<Arc<dyn Authorizer>>,
}

impl SecurityManager {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            remember_me: None,
            session_factory: None,
            authorizer: None,
        }
    }

    pub fn with_remember_me(mut self, pipeline: RememberMePipeline) -> Self {
        self.remember_me = Some(pipeline);
        self
    }

    pub fn with_session_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.session_factory = Some(factory);
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    pub fn remember_me(&self) -> Option<&RememberMePipeline> {
        self.remember_me.as_ref()
    }

    /// Registers a listener with the authenticator.
    ///
    /// ## Errors
    /// [`AuthenticationError::CapabilityNotSupported`] if the authenticator
    /// does not accept listeners.
    pub fn add_authentication_listener(
        &self,
        listener: Arc<dyn AuthenticationListener>,
    ) -> Result<(), AuthenticationError> {
        let registry = self
            .authenticator
            .listener_registry()
            .ok_or(AuthenticationError::CapabilityNotSupported("listener registration"))?;
        registry.add_listener(listener);
        Ok(())
    }

    /// Authenticates `token` on behalf of `subject`.
    ///
    /// Any run-as identities left in `subject`'s session are discarded first.
    /// Returns a new authenticated subject sharing that session (one is
    /// created if it had none and a factory is available).
    pub fn login(
        &self,
        subject: &Subject,
        token: &dyn AuthenticationToken,
    ) -> Result<Subject, AuthenticationError> {
        let store = subject.remember_me_store().cloned();

        if let Some(session) = subject.existing_session() {
            if let Err(err) = RunAsStack::clear(session.as_ref()) {
                warn!(
                    session = session.id(),
                    error = %err,
                    "unable to clear run-as identities before login"
                );
            }
        }

        let record = match self.authenticator.authenticate(token) {
            Ok(record) => record,
            Err(err) => {
                if let (Some(pipeline), Some(store)) = (&self.remember_me, &store) {
                    pipeline.on_failed_login(store.as_ref());
                }
                return Err(err);
            }
        };

        let host = token.host().or(subject.host());
        let logged_in = self
            .with_collaborators(subject.to_builder())
            .principals(record.principals().clone())
            .authenticated(true)
            .host(host)
            .build();

        if logged_in.existing_session().is_none() && logged_in.session_factory().is_some() {
            if let Err(err) = logged_in.session() {
                warn!(error = %err, "unable to create session for logged in subject");
            }
        }

        if let (Some(pipeline), Some(store)) = (&self.remember_me, &store) {
            pipeline.on_successful_login(store.as_ref(), token, &record);
        }

        info!(
            identity = %record.principals(),
            agreement = ?record.agreement(),
            "subject logged in"
        );
        Ok(logged_in)
    }

    /// Logs `subject` out and returns the anonymous subject that replaces it.
    ///
    /// Every step runs even if an earlier one fails; failures are logged.
    pub fn logout(&self, subject: &Subject) -> Subject {
        if let Some(principals) = subject.real_principals() {
            self.authenticator.on_logout(principals);
        }

        if let (Some(pipeline), Some(store)) = (&self.remember_me, subject.remember_me_store()) {
            pipeline.on_logout(store.as_ref());
        }

        if let Some(session) = subject.existing_session() {
            if let Err(err) = RunAsStack::clear(session.as_ref()) {
                warn!(
                    session = session.id(),
                    error = %err,
                    "unable to clear run-as identities on logout"
                );
            }
            if let Err(err) = session.stop() {
                warn!(session = session.id(), error = %err, "unable to stop session on logout");
            }
        }

        debug!(identity = ?subject.real_principals(), "subject logged out");

        subject
            .to_builder()
            .clear_principals()
            .authenticated(false)
            .session(None)
            .build()
    }

    /// Builds the subject for a caller described by `context`.
    ///
    /// Without principals in the context, a remembered identity is recalled.
    /// A recalled subject is remembered, never authenticated.
    pub fn resolve_subject(&self, context: SubjectContext) -> Subject {
        let SubjectContext {
            principals,
            authenticated,
            host,
            session,
            remember_me_store,
        } = context;

        let (principals, authenticated) = match principals.filter(|p| !p.is_empty()) {
            Some(principals) => (Some(principals), authenticated),
            None => (self.recall(remember_me_store.as_deref()), false),
        };

        let host = host.or_else(|| session.as_ref().and_then(|s| s.host()));

        let mut builder = self
            .with_collaborators(Subject::builder())
            .authenticated(authenticated)
            .host(host)
            .session(session);
        if let Some(principals) = principals {
            builder = builder.principals(principals);
        }
        if let Some(store) = remember_me_store {
            builder = builder.remember_me_store(store);
        }
        builder.build()
    }

    fn recall(&self, store: Option<&dyn RememberMeStore>) -> Option<PrincipalSet> {
        let pipeline = self.remember_me.as_ref()?;
        let principals = pipeline.recall(store?)?;
        debug!(identity = %principals, "recalled remembered identity");
        Some(principals)
    }

    fn with_collaborators(&self, mut builder: SubjectBuilder) -> SubjectBuilder {
        if let Some(factory) = &self.session_factory {
            builder = builder.session_factory(Arc::clone(factory));
        }
        if let Some(authorizer) = &self.authorizer {
            builder = builder.authorizer(Arc::clone(authorizer));
        }
        builder
    }
}

impl fmt::Debug for SecurityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityManager")
            .field("remember_me", &self.remember_me)
            .field("session_factory", &self.session_factory.is_some())
            .field("authorizer", &self.authorizer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::coordinator::AuthenticationCoordinator;
    use crate::auth::identity::IdentityRecord;
    use crate::auth::realm::{LogoutAware, Realm};
    use crate::auth::token::UsernamePasswordToken;
    use crate::remember_me::pipeline::DEFAULT_REMEMBER_ME_NAME;
    use crate::remember_me::store::MemoryRememberMeStore;
    use crate::subject::authz::StaticRoleAuthorizer;
    use crate::subject::run_as::RUN_AS_PRINCIPALS_KEY;
    use crate::subject::session::{MemorySession, MemorySessionFactory};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;

    /// Accepts any username except "mallory"; records logouts.
    #[derive(Default)]
    struct UserRealm {
        logouts: Mutex<Vec<String>>,
    }

    impl Realm for UserRealm {
        fn name(&self) -> &str {
            "users"
        }

        fn supports(&self, _token: &dyn AuthenticationToken) -> bool {
            true
        }

        fn identity(
            &self,
            token: &dyn AuthenticationToken,
        ) -> anyhow::Result<Option<IdentityRecord>> {
            if token.principal() == "mallory" {
                return Ok(None);
            }
            Ok(Some(IdentityRecord::new(PrincipalSet::single(
                "users",
                token.principal(),
            ))))
        }

        fn logout_aware(&self) -> Option<&dyn LogoutAware> {
            Some(self)
        }
    }

    impl LogoutAware for UserRealm {
        fn on_logout(&self, principals: &PrincipalSet) {
            self.logouts
                .lock()
                .unwrap()
                .extend(principals.iter().map(str::to_string));
        }
    }

    struct Fixture {
        realm: Arc<UserRealm>,
        store: Arc<MemoryRememberMeStore>,
        manager: SecurityManager,
    }

    fn fixture() -> Fixture {
        let realm = Arc::new(UserRealm::default());
        let coordinator = AuthenticationCoordinator::new(vec![realm.clone() as Arc<dyn Realm>]);
        let manager = SecurityManager::new(Arc::new(coordinator))
            .with_remember_me(RememberMePipeline::new())
            .with_session_factory(Arc::new(MemorySessionFactory))
            .with_authorizer(Arc::new(StaticRoleAuthorizer::default().grant("alice", "staff")));
        Fixture {
            realm,
            store: Arc::new(MemoryRememberMeStore::new()),
            manager,
        }
    }

    fn visitor(store: &Arc<MemoryRememberMeStore>) -> Subject {
        Subject::builder()
            .remember_me_store(store.clone() as Arc<dyn RememberMeStore>)
            .build()
    }

    #[test]
    fn login_builds_authenticated_subject_with_session() {
        let fx = fixture();
        let host = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7));
        let token = UsernamePasswordToken::new("alice", "pw").with_host(host);

        let subject = fx.manager.login(&visitor(&fx.store), &token).unwrap();

        assert!(subject.is_authenticated());
        assert_eq!(subject.host(), Some(host));
        assert!(subject.existing_session().is_some());
        assert!(subject.has_role("staff"));
        assert!(!fx.store.contains(DEFAULT_REMEMBER_ME_NAME));
    }

    #[test]
    fn login_keeps_an_existing_session() {
        let fx = fixture();
        let session: Arc<dyn Session> = Arc::new(MemorySession::new(None));
        let before = Subject::builder().session(Some(session.clone())).build();

        let after = fx
            .manager
            .login(&before, &UsernamePasswordToken::new("alice", "pw"))
            .unwrap();

        assert_eq!(after.existing_session().unwrap().id(), session.id());
    }

    #[test]
    fn login_discards_run_as_identities_left_in_the_session() {
        let fx = fixture();
        let admin = fx
            .manager
            .login(&visitor(&fx.store), &UsernamePasswordToken::new("admin", "pw"))
            .unwrap();
        admin.run_as(PrincipalSet::single("users", "alice")).unwrap();
        assert_eq!(admin.primary_principal().as_deref(), Some("alice"));

        let carol = fx
            .manager
            .login(&admin, &UsernamePasswordToken::new("carol", "pw"))
            .unwrap();

        assert_eq!(carol.primary_principal().as_deref(), Some("carol"));
        assert!(!carol.is_run_as());
        assert_eq!(carol.previous_principals(), None);
        let session = carol.existing_session().unwrap();
        assert_eq!(session.attribute(RUN_AS_PRINCIPALS_KEY).unwrap(), None);
    }

    #[test]
    fn remember_me_login_is_recalled_as_remembered_subject() {
        let fx = fixture();
        let token = UsernamePasswordToken::new("alice", "pw").remember_me(true);
        fx.manager.login(&visitor(&fx.store), &token).unwrap();
        assert!(fx.store.contains(DEFAULT_REMEMBER_ME_NAME));

        let resolved = fx.manager.resolve_subject(
            SubjectContext::default().with_remember_me_store(fx.store.clone()),
        );

        assert!(resolved.is_remembered());
        assert!(!resolved.is_authenticated());
        assert_eq!(resolved.primary_principal().as_deref(), Some("alice"));
    }

    #[test]
    fn failed_login_forgets_remembered_identity() {
        let fx = fixture();
        fx.manager
            .remember_me()
            .unwrap()
            .remember(fx.store.as_ref(), &PrincipalSet::single("users", "alice"));

        let err = fx
            .manager
            .login(&visitor(&fx.store), &UsernamePasswordToken::new("mallory", "pw"))
            .unwrap_err();

        assert!(matches!(err, AuthenticationError::UnknownIdentity { .. }));
        assert!(!fx.store.contains(DEFAULT_REMEMBER_ME_NAME));
    }

    #[test]
    fn logout_tears_everything_down() {
        let fx = fixture();
        let subject = fx
            .manager
            .login(
                &visitor(&fx.store),
                &UsernamePasswordToken::new("alice", "pw").remember_me(true),
            )
            .unwrap();
        subject.run_as(PrincipalSet::single("users", "bob")).unwrap();
        let session = subject.existing_session().unwrap();

        let anonymous = fx.manager.logout(&subject);

        assert_eq!(anonymous.principals(), None);
        assert!(!anonymous.is_authenticated());
        assert!(anonymous.existing_session().is_none());
        assert!(session.attribute("anything").is_err());
        assert!(!fx.store.contains(DEFAULT_REMEMBER_ME_NAME));
        assert_eq!(*fx.realm.logouts.lock().unwrap(), vec!["alice".to_string()]);
    }

    #[test]
    fn resolve_subject_prefers_explicit_principals() {
        let fx = fixture();
        fx.manager
            .remember_me()
            .unwrap()
            .remember(fx.store.as_ref(), &PrincipalSet::single("users", "bob"));

        let resolved = fx.manager.resolve_subject(
            SubjectContext::default()
                .with_principals(PrincipalSet::single("users", "alice"), true)
                .with_remember_me_store(fx.store.clone()),
        );

        assert!(resolved.is_authenticated());
        assert_eq!(resolved.primary_principal().as_deref(), Some("alice"));
    }

    #[test]
    fn resolve_subject_takes_host_from_session() {
        let fx = fixture();
        let host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let session: Arc<dyn Session> = Arc::new(MemorySession::new(Some(host)));

        let resolved = fx
            .manager
            .resolve_subject(SubjectContext::default().with_session(session));

        assert_eq!(resolved.host(), Some(host));
        assert_eq!(resolved.principals(), None);
    }

    struct Bare;

    impl Authenticator for Bare {
        fn authenticate(
            &self,
            _token: &dyn AuthenticationToken,
        ) -> Result<IdentityRecord, AuthenticationError> {
            Err(AuthenticationError::NoRealmAuthenticated)
        }
    }

    struct Silent;

    impl AuthenticationListener for Silent {}

    #[test]
    fn listener_registration_is_capability_checked() {
        let fx = fixture();
        fx.manager.add_authentication_listener(Arc::new(Silent)).unwrap();

        let bare = SecurityManager::new(Arc::new(Bare));
        assert!(matches!(
            bare.add_authentication_listener(Arc::new(Silent)),
            Err(AuthenticationError::CapabilityNotSupported(_))
        ));
    }
}
