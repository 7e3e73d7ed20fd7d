//! # Subject
//!
//! A [`Subject`] is the identity of whoever is running the current unit of
//! work. It is cheap to clone; clones share the same session.
//!
//! Identity lookups go through [`Subject::principals`], which returns the
//! top of the run-as stack when another identity has been assumed and the
//! real principals otherwise.
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use wzs_auth::auth::principal::PrincipalSet;
//! use wzs_auth::subject::Subject;
//! use wzs_auth::subject::session::MemorySessionFactory;
//!
//! let admin = Subject::builder()
//!     .principals(PrincipalSet::single("db", "admin"))
//!     .authenticated(true)
//!     .session_factory(Arc::new(MemorySessionFactory))
//!     .build();
//!
//! admin.run_as(PrincipalSet::single("db", "alice")).unwrap();
//! assert_eq!(admin.primary_principal().as_deref(), Some("alice"));
//!
//! assert_eq!(admin.release_run_as().unwrap(), Some(PrincipalSet::single("db", "alice")));
//! assert_eq!(admin.primary_principal().as_deref(), Some("admin"));
//! ```

use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use super::authz::Authorizer;
use super::run_as::RunAsStack;
use super::session::{Session, SessionFactory};
use crate::auth::principal::PrincipalSet;
use crate::error::SubjectError;
use crate::remember_me::store::RememberMeStore;

/// The identity of the caller of the current unit of work.
#[derive(Clone)]
pub struct Subject {
    inner: Arc<Inner>,
}

struct Inner {
    principals: Option<PrincipalSet>,
    authenticated: bool,
    host: Option<IpAddr>,
    session: RwLock<Option<Arc<dyn Session>>>,
    session_factory: Option<Arc<dyn SessionFactory>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    remember_me_store: Option<Arc<dyn RememberMeStore>>,
}

impl Subject {
    pub fn builder() -> SubjectBuilder {
        SubjectBuilder::default()
    }

    /// A subject with no identity and no session.
    pub fn anonymous() -> Self {
        SubjectBuilder::default().build()
    }

    /// Principals established at login (or recalled), ignoring run-as.
    pub fn real_principals(&self) -> Option<&PrincipalSet> {
        self.inner.principals.as_ref()
    }

    /// Principals currently in effect: the assumed identity if any, else the
    /// real one.
    pub fn current_principals(&self) -> Result<Option<PrincipalSet>, SubjectError> {
        if let Some(session) = self.existing_session() {
            let stack = RunAsStack::load(session.as_ref())?;
            if let Some(top) = stack.top() {
                return Ok(Some(top.clone()));
            }
        }
        Ok(self.inner.principals.clone())
    }

    /// Like [`current_principals`](Self::current_principals), but an
    /// unreadable run-as stack degrades to no identity at all.
    pub fn principals(&self) -> Option<PrincipalSet> {
        match self.current_principals() {
            Ok(principals) => principals,
            Err(err) => {
                warn!(
                    error = %err,
                    "unable to resolve run-as identity; treating subject as anonymous"
                );
                None
            }
        }
    }

    pub fn primary_principal(&self) -> Option<String> {
        self.principals()
            .and_then(|p| p.primary().map(str::to_string))
    }

    fn has_real_principals(&self) -> bool {
        self.inner.principals.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Whether this subject proved its identity during the current session.
    pub fn is_authenticated(&self) -> bool {
        self.inner.authenticated
    }

    /// Whether the identity came from remember-me rather than a login.
    pub fn is_remembered(&self) -> bool {
        !self.inner.authenticated && self.has_real_principals()
    }

    pub fn host(&self) -> Option<IpAddr> {
        self.inner.host
    }

    pub fn authorizer(&self) -> Option<&Arc<dyn Authorizer>> {
        self.inner.authorizer.as_ref()
    }

    pub fn session_factory(&self) -> Option<&Arc<dyn SessionFactory>> {
        self.inner.session_factory.as_ref()
    }

    pub fn remember_me_store(&self) -> Option<&Arc<dyn RememberMeStore>> {
        self.inner.remember_me_store.as_ref()
    }

    /// The session, if one exists. Never creates one.
    pub fn existing_session(&self) -> Option<Arc<dyn Session>> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The session, creating it through the session factory when missing.
    pub fn session(&self) -> Result<Arc<dyn Session>, SubjectError> {
        let mut slot = self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }

        let factory = self
            .inner
            .session_factory
            .as_ref()
            .ok_or(SubjectError::NoSession)?;
        let session = factory.create(self.inner.host).map_err(SubjectError::Session)?;
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Assumes `principals` on top of the current identity.
    ///
    /// ## Errors
    /// - [`SubjectError::NoExistingIdentity`] if this subject has no real principals
    /// - [`SubjectError::EmptyPrincipals`] if `principals` is empty
    pub fn run_as(&self, principals: PrincipalSet) -> Result<(), SubjectError> {
        if !self.has_real_principals() {
            return Err(SubjectError::NoExistingIdentity);
        }
        if principals.is_empty() {
            return Err(SubjectError::EmptyPrincipals);
        }

        let session = self.session()?;
        RunAsStack::push(session.as_ref(), principals)?;
        Ok(())
    }

    pub fn is_run_as(&self) -> bool {
        self.existing_session()
            .and_then(|session| RunAsStack::load(session.as_ref()).ok())
            .is_some_and(|stack| !stack.is_empty())
    }

    /// The identity directly beneath the current one, when running as
    /// someone else.
    pub fn previous_principals(&self) -> Option<PrincipalSet> {
        let session = self.existing_session()?;
        let stack = RunAsStack::load(session.as_ref()).ok()?;
        match stack.len() {
            0 => None,
            1 => self.inner.principals.clone(),
            _ => stack.beneath_top().cloned(),
        }
    }

    /// Drops the most recently assumed identity and returns it.
    ///
    /// Returns `Ok(None)` when no identity is assumed.
    pub fn release_run_as(&self) -> Result<Option<PrincipalSet>, SubjectError> {
        match self.existing_session() {
            Some(session) => RunAsStack::pop(session.as_ref()),
            None => Ok(None),
        }
    }

    /// Role check against the current principals.
    ///
    /// Always `false` without an identity or an authorizer.
    pub fn has_role(&self, role: &str) -> bool {
        match (self.principals(), self.inner.authorizer.as_ref()) {
            (Some(principals), Some(authorizer)) => authorizer.has_role(&principals, role),
            _ => false,
        }
    }

    pub fn check_role(&self, role: &str) -> Result<(), SubjectError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(SubjectError::Unauthorized {
                role: role.to_string(),
            })
        }
    }

    /// Builder pre-filled with everything but identity, for deriving a
    /// logged-in or logged-out subject from this one.
    pub fn to_builder(&self) -> SubjectBuilder {
        SubjectBuilder {
            principals: self.inner.principals.clone(),
            authenticated: self.inner.authenticated,
            host: self.inner.host,
            session: self.existing_session(),
            session_factory: self.inner.session_factory.clone(),
            authorizer: self.inner.authorizer.clone(),
            remember_me_store: self.inner.remember_me_store.clone(),
        }
    }

    /// Whether `self` and `other` are clones of the same subject.
    pub fn ptr_eq(&self, other: &Subject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("principals", &self.inner.principals)
            .field("authenticated", &self.inner.authenticated)
            .field("host", &self.inner.host)
            .field(
                "session",
                &self.existing_session().map(|s| s.id().to_string()),
            )
            .finish()
    }
}

/// Builder for [`Subject`].
#[derive(Default)]
pub struct SubjectBuilder {
    principals: Option<PrincipalSet>,
    authenticated: bool,
    host: Option<IpAddr>,
    session: Option<Arc<dyn Session>>,
    session_factory: Option<Arc<dyn SessionFactory>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    remember_me_store: Option<Arc<dyn RememberMeStore>>,
}

impl SubjectBuilder {
    /// Sets the real identity. An empty set means no identity.
    pub fn principals(mut self, principals: PrincipalSet) -> Self {
        self.principals = (!principals.is_empty()).then_some(principals);
        self
    }

    pub fn clear_principals(mut self) -> Self {
        self.principals = None;
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    pub fn host(mut self, host: Option<IpAddr>) -> Self {
        self.host = host;
        self
    }

    pub fn session(mut self, session: Option<Arc<dyn Session>>) -> Self {
        self.session = session;
        self
    }

    pub fn session_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.session_factory = Some(factory);
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn remember_me_store(mut self, store: Arc<dyn RememberMeStore>) -> Self {
        self.remember_me_store = Some(store);
        self
    }

    pub fn build(self) -> Subject {
        // Only a subject with an identity can be authenticated.
        let authenticated = self.authenticated && self.principals.is_some();
        Subject {
            inner: Arc::new(Inner {
                principals: self.principals,
                authenticated,
                host: self.host,
                session: RwLock::new(self.session),
                session_factory: self.session_factory,
                authorizer: self.authorizer,
                remember_me_store: self.remember_me_store,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::authz::StaticRoleAuthorizer;
    use crate::subject::session::{MemorySession, MemorySessionFactory};

    fn p(name: &str) -> PrincipalSet {
        PrincipalSet::single("test", name)
    }

    fn admin() -> Subject {
        Subject::builder()
            .principals(p("admin"))
            .authenticated(true)
            .session_factory(Arc::new(MemorySessionFactory))
            .authorizer(Arc::new(
                StaticRoleAuthorizer::default()
                    .grant("admin", "admin")
                    .grant("alice", "staff"),
            ))
            .build()
    }

    #[test]
    fn run_as_then_release_restores_real_identity() {
        let subject = admin();

        subject.run_as(p("alice")).unwrap();
        assert!(subject.is_run_as());
        assert_eq!(subject.principals(), Some(p("alice")));
        assert_eq!(subject.real_principals(), Some(&p("admin")));

        assert_eq!(subject.release_run_as().unwrap(), Some(p("alice")));
        assert!(!subject.is_run_as());
        assert_eq!(subject.principals(), Some(p("admin")));

        assert_eq!(subject.release_run_as().unwrap(), None);
    }

    #[test]
    fn run_as_requires_an_existing_identity() {
        let anonymous = Subject::builder()
            .session_factory(Arc::new(MemorySessionFactory))
            .build();

        assert!(matches!(
            anonymous.run_as(p("alice")),
            Err(SubjectError::NoExistingIdentity)
        ));
    }

    #[test]
    fn run_as_rejects_empty_principals() {
        assert!(matches!(
            admin().run_as(PrincipalSet::empty()),
            Err(SubjectError::EmptyPrincipals)
        ));
    }

    #[test]
    fn run_as_without_session_or_factory_fails() {
        let subject = Subject::builder().principals(p("admin")).build();
        assert!(matches!(subject.run_as(p("alice")), Err(SubjectError::NoSession)));
    }

    #[test]
    fn previous_principals_walk_the_stack() {
        let subject = admin();
        assert_eq!(subject.previous_principals(), None);

        subject.run_as(p("alice")).unwrap();
        assert_eq!(subject.previous_principals(), Some(p("admin")));

        subject.run_as(p("bob")).unwrap();
        assert_eq!(subject.previous_principals(), Some(p("alice")));
    }

    #[test]
    fn role_checks_follow_the_assumed_identity() {
        let subject = admin();
        assert!(subject.has_role("admin"));

        subject.run_as(p("alice")).unwrap();
        assert!(!subject.has_role("admin"));
        assert!(subject.has_role("staff"));
        assert!(matches!(
            subject.check_role("admin"),
            Err(SubjectError::Unauthorized { .. })
        ));
    }

    #[test]
    fn clones_share_the_session_and_run_as_state() {
        let subject = admin();
        let clone = subject.clone();

        subject.run_as(p("alice")).unwrap();

        assert!(clone.is_run_as());
        assert!(clone.ptr_eq(&subject));
    }

    #[test]
    fn unreadable_stack_degrades_to_anonymous() {
        let session: Arc<dyn Session> = Arc::new(MemorySession::new(None));
        let subject = Subject::builder()
            .principals(p("admin"))
            .session(Some(session.clone()))
            .build();
        session.stop().unwrap();

        assert!(subject.current_principals().is_err());
        assert_eq!(subject.principals(), None);
        assert!(!subject.has_role("admin"));
    }

    #[test]
    fn remembered_versus_authenticated() {
        let remembered = Subject::builder().principals(p("alice")).build();
        assert!(remembered.is_remembered());
        assert!(!remembered.is_authenticated());

        let anonymous = Subject::builder().authenticated(true).build();
        assert!(!anonymous.is_authenticated());
        assert!(!anonymous.is_remembered());
        assert_eq!(anonymous.primary_principal(), None);
    }
}
