//! # Subject middleware
//!
//! Resolves the caller of every request into a [`Subject`] and runs the rest
//! of the request with it bound as the ambient context.
//!
//! - The remember-me cookie is recalled through the [`SecurityManager`].
//! - Handlers can reach the subject with [`CurrentSubject`] or through
//!   [`context::current_subject`](crate::context::current_subject).
//! - Cookie changes made during the request (login, logout, a discarded
//!   remember-me cookie) are written to the response.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{Router, middleware, routing::get};
//! use wzs_auth::config::app::SecurityConfig;
//! use wzs_auth::web::middleware::{CurrentSubject, SubjectState, bind_subject};
//!
//! let cfg = SecurityConfig::from_env();
//! let manager = Arc::new(cfg.security_manager(Vec::new()).unwrap());
//! let state = SubjectState::new(manager, cfg.remember_me.clone());
//!
//! let app: Router = Router::new()
//!     .route("/me", get(|CurrentSubject(s): CurrentSubject| async move {
//!         s.primary_principal().unwrap_or_else(|| "anonymous".into())
//!     }))
//!     .layer(middleware::from_fn_with_state(state, bind_subject));
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::trace;

use crate::config::remember_me::RememberMeConfig;
use crate::context::{AmbientContext, ExecutionContextBinder};
use crate::subject::Subject;
use crate::subject::manager::{SecurityManager, SubjectContext};
use crate::web::cookie::CookieRememberMeStore;
use crate::web::peer::resolve_peer;

/// State for [`bind_subject`].
#[derive(Clone, Debug)]
pub struct SubjectState {
    pub manager: Arc<SecurityManager>,
    pub remember_me: RememberMeConfig,
    /// Take the peer address from `X-Forwarded-For` / `X-Real-IP`.
    pub trust_forwarded_headers: bool,
}

impl SubjectState {
    pub fn new(manager: Arc<SecurityManager>, remember_me: RememberMeConfig) -> Self {
        Self {
            manager,
            remember_me,
            trust_forwarded_headers: false,
        }
    }

    pub fn trust_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }
}

/// Middleware binding the request's [`Subject`] for the rest of the request.
pub async fn bind_subject(
    State(state): State<SubjectState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let connect = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let peer = resolve_peer(request.headers(), connect, state.trust_forwarded_headers);

    let store = Arc::new(CookieRememberMeStore::new(jar, &state.remember_me));
    let subject = state.manager.resolve_subject(
        SubjectContext::default()
            .with_host(peer)
            .with_remember_me_store(store.clone()),
    );
    trace!(peer = ?peer, remembered = subject.is_remembered(), "resolved request subject");

    let binder = ExecutionContextBinder::from_context(
        AmbientContext::default()
            .with_subject(subject.clone())
            .with_peer_address(peer)
            .with_session_id(subject.existing_session().map(|s| s.id().to_string()))
            .with_security_manager(Arc::clone(&state.manager)),
    );
    request.extensions_mut().insert(subject);

    let response = binder.scope(next.run(request)).await;

    (store.jar(), response).into_response()
}

/// Extractor for the subject bound by [`bind_subject`].
///
/// Anonymous when the middleware is not installed.
#[derive(Clone, Debug)]
pub struct CurrentSubject(pub Subject);

impl<S> FromRequestParts<S> for CurrentSubject
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<Subject>()
                .cloned()
                .unwrap_or_else(Subject::anonymous),
        ))
    }
}
