//! # Execution context binder
//!
//! Captures a [`Subject`] together with the rest of the ambient context and
//! re-establishes it around a unit of work, on this thread, on a worker
//! thread, or inside a tokio task.
//!
//! Binding replaces every slot. Restoring puts back exactly what was there
//! before, so a thread that runs many bound units in sequence never carries
//! anything from one unit into the next.
//!
//! # Example
//! ```rust
//! use wzs_auth::auth::principal::PrincipalSet;
//! use wzs_auth::context::{self, ExecutionContextBinder};
//! use wzs_auth::subject::Subject;
//!
//! let alice = Subject::builder()
//!     .principals(PrincipalSet::single("db", "alice"))
//!     .build();
//! let binder = ExecutionContextBinder::capture(&alice);
//!
//! let worker = std::thread::spawn(binder.associate(|| {
//!     context::current_subject().and_then(|s| s.primary_principal())
//! }));
//!
//! assert_eq!(worker.join().unwrap().as_deref(), Some("alice"));
//! assert!(context::current_subject().is_none());
//! ```

use std::future::{Future, poll_fn};
use std::marker::PhantomData;

use tracing::trace;

use super::ambient::{self, AmbientContext};
use crate::subject::Subject;

/// Snapshot of an ambient context, ready to be bound elsewhere.
#[derive(Clone, Debug)]
pub struct ExecutionContextBinder {
    context: AmbientContext,
}

impl ExecutionContextBinder {
    /// Snapshots `subject` plus whatever else is ambient right now.
    ///
    /// The peer address is the ambient one if set, then the host of the
    /// subject's session, then the subject's own host. The session id comes
    /// from the subject's session, falling back to the ambient one.
    pub fn capture(subject: &Subject) -> Self {
        let ambient = ambient::snapshot();
        let session = subject.existing_session();

        let peer_address = ambient
            .peer_address
            .or_else(|| session.as_ref().and_then(|s| s.host()))
            .or(subject.host());
        let session_id = session
            .as_ref()
            .map(|s| s.id().to_string())
            .or(ambient.session_id);

        Self {
            context: AmbientContext {
                subject: Some(subject.clone()),
                peer_address,
                session_id,
                security_manager: ambient.security_manager,
            },
        }
    }

    /// Binds `context` exactly as given.
    pub fn from_context(context: AmbientContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AmbientContext {
        &self.context
    }

    /// Installs the snapshot on the current thread until the guard drops.
    pub fn bind(&self) -> BindGuard {
        trace!(
            session = ?self.context.session_id,
            peer = ?self.context.peer_address,
            "bound execution context"
        );
        self.install()
    }

    fn install(&self) -> BindGuard {
        BindGuard {
            previous: Some(ambient::install(self.context.clone())),
            _not_send: PhantomData,
        }
    }

    /// Runs `f` with the snapshot bound. Restores even if `f` panics.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.bind();
        f()
    }

    /// Wraps `f` so that it runs with the snapshot bound, wherever it is
    /// eventually called.
    pub fn associate<F, R>(&self, f: F) -> impl FnOnce() -> R + Send + 'static
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let binder = self.clone();
        move || binder.run(f)
    }

    /// Runs `future` with the snapshot as its ambient context.
    ///
    /// The snapshot is installed for the duration of each poll and the
    /// polling thread's own binding is put back afterwards, so other tasks
    /// sharing the thread never see it and it never sees theirs.
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        let mut future = std::pin::pin!(future);
        poll_fn(|cx| {
            let _guard = self.install();
            future.as_mut().poll(cx)
        })
        .await
    }
}

/// Restores the previous ambient context when dropped.
///
/// Not `Send`: a binding is undone on the thread that made it.
#[must_use = "the context is unbound as soon as the guard is dropped"]
pub struct BindGuard {
    previous: Option<AmbientContext>,
    _not_send: PhantomData<*const ()>,
}

impl BindGuard {
    /// Restores now instead of at end of scope.
    pub fn restore(mut self) {
        self.restore_previous();
    }

    fn restore_previous(&mut self) {
        if let Some(previous) = self.previous.take() {
            ambient::restore(previous);
            trace!("restored execution context");
        }
    }
}

impl Drop for BindGuard {
    fn drop(&mut self) {
        self.restore_previous();
    }
}
