//! # Ambient context
//!
//! Four independent slots describe the caller of the current unit of work:
//! the [`Subject`], the peer address, the session id and the
//! [`SecurityManager`].
//!
//! Each slot is a thread-local. Async work is covered by
//! [`ExecutionContextBinder::scope`](super::binder::ExecutionContextBinder::scope),
//! which installs its snapshot around every poll of the wrapped future, so
//! whatever is bound on the polling thread is the whole ambient context.
//!
//! Slots are only written through
//! [`ExecutionContextBinder`](super::binder::ExecutionContextBinder).

use std::cell::RefCell;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::thread::LocalKey;

use tracing::warn;

use crate::subject::Subject;
use crate::subject::manager::SecurityManager;

thread_local! {
    static SUBJECT: RefCell<Option<Subject>> = const { RefCell::new(None) };
    static PEER_ADDRESS: RefCell<Option<IpAddr>> = const { RefCell::new(None) };
    static SESSION_ID: RefCell<Option<String>> = const { RefCell::new(None) };
    static SECURITY_MANAGER: RefCell<Option<Arc<SecurityManager>>> = const { RefCell::new(None) };
}

/// Values of every ambient slot at one point in time.
///
/// `None` means the slot is empty; binding a context with an empty slot
/// clears that slot.
#[derive(Clone, Default)]
pub struct AmbientContext {
    pub subject: Option<Subject>,
    pub peer_address: Option<IpAddr>,
    pub session_id: Option<String>,
    pub security_manager: Option<Arc<SecurityManager>>,
}

impl AmbientContext {
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_peer_address(mut self, peer: Option<IpAddr>) -> Self {
        self.peer_address = peer;
        self
    }

    pub fn with_session_id(mut self, id: Option<String>) -> Self {
        self.session_id = id;
        self
    }

    pub fn with_security_manager(mut self, manager: Arc<SecurityManager>) -> Self {
        self.security_manager = Some(manager);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.peer_address.is_none()
            && self.session_id.is_none()
            && self.security_manager.is_none()
    }
}

impl fmt::Debug for AmbientContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientContext")
            .field("subject", &self.subject)
            .field("peer_address", &self.peer_address)
            .field("session_id", &self.session_id)
            .field("security_manager", &self.security_manager.is_some())
            .finish()
    }
}

fn thread_value<T: Clone + 'static>(key: &'static LocalKey<RefCell<Option<T>>>) -> Option<T> {
    key.try_with(|slot| slot.borrow().clone()).ok().flatten()
}

/// The subject bound to the current thread or scoped task.
pub fn current_subject() -> Option<Subject> {
    thread_value(&SUBJECT)
}

pub fn peer_address() -> Option<IpAddr> {
    thread_value(&PEER_ADDRESS)
}

pub fn session_id() -> Option<String> {
    thread_value(&SESSION_ID)
}

pub fn security_manager() -> Option<Arc<SecurityManager>> {
    thread_value(&SECURITY_MANAGER)
}

/// Everything currently ambient, slot by slot.
pub fn snapshot() -> AmbientContext {
    AmbientContext {
        subject: current_subject(),
        peer_address: peer_address(),
        session_id: session_id(),
        security_manager: security_manager(),
    }
}

/// Replaces one thread slot, returning the value it held.
///
/// A slot that can no longer be accessed (thread teardown) is reported and
/// treated as having been empty.
fn replace_slot<T: 'static>(
    key: &'static LocalKey<RefCell<Option<T>>>,
    slot: &'static str,
    value: Option<T>,
) -> Option<T> {
    match key.try_with(|cell| cell.replace(value)) {
        Ok(previous) => previous,
        Err(err) => {
            warn!(slot, error = %err, "ambient slot is unavailable on this thread");
            None
        }
    }
}

/// Installs `context` into the thread slots and returns what they held.
pub(crate) fn install(context: AmbientContext) -> AmbientContext {
    AmbientContext {
        subject: replace_slot(&SUBJECT, "subject", context.subject),
        peer_address: replace_slot(&PEER_ADDRESS, "peer_address", context.peer_address),
        session_id: replace_slot(&SESSION_ID, "session_id", context.session_id),
        security_manager: replace_slot(
            &SECURITY_MANAGER,
            "security_manager",
            context.security_manager,
        ),
    }
}

/// Puts `previous` back, slot by slot: a previous value is reinstalled and
/// an absent one clears the slot.
pub(crate) fn restore(previous: AmbientContext) {
    replace_slot(&SUBJECT, "subject", previous.subject);
    replace_slot(&PEER_ADDRESS, "peer_address", previous.peer_address);
    replace_slot(&SESSION_ID, "session_id", previous.session_id);
    replace_slot(&SECURITY_MANAGER, "security_manager", previous.security_manager);
}
