//! # Run-as stack
//!
//! Assumed identities are kept as a LIFO stack of [`PrincipalSet`]s stored
//! in the *real* subject's session under [`RUN_AS_PRINCIPALS_KEY`]. Index 0
//! is the most recently assumed identity.
//!
//! Sessions store copies, so every mutation goes through
//! [`RunAsStack::push`] / [`RunAsStack::pop`], which load the stack, change
//! it and write it back in one step. An emptied stack removes the session
//! attribute instead of leaving an empty list behind.

use serde_json::Value;
use tracing::trace;

use super::session::Session;
use crate::auth::principal::PrincipalSet;
use crate::error::SubjectError;

/// Session attribute key holding the serialized stack.
pub const RUN_AS_PRINCIPALS_KEY: &str = "wzs_auth.subject.run_as_principals";

/// Snapshot of the assumed identities of one subject.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunAsStack {
    frames: Vec<PrincipalSet>,
}

impl RunAsStack {
    /// Reads the stack from `session`. A missing attribute is an empty stack.
    pub fn load(session: &dyn Session) -> Result<Self, SubjectError> {
        let frames = match session
            .attribute(RUN_AS_PRINCIPALS_KEY)
            .map_err(SubjectError::Session)?
        {
            Some(value) => serde_json::from_value::<Vec<PrincipalSet>>(value)
                .map_err(|e| SubjectError::Session(e.into()))?,
            None => Vec::new(),
        };
        Ok(Self { frames })
    }

    /// Writes the stack to `session`, removing the attribute when empty.
    pub fn save(&self, session: &dyn Session) -> Result<(), SubjectError> {
        if self.frames.is_empty() {
            session
                .remove_attribute(RUN_AS_PRINCIPALS_KEY)
                .map_err(SubjectError::Session)?;
            return Ok(());
        }

        let value: Value =
            serde_json::to_value(&self.frames).map_err(|e| SubjectError::Session(e.into()))?;
        session
            .set_attribute(RUN_AS_PRINCIPALS_KEY, value)
            .map_err(SubjectError::Session)
    }

    /// Prepends `principals` and persists the stack.
    pub fn push(session: &dyn Session, principals: PrincipalSet) -> Result<Self, SubjectError> {
        let mut stack = Self::load(session)?;
        stack.frames.insert(0, principals);
        stack.save(session)?;
        trace!(depth = stack.frames.len(), session = session.id(), "pushed run-as identity");
        Ok(stack)
    }

    /// Removes and returns the top frame, persisting the remainder.
    ///
    /// Popping an empty stack returns `None` and leaves the session untouched.
    pub fn pop(session: &dyn Session) -> Result<Option<PrincipalSet>, SubjectError> {
        let mut stack = Self::load(session)?;
        if stack.frames.is_empty() {
            return Ok(None);
        }

        let popped = stack.frames.remove(0);
        stack.save(session)?;
        trace!(depth = stack.frames.len(), session = session.id(), "released run-as identity");
        Ok(Some(popped))
    }

    /// Drops every assumed identity.
    pub fn clear(session: &dyn Session) -> Result<(), SubjectError> {
        Self::default().save(session)
    }

    /// The identity currently assumed.
    pub fn top(&self) -> Option<&PrincipalSet> {
        self.frames.first()
    }

    /// The frame directly beneath the top one.
    pub fn beneath_top(&self) -> Option<&PrincipalSet> {
        self.frames.get(1)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
