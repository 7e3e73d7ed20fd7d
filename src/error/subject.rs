use thiserror::Error;

/// Errors raised by [`Subject`](crate::subject::Subject) operations.
#[derive(Debug, Error)]
pub enum SubjectError {
    /// Run-as was requested by a subject that has no identity of its own.
    #[error(
        "this subject does not yet have an identity; assuming another identity is only \
         allowed for subjects with an existing identity"
    )]
    NoExistingIdentity,

    /// Run-as was requested with an empty principal set.
    #[error("principals to run as cannot be empty")]
    EmptyPrincipals,

    /// The subject has no session and no factory to create one.
    #[error("subject has no session and no session factory is configured")]
    NoSession,

    /// The backing session store failed.
    #[error("session store failure")]
    Session(#[source] anyhow::Error),

    /// A role check failed.
    #[error("subject does not have role `{role}`")]
    Unauthorized { role: String },
}
