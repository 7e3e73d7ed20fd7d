use std::collections::{HashMap, HashSet};

use crate::auth::principal::PrincipalSet;

/// Answers role questions for a set of principals.
///
/// [`Subject`](crate::subject::Subject) always passes its *current*
/// principals, so an assumed identity is what gets checked.
pub trait Authorizer: Send + Sync {
    fn has_role(&self, principals: &PrincipalSet, role: &str) -> bool;
}

/// [`Authorizer`] backed by a fixed principal → roles table.
///
/// A principal set has a role if any of its principals was granted it.
///
/// # Example
/// ```rust
/// use wzs_auth::auth::principal::PrincipalSet;
/// use wzs_auth::subject::authz::{Authorizer, StaticRoleAuthorizer};
///
/// let authz = StaticRoleAuthorizer::default().grant("alice", "admin");
/// assert!(authz.has_role(&PrincipalSet::single("db", "alice"), "admin"));
/// assert!(!authz.has_role(&PrincipalSet::single("db", "bob"), "admin"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticRoleAuthorizer {
    roles: HashMap<String, HashSet<String>>,
}

impl StaticRoleAuthorizer {
    pub fn grant(mut self, principal: impl Into<String>, role: impl Into<String>) -> Self {
        self.roles
            .entry(principal.into())
            .or_default()
            .insert(role.into());
        self
    }
}

impl Authorizer for StaticRoleAuthorizer {
    fn has_role(&self, principals: &PrincipalSet, role: &str) -> bool {
        principals
            .iter()
            .filter_map(|p| self.roles.get(p))
            .any(|roles| roles.contains(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_principal_may_carry_the_role() {
        let authz = StaticRoleAuthorizer::default()
            .grant("42", "auditor")
            .grant("alice", "staff");
        let principals = PrincipalSet::of("db", ["alice", "42"]);

        assert!(authz.has_role(&principals, "auditor"));
        assert!(authz.has_role(&principals, "staff"));
        assert!(!authz.has_role(&principals, "admin"));
    }

    #[test]
    fn empty_principals_have_no_roles() {
        let authz = StaticRoleAuthorizer::default().grant("alice", "staff");
        assert!(!authz.has_role(&PrincipalSet::empty(), "staff"));
    }
}
