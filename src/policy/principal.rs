use crate::error::Result;
use crate::store::Store;
use crate::types::{Owner, Role, User};

/// The acting identity for an authorization decision. Derived per request,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User(User),
    /// A user evaluated against a group in which it holds a role.
    Member {
        user: User,
        group_id: String,
        role: Role,
    },
}

impl Principal {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) | Self::Member { user, .. } => Some(user),
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns true if this principal acts as the given user.
    #[must_use]
    pub fn is(&self, user_id: &str) -> bool {
        self.user().is_some_and(|u| u.id == user_id)
    }

    /// Role held inside `group_id`, if this principal was scoped to that group.
    #[must_use]
    pub fn role_in(&self, group_id: &str) -> Option<Role> {
        match self {
            Self::Member {
                group_id: scoped,
                role,
                ..
            } if scoped == group_id => Some(*role),
            _ => None,
        }
    }

    /// Drops any group scope, keeping the user identity.
    #[must_use]
    pub fn unscoped(self) -> Self {
        match self {
            Self::Member { user, .. } => Self::User(user),
            other => other,
        }
    }
}

/// Scopes a principal to a repository owner: a user holding a role in an
/// owning group becomes a `Member` of it. Any other combination comes back
/// unscoped.
pub fn scope(store: &dyn Store, principal: Principal, owner: &Owner) -> Result<Principal> {
    let principal = principal.unscoped();

    let (Principal::User(user), Owner::Group(group)) = (&principal, owner) else {
        return Ok(principal);
    };

    match store.get_membership(&user.id, &group.id)? {
        Some(membership) => Ok(Principal::Member {
            user: user.clone(),
            group_id: group.id.clone(),
            role: membership.role,
        }),
        None => Ok(principal),
    }
}
