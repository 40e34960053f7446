//! Repository access decisions.
//!
//! [`authorize`] is a pure function over the principal, the requested
//! [`Action`] and the [`Target`] it applies to. Looking up what the principal
//! holds (group roles) and resolving slugs into records happen beforehand, in
//! [`scope`] and [`locate`].

mod locate;
mod principal;

pub use locate::{Located, locate};
pub use principal::{Principal, scope};

use serde::Serialize;
use thiserror::Error;

use crate::types::{Owner, Repository, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateRepository,
    ViewRepository,
    /// Create documents inside the repository.
    EditRepository,
    /// Settings, updates and deletion.
    AdministerRepository,
    /// Star or watch.
    React,
}

impl Action {
    /// Every action except viewing changes state.
    #[must_use]
    pub fn is_mutating(self) -> bool {
        !matches!(self, Self::ViewRepository)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// An owner about to receive a new repository.
    Owner(&'a Owner),
    Repository {
        owner: &'a Owner,
        repository: &'a Repository,
    },
}

impl<'a> Target<'a> {
    #[must_use]
    pub fn owner(&self) -> &'a Owner {
        match *self {
            Self::Owner(owner) | Self::Repository { owner, .. } => owner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("you are not authorized to perform this action")]
    Forbidden,
    #[error("not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }

    pub fn ensure(self) -> Result<(), Denial> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(denial) => Err(denial),
        }
    }

    fn allow_if(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny(Denial::Forbidden)
        }
    }
}

impl Owner {
    /// Role the principal holds through this owner. Only groups grant roles.
    #[must_use]
    pub fn resolve_role(&self, principal: &Principal) -> Option<Role> {
        match self {
            Self::User(_) => None,
            Self::Group(group) => principal.role_in(&group.id),
        }
    }

    /// The owning user themself, or a group member holding at least `required`.
    fn grants(&self, principal: &Principal, required: Role) -> bool {
        match self {
            Self::User(user) => principal.is(&user.id),
            Self::Group(_) => self
                .resolve_role(principal)
                .is_some_and(|role| role.has(required)),
        }
    }
}

/// Decides whether `principal` may perform `action` on `target`.
///
/// The principal must already be scoped to the target's owner, see [`scope`].
#[must_use]
pub fn authorize(principal: &Principal, action: Action, target: Target<'_>) -> Decision {
    if action.is_mutating() && principal.is_anonymous() {
        return Decision::Deny(Denial::AuthenticationRequired);
    }

    let owner = target.owner();

    let repository = match target {
        Target::Owner(_) if action == Action::CreateRepository => {
            return Decision::allow_if(owner.grants(principal, Role::Editor));
        }
        Target::Owner(_) => return Decision::Deny(Denial::NotFound),
        Target::Repository { repository, .. } => repository,
    };
    if repository.owner_id != owner.id() {
        return Decision::Deny(Denial::NotFound);
    }

    match action {
        Action::ViewRepository | Action::React => {
            if !repository.is_private() {
                Decision::Allow
            } else if principal.is_anonymous() {
                Decision::Deny(Denial::AuthenticationRequired)
            } else {
                Decision::allow_if(owner.grants(principal, Role::Editor))
            }
        }
        Action::CreateRepository | Action::EditRepository => {
            Decision::allow_if(owner.grants(principal, Role::Editor))
        }
        Action::AdministerRepository => Decision::allow_if(owner.grants(principal, Role::Admin)),
    }
}

/// What a principal may do with one repository; drives conditional page
/// fragments and the API's viewer block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Abilities {
    pub view: bool,
    pub edit: bool,
    pub administer: bool,
    pub react: bool,
}

impl Abilities {
    #[must_use]
    pub fn evaluate(principal: &Principal, owner: &Owner, repository: &Repository) -> Self {
        let target = Target::Repository { owner, repository };
        let allowed = |action| authorize(principal, action, target).is_allowed();
        Self {
            view: allowed(Action::ViewRepository),
            edit: allowed(Action::EditRepository),
            administer: allowed(Action::AdministerRepository),
            react: allowed(Action::React),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{Group, Privacy, User};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            slug: id.to_string(),
            name: id.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn group_owner() -> Owner {
        Owner::Group(Group {
            id: "g-1".to_string(),
            slug: "writers".to_string(),
            name: "Writers".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn repository(owner: &Owner, privacy: Privacy) -> Repository {
        Repository {
            id: "r-1".to_string(),
            owner_id: owner.id().to_string(),
            name: "Handbook".to_string(),
            slug: "handbook".to_string(),
            description: None,
            privacy,
            has_toc: true,
            stars_count: 0,
            watches_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn member(role: Role) -> Principal {
        Principal::Member {
            user: user("u-1"),
            group_id: "g-1".to_string(),
            role,
        }
    }

    #[test]
    fn test_create_on_user_owner_requires_self() {
        let owner = Owner::User(user("u-1"));
        let target = Target::Owner(&owner);

        assert_eq!(
            authorize(&Principal::User(user("u-1")), Action::CreateRepository, target),
            Decision::Allow
        );
        assert_eq!(
            authorize(&Principal::User(user("u-2")), Action::CreateRepository, target),
            Decision::Deny(Denial::Forbidden)
        );
        assert_eq!(
            authorize(&Principal::Anonymous, Action::CreateRepository, target),
            Decision::Deny(Denial::AuthenticationRequired)
        );
    }

    #[test]
    fn test_create_on_group_requires_editor() {
        let owner = group_owner();
        let target = Target::Owner(&owner);

        assert_eq!(
            authorize(&Principal::User(user("u-1")), Action::CreateRepository, target),
            Decision::Deny(Denial::Forbidden)
        );
        assert!(authorize(&member(Role::Editor), Action::CreateRepository, target).is_allowed());
        assert!(authorize(&member(Role::Admin), Action::CreateRepository, target).is_allowed());
    }

    #[test]
    fn test_member_of_other_group_gets_nothing() {
        let owner = group_owner();
        let repo = repository(&owner, Privacy::Private);
        let outsider = Principal::Member {
            user: user("u-1"),
            group_id: "g-2".to_string(),
            role: Role::Admin,
        };
        let target = Target::Repository {
            owner: &owner,
            repository: &repo,
        };

        assert_eq!(
            authorize(&outsider, Action::ViewRepository, target),
            Decision::Deny(Denial::Forbidden)
        );
    }

    #[test]
    fn test_private_view() {
        let owner = group_owner();
        let repo = repository(&owner, Privacy::Private);
        let target = Target::Repository {
            owner: &owner,
            repository: &repo,
        };

        assert_eq!(
            authorize(&Principal::Anonymous, Action::ViewRepository, target),
            Decision::Deny(Denial::AuthenticationRequired)
        );
        assert_eq!(
            authorize(&Principal::User(user("u-1")), Action::ViewRepository, target),
            Decision::Deny(Denial::Forbidden)
        );
        assert!(authorize(&member(Role::Editor), Action::ViewRepository, target).is_allowed());
    }

    #[test]
    fn test_administer_requires_admin_or_owning_user() {
        let owner = group_owner();
        let repo = repository(&owner, Privacy::Public);

        let editor = Abilities::evaluate(&member(Role::Editor), &owner, &repo);
        assert!(editor.edit);
        assert!(!editor.administer);

        let admin = Abilities::evaluate(&member(Role::Admin), &owner, &repo);
        assert!(admin.administer);

        let user_owner = Owner::User(user("u-1"));
        let own_repo = repository(&user_owner, Privacy::Private);
        let me = Abilities::evaluate(&Principal::User(user("u-1")), &user_owner, &own_repo);
        assert_eq!(
            me,
            Abilities {
                view: true,
                edit: true,
                administer: true,
                react: true,
            }
        );
    }

    #[test]
    fn test_anonymous_on_public_repo() {
        let owner = group_owner();
        let repo = repository(&owner, Privacy::Public);
        let abilities = Abilities::evaluate(&Principal::Anonymous, &owner, &repo);

        assert!(abilities.view);
        assert!(!abilities.edit);
        assert!(!abilities.react);

        let target = Target::Repository {
            owner: &owner,
            repository: &repo,
        };
        assert_eq!(
            authorize(&Principal::Anonymous, Action::React, target),
            Decision::Deny(Denial::AuthenticationRequired)
        );
    }

    #[test]
    fn test_repository_of_another_owner_is_not_found() {
        let owner = group_owner();
        let other = Owner::User(user("u-9"));
        let repo = repository(&other, Privacy::Public);
        let target = Target::Repository {
            owner: &owner,
            repository: &repo,
        };

        assert_eq!(
            authorize(&member(Role::Admin), Action::ViewRepository, target),
            Decision::Deny(Denial::NotFound)
        );
    }

    #[test]
    fn test_repository_action_without_repository() {
        let owner = group_owner();
        assert_eq!(
            authorize(&member(Role::Admin), Action::ViewRepository, Target::Owner(&owner)),
            Decision::Deny(Denial::NotFound)
        );
    }
}
