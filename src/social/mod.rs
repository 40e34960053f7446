//! Star and watch toggles.
//!
//! The per-user rows in `social_actions` are the source of truth; the
//! repository counters are refreshed from them inside the same transaction
//! (see [`Store::set_action`]).

mod fragment;

pub use fragment::Fragment;

use thiserror::Error;

use crate::policy::{Action, Denial, Located, Principal, Target, authorize};
use crate::store::Store;
use crate::types::ActionType;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error(transparent)]
    Denied(#[from] Denial),

    #[error(transparent)]
    Store(#[from] crate::error::Error),
}

/// Adds the principal's `action_type` to the repository. Repeating it without
/// an intervening [`untoggle`] changes nothing.
pub fn toggle(
    store: &dyn Store,
    principal: &Principal,
    located: &Located,
    action_type: ActionType,
) -> Result<Fragment, SocialError> {
    apply(store, principal, located, action_type, true)
}

/// Removes the principal's `action_type` from the repository, if present.
pub fn untoggle(
    store: &dyn Store,
    principal: &Principal,
    located: &Located,
    action_type: ActionType,
) -> Result<Fragment, SocialError> {
    apply(store, principal, located, action_type, false)
}

fn apply(
    store: &dyn Store,
    principal: &Principal,
    located: &Located,
    action_type: ActionType,
    active: bool,
) -> Result<Fragment, SocialError> {
    let target = Target::Repository {
        owner: &located.owner,
        repository: &located.repository,
    };
    authorize(principal, Action::React, target).ensure()?;

    let user = principal.user().ok_or(Denial::AuthenticationRequired)?;
    let repository = &located.repository;

    let state = store.set_action(&repository.id, &user.id, action_type, active)?;

    tracing::info!(
        repository = %repository.id,
        user = %user.id,
        action = %action_type,
        active,
        count = state.count,
        "social action updated"
    );

    Ok(Fragment::new(located, action_type, state.active, state.count))
}

/// The button state a principal currently sees. Anonymous principals always
/// see the inactive state.
pub fn current(
    store: &dyn Store,
    principal: &Principal,
    located: &Located,
    action_type: ActionType,
) -> crate::error::Result<Fragment> {
    let repository = &located.repository;

    let (active, count) = match principal.user() {
        Some(user) => {
            let state = store.get_action_state(&repository.id, &user.id, action_type)?;
            (state.active, state.count)
        }
        None => (false, repository.count_for(action_type)),
    };

    Ok(Fragment::new(located, action_type, active, count))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{Owner, Privacy, Repository, User};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            slug: id.to_string(),
            name: id.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn setup() -> (SqliteStore, Located, Located) {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();

        let owner = user("owner");
        store.create_user(&owner).unwrap();
        store.create_user(&user("reader")).unwrap();
        let owner = Owner::User(owner);

        let mut located = Vec::new();
        for slug in ["first", "second"] {
            let repository = Repository {
                id: format!("r-{slug}"),
                owner_id: owner.id().to_string(),
                name: slug.to_string(),
                slug: slug.to_string(),
                description: None,
                privacy: Privacy::Public,
                has_toc: true,
                stars_count: 0,
                watches_count: 0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            store.create_repository(&repository).unwrap();
            located.push(Located {
                owner: owner.clone(),
                repository,
            });
        }

        let second = located.pop().unwrap();
        let first = located.pop().unwrap();
        (store, first, second)
    }

    fn stars(store: &SqliteStore, located: &Located) -> i64 {
        store
            .get_repository_by_id(&located.repository.id)
            .unwrap()
            .unwrap()
            .stars_count
    }

    #[test]
    fn test_toggle_is_idempotent() {
        let (store, repo, _) = setup();
        let reader = Principal::User(user("reader"));

        let first = toggle(&store, &reader, &repo, ActionType::Star).unwrap();
        let second = toggle(&store, &reader, &repo, ActionType::Star).unwrap();

        assert!(first.active);
        assert_eq!(first.count, 1);
        assert_eq!(second.count, 1);
        assert_eq!(stars(&store, &repo), 1);
    }

    #[test]
    fn test_toggle_then_untoggle_restores_count() {
        let (store, repo, _) = setup();
        let reader = Principal::User(user("reader"));

        toggle(&store, &reader, &repo, ActionType::Star).unwrap();
        let fragment = untoggle(&store, &reader, &repo, ActionType::Star).unwrap();

        assert!(!fragment.active);
        assert_eq!(fragment.count, 0);

        let again = untoggle(&store, &reader, &repo, ActionType::Star).unwrap();
        assert_eq!(again.count, 0);
        assert_eq!(stars(&store, &repo), 0);
    }

    #[test]
    fn test_repositories_do_not_share_counters() {
        let (store, first, second) = setup();
        let reader = Principal::User(user("reader"));

        toggle(&store, &reader, &first, ActionType::Star).unwrap();
        assert_eq!(stars(&store, &second), 0);

        toggle(&store, &reader, &second, ActionType::Star).unwrap();
        toggle(&store, &reader, &first, ActionType::Watch).unwrap();

        assert_eq!(stars(&store, &first), 1);
        assert_eq!(stars(&store, &second), 1);
        let first_now = store
            .get_repository_by_id(&first.repository.id)
            .unwrap()
            .unwrap();
        assert_eq!(first_now.watches_count, 1);
    }

    #[test]
    fn test_anonymous_toggle_is_denied_without_change() {
        let (store, repo, _) = setup();

        let result = toggle(&store, &Principal::Anonymous, &repo, ActionType::Star);
        assert!(matches!(
            result,
            Err(SocialError::Denied(Denial::AuthenticationRequired))
        ));
        assert_eq!(stars(&store, &repo), 0);
    }

    #[test]
    fn test_private_repository_toggle_is_forbidden_for_strangers() {
        let (store, mut repo, _) = setup();
        repo.repository.privacy = Privacy::Private;
        store.update_repository(&repo.repository).unwrap();

        let reader = Principal::User(user("reader"));
        let result = toggle(&store, &reader, &repo, ActionType::Watch);
        assert!(matches!(result, Err(SocialError::Denied(Denial::Forbidden))));

        let owner = Principal::User(user("owner"));
        let fragment = toggle(&store, &owner, &repo, ActionType::Watch).unwrap();
        assert_eq!(fragment.count, 1);
    }

    #[test]
    fn test_current_reflects_viewer() {
        let (store, repo, _) = setup();
        let reader = Principal::User(user("reader"));
        toggle(&store, &reader, &repo, ActionType::Star).unwrap();

        let mine = current(&store, &reader, &repo, ActionType::Star).unwrap();
        assert!(mine.active);

        let owner = Principal::User(user("owner"));
        let theirs = current(&store, &owner, &repo, ActionType::Star).unwrap();
        assert!(!theirs.active);
        assert_eq!(theirs.count, 1);
    }
}
