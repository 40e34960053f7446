use crate::error::Result;
use crate::store::Store;
use crate::types::{Owner, Repository};

/// A repository resolved from its `/{owner}/{repo}` path.
#[derive(Debug, Clone)]
pub struct Located {
    pub owner: Owner,
    pub repository: Repository,
}

/// Resolves an owner slug and repository slug.
///
/// Returns `None` when the owner slug is unknown or the repository is not held
/// by that owner. Callers surface this as not found before consulting privacy,
/// so a wrong path never reveals whether a private repository exists elsewhere.
pub fn locate(store: &dyn Store, owner_slug: &str, repo_slug: &str) -> Result<Option<Located>> {
    let Some(owner) = store.get_owner_by_slug(owner_slug)? else {
        return Ok(None);
    };

    let repository = store.get_repository(owner.id(), repo_slug)?;

    Ok(repository.map(|repository| Located { owner, repository }))
}
