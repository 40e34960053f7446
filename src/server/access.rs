use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result as StoreResult};
use crate::policy::{Action, Denial, Located, Principal, Target, authorize, locate, scope};
use crate::server::dto::CreateRepositoryRequest;
use crate::server::response::{ApiError, StoreResultExt};
use crate::server::validation::{
    parse_privacy, validate_description, validate_name, validate_repo_slug,
};
use crate::store::Store;
use crate::types::{Group, Owner, Repository, Role};

/// Resolves `/{owner}/{repo}` and scopes the principal to its owner.
/// An unresolved pair is reported as [`Denial::NotFound`] before any
/// privacy rule runs.
pub fn resolve(
    store: &dyn Store,
    principal: Principal,
    owner_slug: &str,
    repo_slug: &str,
) -> Result<(Principal, Located), ApiError> {
    let located = locate(store, owner_slug, repo_slug)
        .api_err("Failed to look up repository")?
        .ok_or(Denial::NotFound)?;
    let principal =
        scope(store, principal, &located.owner).api_err("Failed to look up membership")?;
    Ok((principal, located))
}

/// Checks `action` against a located repository.
pub fn require(principal: &Principal, action: Action, located: &Located) -> Result<(), Denial> {
    let target = Target::Repository {
        owner: &located.owner,
        repository: &located.repository,
    };
    authorize(principal, action, target).ensure()
}

#[derive(Debug)]
pub enum CreateError {
    Denied(Denial),
    UnknownOwner,
    Invalid(String),
    Duplicate,
    Store(Error),
}

impl From<Denial> for CreateError {
    fn from(denial: Denial) -> Self {
        Self::Denied(denial)
    }
}

impl From<Error> for CreateError {
    fn from(e: Error) -> Self {
        Self::Store(e)
    }
}

impl From<CreateError> for ApiError {
    fn from(e: CreateError) -> Self {
        match e {
            CreateError::Denied(denial) => denial.into(),
            CreateError::UnknownOwner => ApiError::not_found("Owner not found"),
            CreateError::Invalid(message) => ApiError::bad_request(message),
            CreateError::Duplicate => ApiError::conflict("Repository already exists"),
            CreateError::Store(e) => {
                tracing::error!("Failed to create repository: {e}");
                ApiError::internal("Failed to create repository")
            }
        }
    }
}

/// Creates a repository under the owner named by `req.owner_id`.
///
/// The owner must exist, the principal must be allowed to create under it,
/// and only then is the input validated.
pub fn create_repository(
    store: &dyn Store,
    principal: Principal,
    req: CreateRepositoryRequest,
) -> Result<Located, CreateError> {
    if principal.is_anonymous() {
        return Err(Denial::AuthenticationRequired.into());
    }

    let owner = store
        .get_owner(&req.owner_id)?
        .ok_or(CreateError::UnknownOwner)?;
    let principal = scope(store, principal, &owner)?;

    authorize(&principal, Action::CreateRepository, Target::Owner(&owner)).ensure()?;

    validate_name(&req.name, "Repository").map_err(CreateError::Invalid)?;
    validate_repo_slug(&req.slug).map_err(CreateError::Invalid)?;
    let description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    validate_description(description.as_deref()).map_err(CreateError::Invalid)?;
    let privacy = parse_privacy(req.privacy.as_deref()).map_err(CreateError::Invalid)?;

    let now = Utc::now();
    let repository = Repository {
        id: Uuid::new_v4().to_string(),
        owner_id: owner.id().to_string(),
        name: req.name.trim().to_string(),
        slug: req.slug,
        description,
        privacy,
        has_toc: req.has_toc.unwrap_or(true),
        stars_count: 0,
        watches_count: 0,
        created_at: now,
        updated_at: now,
    };

    match store.create_repository(&repository) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => return Err(CreateError::Duplicate),
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        repository = %repository.id,
        owner = %owner.slug(),
        slug = %repository.slug,
        privacy = repository.privacy.as_str(),
        "repository created"
    );

    Ok(Located { owner, repository })
}

/// Owners a user may create repositories under: themself, then every group
/// in which they hold at least the editor role.
pub fn creatable_owners(store: &dyn Store, principal: &Principal) -> StoreResult<Vec<Owner>> {
    let Some(user) = principal.user() else {
        return Ok(Vec::new());
    };

    let mut owners = vec![Owner::User(user.clone())];
    for membership in store.list_user_memberships(&user.id)? {
        if !membership.role.has(Role::Editor) {
            continue;
        }
        let group: Option<Group> = store.get_group(&membership.group_id)?;
        owners.extend(group.map(Owner::Group));
    }
    Ok(owners)
}
