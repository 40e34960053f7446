use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateAccountRequest, MembershipRequest, PaginationParams};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::validate_account;
use crate::types::{Group, Membership};

pub async fn create_group(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> impl IntoResponse {
    validate_account(&req.slug, &req.name)?;

    let now = Utc::now();
    let group = Group {
        id: Uuid::new_v4().to_string(),
        slug: req.slug,
        name: req.name.trim().to_string(),
        created_at: now,
        updated_at: now,
    };

    match state.store.create_group(&group) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => {
            return Err(ApiError::conflict("An account with this slug already exists"));
        }
        Err(e) => {
            tracing::error!("Failed to create group: {e}");
            return Err(ApiError::internal("Failed to create group"));
        }
    }

    tracing::info!(group = %group.id, slug = %group.slug, "group created");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(group))))
}

pub async fn list_groups(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let groups = state
        .store
        .list_groups(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list groups")?;

    let (groups, next_cursor, has_more) =
        paginate(groups, DEFAULT_PAGE_SIZE as usize, |g| g.slug.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(groups, next_cursor, has_more)))
}

pub async fn get_group(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let group = state
        .store
        .get_group(&id)
        .api_err("Failed to get group")?
        .or_not_found("Group not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(group)))
}

pub async fn delete_group(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_group(&id)
        .api_err("Failed to delete group")?;

    if !deleted {
        return Err(ApiError::not_found("Group not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let group = state
        .store
        .get_group(&id)
        .api_err("Failed to get group")?
        .or_not_found("Group not found")?;

    let memberships = state
        .store
        .list_group_memberships(&group.id)
        .api_err("Failed to list memberships")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(memberships)))
}

/// Grants or changes a user's role in a group.
pub async fn put_member(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((group_id, user_id)): Path<(String, String)>,
    Json(req): Json<MembershipRequest>,
) -> impl IntoResponse {
    let now = Utc::now();
    let created_at = state
        .store
        .get_membership(&user_id, &group_id)
        .api_err("Failed to get membership")?
        .map_or(now, |m| m.created_at);

    let membership = Membership {
        user_id,
        group_id,
        role: req.role,
        created_at,
        updated_at: now,
    };

    match state.store.upsert_membership(&membership) {
        Ok(()) => {}
        Err(Error::NotFound) => return Err(ApiError::not_found("User or group not found")),
        Err(Error::NotAGroup) => {
            return Err(ApiError::bad_request("Memberships can only be granted on groups"));
        }
        Err(e) => {
            tracing::error!("Failed to save membership: {e}");
            return Err(ApiError::internal("Failed to save membership"));
        }
    }

    tracing::info!(
        group = %membership.group_id,
        user = %membership.user_id,
        role = %membership.role,
        "membership saved"
    );

    Ok(Json(ApiResponse::success(membership)))
}

pub async fn delete_member(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_membership(&user_id, &group_id)
        .api_err("Failed to delete membership")?;

    if !deleted {
        return Err(ApiError::not_found("Membership not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
