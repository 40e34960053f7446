use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::Abilities;
use crate::social::Fragment;
use crate::types::{AccountKind, Owner, Repository, Role, Token};

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Body shared by the JSON endpoint and the web form. Form fields arrive as
/// strings, so privacy stays textual until validated.
#[derive(Debug, Deserialize)]
pub struct CreateRepositoryRequest {
    pub owner_id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privacy: Option<String>,
    #[serde(default)]
    pub has_toc: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRepositoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privacy: Option<String>,
    #[serde(default)]
    pub has_toc: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocRequest {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OwnerSummary {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub kind: AccountKind,
}

impl From<&Owner> for OwnerSummary {
    fn from(owner: &Owner) -> Self {
        Self {
            id: owner.id().to_string(),
            slug: owner.slug().to_string(),
            name: owner.name().to_string(),
            kind: owner.kind(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SocialState {
    pub action_type: String,
    pub active: bool,
    pub count: i64,
    pub scope: String,
}

impl From<Fragment> for SocialState {
    fn from(fragment: Fragment) -> Self {
        Self {
            scope: fragment.scope(),
            action_type: fragment.action_type.to_string(),
            active: fragment.active,
            count: fragment.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RepositoryResponse {
    #[serde(flatten)]
    pub repository: Repository,
    pub path: String,
    pub owner: OwnerSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abilities: Option<Abilities>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub social: Vec<SocialState>,
}

impl RepositoryResponse {
    #[must_use]
    pub fn new(owner: &Owner, repository: Repository) -> Self {
        Self {
            path: owner.repository_path(&repository),
            owner: owner.into(),
            repository,
            abilities: None,
            social: Vec::new(),
        }
    }
}

/// Parameters of the web action endpoint, sent in the query string or as a
/// urlencoded form body.
#[derive(Debug, Default, Deserialize)]
pub struct ActionParams {
    #[serde(default, alias = "type")]
    pub action_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

impl ActionParams {
    /// Fills fields missing here from `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            action_type: self.action_type.or(other.action_type),
            format: self.format.or(other.format),
        }
    }

    #[must_use]
    pub fn wants_script(&self) -> bool {
        self.format.as_deref() == Some("js")
    }
}
