use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Users and groups share one slug space; the kind is stored alongside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Group,
}

impl AccountKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "group" => Some(Self::Group),
            _ => None,
        }
    }
}

/// The account holding a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Owner {
    User(User),
    Group(Group),
}

impl Owner {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::User(u) => &u.id,
            Self::Group(g) => &g.id,
        }
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Self::User(u) => &u.slug,
            Self::Group(g) => &g.slug,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::User(u) => &u.name,
            Self::Group(g) => &g.name,
        }
    }

    #[must_use]
    pub fn kind(&self) -> AccountKind {
        match self {
            Self::User(_) => AccountKind::User,
            Self::Group(_) => AccountKind::Group,
        }
    }

    /// Page path of a repository held by this owner: `/{owner}/{repo}`.
    #[must_use]
    pub fn repository_path(&self, repo: &Repository) -> String {
        format!("/{}/{}", self.slug(), repo.slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Private,
}

impl Privacy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub privacy: Privacy,
    /// Render the table of contents instead of the flat doc list.
    pub has_toc: bool,
    pub stars_count: i64,
    pub watches_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.privacy == Privacy::Private
    }

    #[must_use]
    pub fn count_for(&self, action_type: ActionType) -> i64 {
        match action_type {
            ActionType::Star => self.stars_count,
            ActionType::Watch => self.watches_count,
        }
    }
}

/// A role record for a user inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: String,
    pub group_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Star,
    Watch,
}

impl ActionType {
    pub const ALL: [ActionType; 2] = [ActionType::Star, ActionType::Watch];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Star => "star",
            Self::Watch => "watch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "star" => Some(Self::Star),
            "watch" => Some(Self::Watch),
            _ => None,
        }
    }

    /// Name of the repository column caching this action's count.
    #[must_use]
    pub const fn counter_column(self) -> &'static str {
        match self {
            Self::Star => "stars_count",
            Self::Watch => "watches_count",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a user holds a social action on a repository, and the resulting count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionState {
    pub active: bool,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doc {
    pub id: String,
    pub repository_id: String,
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}
