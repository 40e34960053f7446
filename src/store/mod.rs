mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Group operations
    fn create_group(&self, group: &Group) -> Result<()>;
    fn get_group(&self, id: &str) -> Result<Option<Group>>;
    fn list_groups(&self, cursor: &str, limit: i32) -> Result<Vec<Group>>;
    fn delete_group(&self, id: &str) -> Result<bool>;

    // Owner lookup (users and groups share ids and slugs)
    fn get_owner(&self, id: &str) -> Result<Option<Owner>>;
    fn get_owner_by_slug(&self, slug: &str) -> Result<Option<Owner>>;

    // Membership (role) operations
    fn upsert_membership(&self, membership: &Membership) -> Result<()>;
    fn delete_membership(&self, user_id: &str, group_id: &str) -> Result<bool>;
    fn get_membership(&self, user_id: &str, group_id: &str) -> Result<Option<Membership>>;
    fn list_group_memberships(&self, group_id: &str) -> Result<Vec<Membership>>;
    fn list_user_memberships(&self, user_id: &str) -> Result<Vec<Membership>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Repository operations
    fn create_repository(&self, repo: &Repository) -> Result<()>;
    fn get_repository(&self, owner_id: &str, slug: &str) -> Result<Option<Repository>>;
    fn get_repository_by_id(&self, id: &str) -> Result<Option<Repository>>;
    fn update_repository(&self, repo: &Repository) -> Result<()>;
    fn delete_repository(&self, id: &str) -> Result<bool>;

    // Social action operations. Each change and its counter refresh commit together.
    fn get_action_state(
        &self,
        repository_id: &str,
        user_id: &str,
        action_type: ActionType,
    ) -> Result<ActionState>;
    fn set_action(
        &self,
        repository_id: &str,
        user_id: &str,
        action_type: ActionType,
        active: bool,
    ) -> Result<ActionState>;

    // Doc operations
    fn create_doc(&self, doc: &Doc) -> Result<()>;
    fn get_doc(&self, repository_id: &str, slug: &str) -> Result<Option<Doc>>;
    fn list_docs(&self, repository_id: &str) -> Result<Vec<Doc>>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;
}
